use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use anyhow::Result;
use lazyflags_app::App;
use lazyflags_core::cache::{CacheKey, ResultCache};
use lazyflags_core::model::{Application, ConfigurationProfile, FlagResult, any_failed};
use log::{debug, error, warn};

use crate::navigation::{Command, FlagsSource, Message, RequestId};

pub(crate) trait TaskOps: Send + Sync {
    fn list_applications(&self) -> Result<Vec<Application>>;
    fn list_flag_profiles(&self, application_id: &str) -> Result<Vec<ConfigurationProfile>>;
    fn fetch_flags(&self, key: &CacheKey) -> Result<Vec<FlagResult>>;
}

impl TaskOps for App {
    fn list_applications(&self) -> Result<Vec<Application>> {
        App::list_applications(self)
    }

    fn list_flag_profiles(&self, application_id: &str) -> Result<Vec<ConfigurationProfile>> {
        App::list_flag_profiles(self, application_id)
    }

    fn fetch_flags(&self, key: &CacheKey) -> Result<Vec<FlagResult>> {
        App::fetch_flags(self, &key.application_id, &key.profile_id)
    }
}

#[derive(Debug, Clone)]
enum Task {
    Applications {
        request: RequestId,
    },
    Profiles {
        request: RequestId,
        application_id: String,
    },
    Flags {
        request: RequestId,
        key: CacheKey,
    },
}

#[derive(Debug)]
enum TaskOutcome {
    Applications {
        request: RequestId,
        result: Result<Vec<Application>, String>,
    },
    Profiles {
        request: RequestId,
        application_id: String,
        result: Result<Vec<ConfigurationProfile>, String>,
    },
    Flags {
        request: RequestId,
        key: CacheKey,
        result: Result<Vec<FlagResult>, String>,
    },
}

impl Task {
    fn name(&self) -> &'static str {
        match self {
            Self::Applications { .. } => "applications",
            Self::Profiles { .. } => "profiles",
            Self::Flags { .. } => "flags",
        }
    }

    fn run(&self, ops: &dyn TaskOps) -> TaskOutcome {
        match self {
            Self::Applications { request } => TaskOutcome::Applications {
                request: *request,
                result: ops.list_applications().map_err(|error| format!("{error:#}")),
            },
            Self::Profiles {
                request,
                application_id,
            } => TaskOutcome::Profiles {
                request: *request,
                application_id: application_id.clone(),
                result: ops
                    .list_flag_profiles(application_id)
                    .map_err(|error| format!("{error:#}")),
            },
            Self::Flags { request, key } => TaskOutcome::Flags {
                request: *request,
                key: key.clone(),
                result: ops.fetch_flags(key).map_err(|error| format!("{error:#}")),
            },
        }
    }

    fn failed(self, message: String) -> TaskOutcome {
        match self {
            Self::Applications { request } => TaskOutcome::Applications {
                request,
                result: Err(message),
            },
            Self::Profiles {
                request,
                application_id,
            } => TaskOutcome::Profiles {
                request,
                application_id,
                result: Err(message),
            },
            Self::Flags { request, key } => TaskOutcome::Flags {
                request,
                key,
                result: Err(message),
            },
        }
    }
}

/// Runs load commands off the loop thread and turns their outcomes back
/// into messages. Owns the result cache; only `dispatch` and `drain`, both
/// called from the loop thread, ever touch it.
pub(crate) struct Dispatcher {
    ops: Arc<dyn TaskOps>,
    cache: ResultCache,
    sender: Sender<TaskOutcome>,
    receiver: Receiver<TaskOutcome>,
    ready: VecDeque<Message>,
}

impl Dispatcher {
    pub(crate) fn new(ops: Arc<dyn TaskOps>, cache: ResultCache) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            ops,
            cache,
            sender,
            receiver,
            ready: VecDeque::new(),
        }
    }

    pub(crate) fn dispatch(&mut self, command: Command) {
        match command {
            Command::LoadApplications { request } => {
                self.spawn(Task::Applications { request });
            }
            Command::LoadProfiles {
                request,
                application_id,
            } => {
                self.spawn(Task::Profiles {
                    request,
                    application_id,
                });
            }
            Command::LoadFlags { request, key } => {
                if let Some(results) = self.cache.get(&key) {
                    debug!("cache hit for {key}");
                    self.ready.push_back(Message::FlagsLoaded {
                        request,
                        key,
                        result: Ok(results),
                        source: FlagsSource::Cache,
                        cache_warning: None,
                    });
                    return;
                }

                debug!("cache miss for {key}; fetching");
                self.spawn(Task::Flags { request, key });
            }
            Command::Quit => {}
        }
    }

    /// Collects every finished task. Successful fetches are written to the
    /// cache here, before the navigator sees them.
    pub(crate) fn drain(&mut self) -> Vec<Message> {
        let mut messages: Vec<Message> = self.ready.drain(..).collect();
        while let Ok(outcome) = self.receiver.try_recv() {
            messages.push(self.into_message(outcome));
        }
        messages
    }

    fn into_message(&mut self, outcome: TaskOutcome) -> Message {
        match outcome {
            TaskOutcome::Applications { request, result } => {
                Message::ApplicationsLoaded { request, result }
            }
            TaskOutcome::Profiles {
                request,
                application_id,
                result,
            } => Message::ProfilesLoaded {
                request,
                application_id,
                result,
            },
            TaskOutcome::Flags {
                request,
                key,
                result,
            } => {
                let cache_warning = match &result {
                    Ok(results) => self.store(&key, results),
                    Err(_) => None,
                };
                Message::FlagsLoaded {
                    request,
                    key,
                    result,
                    source: FlagsSource::Fetch,
                    cache_warning,
                }
            }
        }
    }

    fn store(&mut self, key: &CacheKey, results: &[FlagResult]) -> Option<String> {
        if any_failed(results) {
            debug!("not caching {key}: at least one environment failed");
            return None;
        }

        match self.cache.add(key, results.to_vec()) {
            Ok(()) => None,
            Err(error) => {
                warn!("failed to persist cache entry {key}: {error}");
                Some(error.to_string())
            }
        }
    }

    fn spawn(&mut self, task: Task) {
        let name = task.name();
        let ops = Arc::clone(&self.ops);
        let sender = self.sender.clone();
        let job = task.clone();

        let spawned = thread::Builder::new()
            .name(format!("lazyflags-{name}"))
            .spawn(move || {
                let outcome = match panic::catch_unwind(AssertUnwindSafe(|| job.run(ops.as_ref())))
                {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        error!("background {name} task panicked");
                        job.failed(format!("background {name} task panicked"))
                    }
                };
                let _ = sender.send(outcome);
            });

        if let Err(spawn_error) = spawned {
            error!("failed to start background {name} task: {spawn_error}");
            let outcome = task.failed(format!(
                "failed to start background {name} task: {spawn_error}"
            ));
            let message = self.into_message(outcome);
            self.ready.push_back(message);
        }
    }
}
