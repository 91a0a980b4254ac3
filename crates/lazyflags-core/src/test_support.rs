use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

use crate::model::{Environment, EnvironmentState};
use crate::service::{DataService, ServiceError, SessionRequest, SessionToken};

#[derive(Debug, Clone)]
pub enum Script {
    Blob { raw: String, delay_ms: u64 },
    SessionFailure(ServiceError),
    LatestFailure(ServiceError),
    Panic,
    /// Holds the worker until `expected` workers have arrived, then serves
    /// `raw`. Fails with a transport error if the others never show up.
    Rendezvous {
        raw: String,
        rendezvous: Arc<Rendezvous>,
    },
}

#[derive(Debug)]
pub struct Rendezvous {
    expected: usize,
    arrived: Mutex<usize>,
    all_arrived: Condvar,
}

impl Rendezvous {
    pub fn new(expected: usize) -> Arc<Self> {
        Arc::new(Self {
            expected,
            arrived: Mutex::new(0),
            all_arrived: Condvar::new(),
        })
    }

    fn arrive(&self, timeout: Duration) -> bool {
        let mut arrived = self.arrived.lock().expect("rendezvous lock");
        *arrived += 1;
        self.all_arrived.notify_all();
        let (_arrived, wait) = self
            .all_arrived
            .wait_timeout_while(arrived, timeout, |count| *count < self.expected)
            .expect("rendezvous wait");
        !wait.timed_out()
    }
}

#[derive(Default)]
pub struct ScriptedDataService {
    scripts: HashMap<String, Script>,
    sessions: Mutex<Vec<SessionRequest>>,
    fetches: Mutex<Vec<String>>,
}

impl ScriptedDataService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, environment_id: &str, script: Script) -> Self {
        self.scripts.insert(environment_id.to_string(), script);
        self
    }

    pub fn blob(self, environment_id: &str, raw: &str, delay_ms: u64) -> Self {
        self.with(
            environment_id,
            Script::Blob {
                raw: raw.to_string(),
                delay_ms,
            },
        )
    }

    pub fn sessions(&self) -> Vec<SessionRequest> {
        self.sessions.lock().expect("sessions lock").clone()
    }

    pub fn fetches(&self) -> Vec<String> {
        self.fetches.lock().expect("fetches lock").clone()
    }
}

impl DataService for ScriptedDataService {
    fn start_configuration_session(
        &self,
        request: &SessionRequest,
    ) -> Result<SessionToken, ServiceError> {
        self.sessions
            .lock()
            .expect("sessions lock")
            .push(request.clone());

        match self.scripts.get(&request.environment_id) {
            Some(Script::SessionFailure(error)) => Err(error.clone()),
            Some(_) => Ok(SessionToken(request.environment_id.clone())),
            None => Err(ServiceError::NotFound {
                resource: "environment",
                id: request.environment_id.clone(),
            }),
        }
    }

    fn get_latest_configuration(&self, token: &SessionToken) -> Result<Vec<u8>, ServiceError> {
        self.fetches
            .lock()
            .expect("fetches lock")
            .push(token.0.clone());

        match self.scripts.get(&token.0) {
            Some(Script::Blob { raw, delay_ms }) => {
                thread::sleep(Duration::from_millis(*delay_ms));
                Ok(raw.as_bytes().to_vec())
            }
            Some(Script::LatestFailure(error)) => Err(error.clone()),
            Some(Script::SessionFailure(error)) => Err(error.clone()),
            Some(Script::Panic) => panic!("scripted panic in get_latest_configuration"),
            Some(Script::Rendezvous { raw, rendezvous }) => {
                if rendezvous.arrive(Duration::from_secs(5)) {
                    Ok(raw.as_bytes().to_vec())
                } else {
                    Err(ServiceError::transport("other workers never arrived"))
                }
            }
            None => Err(ServiceError::transport("no script")),
        }
    }
}

pub fn environment(id: &str, name: &str) -> Environment {
    Environment {
        id: id.to_string(),
        name: name.to_string(),
        state: EnvironmentState::ReadyForDeployment,
    }
}
