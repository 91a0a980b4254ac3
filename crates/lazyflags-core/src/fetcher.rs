use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::thread;

use log::{debug, warn};
use thiserror::Error;

use crate::model::{Environment, FlagResult, Flags, decode_flags};
use crate::service::{DataService, ServiceError, SessionRequest};

pub const DEFAULT_MIN_POLL_INTERVAL_SECONDS: u32 = 60;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to establish configuration session: {0}")]
    Session(#[source] ServiceError),
    #[error("failed to get feature flags: {0}")]
    Latest(#[source] ServiceError),
    #[error("failed to decode feature flags: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Two-step retrieval of one environment's latest flag configuration.
pub fn fetch_environment_flags(
    data: &dyn DataService,
    request: &SessionRequest,
) -> Result<Flags, FetchError> {
    let token = data
        .start_configuration_session(request)
        .map_err(FetchError::Session)?;
    let raw = data
        .get_latest_configuration(&token)
        .map_err(FetchError::Latest)?;
    decode_flags(&raw).map_err(FetchError::Decode)
}

pub struct EnvironmentFetcher<'a> {
    data: &'a dyn DataService,
    min_poll_interval_seconds: u32,
}

impl<'a> EnvironmentFetcher<'a> {
    pub fn new(data: &'a dyn DataService, min_poll_interval_seconds: u32) -> Self {
        Self {
            data,
            min_poll_interval_seconds,
        }
    }

    /// Fetches every environment concurrently, one worker per environment,
    /// and returns once all of them have reported. The returned results are
    /// in `environments` order regardless of which worker finished first; a
    /// failing environment yields a result carrying its error.
    pub fn fetch(
        &self,
        application_id: &str,
        profile_id: &str,
        environments: &[Environment],
    ) -> Vec<FlagResult> {
        let (sender, receiver) = mpsc::channel::<(usize, FlagResult)>();
        let mut slots: Vec<Option<FlagResult>> = environments.iter().map(|_| None).collect();

        thread::scope(|scope| {
            for (index, environment) in environments.iter().enumerate() {
                let sender = sender.clone();
                let request = SessionRequest {
                    application_id: application_id.to_string(),
                    profile_id: profile_id.to_string(),
                    environment_id: environment.id.clone(),
                    min_poll_interval_seconds: self.min_poll_interval_seconds,
                };
                let data = self.data;

                scope.spawn(move || {
                    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                        fetch_environment_flags(data, &request)
                    }));
                    let result = match outcome {
                        Ok(Ok(flags)) => FlagResult::loaded(environment, flags),
                        Ok(Err(error)) => {
                            warn!("fetch failed for environment '{}': {error}", environment.name);
                            FlagResult::failed(environment, error.to_string())
                        }
                        Err(_) => FlagResult::failed(environment, "fetch worker panicked"),
                    };
                    let _ = sender.send((index, result));
                });
            }
            drop(sender);

            for (index, result) in receiver {
                debug!("collected flags for environment '{}'", result.environment_name);
                slots[index] = Some(result);
            }
        });

        slots
            .into_iter()
            .zip(environments)
            .map(|(slot, environment)| {
                slot.unwrap_or_else(|| {
                    FlagResult::failed(environment, "fetch worker ended without reporting")
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Rendezvous, Script, ScriptedDataService, environment};

    #[test]
    fn results_follow_listing_order_not_completion_order() {
        let data = ScriptedDataService::new()
            .blob("dev", r#"{"a":{"enabled":true}}"#, 60)
            .blob("stg", r#"{"a":{"enabled":false}}"#, 30)
            .blob("prd", r#"{"a":{"enabled":true}}"#, 0);
        let environments = vec![
            environment("dev", "development"),
            environment("stg", "staging"),
            environment("prd", "production"),
        ];

        let results = EnvironmentFetcher::new(&data, 60).fetch("app1", "cfg1", &environments);

        let names: Vec<&str> = results
            .iter()
            .map(|result| result.environment_name.as_str())
            .collect();
        assert_eq!(names, vec!["development", "staging", "production"]);
        assert!(results[0].flags["a"].enabled);
        assert!(!results[1].flags["a"].enabled);
    }

    #[test]
    fn all_environments_are_in_flight_at_once() {
        let ids = ["dev", "qa", "stg", "perf", "prd"];
        let rendezvous = Rendezvous::new(ids.len());
        let data = ids.iter().fold(ScriptedDataService::new(), |data, id| {
            data.with(
                id,
                Script::Rendezvous {
                    raw: r#"{"a":{"enabled":true}}"#.to_string(),
                    rendezvous: rendezvous.clone(),
                },
            )
        });
        let environments: Vec<Environment> = ids.iter().map(|id| environment(id, id)).collect();

        let results = EnvironmentFetcher::new(&data, 60).fetch("app1", "cfg1", &environments);

        assert_eq!(results.len(), ids.len());
        for result in &results {
            assert_eq!(
                result.error, None,
                "{} was not fetched concurrently",
                result.environment_name
            );
            assert!(result.flags["a"].enabled);
        }
    }

    #[test]
    fn each_environment_gets_its_own_session_with_poll_interval() {
        let data = ScriptedDataService::new()
            .blob("dev", "{}", 0)
            .blob("prd", "{}", 0);
        let environments = vec![
            environment("dev", "development"),
            environment("prd", "production"),
        ];

        EnvironmentFetcher::new(&data, 90).fetch("app1", "cfg1", &environments);

        let mut sessions = data.sessions();
        sessions.sort_by(|left, right| left.environment_id.cmp(&right.environment_id));
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].environment_id, "dev");
        assert_eq!(sessions[0].application_id, "app1");
        assert_eq!(sessions[0].profile_id, "cfg1");
        assert_eq!(sessions[0].min_poll_interval_seconds, 90);
        assert_eq!(data.fetches().len(), 2);
    }

    #[test]
    fn failing_environment_does_not_abort_the_fetch() {
        let data = ScriptedDataService::new()
            .blob("a", r#"{"dark_mode":{"enabled":true}}"#, 0)
            .with(
                "b",
                Script::LatestFailure(ServiceError::transport("connection reset")),
            );
        let environments = vec![environment("a", "A"), environment("b", "B")];

        let results = EnvironmentFetcher::new(&data, 60).fetch("app1", "cfg1", &environments);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].error, None);
        let error = results[1].error.as_deref().expect("B error");
        assert!(error.contains("failed to get feature flags"));
        assert!(error.contains("connection reset"));
        assert!(results[1].flags.is_empty());
    }

    #[test]
    fn session_failure_skips_latest_configuration_call() {
        let data = ScriptedDataService::new().with(
            "a",
            Script::SessionFailure(ServiceError::credentials("expired token")),
        );
        let environments = vec![environment("a", "A")];

        let results = EnvironmentFetcher::new(&data, 60).fetch("app1", "cfg1", &environments);

        assert!(
            results[0]
                .error
                .as_deref()
                .expect("error")
                .starts_with("failed to establish configuration session")
        );
        assert!(data.fetches().is_empty());
    }

    #[test]
    fn undecodable_blob_is_reported_per_environment() {
        let data = ScriptedDataService::new().blob("a", "not json", 0);
        let environments = vec![environment("a", "A")];

        let results = EnvironmentFetcher::new(&data, 60).fetch("app1", "cfg1", &environments);

        assert!(
            results[0]
                .error
                .as_deref()
                .expect("error")
                .starts_with("failed to decode feature flags")
        );
    }

    #[test]
    fn panicking_worker_is_reported_as_that_environments_error() {
        let data = ScriptedDataService::new()
            .with("a", Script::Panic)
            .blob("b", r#"{"dark_mode":{"enabled":false}}"#, 0);
        let environments = vec![environment("a", "A"), environment("b", "B")];

        let results = EnvironmentFetcher::new(&data, 60).fetch("app1", "cfg1", &environments);

        assert_eq!(results[0].error.as_deref(), Some("fetch worker panicked"));
        assert_eq!(results[1].error, None);
        assert!(!results[1].flags["dark_mode"].enabled);
    }

    #[test]
    fn empty_listing_returns_no_results() {
        let data = ScriptedDataService::new();
        let results = EnvironmentFetcher::new(&data, 60).fetch("app1", "cfg1", &[]);
        assert!(results.is_empty());
        assert!(data.sessions().is_empty());
    }
}
