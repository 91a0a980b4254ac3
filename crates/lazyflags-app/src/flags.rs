use anyhow::Result;
use lazyflags_core::fetcher::EnvironmentFetcher;
use lazyflags_core::model::FlagResult;
use log::debug;

use crate::{App, describe_service_error};

impl App {
    /// Lists environments fresh, then fetches every environment's flags
    /// concurrently. Only the environment listing can fail the whole call;
    /// per-environment failures are carried in the results.
    pub fn fetch_flags(&self, application_id: &str, profile_id: &str) -> Result<Vec<FlagResult>> {
        let environments = self
            .config
            .list_environments(application_id)
            .map_err(|error| {
                describe_service_error(
                    error,
                    &format!("failed to list environments for '{application_id}'"),
                )
            })?;
        debug!(
            "fetching {application_id}:{profile_id} across {} environments",
            environments.len()
        );

        let fetcher = EnvironmentFetcher::new(self.data.as_ref(), self.min_poll_interval_seconds);
        Ok(fetcher.fetch(application_id, profile_id, &environments))
    }
}
