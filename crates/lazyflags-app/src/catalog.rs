use anyhow::Result;
use lazyflags_core::model::{Application, ConfigurationProfile};

use crate::{App, describe_service_error};

impl App {
    pub fn list_applications(&self) -> Result<Vec<Application>> {
        self.config
            .list_applications()
            .map_err(|error| describe_service_error(error, "failed to list applications"))
    }

    /// Feature-flag profiles of the application, in listing order. Other
    /// profile kinds are dropped.
    pub fn list_flag_profiles(&self, application_id: &str) -> Result<Vec<ConfigurationProfile>> {
        let profiles = self
            .config
            .list_configuration_profiles(application_id)
            .map_err(|error| {
                describe_service_error(
                    error,
                    &format!("failed to list configuration profiles for '{application_id}'"),
                )
            })?;

        Ok(profiles
            .into_iter()
            .filter(|profile| profile.kind.is_feature_flags())
            .collect())
    }
}
