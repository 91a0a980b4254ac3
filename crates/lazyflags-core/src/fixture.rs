//! Local stand-in for the remote configuration service.
//!
//! A fixture file describes applications with their profiles, environments
//! and per-(profile, environment) flag blobs, and can inject failures at
//! any call site:
//!
//! ```toml
//! [[application]]
//! id = "app1"
//! name = "checkout"
//!
//! [[application.profile]]
//! id = "cfg1"
//! name = "release-flags"
//!
//! [[application.environment]]
//! id = "dev"
//! name = "development"
//!
//! [[application.configuration]]
//! profile = "cfg1"
//! environment = "dev"
//! content = '{"dark_mode":{"enabled":true}}'
//! ```

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use log::debug;
use serde::Deserialize;
use thiserror::Error;

use crate::model::{
    Application, ConfigurationProfile, Environment, EnvironmentState, FEATURE_FLAGS_PROFILE_TYPE,
    ProfileKind,
};
use crate::service::{ConfigService, DataService, ServiceError, SessionRequest, SessionToken};

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("failed to read fixture at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse fixture at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid fixture: {message}")]
    Validation { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Transport,
    Credentials,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InjectedFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl InjectedFailure {
    fn to_error(&self) -> ServiceError {
        match self.kind {
            FailureKind::Transport => ServiceError::transport(self.message.clone()),
            FailureKind::Credentials => ServiceError::credentials(self.message.clone()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct FixtureFile {
    applications_failure: Option<InjectedFailure>,
    #[serde(default, rename = "application")]
    applications: Vec<FixtureApplication>,
}

#[derive(Debug, Clone, Deserialize)]
struct FixtureApplication {
    id: String,
    name: String,
    description: Option<String>,
    profiles_failure: Option<InjectedFailure>,
    environments_failure: Option<InjectedFailure>,
    #[serde(default, rename = "profile")]
    profiles: Vec<FixtureProfile>,
    #[serde(default, rename = "environment")]
    environments: Vec<FixtureEnvironment>,
    #[serde(default, rename = "configuration")]
    configurations: Vec<FixtureConfiguration>,
}

#[derive(Debug, Clone, Deserialize)]
struct FixtureProfile {
    id: String,
    name: String,
    #[serde(default = "default_profile_kind")]
    kind: String,
}

fn default_profile_kind() -> String {
    FEATURE_FLAGS_PROFILE_TYPE.to_string()
}

#[derive(Debug, Clone, Deserialize)]
struct FixtureEnvironment {
    id: String,
    name: String,
    #[serde(default = "default_environment_state")]
    state: EnvironmentState,
}

fn default_environment_state() -> EnvironmentState {
    EnvironmentState::ReadyForDeployment
}

#[derive(Debug, Clone, Deserialize)]
struct FixtureConfiguration {
    profile: String,
    environment: String,
    content: Option<String>,
    failure: Option<InjectedFailure>,
    #[serde(default)]
    delay_ms: u64,
}

/// Serves both service traits from a parsed fixture file.
#[derive(Debug, Clone)]
pub struct FixtureBackend {
    file: FixtureFile,
}

impl FixtureBackend {
    pub fn load(path: &Path) -> Result<Self, FixtureError> {
        let raw = fs::read_to_string(path).map_err(|source| FixtureError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: FixtureFile = toml::from_str(&raw).map_err(|source| FixtureError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        validate_fixture(&file)?;
        debug!(
            "loaded fixture {} with {} applications",
            path.display(),
            file.applications.len()
        );
        Ok(Self { file })
    }

    pub fn application_count(&self) -> usize {
        self.file.applications.len()
    }

    fn application(&self, application_id: &str) -> Result<&FixtureApplication, ServiceError> {
        self.file
            .applications
            .iter()
            .find(|application| application.id == application_id)
            .ok_or_else(|| ServiceError::NotFound {
                resource: "application",
                id: application_id.to_string(),
            })
    }
}

impl ConfigService for FixtureBackend {
    fn list_applications(&self) -> Result<Vec<Application>, ServiceError> {
        if let Some(failure) = &self.file.applications_failure {
            return Err(failure.to_error());
        }
        Ok(self
            .file
            .applications
            .iter()
            .map(|application| Application {
                id: application.id.clone(),
                name: application.name.clone(),
                description: application.description.clone(),
            })
            .collect())
    }

    fn list_configuration_profiles(
        &self,
        application_id: &str,
    ) -> Result<Vec<ConfigurationProfile>, ServiceError> {
        let application = self.application(application_id)?;
        if let Some(failure) = &application.profiles_failure {
            return Err(failure.to_error());
        }
        Ok(application
            .profiles
            .iter()
            .map(|profile| ConfigurationProfile {
                id: profile.id.clone(),
                name: profile.name.clone(),
                application_id: application.id.clone(),
                kind: ProfileKind::from_type_name(&profile.kind),
            })
            .collect())
    }

    fn list_environments(&self, application_id: &str) -> Result<Vec<Environment>, ServiceError> {
        let application = self.application(application_id)?;
        if let Some(failure) = &application.environments_failure {
            return Err(failure.to_error());
        }
        Ok(application
            .environments
            .iter()
            .map(|environment| Environment {
                id: environment.id.clone(),
                name: environment.name.clone(),
                state: environment.state,
            })
            .collect())
    }
}

impl DataService for FixtureBackend {
    fn start_configuration_session(
        &self,
        request: &SessionRequest,
    ) -> Result<SessionToken, ServiceError> {
        let application = self.application(&request.application_id)?;
        if !application
            .profiles
            .iter()
            .any(|profile| profile.id == request.profile_id)
        {
            return Err(ServiceError::NotFound {
                resource: "configuration profile",
                id: request.profile_id.clone(),
            });
        }
        if !application
            .environments
            .iter()
            .any(|environment| environment.id == request.environment_id)
        {
            return Err(ServiceError::NotFound {
                resource: "environment",
                id: request.environment_id.clone(),
            });
        }

        Ok(SessionToken(format!(
            "{}/{}/{}",
            request.application_id, request.profile_id, request.environment_id
        )))
    }

    fn get_latest_configuration(&self, token: &SessionToken) -> Result<Vec<u8>, ServiceError> {
        let mut parts = token.0.splitn(3, '/');
        let (Some(application_id), Some(profile_id), Some(environment_id)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(ServiceError::transport(format!(
                "malformed session token '{}'",
                token.0
            )));
        };

        let application = self.application(application_id)?;
        let configuration = application
            .configurations
            .iter()
            .find(|configuration| {
                configuration.profile == profile_id && configuration.environment == environment_id
            })
            .ok_or_else(|| ServiceError::NotFound {
                resource: "configuration",
                id: format!("{profile_id}/{environment_id}"),
            })?;

        if configuration.delay_ms > 0 {
            thread::sleep(Duration::from_millis(configuration.delay_ms));
        }

        if let Some(failure) = &configuration.failure {
            return Err(failure.to_error());
        }
        Ok(configuration
            .content
            .clone()
            .unwrap_or_default()
            .into_bytes())
    }
}

fn validate_fixture(file: &FixtureFile) -> Result<(), FixtureError> {
    let mut application_ids = BTreeSet::new();

    for (index, application) in file.applications.iter().enumerate() {
        if application.id.trim().is_empty() {
            return Err(validation(format!(
                "application[{index}] id must be non-empty"
            )));
        }
        check_token_safe("application", &application.id)?;
        for profile in &application.profiles {
            check_token_safe("profile", &profile.id)?;
        }
        for environment in &application.environments {
            check_token_safe("environment", &environment.id)?;
        }
        if !application_ids.insert(application.id.as_str()) {
            return Err(validation(format!(
                "application id '{}' is defined more than once",
                application.id
            )));
        }

        let profile_ids: BTreeSet<&str> = application
            .profiles
            .iter()
            .map(|profile| profile.id.as_str())
            .collect();
        let environment_ids: BTreeSet<&str> = application
            .environments
            .iter()
            .map(|environment| environment.id.as_str())
            .collect();

        if profile_ids.len() != application.profiles.len() {
            return Err(validation(format!(
                "application '{}' has duplicate profile ids",
                application.id
            )));
        }
        if environment_ids.len() != application.environments.len() {
            return Err(validation(format!(
                "application '{}' has duplicate environment ids",
                application.id
            )));
        }

        for configuration in &application.configurations {
            if !profile_ids.contains(configuration.profile.as_str()) {
                return Err(validation(format!(
                    "application '{}' configuration references unknown profile '{}'",
                    application.id, configuration.profile
                )));
            }
            if !environment_ids.contains(configuration.environment.as_str()) {
                return Err(validation(format!(
                    "application '{}' configuration references unknown environment '{}'",
                    application.id, configuration.environment
                )));
            }
            if configuration.content.is_some() == configuration.failure.is_some() {
                return Err(validation(format!(
                    "application '{}' configuration {}/{} must set exactly one of content or failure",
                    application.id, configuration.profile, configuration.environment
                )));
            }
        }
    }

    Ok(())
}

// Session tokens join the three ids with '/'.
fn check_token_safe(kind: &str, id: &str) -> Result<(), FixtureError> {
    if id.contains('/') {
        return Err(validation(format!("{kind} id '{id}' must not contain '/'")));
    }
    Ok(())
}

fn validation(message: String) -> FixtureError {
    FixtureError::Validation { message }
}
