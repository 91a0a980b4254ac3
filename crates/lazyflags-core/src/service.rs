use thiserror::Error;

use crate::model::{Application, ConfigurationProfile, Environment};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("credentials were rejected: {message}")]
    Credentials { message: String },
    #[error("{resource} '{id}' was not found")]
    NotFound { resource: &'static str, id: String },
    #[error("request failed: {message}")]
    Transport { message: String },
}

impl ServiceError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn credentials(message: impl Into<String>) -> Self {
        Self::Credentials {
            message: message.into(),
        }
    }

    pub fn is_credential_error(&self) -> bool {
        matches!(self, Self::Credentials { .. })
    }
}

/// Listing side of the remote configuration service.
pub trait ConfigService: Send + Sync {
    fn list_applications(&self) -> Result<Vec<Application>, ServiceError>;

    /// Returns every profile of the application, whatever its kind.
    fn list_configuration_profiles(
        &self,
        application_id: &str,
    ) -> Result<Vec<ConfigurationProfile>, ServiceError>;

    fn list_environments(&self, application_id: &str) -> Result<Vec<Environment>, ServiceError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    pub application_id: String,
    pub profile_id: String,
    pub environment_id: String,
    pub min_poll_interval_seconds: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken(pub String);

/// Data-plane side of the service. Each call here is billed, which is why
/// results are cached upstream.
pub trait DataService: Send + Sync {
    fn start_configuration_session(
        &self,
        request: &SessionRequest,
    ) -> Result<SessionToken, ServiceError>;

    fn get_latest_configuration(&self, token: &SessionToken) -> Result<Vec<u8>, ServiceError>;
}
