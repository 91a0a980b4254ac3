use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use lazyflags_app::App;
use lazyflags_core::model::{
    Application, ConfigurationProfile, Environment, EnvironmentState, ProfileKind,
};
use lazyflags_core::service::{ConfigService, DataService, ServiceError, SessionRequest, SessionToken};

#[derive(Default)]
pub struct FakeService {
    pub applications: Vec<Application>,
    pub profiles: Vec<ConfigurationProfile>,
    pub environments: Vec<Environment>,
    pub profiles_error: Option<ServiceError>,
    pub environments_error: Option<ServiceError>,
    blobs: HashMap<String, (Result<String, ServiceError>, u64)>,
    sessions: Mutex<Vec<SessionRequest>>,
}

impl FakeService {
    pub fn with_environments(names: &[(&str, &str)]) -> Self {
        Self {
            environments: names
                .iter()
                .map(|(id, name)| Environment {
                    id: id.to_string(),
                    name: name.to_string(),
                    state: EnvironmentState::ReadyForDeployment,
                })
                .collect(),
            ..Self::default()
        }
    }

    pub fn blob(mut self, environment_id: &str, raw: &str, delay_ms: u64) -> Self {
        self.blobs
            .insert(environment_id.to_string(), (Ok(raw.to_string()), delay_ms));
        self
    }

    pub fn failing(mut self, environment_id: &str, error: ServiceError) -> Self {
        self.blobs
            .insert(environment_id.to_string(), (Err(error), 0));
        self
    }

    pub fn sessions(&self) -> Vec<SessionRequest> {
        self.sessions.lock().expect("sessions lock").clone()
    }

    pub fn into_app(self) -> (App, Arc<FakeService>) {
        let service = Arc::new(self);
        (App::new(service.clone(), service.clone(), 60), service)
    }
}

impl ConfigService for FakeService {
    fn list_applications(&self) -> Result<Vec<Application>, ServiceError> {
        Ok(self.applications.clone())
    }

    fn list_configuration_profiles(
        &self,
        _application_id: &str,
    ) -> Result<Vec<ConfigurationProfile>, ServiceError> {
        match &self.profiles_error {
            Some(error) => Err(error.clone()),
            None => Ok(self.profiles.clone()),
        }
    }

    fn list_environments(&self, _application_id: &str) -> Result<Vec<Environment>, ServiceError> {
        match &self.environments_error {
            Some(error) => Err(error.clone()),
            None => Ok(self.environments.clone()),
        }
    }
}

impl DataService for FakeService {
    fn start_configuration_session(
        &self,
        request: &SessionRequest,
    ) -> Result<SessionToken, ServiceError> {
        self.sessions
            .lock()
            .expect("sessions lock")
            .push(request.clone());
        Ok(SessionToken(request.environment_id.clone()))
    }

    fn get_latest_configuration(&self, token: &SessionToken) -> Result<Vec<u8>, ServiceError> {
        let (outcome, delay_ms) = self
            .blobs
            .get(&token.0)
            .cloned()
            .unwrap_or_else(|| (Err(ServiceError::transport("no blob")), 0));
        thread::sleep(Duration::from_millis(delay_ms));
        outcome.map(String::into_bytes)
    }
}

pub fn profile(id: &str, kind: ProfileKind) -> ConfigurationProfile {
    ConfigurationProfile {
        id: id.to_string(),
        name: format!("{id}-name"),
        application_id: "app1".to_string(),
        kind,
    }
}

pub fn write_fixture(root: &Path) -> PathBuf {
    let path = root.join("fixture.toml");
    fs::write(
        &path,
        r#"
[[application]]
id = "app1"
name = "checkout"

[[application.profile]]
id = "cfg1"
name = "release-flags"

[[application.profile]]
id = "cfg2"
name = "raw-json"
kind = "AWS.Freeform"

[[application.environment]]
id = "dev"
name = "development"

[[application.configuration]]
profile = "cfg1"
environment = "dev"
content = '{"dark_mode":{"enabled":true}}'
"#,
    )
    .expect("write fixture");
    path
}
