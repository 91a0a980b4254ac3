mod catalog;
mod flags;
mod maintenance;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use lazyflags_core::fixture::FixtureBackend;
use lazyflags_core::service::{ConfigService, DataService, ServiceError};
use lazyflags_core::settings::{Settings, load_settings_or_default, resolve_settings_path};
use log::info;

pub use maintenance::{CacheListing, CacheListingRow, clear_cache, doctor, list_cache};

/// Use cases shared by the TUI and the CLI. Cheap to clone; clones share the
/// underlying service clients.
#[derive(Clone)]
pub struct App {
    config: Arc<dyn ConfigService>,
    data: Arc<dyn DataService>,
    min_poll_interval_seconds: u32,
}

impl App {
    pub fn new(
        config: Arc<dyn ConfigService>,
        data: Arc<dyn DataService>,
        min_poll_interval_seconds: u32,
    ) -> Self {
        Self {
            config,
            data,
            min_poll_interval_seconds,
        }
    }
}

pub fn load_settings() -> Result<Settings> {
    let path = resolve_settings_path().context("failed to resolve settings path")?;
    load_settings_or_default(&path)
        .with_context(|| format!("failed to load settings at {}", path.display()))
}

/// Builds the App against the configured source. A `--fixture` override
/// wins over `source.fixture` from the settings file.
pub fn connect(settings: &Settings, fixture_override: Option<&Path>) -> Result<App> {
    let Some(fixture) = fixture_override.or(settings.source.fixture.as_deref()) else {
        bail!(
            "no configuration source configured; pass --fixture <PATH> or set source.fixture in ~/.config/lazyflags/config.toml"
        );
    };

    let backend = Arc::new(
        FixtureBackend::load(fixture)
            .with_context(|| format!("failed to open fixture source {}", fixture.display()))?,
    );
    info!(
        "connected to fixture {} ({} applications)",
        fixture.display(),
        backend.application_count()
    );

    Ok(App::new(
        backend.clone(),
        backend,
        settings.fetch.min_poll_interval_seconds,
    ))
}

pub(crate) fn describe_service_error(error: ServiceError, action: &str) -> anyhow::Error {
    if error.is_credential_error() {
        anyhow::Error::new(error).context(format!("{action}; check your credentials"))
    } else {
        anyhow::Error::new(error).context(action.to_string())
    }
}
