use std::fs;
use std::io;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fetcher::DEFAULT_MIN_POLL_INTERVAL_SECONDS;

const MIN_POLL_INTERVAL_RANGE: RangeInclusive<u32> = 15..=86_400;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Settings {
    pub version: u32,
    #[serde(default)]
    pub source: SourceSettings,
    #[serde(default)]
    pub fetch: FetchSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: 1,
            source: SourceSettings::default(),
            fetch: FetchSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SourceSettings {
    pub fixture: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FetchSettings {
    #[serde(default = "default_min_poll_interval")]
    pub min_poll_interval_seconds: u32,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            min_poll_interval_seconds: DEFAULT_MIN_POLL_INTERVAL_SECONDS,
        }
    }
}

fn default_min_poll_interval() -> u32 {
    DEFAULT_MIN_POLL_INTERVAL_SECONDS
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("could not resolve home directory for settings path")]
    HomeDirectoryUnavailable,
    #[error("failed to read settings at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse settings at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid settings: {message}")]
    Validation { message: String },
}

pub fn resolve_settings_dir() -> Result<PathBuf, SettingsError> {
    let base_dirs = BaseDirs::new().ok_or(SettingsError::HomeDirectoryUnavailable)?;
    Ok(base_dirs.home_dir().join(".config").join("lazyflags"))
}

pub fn resolve_settings_path() -> Result<PathBuf, SettingsError> {
    Ok(resolve_settings_dir()?.join("config.toml"))
}

pub fn load_settings(path: &Path) -> Result<Settings, SettingsError> {
    let raw = fs::read_to_string(path).map_err(|source| SettingsError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let parsed: Settings = toml::from_str(&raw).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    validate_settings(&parsed)?;
    Ok(parsed)
}

/// Like [`load_settings`], but a missing file means defaults.
pub fn load_settings_or_default(path: &Path) -> Result<Settings, SettingsError> {
    if !path.exists() {
        return Ok(Settings::default());
    }
    load_settings(path)
}

pub fn validate_settings(settings: &Settings) -> Result<(), SettingsError> {
    if settings.version != 1 {
        return Err(SettingsError::Validation {
            message: "version must be 1".to_string(),
        });
    }

    let interval = settings.fetch.min_poll_interval_seconds;
    if !MIN_POLL_INTERVAL_RANGE.contains(&interval) {
        return Err(SettingsError::Validation {
            message: format!(
                "fetch.min_poll_interval_seconds must be between {} and {}, got {interval}",
                MIN_POLL_INTERVAL_RANGE.start(),
                MIN_POLL_INTERVAL_RANGE.end()
            ),
        });
    }

    if let Some(fixture) = &settings.source.fixture
        && fixture.as_os_str().is_empty()
    {
        return Err(SettingsError::Validation {
            message: "source.fixture must be a non-empty path".to_string(),
        });
    }

    Ok(())
}
