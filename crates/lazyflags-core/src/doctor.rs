use std::fmt;
use std::path::{Path, PathBuf};

use crate::cache::{CacheError, CacheFileStatus, inspect_cache_file, resolve_cache_path};
use crate::fixture::FixtureBackend;
use crate::settings::{Settings, SettingsError, load_settings, resolve_settings_path};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckState {
    Pass,
    Fail,
}

impl fmt::Display for CheckState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::Fail => write!(f, "FAIL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoctorCheck {
    pub name: String,
    pub state: CheckState,
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoctorReport {
    pub checks: Vec<DoctorCheck>,
}

impl DoctorReport {
    pub fn has_failures(&self) -> bool {
        self.checks
            .iter()
            .any(|check| check.state == CheckState::Fail)
    }

    pub fn summary(&self) -> String {
        let passed = self
            .checks
            .iter()
            .filter(|check| check.state == CheckState::Pass)
            .count();
        let failed = self.checks.len().saturating_sub(passed);
        format!("{passed} passed, {failed} failed")
    }
}

pub fn run_doctor(fixture_override: Option<&Path>) -> DoctorReport {
    run_doctor_with_paths(
        resolve_settings_path(),
        resolve_cache_path(),
        fixture_override,
    )
}

pub fn run_doctor_with_paths(
    settings_path: Result<PathBuf, SettingsError>,
    cache_path: Result<PathBuf, CacheError>,
    fixture_override: Option<&Path>,
) -> DoctorReport {
    let mut checks = Vec::new();

    let settings = match settings_path {
        Ok(path) => {
            checks.push(pass_check(
                "settings path resolves",
                path.display().to_string(),
            ));
            check_settings_file(&path, &mut checks)
        }
        Err(error) => {
            checks.push(fail_check("settings path resolves", error.to_string()));
            checks.push(skipped_check(
                "settings file parses and validates",
                "settings path could not be resolved",
            ));
            None
        }
    };

    let fixture = fixture_override
        .map(Path::to_path_buf)
        .or_else(|| settings.and_then(|settings| settings.source.fixture));
    checks.push(check_fixture_source(fixture.as_deref()));

    match cache_path {
        Ok(path) => {
            checks.push(pass_check(
                "cache directory resolves",
                path.display().to_string(),
            ));
            checks.push(check_cache_file(&path));
        }
        Err(error) => {
            checks.push(fail_check(
                "cache directory resolves",
                format!("{error}; results will only be cached in memory"),
            ));
            checks.push(skipped_check(
                "cache file readable",
                "cache directory could not be resolved",
            ));
        }
    }

    DoctorReport { checks }
}

fn check_settings_file(path: &Path, checks: &mut Vec<DoctorCheck>) -> Option<Settings> {
    if !path.exists() {
        checks.push(pass_check(
            "settings file parses and validates",
            "no settings file, using defaults",
        ));
        return None;
    }

    match load_settings(path) {
        Ok(settings) => {
            checks.push(pass_check(
                "settings file parses and validates",
                "settings are valid",
            ));
            Some(settings)
        }
        Err(error) => {
            checks.push(fail_check(
                "settings file parses and validates",
                error.to_string(),
            ));
            None
        }
    }
}

fn check_fixture_source(fixture: Option<&Path>) -> DoctorCheck {
    let Some(path) = fixture else {
        return fail_check(
            "configuration source loads",
            "no configuration source configured; pass --fixture <PATH> or set source.fixture",
        );
    };

    match FixtureBackend::load(path) {
        Ok(backend) => pass_check(
            "configuration source loads",
            format!(
                "fixture {} with {} applications",
                path.display(),
                backend.application_count()
            ),
        ),
        Err(error) => fail_check("configuration source loads", error.to_string()),
    }
}

fn check_cache_file(path: &Path) -> DoctorCheck {
    match inspect_cache_file(path) {
        CacheFileStatus::Missing => pass_check("cache file readable", "no cache file yet"),
        CacheFileStatus::Valid { entries } => {
            pass_check("cache file readable", format!("{entries} entries"))
        }
        CacheFileStatus::Corrupt { message } => fail_check(
            "cache file readable",
            format!("cache is corrupt and will be ignored: {message}"),
        ),
    }
}

fn pass_check(name: &str, details: impl Into<String>) -> DoctorCheck {
    DoctorCheck {
        name: name.to_string(),
        state: CheckState::Pass,
        details: details.into(),
    }
}

fn fail_check(name: &str, details: impl Into<String>) -> DoctorCheck {
    DoctorCheck {
        name: name.to_string(),
        state: CheckState::Fail,
        details: details.into(),
    }
}

fn skipped_check(name: &str, reason: &str) -> DoctorCheck {
    fail_check(name, format!("skipped because {reason}"))
}
