use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub const FEATURE_FLAGS_PROFILE_TYPE: &str = "AWS.AppConfig.FeatureFlags";
pub const FREEFORM_PROFILE_TYPE: &str = "AWS.Freeform";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Application {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileKind {
    FeatureFlags,
    Freeform,
    Other(String),
}

impl ProfileKind {
    pub fn from_type_name(value: &str) -> Self {
        match value {
            FEATURE_FLAGS_PROFILE_TYPE => Self::FeatureFlags,
            FREEFORM_PROFILE_TYPE => Self::Freeform,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_feature_flags(&self) -> bool {
        matches!(self, Self::FeatureFlags)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationProfile {
    pub id: String,
    pub name: String,
    pub application_id: String,
    pub kind: ProfileKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EnvironmentState {
    ReadyForDeployment,
    Deploying,
    RollingBack,
    RolledBack,
    Reverted,
    #[default]
    #[serde(other)]
    Unknown,
}

impl fmt::Display for EnvironmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::ReadyForDeployment => "ready",
            Self::Deploying => "deploying",
            Self::RollingBack => "rolling back",
            Self::RolledBack => "rolled back",
            Self::Reverted => "reverted",
            Self::Unknown => "unknown",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    pub id: String,
    pub name: String,
    pub state: EnvironmentState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flag {
    pub enabled: bool,
}

pub type Flags = BTreeMap<String, Flag>;

/// Outcome of fetching one environment's flags. The field names match the
/// on-disk cache layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagResult {
    #[serde(rename = "EnvName")]
    pub environment_name: String,
    #[serde(rename = "EnvState", default)]
    pub environment_state: EnvironmentState,
    #[serde(rename = "Flags", default)]
    pub flags: Flags,
    #[serde(rename = "Err", default)]
    pub error: Option<String>,
}

impl FlagResult {
    pub fn loaded(environment: &Environment, flags: Flags) -> Self {
        Self {
            environment_name: environment.name.clone(),
            environment_state: environment.state,
            flags,
            error: None,
        }
    }

    pub fn failed(environment: &Environment, error: impl Into<String>) -> Self {
        Self {
            environment_name: environment.name.clone(),
            environment_state: environment.state,
            flags: Flags::new(),
            error: Some(error.into()),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

pub fn any_failed(results: &[FlagResult]) -> bool {
    results.iter().any(FlagResult::is_failure)
}

/// Decodes a feature-flag configuration blob: a JSON object mapping flag
/// name to `{"enabled": bool}`. Extra attributes on a flag are ignored.
pub fn decode_flags(raw: &[u8]) -> Result<Flags, serde_json::Error> {
    serde_json::from_slice(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn environment(name: &str) -> Environment {
        Environment {
            id: format!("{name}-id"),
            name: name.to_string(),
            state: EnvironmentState::ReadyForDeployment,
        }
    }

    #[test]
    fn decode_flags_reads_enabled_and_ignores_extra_attributes() {
        let flags = decode_flags(
            br#"{"dark_mode":{"enabled":true,"variant":"blue"},"beta":{"enabled":false}}"#,
        )
        .expect("decode");

        assert_eq!(flags.len(), 2);
        assert!(flags["dark_mode"].enabled);
        assert!(!flags["beta"].enabled);
    }

    #[test]
    fn decode_flags_rejects_non_object_payload() {
        assert!(decode_flags(b"[1,2,3]").is_err());
        assert!(decode_flags(b"not json").is_err());
    }

    #[test]
    fn profile_kind_maps_known_type_names() {
        assert_eq!(
            ProfileKind::from_type_name("AWS.AppConfig.FeatureFlags"),
            ProfileKind::FeatureFlags
        );
        assert_eq!(
            ProfileKind::from_type_name("AWS.Freeform"),
            ProfileKind::Freeform
        );
        assert_eq!(
            ProfileKind::from_type_name("Custom"),
            ProfileKind::Other("Custom".to_string())
        );
    }

    #[test]
    fn flag_result_serializes_with_cache_field_names() {
        let mut flags = Flags::new();
        flags.insert("dark_mode".to_string(), Flag { enabled: true });
        let result = FlagResult::loaded(&environment("development"), flags);

        let raw = serde_json::to_string(&result).expect("serialize");
        assert!(raw.contains("\"EnvName\":\"development\""));
        assert!(raw.contains("\"EnvState\":\"ReadyForDeployment\""));
        assert!(raw.contains("\"Flags\":{\"dark_mode\":{\"enabled\":true}}"));
        assert!(raw.contains("\"Err\":null"));
    }

    #[test]
    fn unknown_environment_state_deserializes_as_unknown() {
        let result: FlagResult =
            serde_json::from_str(r#"{"EnvName":"qa","EnvState":"Archived","Flags":{}}"#)
                .expect("deserialize");
        assert_eq!(result.environment_state, EnvironmentState::Unknown);
        assert_eq!(result.error, None);
    }

    #[test]
    fn any_failed_detects_a_single_failed_environment() {
        let ok = FlagResult::loaded(&environment("a"), Flags::new());
        let failed = FlagResult::failed(&environment("b"), "throttled");

        assert!(!any_failed(std::slice::from_ref(&ok)));
        assert!(any_failed(&[ok, failed]));
    }
}
