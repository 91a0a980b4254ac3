use lazyflags_core::matrix::CellState;
use lazyflags_core::model::{Application, ConfigurationProfile, EnvironmentState};

/// Per-environment line of the flag detail view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EnvironmentEntry {
    pub(crate) index: usize,
    pub(crate) name: String,
    pub(crate) state: EnvironmentState,
    pub(crate) cell: CellState,
}

/// Everything a list view can show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ListEntry {
    App(Application),
    Config(ConfigurationProfile),
    Environment(EnvironmentEntry),
}

impl ListEntry {
    pub(crate) fn title(&self) -> String {
        match self {
            Self::App(application) => application.name.clone(),
            Self::Config(profile) => profile.name.clone(),
            Self::Environment(environment) => {
                format!("{} {}", checkbox(environment.cell), environment.name)
            }
        }
    }

    pub(crate) fn description(&self) -> Option<String> {
        match self {
            Self::App(application) => application.description.clone(),
            Self::Config(profile) => Some(profile.id.clone()),
            Self::Environment(environment) => Some(match environment.cell {
                CellState::Absent => "flag not defined".to_string(),
                CellState::Failed => "failed to load".to_string(),
                CellState::On | CellState::Off => environment.state.to_string(),
            }),
        }
    }

    pub(crate) fn as_app(&self) -> Option<&Application> {
        match self {
            Self::App(application) => Some(application),
            _ => None,
        }
    }

    pub(crate) fn as_config(&self) -> Option<&ConfigurationProfile> {
        match self {
            Self::Config(profile) => Some(profile),
            _ => None,
        }
    }

    pub(crate) fn as_environment(&self) -> Option<&EnvironmentEntry> {
        match self {
            Self::Environment(environment) => Some(environment),
            _ => None,
        }
    }
}

fn checkbox(cell: CellState) -> &'static str {
    match cell {
        CellState::On => "[x]",
        CellState::Off => "[ ]",
        CellState::Absent => "[-]",
        CellState::Failed => "[!]",
    }
}
