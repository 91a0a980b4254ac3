use std::collections::{BTreeMap, BTreeSet};

use crate::model::{EnvironmentState, FlagResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellState {
    On,
    Off,
    /// The environment loaded but does not define the flag.
    Absent,
    /// The environment's fetch failed, so its state is unknown.
    Failed,
}

impl CellState {
    pub fn from_enabled(enabled: bool) -> Self {
        if enabled { Self::On } else { Self::Off }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
            Self::Absent => "-",
            Self::Failed => "failed",
        }
    }

    pub fn is_toggleable(self) -> bool {
        matches!(self, Self::On | Self::Off)
    }

    pub fn flipped(self) -> Self {
        match self {
            Self::On => Self::Off,
            Self::Off => Self::On,
            other => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentColumn {
    pub name: String,
    pub state: EnvironmentState,
    pub error: Option<String>,
}

impl EnvironmentColumn {
    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagRow {
    pub name: String,
    cells: Vec<CellState>,
}

impl FlagRow {
    pub fn cells(&self) -> &[CellState] {
        &self.cells
    }

    pub fn cell(&self, environment: usize) -> Option<CellState> {
        self.cells.get(environment).copied()
    }
}

/// Flag × environment table pivoted from per-environment fetch results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagMatrix {
    environments: Vec<EnvironmentColumn>,
    rows: Vec<FlagRow>,
    staged_toggles: usize,
}

impl FlagMatrix {
    /// Columns follow the order of `results`.
    pub fn from_results(results: &[FlagResult]) -> Self {
        let order: Vec<String> = results
            .iter()
            .map(|result| result.environment_name.clone())
            .collect();
        Self::pivot(results, &order)
    }

    /// Columns follow `environment_order`. A declared environment with no
    /// matching result is treated as failed.
    pub fn pivot(results: &[FlagResult], environment_order: &[String]) -> Self {
        let by_environment: BTreeMap<&str, &FlagResult> = results
            .iter()
            .map(|result| (result.environment_name.as_str(), result))
            .collect();

        let environments: Vec<EnvironmentColumn> = environment_order
            .iter()
            .map(|name| match by_environment.get(name.as_str()) {
                Some(result) => EnvironmentColumn {
                    name: name.clone(),
                    state: result.environment_state,
                    error: result.error.clone(),
                },
                None => EnvironmentColumn {
                    name: name.clone(),
                    state: EnvironmentState::Unknown,
                    error: Some("no result for environment".to_string()),
                },
            })
            .collect();

        let flag_names: BTreeSet<&str> = results
            .iter()
            .flat_map(|result| result.flags.keys().map(String::as_str))
            .collect();

        let rows = flag_names
            .into_iter()
            .map(|flag_name| {
                let cells = environments
                    .iter()
                    .map(|column| {
                        if column.failed() {
                            return CellState::Failed;
                        }
                        by_environment
                            .get(column.name.as_str())
                            .and_then(|result| result.flags.get(flag_name))
                            .map_or(CellState::Absent, |flag| {
                                CellState::from_enabled(flag.enabled)
                            })
                    })
                    .collect();
                FlagRow {
                    name: flag_name.to_string(),
                    cells,
                }
            })
            .collect();

        Self {
            environments,
            rows,
            staged_toggles: 0,
        }
    }

    pub fn rows(&self) -> &[FlagRow] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&FlagRow> {
        self.rows.get(index)
    }

    pub fn environments(&self) -> &[EnvironmentColumn] {
        &self.environments
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn failed_environments(&self) -> impl Iterator<Item = &EnvironmentColumn> {
        self.environments.iter().filter(|column| column.failed())
    }

    /// Flips an on/off cell in place and returns its new state. Absent,
    /// failed and out-of-range cells are left untouched and yield `None`.
    pub fn toggle(&mut self, row: usize, environment: usize) -> Option<CellState> {
        let cell = self.rows.get_mut(row)?.cells.get_mut(environment)?;
        if !cell.is_toggleable() {
            return None;
        }
        *cell = cell.flipped();
        self.staged_toggles += 1;
        Some(*cell)
    }

    pub fn staged_toggles(&self) -> usize {
        self.staged_toggles
    }
}
