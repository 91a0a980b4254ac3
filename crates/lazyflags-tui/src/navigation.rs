use std::collections::HashMap;

use lazyflags_core::cache::CacheKey;
use lazyflags_core::matrix::{CellState, FlagMatrix};
use lazyflags_core::model::{Application, ConfigurationProfile, FlagResult};
use log::debug;

use crate::confirm::{ConfirmDialog, ConfirmOutcome};
use crate::entry::{EnvironmentEntry, ListEntry};
use crate::keymap::Input;
use crate::ui::picker::PickerState;

pub(crate) type RequestId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum View {
    AppList,
    ConfigList,
    FlagsMatrix,
    FlagDetail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FlagsSource {
    Cache,
    Fetch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Message {
    Input(Input),
    ApplicationsLoaded {
        request: RequestId,
        result: Result<Vec<Application>, String>,
    },
    ProfilesLoaded {
        request: RequestId,
        application_id: String,
        result: Result<Vec<ConfigurationProfile>, String>,
    },
    FlagsLoaded {
        request: RequestId,
        key: CacheKey,
        result: Result<Vec<FlagResult>, String>,
        source: FlagsSource,
        cache_warning: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    LoadApplications {
        request: RequestId,
    },
    LoadProfiles {
        request: RequestId,
        application_id: String,
    },
    LoadFlags {
        request: RequestId,
        key: CacheKey,
    },
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingLoad {
    Applications,
    Profiles,
    Flags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pending {
    id: RequestId,
    load: PendingLoad,
}

#[derive(Debug, Default)]
pub(crate) struct AppListState {
    pub(crate) entries: PickerState<ListEntry>,
    pub(crate) error: Option<String>,
}

#[derive(Debug, Default)]
pub(crate) struct ConfigListState {
    pub(crate) application: Option<Application>,
    pub(crate) entries: PickerState<ListEntry>,
    pub(crate) error: Option<String>,
}

#[derive(Debug, Default)]
pub(crate) struct FlagsState {
    pub(crate) application: Option<Application>,
    pub(crate) profile: Option<ConfigurationProfile>,
    pub(crate) matrix: FlagMatrix,
    pub(crate) selected: usize,
    pub(crate) error: Option<String>,
    pub(crate) notice: Option<String>,
}

#[derive(Debug)]
pub(crate) struct DetailState {
    pub(crate) row: usize,
    pub(crate) flag_name: String,
    pub(crate) entries: PickerState<ListEntry>,
    pub(crate) confirm: Option<ConfirmDialog>,
    pub(crate) notice: Option<String>,
}

/// Navigation controller. Consumes input and load results, returns the
/// next side effect for the loop to run. Holds at most one pending load;
/// results for any other request id are dropped.
#[derive(Debug, Default)]
pub(crate) struct Navigator {
    view: Option<View>,
    next_request: RequestId,
    pending: Option<Pending>,
    profile_cache: HashMap<String, Vec<ConfigurationProfile>>,
    apps: AppListState,
    configs: ConfigListState,
    flags: FlagsState,
    detail: Option<DetailState>,
}

impl Navigator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Initial command: load the application list.
    pub(crate) fn start(&mut self) -> Command {
        self.view = Some(View::AppList);
        self.load_applications()
    }

    pub(crate) fn view(&self) -> View {
        self.view.unwrap_or(View::AppList)
    }

    pub(crate) fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub(crate) fn loading_message(&self) -> Option<&'static str> {
        self.pending.map(|pending| match pending.load {
            PendingLoad::Applications => "Loading applications",
            PendingLoad::Profiles => "Loading configuration profiles",
            PendingLoad::Flags => "Fetching flags from every environment",
        })
    }

    pub(crate) fn apps(&self) -> &AppListState {
        &self.apps
    }

    pub(crate) fn configs(&self) -> &ConfigListState {
        &self.configs
    }

    pub(crate) fn flags(&self) -> &FlagsState {
        &self.flags
    }

    pub(crate) fn detail(&self) -> Option<&DetailState> {
        self.detail.as_ref()
    }

    pub(crate) fn selected_application(&self) -> Option<&Application> {
        self.configs.application.as_ref()
    }

    pub(crate) fn selected_profile(&self) -> Option<&ConfigurationProfile> {
        self.flags.profile.as_ref()
    }

    pub(crate) fn update(&mut self, message: Message) -> Option<Command> {
        match message {
            Message::Input(input) => self.on_input(input),
            Message::ApplicationsLoaded { request, result } => {
                if self.accept(request) {
                    self.on_applications(result);
                }
                None
            }
            Message::ProfilesLoaded {
                request,
                application_id,
                result,
            } => {
                if self.accept(request) {
                    self.on_profiles(application_id, result);
                }
                None
            }
            Message::FlagsLoaded {
                request,
                key,
                result,
                source,
                cache_warning,
            } => {
                if self.accept(request) {
                    debug!("applying flags for {key} from {source:?}");
                    self.on_flags(result, source, cache_warning);
                }
                None
            }
        }
    }

    fn on_input(&mut self, input: Input) -> Option<Command> {
        if input == Input::Quit {
            return Some(Command::Quit);
        }

        match self.view() {
            View::AppList => self.on_app_list_input(input),
            View::ConfigList => self.on_config_list_input(input),
            View::FlagsMatrix => self.on_matrix_input(input),
            View::FlagDetail => {
                self.on_detail_input(input);
                None
            }
        }
    }

    fn on_app_list_input(&mut self, input: Input) -> Option<Command> {
        match input {
            Input::Up => self.apps.entries.move_up(),
            Input::Down => self.apps.entries.move_down(),
            Input::Enter if !self.is_loading() => {
                let Some(application) = self
                    .apps
                    .entries
                    .selected_item()
                    .and_then(ListEntry::as_app)
                    .cloned()
                else {
                    return Some(self.load_applications());
                };
                return self.open_application(application);
            }
            Input::Back => self.cancel_pending(),
            _ => {}
        }
        None
    }

    fn on_config_list_input(&mut self, input: Input) -> Option<Command> {
        match input {
            Input::Up => self.configs.entries.move_up(),
            Input::Down => self.configs.entries.move_down(),
            Input::Enter if !self.is_loading() => {
                let profile = self
                    .configs
                    .entries
                    .selected_item()
                    .and_then(ListEntry::as_config)
                    .cloned()?;
                return self.open_profile(profile);
            }
            Input::Back => {
                self.cancel_pending();
                self.view = Some(View::AppList);
            }
            _ => {}
        }
        None
    }

    fn on_matrix_input(&mut self, input: Input) -> Option<Command> {
        match input {
            Input::Up => self.flags.selected = self.flags.selected.saturating_sub(1),
            Input::Down => {
                if self.flags.selected + 1 < self.flags.matrix.rows().len() {
                    self.flags.selected += 1;
                }
            }
            Input::Enter if !self.is_loading() => self.open_detail(self.flags.selected),
            Input::Back => {
                self.cancel_pending();
                self.view = Some(View::ConfigList);
            }
            _ => {}
        }
        None
    }

    fn on_detail_input(&mut self, input: Input) {
        let Some(detail) = self.detail.as_mut() else {
            self.view = Some(View::FlagsMatrix);
            return;
        };

        if let Some(dialog) = detail.confirm.as_mut() {
            match dialog.on_input(input) {
                ConfirmOutcome::Pending => {}
                ConfirmOutcome::Dismiss => detail.confirm = None,
                ConfirmOutcome::Apply => {
                    let Some(dialog) = detail.confirm.take() else {
                        return;
                    };
                    if let Some(state) = self.flags.matrix.toggle(detail.row, dialog.environment) {
                        detail.notice = Some(format!(
                            "{} turned {} in {} (not saved)",
                            dialog.flag_name,
                            state.label(),
                            dialog.environment_name
                        ));
                    }
                    let selected = detail.entries.selected;
                    detail.entries =
                        PickerState::from_items(detail_entries(&self.flags.matrix, detail.row));
                    detail.entries.selected = selected;
                }
            }
            return;
        }

        match input {
            Input::Up | Input::Left => detail.entries.move_up(),
            Input::Down | Input::Right => detail.entries.move_down(),
            Input::Toggle => {
                let Some(environment) = detail
                    .entries
                    .selected_item()
                    .and_then(ListEntry::as_environment)
                    .cloned()
                else {
                    return;
                };
                match environment.cell {
                    CellState::On | CellState::Off => {
                        detail.notice = None;
                        detail.confirm = Some(ConfirmDialog::new(
                            environment.index,
                            environment.name,
                            detail.flag_name.clone(),
                            environment.cell.flipped(),
                        ));
                    }
                    CellState::Absent => {
                        detail.notice = Some(format!(
                            "{} is not defined in {}; nothing to toggle",
                            detail.flag_name, environment.name
                        ));
                    }
                    CellState::Failed => {
                        detail.notice = Some(format!(
                            "{} failed to load; nothing to toggle",
                            environment.name
                        ));
                    }
                }
            }
            Input::Back => {
                self.detail = None;
                self.view = Some(View::FlagsMatrix);
            }
            _ => {}
        }
    }

    fn open_application(&mut self, application: Application) -> Option<Command> {
        let cached = self.profile_cache.get(&application.id).cloned();
        let application_id = application.id.clone();
        self.configs = ConfigListState {
            application: Some(application),
            ..ConfigListState::default()
        };
        self.view = Some(View::ConfigList);

        if let Some(profiles) = cached {
            debug!("profiles for '{application_id}' served from session cache");
            self.configs
                .entries
                .set_items(profiles.into_iter().map(ListEntry::Config).collect());
            return None;
        }

        let request = self.issue(PendingLoad::Profiles);
        Some(Command::LoadProfiles {
            request,
            application_id,
        })
    }

    fn open_profile(&mut self, profile: ConfigurationProfile) -> Option<Command> {
        let application = self.configs.application.clone()?;
        let key = CacheKey::new(application.id.clone(), profile.id.clone());
        self.flags = FlagsState {
            application: Some(application),
            profile: Some(profile),
            ..FlagsState::default()
        };
        self.view = Some(View::FlagsMatrix);

        let request = self.issue(PendingLoad::Flags);
        Some(Command::LoadFlags { request, key })
    }

    fn open_detail(&mut self, row: usize) {
        let Some(flag) = self.flags.matrix.row(row) else {
            return;
        };
        self.detail = Some(DetailState {
            row,
            flag_name: flag.name.clone(),
            entries: PickerState::from_items(detail_entries(&self.flags.matrix, row)),
            confirm: None,
            notice: None,
        });
        self.view = Some(View::FlagDetail);
    }

    fn on_applications(&mut self, result: Result<Vec<Application>, String>) {
        match result {
            Ok(applications) => {
                self.apps
                    .entries
                    .set_items(applications.into_iter().map(ListEntry::App).collect());
                self.apps.error = None;
            }
            Err(error) => self.apps.error = Some(error),
        }
    }

    fn on_profiles(
        &mut self,
        application_id: String,
        result: Result<Vec<ConfigurationProfile>, String>,
    ) {
        match result {
            Ok(profiles) => {
                self.configs
                    .entries
                    .set_items(profiles.iter().cloned().map(ListEntry::Config).collect());
                self.configs.error = None;
                self.profile_cache.insert(application_id, profiles);
            }
            Err(error) => self.configs.error = Some(error),
        }
    }

    fn on_flags(
        &mut self,
        result: Result<Vec<FlagResult>, String>,
        source: FlagsSource,
        cache_warning: Option<String>,
    ) {
        match result {
            Ok(results) => {
                self.flags.matrix = FlagMatrix::from_results(&results);
                self.flags.selected = 0;
                self.flags.error = None;
                self.flags.notice = match (source, cache_warning) {
                    (FlagsSource::Cache, _) => Some("served from cache".to_string()),
                    (FlagsSource::Fetch, Some(warning)) => {
                        Some(format!("results were not cached: {warning}"))
                    }
                    (FlagsSource::Fetch, None) => None,
                };
            }
            Err(error) => {
                self.flags.matrix = FlagMatrix::default();
                self.flags.error = Some(error);
                self.flags.notice = None;
            }
        }
    }

    fn load_applications(&mut self) -> Command {
        let request = self.issue(PendingLoad::Applications);
        Command::LoadApplications { request }
    }

    fn issue(&mut self, load: PendingLoad) -> RequestId {
        self.next_request += 1;
        let id = self.next_request;
        if let Some(previous) = self.pending.replace(Pending { id, load }) {
            debug!("request {} superseded by {id}", previous.id);
        }
        id
    }

    fn accept(&mut self, request: RequestId) -> bool {
        match self.pending {
            Some(pending) if pending.id == request => {
                self.pending = None;
                true
            }
            _ => {
                debug!("discarding result for stale request {request}");
                false
            }
        }
    }

    fn cancel_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            debug!("cancelled request {}", pending.id);
        }
    }
}

fn detail_entries(matrix: &FlagMatrix, row: usize) -> Vec<ListEntry> {
    let Some(flag) = matrix.row(row) else {
        return Vec::new();
    };
    matrix
        .environments()
        .iter()
        .zip(flag.cells())
        .enumerate()
        .map(|(index, (column, cell))| {
            ListEntry::Environment(EnvironmentEntry {
                index,
                name: column.name.clone(),
                state: column.state,
                cell: *cell,
            })
        })
        .collect()
}
