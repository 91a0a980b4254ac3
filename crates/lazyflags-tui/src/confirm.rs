use lazyflags_core::matrix::CellState;

use crate::keymap::Input;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConfirmFocus {
    Yes,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConfirmOutcome {
    Pending,
    Apply,
    Dismiss,
}

/// "Are you sure" gate in front of a toggle. Opens focused on Cancel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ConfirmDialog {
    pub(crate) environment: usize,
    pub(crate) environment_name: String,
    pub(crate) flag_name: String,
    pub(crate) new_state: CellState,
    focus: ConfirmFocus,
}

impl ConfirmDialog {
    pub(crate) fn new(
        environment: usize,
        environment_name: impl Into<String>,
        flag_name: impl Into<String>,
        new_state: CellState,
    ) -> Self {
        Self {
            environment,
            environment_name: environment_name.into(),
            flag_name: flag_name.into(),
            new_state,
            focus: ConfirmFocus::Cancel,
        }
    }

    pub(crate) fn focus(&self) -> ConfirmFocus {
        self.focus
    }

    pub(crate) fn on_input(&mut self, input: Input) -> ConfirmOutcome {
        match input {
            Input::Left => {
                self.focus = ConfirmFocus::Yes;
                ConfirmOutcome::Pending
            }
            Input::Right => {
                self.focus = ConfirmFocus::Cancel;
                ConfirmOutcome::Pending
            }
            Input::Enter => match self.focus {
                ConfirmFocus::Yes => ConfirmOutcome::Apply,
                ConfirmFocus::Cancel => ConfirmOutcome::Dismiss,
            },
            Input::Back => ConfirmOutcome::Dismiss,
            _ => ConfirmOutcome::Pending,
        }
    }

    pub(crate) fn prompt(&self) -> String {
        format!(
            "Turn {} {} in {}?",
            self.flag_name,
            self.new_state.label(),
            self.environment_name
        )
    }
}
