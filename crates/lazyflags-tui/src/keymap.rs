use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Keys the navigation controller understands. Everything else is `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Input {
    Enter,
    Back,
    Quit,
    Up,
    Down,
    Left,
    Right,
    Toggle,
    Other,
}

pub(crate) fn is_ctrl_c(key: KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c')
}

pub(crate) fn classify(key: KeyEvent) -> Input {
    if is_ctrl_c(key) {
        return Input::Quit;
    }

    match key.code {
        KeyCode::Enter => Input::Enter,
        KeyCode::Esc => Input::Back,
        KeyCode::Char('q') => Input::Quit,
        KeyCode::Up | KeyCode::Char('k') => Input::Up,
        KeyCode::Down | KeyCode::Char('j') => Input::Down,
        KeyCode::Left | KeyCode::Char('h') => Input::Left,
        KeyCode::Right | KeyCode::Char('l') => Input::Right,
        KeyCode::Char(' ') | KeyCode::Char('t') => Input::Toggle,
        _ => Input::Other,
    }
}
