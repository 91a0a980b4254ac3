mod confirm;
mod dispatch;
mod entry;
mod keymap;
mod navigation;
mod render;
mod theme;
mod ui;

use std::io::{Stdout, stdout};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use crossterm::cursor::{Hide, Show};
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use lazyflags_app::App;
use lazyflags_core::cache::ResultCache;
use log::info;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};

use crate::dispatch::Dispatcher;
use crate::navigation::{Command, Message, Navigator};
use crate::ui::loading::LoadingState;

const TICK_RATE: Duration = Duration::from_millis(120);

pub(crate) struct TerminalSession {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalSession {
    pub(crate) fn enter() -> Result<Self> {
        let mut terminal = None;
        run_setup(&mut [
            SetupStep::new(
                || enable_raw_mode().context("failed to enable raw mode"),
                || {
                    let _ = disable_raw_mode();
                },
            ),
            SetupStep::new(
                || {
                    let mut out = stdout();
                    execute!(out, EnterAlternateScreen, Hide)
                        .context("failed to enter alternate screen")
                },
                || {
                    let mut out = stdout();
                    let _ = execute!(out, Show, LeaveAlternateScreen);
                },
            ),
            SetupStep::new(
                || {
                    let backend = CrosstermBackend::new(stdout());
                    terminal =
                        Some(Terminal::new(backend).context("failed to create terminal backend")?);
                    Ok(())
                },
                || {},
            ),
        ])?;

        let terminal = terminal.ok_or_else(|| anyhow!("terminal backend was not created"))?;
        Ok(Self { terminal })
    }

    pub(crate) fn draw<F>(&mut self, draw_fn: F) -> Result<()>
    where
        F: FnOnce(&mut ratatui::Frame<'_>),
    {
        self.terminal
            .draw(draw_fn)
            .context("failed to render terminal")?;
        Ok(())
    }

    pub(crate) fn autoresize(&mut self) -> Result<()> {
        self.terminal
            .autoresize()
            .context("failed to autoresize terminal")?;
        Ok(())
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = execute!(self.terminal.backend_mut(), Show, LeaveAlternateScreen);
        let _ = disable_raw_mode();
    }
}

struct SetupStep<'a> {
    apply: Box<dyn FnMut() -> Result<()> + 'a>,
    undo: Box<dyn FnMut() + 'a>,
}

impl<'a> SetupStep<'a> {
    fn new(apply: impl FnMut() -> Result<()> + 'a, undo: impl FnMut() + 'a) -> Self {
        Self {
            apply: Box::new(apply),
            undo: Box::new(undo),
        }
    }
}

/// Applies `steps` in order. When one fails, the steps already applied are
/// undone newest first and the failure is returned.
fn run_setup(steps: &mut [SetupStep<'_>]) -> Result<()> {
    let mut applied = 0;
    let mut failure = None;
    for step in steps.iter_mut() {
        if let Err(error) = (step.apply)() {
            failure = Some(error);
            break;
        }
        applied += 1;
    }

    let Some(error) = failure else {
        return Ok(());
    };
    for step in steps[..applied].iter_mut().rev() {
        (step.undo)();
    }
    Err(error)
}

/// Feeds one message through the navigator and hands the resulting command
/// to the dispatcher. Returns `true` once the user asked to quit.
fn step(navigator: &mut Navigator, dispatcher: &mut Dispatcher, message: Message) -> bool {
    match navigator.update(message) {
        Some(Command::Quit) => true,
        Some(command) => {
            dispatcher.dispatch(command);
            false
        }
        None => false,
    }
}

/// Runs the browser until the user quits. Toggles made in the flag detail
/// view live only in memory and are gone once this returns.
pub fn run(app: App, cache: ResultCache) -> Result<()> {
    let mut session = TerminalSession::enter()?;
    let mut dispatcher = Dispatcher::new(Arc::new(app), cache);
    let mut navigator = Navigator::new();
    let mut loading = LoadingState::default();

    dispatcher.dispatch(navigator.start());

    loop {
        for message in dispatcher.drain() {
            if step(&mut navigator, &mut dispatcher, message) {
                return Ok(());
            }
        }

        session.draw(|frame| render::render(frame, &navigator, &loading))?;

        let has_event = event::poll(TICK_RATE).context("failed to poll terminal event")?;
        if !has_event {
            if navigator.is_loading() {
                loading.next_frame();
            }
            continue;
        }

        let event = event::read().context("failed to read terminal event")?;
        let key = match event {
            Event::Resize(_, _) => {
                session.autoresize()?;
                continue;
            }
            Event::Key(key) if matches!(key.kind, KeyEventKind::Press) => key,
            _ => continue,
        };

        let input = keymap::classify(key);
        if step(&mut navigator, &mut dispatcher, Message::Input(input)) {
            info!("quit requested");
            return Ok(());
        }
    }
}

pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let pct_x = percent_x.min(100);
    let pct_y = percent_y.min(100);

    let [_, vertical, _] = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - pct_y) / 2),
            Constraint::Percentage(pct_y),
            Constraint::Percentage((100 - pct_y) / 2),
        ])
        .areas(area);
    let [_, horizontal, _] = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - pct_x) / 2),
            Constraint::Percentage(pct_x),
            Constraint::Percentage((100 - pct_x) / 2),
        ])
        .areas(vertical);
    horizontal
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use anyhow::anyhow;
    use lazyflags_core::cache::CacheKey;
    use lazyflags_core::clock::SystemClock;
    use lazyflags_core::model::{Application, ConfigurationProfile, FlagResult};
    use ratatui::layout::Rect;

    use super::*;
    use crate::dispatch::TaskOps;
    use crate::keymap::Input;

    struct IdleOps;

    impl TaskOps for IdleOps {
        fn list_applications(&self) -> Result<Vec<Application>> {
            Ok(Vec::new())
        }

        fn list_flag_profiles(&self, _application_id: &str) -> Result<Vec<ConfigurationProfile>> {
            Ok(Vec::new())
        }

        fn fetch_flags(&self, _key: &CacheKey) -> Result<Vec<FlagResult>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn centered_rect_returns_middle_segment() {
        let area = Rect::new(0, 0, 100, 50);
        let centered = centered_rect(80, 60, area);

        assert_eq!(centered.width, 80);
        assert_eq!(centered.height, 30);
        assert_eq!(centered.x, 10);
        assert_eq!(centered.y, 10);
    }

    #[test]
    fn centered_rect_clamps_percentages_over_100() {
        let area = Rect::new(3, 4, 40, 20);
        let centered = centered_rect(120, 150, area);

        assert_eq!(centered, area);
    }

    #[test]
    fn step_reports_quit_and_dispatches_everything_else() {
        let mut navigator = Navigator::new();
        let mut dispatcher = Dispatcher::new(
            Arc::new(IdleOps),
            ResultCache::in_memory(Box::new(SystemClock)),
        );
        dispatcher.dispatch(navigator.start());

        assert!(!step(
            &mut navigator,
            &mut dispatcher,
            Message::Input(Input::Down)
        ));
        assert!(step(
            &mut navigator,
            &mut dispatcher,
            Message::Input(Input::Quit)
        ));
    }

    fn recorded_step<'a>(
        calls: &'a RefCell<Vec<String>>,
        name: &'static str,
        fails: bool,
    ) -> SetupStep<'a> {
        SetupStep::new(
            move || {
                calls.borrow_mut().push(format!("apply {name}"));
                if fails {
                    Err(anyhow!("{name} failed"))
                } else {
                    Ok(())
                }
            },
            move || calls.borrow_mut().push(format!("undo {name}")),
        )
    }

    #[test]
    fn failed_setup_undoes_applied_steps_newest_first() {
        let calls = RefCell::new(Vec::new());

        let error = run_setup(&mut [
            recorded_step(&calls, "raw_mode", false),
            recorded_step(&calls, "alt_screen", false),
            recorded_step(&calls, "terminal", true),
            recorded_step(&calls, "never", false),
        ])
        .expect_err("setup should fail");

        assert_eq!(
            calls.into_inner(),
            vec![
                "apply raw_mode",
                "apply alt_screen",
                "apply terminal",
                "undo alt_screen",
                "undo raw_mode",
            ]
        );
        assert_eq!(error.to_string(), "terminal failed");
    }

    #[test]
    fn successful_setup_undoes_nothing() {
        let calls = RefCell::new(Vec::new());

        run_setup(&mut [
            recorded_step(&calls, "raw_mode", false),
            recorded_step(&calls, "alt_screen", false),
        ])
        .expect("setup should succeed");

        assert_eq!(
            calls.into_inner(),
            vec!["apply raw_mode", "apply alt_screen"]
        );
    }
}
