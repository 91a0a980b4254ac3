use lazyflags_core::matrix::CellState;
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Color;
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Cell, Clear, List, ListItem, ListState, Row, Table, TableState};

use crate::centered_rect;
use crate::confirm::{ConfirmDialog, ConfirmFocus};
use crate::entry::ListEntry;
use crate::navigation::{DetailState, FlagsState, Navigator, View};
use crate::theme;
use crate::ui::loading::{LoadingState, render_loading_modal};
use crate::ui::modal::{ModalSpec, render_modal};
use crate::ui::picker::PickerState;
use crate::ui::text::{
    compact_hint, error_line, focus_line, key_hint_height, key_hint_paragraph, label_value_line,
    wrapped_paragraph,
};

const LOADING_HINT: &str = "Esc: cancel    q: quit";

pub(crate) fn render(frame: &mut Frame<'_>, navigator: &Navigator, loading: &LoadingState) {
    let area = frame.area();
    let key_text = key_text(navigator.view(), area.width);
    let footer_height = key_hint_height(area.width, key_text);
    let [header, body, footer] = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(6),
            Constraint::Length(footer_height),
        ])
        .areas(area);

    render_header(frame, header, navigator);

    match navigator.view() {
        View::AppList => {
            let apps = navigator.apps();
            render_entries(
                frame,
                body,
                EntriesRender {
                    title: focus_line("Applications"),
                    entries: &apps.entries,
                    error: apps.error.as_deref(),
                    empty_message: "No applications found. Enter: retry",
                    highlight: Color::Cyan,
                },
            );
        }
        View::ConfigList => render_config_list(frame, body, navigator),
        View::FlagsMatrix => render_matrix(frame, body, navigator.flags()),
        View::FlagDetail => {
            render_matrix(frame, body, navigator.flags());
            if let Some(detail) = navigator.detail() {
                render_detail(frame, detail);
                if let Some(dialog) = detail.confirm.as_ref() {
                    render_confirm(frame, dialog);
                }
            }
        }
    }

    frame.render_widget(key_hint_paragraph(key_text).block(theme::key_block()), footer);

    if let Some(message) = navigator.loading_message() {
        render_loading_modal(frame, message, LOADING_HINT, loading);
    }
}

fn key_text(view: View, width: u16) -> &'static str {
    match view {
        View::AppList => compact_hint(
            width,
            "Enter: open    Up/Down or j/k: move    q: quit",
            "Enter: open    j/k: move    q: quit",
            "Enter open | j/k move | q quit",
        ),
        View::ConfigList => compact_hint(
            width,
            "Enter: show flags    Up/Down or j/k: move    Esc: back    q: quit",
            "Enter: flags    j/k: move    Esc: back    q: quit",
            "Enter flags | j/k move | Esc back | q quit",
        ),
        View::FlagsMatrix => compact_hint(
            width,
            "Enter: flag detail    Up/Down or j/k: move    Esc: back    q: quit",
            "Enter: detail    j/k: move    Esc: back    q: quit",
            "Enter detail | j/k move | Esc back | q quit",
        ),
        View::FlagDetail => compact_hint(
            width,
            "Space/t: toggle    Up/Down/Left/Right or h/j/k/l: move    Esc: back    q: quit",
            "Space/t: toggle    h/j/k/l: move    Esc: back    q: quit",
            "t toggle | hjkl move | Esc back | q quit",
        ),
    }
}

fn render_header(frame: &mut Frame<'_>, area: Rect, navigator: &Navigator) {
    let mut crumbs = vec!["Applications".to_string()];
    if navigator.view() != View::AppList
        && let Some(application) = navigator.selected_application()
    {
        crumbs.push(application.name.clone());
    }
    if matches!(navigator.view(), View::FlagsMatrix | View::FlagDetail)
        && let Some(profile) = navigator.selected_profile()
    {
        crumbs.push(profile.name.clone());
    }
    if let Some(detail) = navigator.detail()
        && navigator.view() == View::FlagDetail
    {
        crumbs.push(detail.flag_name.clone());
    }

    let prompt = match navigator.view() {
        View::AppList => "Choose an application",
        View::ConfigList => "Choose a feature flag profile",
        View::FlagsMatrix => "Flags across environments",
        View::FlagDetail => "Stage a toggle for one environment",
    };

    let header_text = Text::from(vec![Line::from(crumbs.join(" > ")), focus_line(prompt)]);
    frame.render_widget(
        wrapped_paragraph(header_text).block(theme::chrome("lazyflags")),
        area,
    );
}

struct EntriesRender<'a> {
    title: Line<'a>,
    entries: &'a PickerState<ListEntry>,
    error: Option<&'a str>,
    empty_message: &'a str,
    highlight: Color,
}

fn render_entries(frame: &mut Frame<'_>, area: Rect, render: EntriesRender<'_>) {
    let mut status = Vec::new();
    if let Some(error) = render.error {
        status.push(error_line(error));
    }
    let list_area = render_status(frame, area, status);

    if render.entries.is_empty() {
        let empty = wrapped_paragraph(render.empty_message).block(theme::chrome(render.title));
        frame.render_widget(empty, list_area);
        return;
    }

    let items: Vec<ListItem<'_>> = render.entries.items.iter().map(entry_item).collect();
    let list = List::new(items)
        .block(theme::chrome(render.title))
        .highlight_style(theme::table_highlight(render.highlight));

    let mut state = ListState::default();
    state.select(Some(render.entries.selected));
    frame.render_stateful_widget(list, list_area, &mut state);
}

fn entry_item(entry: &ListEntry) -> ListItem<'static> {
    let mut lines = vec![Line::from(entry.title())];
    if let Some(description) = entry.description() {
        lines.push(Line::from(Span::styled(
            format!("  {description}"),
            theme::secondary_text(),
        )));
    }
    ListItem::new(Text::from(lines))
}

/// Draws `lines` in a status box at the bottom of `area` and returns what is
/// left above it.
fn render_status(frame: &mut Frame<'_>, area: Rect, lines: Vec<Line<'static>>) -> Rect {
    if lines.is_empty() {
        return area;
    }

    let height = (lines.len() as u16).saturating_add(2);
    let [rest, status] = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(height)])
        .areas(area);
    frame.render_widget(
        wrapped_paragraph(Text::from(lines)).block(theme::chrome("Status")),
        status,
    );
    rest
}

fn render_config_list(frame: &mut Frame<'_>, area: Rect, navigator: &Navigator) {
    let [parent, child] = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .areas(area);

    let apps = navigator.apps();
    render_entries(
        frame,
        parent,
        EntriesRender {
            title: Line::from("Applications"),
            entries: &apps.entries,
            error: None,
            empty_message: "No applications found.",
            highlight: Color::DarkGray,
        },
    );

    let configs = navigator.configs();
    render_entries(
        frame,
        child,
        EntriesRender {
            title: focus_line("Feature flag profiles"),
            entries: &configs.entries,
            error: configs.error.as_deref(),
            empty_message: "No feature flag profiles in this application.",
            highlight: Color::Cyan,
        },
    );
}

fn render_matrix(frame: &mut Frame<'_>, area: Rect, flags: &FlagsState) {
    let matrix = &flags.matrix;

    let mut status = Vec::new();
    if let Some(error) = flags.error.as_deref() {
        status.push(error_line(error));
    }
    for column in matrix.failed_environments() {
        status.push(error_line(format!(
            "{}: {}",
            column.name,
            column.error.as_deref().unwrap_or("failed to load")
        )));
    }
    if let Some(notice) = flags.notice.as_deref() {
        status.push(Line::from(Span::styled(
            notice.to_string(),
            theme::warning_prompt(),
        )));
    }
    if matrix.staged_toggles() > 0 {
        status.push(Line::from(Span::styled(
            format!("{} staged changes (not saved)", matrix.staged_toggles()),
            theme::warning_prompt(),
        )));
    }
    let table_area = render_status(frame, area, status);

    let title = focus_line("Flags");
    if matrix.rows().is_empty() {
        let message = if flags.error.is_some() {
            "Flags could not be loaded. Esc: back, then Enter to retry."
        } else {
            "No flags defined in this profile."
        };
        frame.render_widget(
            wrapped_paragraph(message).block(theme::chrome(title)),
            table_area,
        );
        return;
    }

    let header_cells = std::iter::once(Cell::from("Flag")).chain(matrix.environments().iter().map(
        |column| {
            if column.failed() {
                Cell::from(format!("{} (failed)", column.name)).style(theme::error_prompt())
            } else {
                Cell::from(column.name.clone())
            }
        },
    ));
    let header = Row::new(header_cells).style(theme::table_header(Color::Cyan));

    let rows = matrix.rows().iter().map(|row| {
        let cells = row
            .cells()
            .iter()
            .map(|cell| Cell::from(cell.label()).style(theme::cell(*cell)));
        Row::new(std::iter::once(Cell::from(row.name.clone())).chain(cells))
    });

    let mut widths = vec![Constraint::Min(20)];
    widths.extend(matrix.environments().iter().map(|column| {
        let label = if column.failed() {
            column.name.chars().count() + " (failed)".len()
        } else {
            column.name.chars().count()
        };
        Constraint::Length(label.max(CellState::Failed.label().len()) as u16 + 2)
    }));

    let table = Table::new(rows, widths)
        .header(header)
        .block(theme::chrome(title))
        .row_highlight_style(theme::table_highlight(Color::Cyan));

    let mut state = TableState::default();
    state.select(Some(flags.selected));
    frame.render_stateful_widget(table, table_area, &mut state);
}

fn render_detail(frame: &mut Frame<'_>, detail: &DetailState) {
    let area = centered_rect(70, 60, frame.area());
    frame.render_widget(Clear, area);

    let mut status = vec![label_value_line("flag", detail.flag_name.clone())];
    if let Some(notice) = detail.notice.as_deref() {
        status.push(Line::from(Span::styled(
            notice.to_string(),
            theme::warning_prompt(),
        )));
    }
    let list_area = render_status(frame, area, status);

    render_entries(
        frame,
        list_area,
        EntriesRender {
            title: focus_line("Environments"),
            entries: &detail.entries,
            error: None,
            empty_message: "No environments.",
            highlight: Color::Cyan,
        },
    );
}

fn render_confirm(frame: &mut Frame<'_>, dialog: &ConfirmDialog) {
    let button = |label: &'static str, focus: ConfirmFocus| {
        if dialog.focus() == focus {
            Span::styled(format!("[ {label} ]"), theme::table_highlight(Color::Yellow))
        } else {
            Span::raw(format!("[ {label} ]"))
        }
    };

    let body = Text::from(vec![
        Line::from(""),
        Line::from(dialog.prompt()),
        Line::from(Span::styled(
            "The change stays local and is not saved.",
            theme::secondary_text(),
        )),
        Line::from(""),
        Line::from(vec![
            button("Yes", ConfirmFocus::Yes),
            Span::raw("   "),
            button("Cancel", ConfirmFocus::Cancel),
        ]),
    ]);

    render_modal(
        frame,
        ModalSpec {
            title: "Confirm toggle",
            title_style: theme::warning_prompt(),
            body,
            key_hint: "Left/h: yes    Right/l: cancel    Enter: choose    Esc: close",
            width_pct: 60,
            height_pct: 35,
        },
    );
}
