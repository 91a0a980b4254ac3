use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::Clear;

use crate::centered_rect;
use crate::theme;
use crate::ui::text::{key_hint_height, key_hint_paragraph, wrapped_paragraph};

pub(crate) struct ModalSpec<'a> {
    pub(crate) title: &'a str,
    pub(crate) title_style: Style,
    pub(crate) body: Text<'a>,
    pub(crate) key_hint: &'a str,
    pub(crate) width_pct: u16,
    pub(crate) height_pct: u16,
}

/// Draws a centered modal with its key hint strip right underneath.
pub(crate) fn render_modal(frame: &mut Frame<'_>, modal: ModalSpec<'_>) {
    let screen = frame.area();
    let area = centered_rect(modal.width_pct, modal.height_pct, screen);
    let (body_area, hint_area) =
        stack_hint_below(screen, area, key_hint_height(area.width, modal.key_hint));

    let title = Line::from(Span::styled(modal.title.to_string(), modal.title_style));
    frame.render_widget(Clear, body_area);
    frame.render_widget(
        wrapped_paragraph(modal.body).block(theme::chrome(title)),
        body_area,
    );

    frame.render_widget(Clear, hint_area);
    frame.render_widget(
        key_hint_paragraph(modal.key_hint).block(theme::key_block()),
        hint_area,
    );
}

/// Places a `hint_height` strip under `body`. Near the bottom of the screen
/// the strip stays on screen and the body gives up the rows it needs.
fn stack_hint_below(screen: Rect, body: Rect, hint_height: u16) -> (Rect, Rect) {
    let screen_bottom = screen.y.saturating_add(screen.height);
    let hint_y = body
        .bottom()
        .min(screen_bottom.saturating_sub(hint_height))
        .max(body.y);
    let hint = Rect::new(
        body.x,
        hint_y,
        body.width,
        hint_height.min(screen_bottom.saturating_sub(hint_y)),
    );
    let body = Rect::new(body.x, body.y, body.width, hint_y - body.y);
    (body, hint)
}
