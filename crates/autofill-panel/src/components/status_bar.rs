//! Status bar at the bottom of the panel.

use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::action::Action;
use crate::components::{truncate, Component};
use crate::theme::Theme;

pub struct StatusBarComponent {
    pub message: String,
    /// Mirror of the enabled flag, for the badge.
    pub enabled: bool,
}

impl StatusBarComponent {
    pub fn new(enabled: bool) -> Self {
        Self {
            message: "Press i to edit the prompt, r to run.".to_string(),
            enabled,
        }
    }
}

impl Component for StatusBarComponent {
    fn handle_action(&mut self, action: &Action) -> Option<Action> {
        if let Action::SetStatus(msg) = action {
            self.message = msg.clone();
        }
        None
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let width = area.width as usize;

        let hints = "q·?·i·r·s·t";
        let hints_len = hints.chars().count() + 1;

        let badge = if self.enabled { "ON" } else { "OFF" };
        let badge_len = badge.len() + 2;

        let msg_budget = width
            .saturating_sub(badge_len)
            .saturating_sub(hints_len)
            .saturating_sub(4);
        let msg = truncate(&self.message, msg_budget);

        // Pad to push hints to the right edge
        let used = badge_len + 2 + msg.chars().count();
        let pad = width.saturating_sub(used + hints_len);

        let line = Line::from(vec![
            Span::styled(format!(" {} ", badge), Theme::toggle(self.enabled)),
            Span::styled("  ", Theme::dim()),
            Span::styled(msg, Theme::dim()),
            Span::raw(" ".repeat(pad)),
            Span::styled(hints, Theme::key_hint()),
            Span::raw(" "),
        ]);

        frame.render_widget(Paragraph::new(line), area);
    }
}
