//! Modal notice shown after a command: run results, saves, toggles, errors.

use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

use autofill_core::{Notice, Severity};

use crate::action::Action;
use crate::components::{centered_rect, Component};
use crate::theme::Theme;

const DIALOG_WIDTH: u16 = 60;

pub struct NoticeDialogComponent {
    pub notice: Option<Notice>,
}

impl NoticeDialogComponent {
    pub fn new() -> Self {
        Self { notice: None }
    }

    pub fn visible(&self) -> bool {
        self.notice.is_some()
    }
}

impl Default for NoticeDialogComponent {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for NoticeDialogComponent {
    fn handle_action(&mut self, action: &Action) -> Option<Action> {
        match action {
            Action::ShowNotice(notice) => {
                self.notice = Some(notice.clone());
                Some(Action::SetStatus(notice.message.clone()))
            }
            Action::Tick | Action::SetStatus(_) => None,
            // Any key dismisses.
            _ => {
                self.notice = None;
                None
            }
        }
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let Some(notice) = &self.notice else {
            return;
        };

        let color = Theme::severity_color(notice.severity);
        let title = match notice.severity {
            Severity::Info => " Autofill ",
            Severity::Warning => " Autofill: check this ",
            Severity::Error => " Autofill: error ",
        };
        let text_width = DIALOG_WIDTH.saturating_sub(4) as usize;
        let lines = notice.message.chars().count() / text_width.max(1) + 1;
        let dialog = centered_rect(area, DIALOG_WIDTH, lines as u16 + 5);
        frame.render_widget(Clear, dialog);

        let block = Block::default()
            .title(title)
            .title_style(Style::default().fg(color))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(color));

        let body = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(notice.message.clone(), Theme::normal())),
            Line::from(""),
            Line::from(Span::styled("press any key", Theme::dim())),
        ])
        .wrap(Wrap { trim: true })
        .block(block);
        frame.render_widget(body, dialog);
    }
}
