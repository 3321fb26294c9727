//! Help overlay: keybinding reference.

use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

use crate::action::Action;
use crate::components::{centered_rect, Component};
use crate::theme::Theme;

pub struct HelpComponent {
    pub visible: bool,
}

impl HelpComponent {
    pub fn new() -> Self {
        Self { visible: false }
    }
}

impl Default for HelpComponent {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for HelpComponent {
    fn handle_action(&mut self, action: &Action) -> Option<Action> {
        match action {
            Action::ToggleHelp => {
                self.visible = !self.visible;
                None
            }
            Action::Tick | Action::SetStatus(_) | Action::ShowNotice(_) => None,
            _ if self.visible => {
                // Any key closes help.
                self.visible = false;
                None
            }
            _ => None,
        }
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        if !self.visible {
            return;
        }

        let dialog = centered_rect(area, 58, 24);
        frame.render_widget(Clear, dialog);

        let block = Block::default()
            .title(" Help: Keybindings ")
            .title_style(Theme::title())
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Theme::accent()));

        let help_text = vec![
            Line::from(""),
            key_line("q / Ctrl+C", "Quit"),
            key_line("?", "Toggle this help"),
            key_line("i / Enter", "Edit the prompt"),
            key_line("r", "Run (saves the prompt first)"),
            key_line("s", "Save the prompt"),
            key_line("t", "Toggle autofill ON/OFF"),
            key_line("Up / Down / j / k", "Select card"),
            key_line("w", "Write the page back to its file"),
            key_line("Esc", "Dismiss notice"),
            Line::from(""),
            Line::from(Span::styled("── Menu ──", Theme::header())),
            Line::from(""),
            key_line("F5", "Run with the saved prompt"),
            key_line("p / h", "Show / hide the panel"),
            Line::from(""),
            Line::from(Span::styled("── While editing ──", Theme::header())),
            Line::from(""),
            key_line("Ctrl+R / Ctrl+Enter", "Run"),
            key_line("Ctrl+S", "Save"),
            key_line("Ctrl+T", "Toggle"),
            key_line("Ctrl+W", "Delete word"),
            key_line("Esc", "Stop editing"),
        ];

        let paragraph = Paragraph::new(help_text).block(block);
        frame.render_widget(paragraph, dialog);
    }
}

fn key_line<'a>(key: &'a str, desc: &'a str) -> Line<'a> {
    Line::from(vec![
        Span::styled(format!("  {:<22}", key), Theme::selected()),
        Span::styled(desc, Theme::normal()),
    ])
}
