//! The floating panel: ON/OFF toggle, multi-line prompt editor, Run and Save.
//!
//! The prompt is edited in place; nothing is persisted until Save or Run,
//! which the App routes to the controller.

use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::action::Action;
use crate::components::Component;
use crate::theme::Theme;

pub struct PromptPanelComponent {
    prompt: String,
    /// Byte offset into `prompt`, always on a char boundary.
    cursor: usize,
    pub editing: bool,
    /// Mirror of the persisted enabled flag.
    pub enabled: bool,
    /// Edited since the last save.
    pub dirty: bool,
    scroll: usize,
}

impl PromptPanelComponent {
    pub fn new(prompt: &str, enabled: bool) -> Self {
        Self {
            prompt: prompt.to_string(),
            cursor: prompt.len(),
            editing: false,
            enabled,
            dirty: false,
            scroll: 0,
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn wants_input(&self) -> bool {
        self.editing
    }

    /// Replace the edited text without saving it.
    pub fn replace_prompt(&mut self, prompt: &str) {
        self.prompt = prompt.to_string();
        self.cursor = self.prompt.len();
        self.scroll = 0;
        self.dirty = true;
    }

    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }

    fn edited(&mut self) {
        self.dirty = true;
        self.ensure_cursor_visible();
    }

    fn insert_char(&mut self, c: char) {
        self.prompt.insert(self.cursor, c);
        self.cursor += c.len_utf8();
        self.edited();
    }

    fn insert_str(&mut self, s: &str) {
        let normalized = s.replace("\r\n", "\n").replace('\r', "\n");
        self.prompt.insert_str(self.cursor, &normalized);
        self.cursor += normalized.len();
        self.edited();
    }

    fn delete_char(&mut self) {
        let Some((prev, _)) = self.prompt[..self.cursor].char_indices().next_back() else {
            return;
        };
        self.prompt.remove(prev);
        self.cursor = prev;
        self.edited();
    }

    fn delete_word(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let bytes = self.prompt.as_bytes();
        let mut end = self.cursor;
        while end > 0 && bytes[end - 1] == b' ' {
            end -= 1;
        }
        let mut start = end;
        while start > 0 && !matches!(bytes[start - 1], b' ' | b'\n') {
            start -= 1;
        }
        self.prompt.drain(start..self.cursor);
        self.cursor = start;
        self.edited();
    }

    /// Line index and column (in chars) of the cursor.
    fn line_col(&self) -> (usize, usize) {
        let before = &self.prompt[..self.cursor];
        let line = before.matches('\n').count();
        let line_start = before.rfind('\n').map(|p| p + 1).unwrap_or(0);
        (line, before[line_start..].chars().count())
    }

    /// Byte offset of `col` chars into line `line`, clamped to the line end.
    fn offset_of(&self, line: usize, col: usize) -> usize {
        let mut start = 0;
        for (i, text) in self.prompt.split('\n').enumerate() {
            if i == line {
                return start
                    + text
                        .char_indices()
                        .nth(col)
                        .map(|(b, _)| b)
                        .unwrap_or(text.len());
            }
            start += text.len() + 1;
        }
        self.prompt.len()
    }

    fn cursor_left(&mut self) {
        if let Some((prev, _)) = self.prompt[..self.cursor].char_indices().next_back() {
            self.cursor = prev;
        }
    }

    fn cursor_right(&mut self) {
        if let Some(c) = self.prompt[self.cursor..].chars().next() {
            self.cursor += c.len_utf8();
        }
    }

    fn cursor_up(&mut self) {
        let (line, col) = self.line_col();
        if line > 0 {
            self.cursor = self.offset_of(line - 1, col);
            self.ensure_cursor_visible();
        }
    }

    fn cursor_down(&mut self) {
        let (line, col) = self.line_col();
        if line + 1 < self.prompt.split('\n').count() {
            self.cursor = self.offset_of(line + 1, col);
            self.ensure_cursor_visible();
        }
    }

    /// Keep the cursor line inside a conservative viewport; render adjusts
    /// further once the real height is known.
    fn ensure_cursor_visible(&mut self) {
        const ESTIMATED_VIEWPORT: usize = 6;
        let (line, _) = self.line_col();
        if line < self.scroll {
            self.scroll = line;
        }
        if line >= self.scroll + ESTIMATED_VIEWPORT {
            self.scroll = line + 1 - ESTIMATED_VIEWPORT;
        }
    }

    fn render_prompt(&self, frame: &mut Frame, area: Rect) {
        let line_count = self.prompt.split('\n').count();
        let title = if self.prompt.is_empty() {
            " Prompt ".to_string()
        } else {
            format!(
                " Prompt ({} line{}, {} chars{}) ",
                line_count,
                if line_count == 1 { "" } else { "s" },
                self.prompt.chars().count(),
                if self.dirty { ", unsaved" } else { "" }
            )
        };
        let block = Block::default()
            .title(title)
            .title_style(if self.editing {
                Theme::key_hint()
            } else {
                Theme::muted()
            })
            .borders(Borders::ALL)
            .border_style(if self.editing {
                Style::default().fg(Theme::accent())
            } else {
                Theme::border()
            });
        let viewport = block.inner(area).height as usize;

        if self.prompt.is_empty() && !self.editing {
            let placeholder = Paragraph::new(vec![
                Line::from(Span::styled("Paste text, a JSON object with", Theme::dim())),
                Line::from(Span::styled(
                    "\"final_prompt\", or a JSON array of cards.",
                    Theme::dim(),
                )),
            ])
            .block(block);
            frame.render_widget(placeholder, area);
            return;
        }

        let (cursor_line, cursor_col) = self.line_col();
        let mut scroll = self.scroll;
        if cursor_line < scroll {
            scroll = cursor_line;
        }
        if viewport > 0 && cursor_line >= scroll + viewport {
            scroll = cursor_line + 1 - viewport;
        }

        let lines: Vec<Line> = self
            .prompt
            .split('\n')
            .enumerate()
            .skip(scroll)
            .take(viewport.max(1))
            .map(|(i, text)| {
                if !(self.editing && i == cursor_line) {
                    return Line::from(Span::styled(text.to_string(), Theme::normal()));
                }
                let split = text
                    .char_indices()
                    .nth(cursor_col)
                    .map(|(b, _)| b)
                    .unwrap_or(text.len());
                let (before, after) = text.split_at(split);
                let mut rest = after.chars();
                let under = rest.next().map(String::from).unwrap_or_else(|| " ".into());
                Line::from(vec![
                    Span::styled(before.to_string(), Theme::normal()),
                    Span::styled(under, Theme::cursor()),
                    Span::styled(rest.as_str().to_string(), Theme::normal()),
                ])
            })
            .collect();

        frame.render_widget(Paragraph::new(lines).block(block), area);
    }
}

impl Component for PromptPanelComponent {
    fn handle_action(&mut self, action: &Action) -> Option<Action> {
        match action {
            Action::FocusPrompt => {
                self.editing = true;
                None
            }
            Action::BlurPrompt => {
                self.editing = false;
                None
            }
            _ if !self.editing => None,

            // ── Text input ──────────────────────────────────────
            Action::CharInput(c) => {
                self.insert_char(*c);
                None
            }
            Action::NewlineInput => {
                self.insert_char('\n');
                None
            }
            Action::PasteBulk(text) => {
                self.insert_str(text);
                None
            }
            Action::BackspaceInput => {
                self.delete_char();
                None
            }
            Action::DeleteWord => {
                self.delete_word();
                None
            }

            // ── Cursor ──────────────────────────────────────────
            Action::CursorLeft => {
                self.cursor_left();
                None
            }
            Action::CursorRight => {
                self.cursor_right();
                None
            }
            Action::CursorUp => {
                self.cursor_up();
                None
            }
            Action::CursorDown => {
                self.cursor_down();
                None
            }
            _ => None,
        }
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(" Situation Autofill ")
            .title_style(Theme::title())
            .borders(Borders::ALL)
            .border_style(if self.editing {
                Style::default().fg(Theme::accent())
            } else {
                Theme::border()
            });
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let chunks = Layout::vertical([
            Constraint::Length(1), // Toggle
            Constraint::Min(5),    // Prompt
            Constraint::Length(1), // Buttons
        ])
        .split(inner);

        let toggle = Paragraph::new(Line::from(vec![
            Span::styled(" Autofill ", Theme::header()),
            Span::styled(
                if self.enabled { "[ON] " } else { "[OFF]" },
                Theme::toggle(self.enabled),
            ),
            Span::styled("  t", Theme::key_hint()),
            Span::styled(" toggle", Theme::dim()),
        ]));
        frame.render_widget(toggle, chunks[0]);

        self.render_prompt(frame, chunks[1]);

        let buttons = if self.editing {
            Line::from(vec![
                Span::styled(" ctrl+r", Theme::key_hint()),
                Span::styled(" run  ", Theme::dim()),
                Span::styled("ctrl+s", Theme::key_hint()),
                Span::styled(" save  ", Theme::dim()),
                Span::styled("esc", Theme::key_hint()),
                Span::styled(" done", Theme::dim()),
            ])
        } else {
            Line::from(vec![
                Span::styled(" [ Run ]", Theme::selected()),
                Span::styled(" r  ", Theme::dim()),
                Span::styled("[ Save ]", Theme::selected()),
                Span::styled(" s  ", Theme::dim()),
                Span::styled("i", Theme::key_hint()),
                Span::styled(" edit", Theme::dim()),
            ])
        };
        frame.render_widget(Paragraph::new(buttons), chunks[2]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editing(prompt: &str) -> PromptPanelComponent {
        let mut panel = PromptPanelComponent::new(prompt, true);
        panel.handle_action(&Action::FocusPrompt);
        panel
    }

    fn send(panel: &mut PromptPanelComponent, actions: &[Action]) {
        for action in actions {
            panel.handle_action(action);
        }
    }

    #[test]
    fn typing_requires_focus() {
        let mut panel = PromptPanelComponent::new("", true);
        panel.handle_action(&Action::CharInput('x'));
        assert_eq!(panel.prompt(), "");
        assert!(!panel.dirty);

        panel.handle_action(&Action::FocusPrompt);
        panel.handle_action(&Action::CharInput('x'));
        assert_eq!(panel.prompt(), "x");
        assert!(panel.dirty);
    }

    #[test]
    fn backspace_removes_whole_characters() {
        let mut panel = editing("비 오는");
        send(&mut panel, &[Action::BackspaceInput, Action::BackspaceInput]);
        assert_eq!(panel.prompt(), "비 ");
    }

    #[test]
    fn delete_word_stops_at_spaces_and_newlines() {
        let mut panel = editing("1=rain\n2=neon sign  ");
        panel.handle_action(&Action::DeleteWord);
        assert_eq!(panel.prompt(), "1=rain\n2=neon ");
        send(&mut panel, &[Action::DeleteWord, Action::DeleteWord]);
        assert_eq!(panel.prompt(), "1=rain\n");
    }

    #[test]
    fn paste_normalizes_line_endings() {
        let mut panel = editing("");
        panel.handle_action(&Action::PasteBulk("a\r\nb\rc".into()));
        assert_eq!(panel.prompt(), "a\nb\nc");
    }

    #[test]
    fn vertical_moves_keep_the_column_on_char_boundaries() {
        let mut panel = editing("가나다라\nab");
        // cursor at end of "ab", column 2
        panel.handle_action(&Action::CursorUp);
        panel.handle_action(&Action::CharInput('X'));
        assert_eq!(panel.prompt(), "가나X다라\nab");

        panel.handle_action(&Action::CursorDown);
        panel.handle_action(&Action::CharInput('Y'));
        assert_eq!(panel.prompt(), "가나X다라\nabY");
    }

    #[test]
    fn horizontal_moves_insert_mid_text() {
        let mut panel = editing("rain");
        send(
            &mut panel,
            &[
                Action::CursorLeft,
                Action::CursorLeft,
                Action::CharInput('-'),
                Action::CursorRight,
                Action::CursorRight,
                Action::CursorRight,
                Action::CharInput('!'),
            ],
        );
        assert_eq!(panel.prompt(), "ra-in!");
    }

    #[test]
    fn blur_stops_editing_and_save_clears_dirty() {
        let mut panel = editing("");
        send(&mut panel, &[Action::CharInput('a'), Action::BlurPrompt]);
        assert!(!panel.wants_input());
        panel.mark_saved();
        assert!(!panel.dirty);
    }
}
