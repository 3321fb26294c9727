//! Page preview: the cards discovery finds on the loaded page and what each
//! of their fields currently holds.

use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap};
use ratatui::Frame;

use autofill_core::discovery::{inspect_cards, CardReport, FieldKind, FieldReport};
use autofill_core::runner::FieldWrite;
use autofill_core::{AutofillConfig, Document};

use crate::action::Action;
use crate::components::{truncate, Component};
use crate::theme::Theme;

pub struct PagePreviewComponent {
    /// Where the page came from, for the title.
    pub source: String,
    pub cards: Vec<CardReport>,
    pub selected: usize,
    /// Writes of the last run, for cut annotations.
    pub writes: Vec<FieldWrite>,
}

impl PagePreviewComponent {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            cards: Vec::new(),
            selected: 0,
            writes: Vec::new(),
        }
    }

    /// Re-read the cards from the page.
    pub fn refresh<D: Document + ?Sized>(&mut self, doc: &D, config: &AutofillConfig) {
        self.cards = inspect_cards(doc, config);
        if self.selected >= self.cards.len() {
            self.selected = self.cards.len().saturating_sub(1);
        }
    }

    fn field_cell(field: &Option<FieldReport>, width: usize) -> Cell<'static> {
        match field {
            None => Cell::from(Span::styled("—", Theme::dim())),
            Some(f) => {
                let used = f.value.chars().count();
                let gauge = format!("{used:>3}/{:<3} ", f.capacity);
                let text = truncate(&f.value, width.saturating_sub(gauge.len()));
                Cell::from(Line::from(vec![
                    Span::styled(gauge, Style::default().fg(Theme::fill_color(used, f.capacity))),
                    Span::styled(text, Theme::normal()),
                ]))
            }
        }
    }

    fn render_table(&self, frame: &mut Frame, area: Rect) {
        let inner_height = area.height.saturating_sub(2) as usize;
        let scroll_offset = if self.selected >= inner_height && inner_height > 0 {
            self.selected - inner_height + 1
        } else {
            0
        };
        let column = (area.width as usize).saturating_sub(6) / 3;

        let header = Row::new(vec![
            Cell::from(" # "),
            Cell::from("Title"),
            Cell::from("Situation"),
            Cell::from("Hint"),
        ])
        .style(Theme::header());

        let rows: Vec<Row> = self
            .cards
            .iter()
            .enumerate()
            .skip(scroll_offset)
            .take(inner_height)
            .map(|(i, card)| {
                let style = if i == self.selected {
                    Theme::selected()
                } else {
                    Theme::normal()
                };
                Row::new(vec![
                    Cell::from(format!("{:>3}", i + 1)),
                    Self::field_cell(&card.title, column),
                    Self::field_cell(&card.situation, column),
                    Self::field_cell(&card.hint, column),
                ])
                .style(style)
            })
            .collect();

        let table = Table::new(
            rows,
            [
                Constraint::Length(4),
                Constraint::Ratio(1, 3),
                Constraint::Ratio(1, 3),
                Constraint::Ratio(1, 3),
            ],
        )
        .header(header)
        .column_spacing(1)
        .block(Block::default().borders(Borders::TOP));

        frame.render_widget(table, area);
    }

    fn render_detail(&self, frame: &mut Frame, area: Rect) {
        let Some(card) = self.cards.get(self.selected) else {
            return;
        };

        let mut lines = vec![Line::from(vec![
            Span::styled(format!("Card {} ", self.selected + 1), Theme::header()),
            Span::styled(format!("(node {})", card.card), Theme::dim()),
        ])];
        for (kind, field) in [
            (FieldKind::Title, &card.title),
            (FieldKind::Situation, &card.situation),
            (FieldKind::Hint, &card.hint),
        ] {
            let Some(field) = field else { continue };
            let cut = self
                .writes
                .iter()
                .find(|w| w.node == field.node)
                .and_then(|w| w.cut)
                .map(|cut| format!("  [{cut:?}]"))
                .unwrap_or_default();
            lines.push(Line::from(vec![
                Span::styled(format!("{:<10}", kind.label()), Theme::muted()),
                Span::styled(field.value.clone(), Theme::normal()),
                Span::styled(cut, Theme::dim()),
            ]));
        }

        let detail = Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::TOP).border_style(Theme::border()));
        frame.render_widget(detail, area);
    }
}

impl Component for PagePreviewComponent {
    fn handle_action(&mut self, action: &Action) -> Option<Action> {
        match action {
            Action::SelectPrev => {
                self.selected = self.selected.saturating_sub(1);
                None
            }
            Action::SelectNext => {
                if self.selected + 1 < self.cards.len() {
                    self.selected += 1;
                }
                None
            }
            _ => None,
        }
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(format!(" Page: {} ", self.source))
            .title_style(Theme::title())
            .borders(Borders::ALL)
            .border_style(Theme::dim());
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if self.cards.is_empty() {
            let empty = Paragraph::new(vec![
                Line::from(""),
                Line::from(Span::styled("No situation cards found on this page.", Theme::dim())),
                Line::from(Span::styled(
                    "Check the label keywords in config.toml.",
                    Theme::dim(),
                )),
            ]);
            frame.render_widget(empty, inner);
            return;
        }

        let chunks = Layout::vertical([
            Constraint::Length(1), // Summary
            Constraint::Min(5),    // Card table
            Constraint::Length(6), // Card detail
        ])
        .split(inner);

        let filled = self
            .cards
            .iter()
            .filter(|c| {
                [&c.title, &c.situation]
                    .iter()
                    .any(|f| matches!(f, Some(f) if !f.value.is_empty()))
            })
            .count();
        let summary = Paragraph::new(Line::from(vec![
            Span::styled(format!("{} cards", self.cards.len()), Theme::header()),
            Span::styled("  |  ", Theme::dim()),
            Span::styled(format!("{filled} with text"), Theme::muted()),
        ]));
        frame.render_widget(summary, chunks[0]);

        self.render_table(frame, chunks[1]);
        self.render_detail(frame, chunks[2]);
    }
}
