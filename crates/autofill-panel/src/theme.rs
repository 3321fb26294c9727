//! Color scheme and styling for the panel.

use ratatui::style::{Color, Modifier, Style};

use autofill_core::Severity;

pub struct Theme;

impl Theme {
    // ── Base colors ─────────────────────────────────────────
    pub fn bg() -> Color {
        Color::Reset
    }

    pub fn fg() -> Color {
        Color::Rgb(200, 200, 200)
    }

    pub fn fg_dim() -> Color {
        Color::Rgb(100, 100, 100)
    }

    pub fn fg_muted() -> Color {
        Color::Rgb(140, 140, 140)
    }

    // ── Accent colors ───────────────────────────────────────
    pub fn accent() -> Color {
        Color::Rgb(110, 170, 255)
    }

    pub fn success() -> Color {
        Color::Rgb(80, 200, 120)
    }

    pub fn warning() -> Color {
        Color::Rgb(230, 180, 80)
    }

    pub fn error() -> Color {
        Color::Rgb(240, 80, 80)
    }

    pub fn border_color() -> Color {
        Color::Rgb(60, 60, 60)
    }

    // ── Composite styles ────────────────────────────────────

    pub fn title() -> Style {
        Style::default()
            .fg(Self::accent())
            .add_modifier(Modifier::BOLD)
    }

    pub fn header() -> Style {
        Style::default().fg(Self::fg()).add_modifier(Modifier::BOLD)
    }

    pub fn selected() -> Style {
        Style::default()
            .fg(Self::accent())
            .add_modifier(Modifier::BOLD)
    }

    pub fn normal() -> Style {
        Style::default().fg(Self::fg())
    }

    pub fn dim() -> Style {
        Style::default().fg(Self::fg_dim())
    }

    pub fn muted() -> Style {
        Style::default().fg(Self::fg_muted())
    }

    pub fn border() -> Style {
        Style::default().fg(Self::border_color())
    }

    pub fn key_hint() -> Style {
        Style::default().fg(Self::accent())
    }

    pub fn cursor() -> Style {
        Style::default().fg(Self::bg()).bg(Self::accent())
    }

    /// The ON/OFF badge of the panel toggle.
    pub fn toggle(enabled: bool) -> Style {
        let color = if enabled {
            Self::success()
        } else {
            Self::fg_dim()
        };
        Style::default().fg(color).add_modifier(Modifier::BOLD)
    }

    pub fn severity_color(severity: Severity) -> Color {
        match severity {
            Severity::Info => Self::success(),
            Severity::Warning => Self::warning(),
            Severity::Error => Self::error(),
        }
    }

    /// Fill level of a field: green while there is room, red when full.
    pub fn fill_color(used: usize, capacity: usize) -> Color {
        if capacity == 0 || used >= capacity {
            Self::error()
        } else if used * 10 >= capacity * 8 {
            Self::warning()
        } else {
            Self::success()
        }
    }
}
