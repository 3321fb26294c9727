//! Action enum, the message bus for the panel.
//! Key presses and command results all flow through here.

use autofill_core::{MenuCommand, Notice};

#[derive(Debug, Clone)]
pub enum Action {
    // ── Global ──────────────────────────────────────────────
    Quit,
    ToggleHelp,
    /// Display a status message in the status bar.
    SetStatus(String),
    /// Periodic wake-up; also sent on resize.
    Tick,

    // ── Commands ────────────────────────────────────────────
    /// A menu command, handled by the controller.
    Command(MenuCommand),
    /// The panel's Run button: save the edited prompt, then run.
    RunFromPanel,
    /// The panel's Save button.
    SavePrompt,
    /// Write the page, with filled values, back to its file.
    WritePage,

    // ── Notices ─────────────────────────────────────────────
    ShowNotice(Notice),
    DismissNotice,

    // ── Prompt editing ──────────────────────────────────────
    FocusPrompt,
    BlurPrompt,
    CharInput(char),
    BackspaceInput,
    /// Delete the word before the cursor (Ctrl+W).
    DeleteWord,
    NewlineInput,
    /// Bracketed paste: the terminal sends the whole text at once.
    PasteBulk(String),
    CursorLeft,
    CursorRight,
    CursorUp,
    CursorDown,

    // ── Page preview ────────────────────────────────────────
    SelectPrev,
    SelectNext,
}

/// Whether raw keys go to the prompt editor or are read as shortcuts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}
