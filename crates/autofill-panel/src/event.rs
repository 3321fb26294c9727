//! Terminal event handling: reads crossterm events and sends Actions.
//!
//! Two keymaps:
//! - Normal: single keys are panel and menu shortcuts.
//! - Editing: keys are forwarded to the prompt editor; panel buttons move
//!   to Ctrl chords.
//!
//! The current InputMode is shared between the App and EventHandler via
//! an Arc<AtomicU8>.

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use autofill_core::MenuCommand;

use crate::action::{Action, InputMode};

const MODE_NORMAL: u8 = 0;
const MODE_EDITING: u8 = 1;

/// Shared flag the App sets so the EventHandler knows which keymap to use.
pub type InputModeFlag = Arc<AtomicU8>;

pub fn new_input_mode_flag() -> InputModeFlag {
    Arc::new(AtomicU8::new(MODE_NORMAL))
}

pub fn set_input_mode(flag: &InputModeFlag, mode: InputMode) {
    let val = match mode {
        InputMode::Normal => MODE_NORMAL,
        InputMode::Editing => MODE_EDITING,
    };
    flag.store(val, Ordering::Relaxed);
}

fn get_input_mode(flag: &InputModeFlag) -> InputMode {
    match flag.load(Ordering::Relaxed) {
        MODE_EDITING => InputMode::Editing,
        _ => InputMode::Normal,
    }
}

pub struct EventHandler {
    tx: mpsc::UnboundedSender<Action>,
    tick_rate: Duration,
    mode_flag: InputModeFlag,
}

impl EventHandler {
    pub fn new(
        tx: mpsc::UnboundedSender<Action>,
        tick_rate: Duration,
        mode_flag: InputModeFlag,
    ) -> Self {
        Self {
            tx,
            tick_rate,
            mode_flag,
        }
    }

    /// Run until the receiving side is dropped. Spawn this in a task.
    pub async fn run(&self) {
        let mut interval = tokio::time::interval(self.tick_rate);

        loop {
            let action = tokio::select! {
                _ = interval.tick() => {
                    Some(Action::Tick)
                }
                result = tokio::task::spawn_blocking({
                    || {
                        if event::poll(Duration::from_millis(50)).unwrap_or(false) {
                            event::read().ok()
                        } else {
                            None
                        }
                    }
                }) => {
                    match result {
                        Ok(Some(event)) => self.map_event(event),
                        _ => None,
                    }
                }
            };

            if let Some(action) = action {
                if self.tx.send(action).is_err() {
                    break;
                }
            }
        }
    }

    fn map_event(&self, event: Event) -> Option<Action> {
        match event {
            Event::Key(key) => self.map_key(key),
            Event::Paste(text) => Some(Action::PasteBulk(text)),
            Event::Resize(_, _) => Some(Action::Tick),
            _ => None,
        }
    }

    fn map_key(&self, key: KeyEvent) -> Option<Action> {
        // Ctrl+C always quits regardless of mode.
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Some(Action::Quit);
        }

        match get_input_mode(&self.mode_flag) {
            InputMode::Editing => self.map_key_editing(key),
            InputMode::Normal => self.map_key_normal(key),
        }
    }

    fn map_key_editing(&self, key: KeyEvent) -> Option<Action> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('r') => Some(Action::RunFromPanel),
                KeyCode::Char('s') => Some(Action::SavePrompt),
                KeyCode::Char('t') => Some(Action::Command(MenuCommand::Toggle)),
                KeyCode::Char('w') => Some(Action::DeleteWord),
                KeyCode::Enter => Some(Action::RunFromPanel),
                _ => None,
            };
        }

        match key.code {
            KeyCode::Esc => Some(Action::BlurPrompt),
            KeyCode::Enter => Some(Action::NewlineInput),
            KeyCode::Backspace => Some(Action::BackspaceInput),
            KeyCode::Left => Some(Action::CursorLeft),
            KeyCode::Right => Some(Action::CursorRight),
            KeyCode::Up => Some(Action::CursorUp),
            KeyCode::Down => Some(Action::CursorDown),
            KeyCode::Char(c) => Some(Action::CharInput(c)),
            _ => None,
        }
    }

    fn map_key_normal(&self, key: KeyEvent) -> Option<Action> {
        match key.code {
            KeyCode::Char('q') => Some(Action::Quit),
            KeyCode::Char('?') => Some(Action::ToggleHelp),
            KeyCode::Char('i') | KeyCode::Enter => Some(Action::FocusPrompt),
            KeyCode::Char('r') => Some(Action::RunFromPanel),
            KeyCode::Char('s') => Some(Action::SavePrompt),
            KeyCode::Char('w') => Some(Action::WritePage),
            KeyCode::Esc => Some(Action::DismissNotice),

            // Menu commands.
            KeyCode::F(5) => Some(Action::Command(MenuCommand::Run)),
            KeyCode::Char('t') => Some(Action::Command(MenuCommand::Toggle)),
            KeyCode::Char('p') => Some(Action::Command(MenuCommand::ShowPanel)),
            KeyCode::Char('h') => Some(Action::Command(MenuCommand::HidePanel)),

            KeyCode::Up | KeyCode::Char('k') => Some(Action::SelectPrev),
            KeyCode::Down | KeyCode::Char('j') => Some(Action::SelectNext),
            _ => None,
        }
    }
}
