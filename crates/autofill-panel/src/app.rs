//! Main application state and render loop.

use crossterm::{
    event::{DisableBracketedPaste, EnableBracketedPaste},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Layout};
use ratatui::Terminal;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};

use autofill_core::{Controller, MenuCommand, Notice, Page, SettingsStore, Severity};

use crate::action::{Action, InputMode};
use crate::components::help::HelpComponent;
use crate::components::notice_dialog::NoticeDialogComponent;
use crate::components::page_preview::PagePreviewComponent;
use crate::components::prompt_panel::PromptPanelComponent;
use crate::components::status_bar::StatusBarComponent;
use crate::components::Component;
use crate::event::{self, EventHandler, InputModeFlag};

/// Controller work queued by `handle_action` and awaited by the main loop.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Pending {
    Run { prompt: String },
    Command(MenuCommand),
}

pub struct App<S: SettingsStore> {
    should_quit: bool,
    /// Shared flag to tell the EventHandler which key-mapping to use.
    input_mode_flag: InputModeFlag,

    controller: Controller<S>,
    page: Page,
    /// File the page was loaded from; `w` writes it back there.
    page_path: Option<PathBuf>,
    pending: Option<Pending>,

    // Components
    panel: PromptPanelComponent,
    preview: PagePreviewComponent,
    notice: NoticeDialogComponent,
    status_bar: StatusBarComponent,
    help: HelpComponent,
}

impl<S: SettingsStore> App<S> {
    pub fn new(mut controller: Controller<S>, page: Page, page_path: Option<PathBuf>) -> Self {
        controller.show_panel();
        let settings = controller.settings().clone();

        let source = page_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(no page loaded)".to_string());
        let mut preview = PagePreviewComponent::new(source);
        preview.refresh(&page, controller.config());

        Self {
            should_quit: false,
            input_mode_flag: event::new_input_mode_flag(),
            controller,
            page,
            page_path,
            pending: None,
            panel: PromptPanelComponent::new(&settings.prompt, settings.enabled),
            preview,
            notice: NoticeDialogComponent::new(),
            status_bar: StatusBarComponent::new(settings.enabled),
            help: HelpComponent::new(),
        }
    }

    /// Pre-fill the prompt editor from CLI args. Not saved until Save or Run.
    pub fn set_initial_prompt(&mut self, prompt: &str) {
        self.panel.replace_prompt(prompt);
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn controller(&self) -> &Controller<S> {
        &self.controller
    }

    /// Run the panel until the user quits.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let (tx, mut rx) = mpsc::unbounded_channel::<Action>();

        let mode_flag = self.input_mode_flag.clone();
        let event_handler = EventHandler::new(tx, Duration::from_millis(250), mode_flag);
        tokio::spawn(async move {
            event_handler.run().await;
        });

        self.sync_input_mode();
        info!(cards = self.preview.cards.len(), "Panel started");

        loop {
            terminal.draw(|frame| {
                self.render(frame);
            })?;

            if let Some(action) = rx.recv().await {
                self.handle_action(&action);
                self.process_pending().await;

                if self.should_quit {
                    break;
                }
            } else {
                break;
            }
        }

        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableBracketedPaste
        )?;
        terminal.show_cursor()?;

        Ok(())
    }

    fn sync_input_mode(&self) {
        event::set_input_mode(&self.input_mode_flag, self.current_input_mode());
    }

    fn current_input_mode(&self) -> InputMode {
        // Overlays take keys in normal mode so any key dismisses them.
        if self.help.visible || self.notice.visible() || !self.controller.is_panel_visible() {
            return InputMode::Normal;
        }
        if self.panel.wants_input() {
            InputMode::Editing
        } else {
            InputMode::Normal
        }
    }

    /// Dispatch an action to the relevant components.
    fn handle_action(&mut self, action: &Action) {
        if matches!(action, Action::Quit) {
            self.should_quit = true;
            return;
        }

        // An open notice swallows the key that dismisses it.
        if self.notice.visible() && !matches!(action, Action::Tick | Action::SetStatus(_)) {
            let chained = self.notice.handle_action(action);
            self.status_bar.handle_action(action);
            self.sync_input_mode();
            if let Some(chained) = chained {
                self.handle_action(&chained);
            }
            return;
        }

        // Open help closes on the next key without acting on it.
        if self.help.visible
            && !matches!(
                action,
                Action::Tick | Action::SetStatus(_) | Action::ShowNotice(_)
            )
        {
            self.help.handle_action(action);
            self.sync_input_mode();
            return;
        }

        let mut chained = Vec::new();
        match action {
            Action::Command(command) => {
                self.pending = Some(Pending::Command(*command));
            }
            Action::RunFromPanel => {
                self.pending = Some(Pending::Run {
                    prompt: self.panel.prompt().to_string(),
                });
            }
            Action::SavePrompt => {
                let notice = self.controller.save_prompt(self.panel.prompt());
                if notice.severity != Severity::Error {
                    self.panel.mark_saved();
                }
                chained.push(Action::ShowNotice(notice));
            }
            Action::WritePage => {
                chained.push(Action::ShowNotice(self.write_page()));
            }
            Action::FocusPrompt if !self.controller.is_panel_visible() => {
                chained.push(Action::SetStatus(
                    "The panel is hidden. Press p to show it.".to_string(),
                ));
            }
            _ => {}
        }

        if self.controller.is_panel_visible() {
            chained.extend(self.panel.handle_action(action));
        }
        if !self.panel.wants_input() {
            chained.extend(self.preview.handle_action(action));
        }
        chained.extend(self.help.handle_action(action));
        chained.extend(self.notice.handle_action(action));
        chained.extend(self.status_bar.handle_action(action));

        self.sync_input_mode();

        for action in chained {
            self.handle_action(&action);
        }
    }

    /// Await queued controller work and show its notice.
    async fn process_pending(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };

        let notice = match pending {
            Pending::Run { prompt } => {
                self.controller
                    .run_with_prompt(&mut self.page, &prompt)
                    .await
            }
            Pending::Command(command) => self.controller.handle(command, &mut self.page).await,
        };

        if self.controller.settings().prompt == self.panel.prompt() {
            self.panel.mark_saved();
        }
        let enabled = self.controller.settings().enabled;
        self.panel.enabled = enabled;
        self.status_bar.enabled = enabled;
        if !self.controller.is_panel_visible() {
            self.panel.editing = false;
        }
        self.preview.writes = self
            .controller
            .last_report()
            .map(|report| report.writes.clone())
            .unwrap_or_default();
        self.preview.refresh(&self.page, self.controller.config());

        self.handle_action(&Action::ShowNotice(notice));
    }

    fn write_page(&self) -> Notice {
        let Some(path) = &self.page_path else {
            return Notice {
                severity: Severity::Warning,
                message: "No page file to write to.".to_string(),
            };
        };
        match self.page.save(path) {
            Ok(()) => {
                info!(path = %path.display(), "Wrote page");
                Notice::info(format!("Page written to {}.", path.display()))
            }
            Err(e) => {
                error!(error = %e, path = %path.display(), "Failed to write page");
                Notice::error(format!("Could not write the page: {e}"))
            }
        }
    }

    fn render(&self, frame: &mut ratatui::Frame) {
        let area = frame.area();

        let chunks = Layout::vertical([
            Constraint::Min(10),   // Main content
            Constraint::Length(1), // Status bar
        ])
        .split(area);

        if self.controller.is_panel_visible() {
            let columns = Layout::horizontal([
                Constraint::Percentage(60), // Page preview
                Constraint::Percentage(40), // Floating panel
            ])
            .split(chunks[0]);
            self.preview.render(frame, columns[0]);
            self.panel.render(frame, columns[1]);
        } else {
            self.preview.render(frame, chunks[0]);
        }

        self.status_bar.render(frame, chunks[1]);

        // Overlays (rendered on top)
        self.notice.render(frame, area);
        self.help.render(frame, area);
    }
}
