//! Entry-point glue between the panel / menu and the runner.
//!
//! Every user command ends in a [`Notice`]. Failures are caught here, logged,
//! and turned into a generic error notice so nothing escapes to the caller.

use serde::Serialize;
use tracing::{error, info};

use crate::config::AutofillConfig;
use crate::dom::Document;
use crate::runner::{run_autofill, RunReport, Severity};
use crate::settings::{Settings, SettingsStore};

const RUN_FAILED: &str = "Autofill failed with an unexpected error. See the log for details.";
const SAVE_FAILED: &str = "Could not save settings. See the log for details.";

/// Commands exposed outside the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuCommand {
    Run,
    Toggle,
    ShowPanel,
    HidePanel,
}

/// Message shown to the user after a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

pub struct Controller<S: SettingsStore> {
    store: S,
    settings: Settings,
    config: AutofillConfig,
    panel_visible: bool,
    last_report: Option<RunReport>,
}

impl<S: SettingsStore> Controller<S> {
    pub fn new(store: S, config: AutofillConfig) -> Self {
        let settings = Settings::load(&store);
        Self {
            store,
            settings,
            config,
            panel_visible: false,
            last_report: None,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn config(&self) -> &AutofillConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn is_panel_visible(&self) -> bool {
        self.panel_visible
    }

    /// Report of the most recent run that got past the prompt save.
    pub fn last_report(&self) -> Option<&RunReport> {
        self.last_report.as_ref()
    }

    /// Persist a full settings value, keeping the old one on failure.
    fn commit(&mut self, next: Settings) -> Result<(), Notice> {
        if let Err(e) = next.save(&mut self.store) {
            error!(error = %e, "Failed to persist settings");
            return Err(Notice::error(SAVE_FAILED));
        }
        self.settings = next;
        Ok(())
    }

    pub fn toggle(&mut self) -> Notice {
        let next = Settings {
            enabled: !self.settings.enabled,
            ..self.settings.clone()
        };
        match self.commit(next) {
            Ok(()) => {
                info!(enabled = self.settings.enabled, "Toggled autofill");
                Notice::info(if self.settings.enabled {
                    "Autofill enabled."
                } else {
                    "Autofill disabled."
                })
            }
            Err(notice) => notice,
        }
    }

    pub fn save_prompt(&mut self, prompt: &str) -> Notice {
        let next = Settings {
            prompt: prompt.to_string(),
            ..self.settings.clone()
        };
        match self.commit(next) {
            Ok(()) => Notice::info("Saved."),
            Err(notice) => notice,
        }
    }

    /// Save `prompt`, then run with the resulting settings.
    pub async fn run_with_prompt<D: Document + ?Sized>(
        &mut self,
        doc: &mut D,
        prompt: &str,
    ) -> Notice {
        if prompt != self.settings.prompt {
            let next = Settings {
                prompt: prompt.to_string(),
                ..self.settings.clone()
            };
            if let Err(notice) = self.commit(next) {
                return notice;
            }
        }
        self.run(doc).await
    }

    /// Run with the stored settings.
    pub async fn run<D: Document + ?Sized>(&mut self, doc: &mut D) -> Notice {
        match run_autofill(doc, &self.settings, &self.config).await {
            Ok(report) => {
                let notice = Notice {
                    severity: report.outcome.severity(),
                    message: report.outcome.to_string(),
                };
                self.last_report = Some(report);
                notice
            }
            Err(e) => {
                error!(error = %e, "Autofill run failed");
                self.last_report = None;
                Notice::error(RUN_FAILED)
            }
        }
    }

    pub fn show_panel(&mut self) -> Notice {
        self.panel_visible = true;
        Notice::info("Panel shown.")
    }

    pub fn hide_panel(&mut self) -> Notice {
        self.panel_visible = false;
        Notice::info("Panel hidden.")
    }

    pub async fn handle<D: Document + ?Sized>(&mut self, command: MenuCommand, doc: &mut D) -> Notice {
        match command {
            MenuCommand::Run => self.run(doc).await,
            MenuCommand::Toggle => self.toggle(),
            MenuCommand::ShowPanel => self.show_panel(),
            MenuCommand::HidePanel => self.hide_panel(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{DomEvent, NodeId};
    use crate::error::{AutofillError, Result};
    use crate::page::{El, Page};
    use crate::settings::{MemoryStore, KEY_ENABLED, KEY_PROMPT};

    fn config() -> AutofillConfig {
        let mut config = AutofillConfig::default();
        config.timing.reveal_delay_ms = 0;
        config
    }

    fn page() -> Page {
        Page::build(
            El::new("body").child(
                El::new("div")
                    .child(El::new("input").id("t").attr("placeholder", "Title"))
                    .child(El::new("textarea").id("s").attr("placeholder", "Situation"))
                    .child(El::new("button").text("Change Image")),
            ),
        )
    }

    fn value(page: &Page, id: &str) -> String {
        page.value(page.element_by_id(id).unwrap()).unwrap().to_string()
    }

    /// Store that refuses every write.
    #[derive(Default)]
    struct ReadOnlyStore(MemoryStore);

    impl SettingsStore for ReadOnlyStore {
        fn get(&self, key: &str) -> Option<String> {
            self.0.get(key)
        }

        fn set(&mut self, _key: &str, _value: &str) -> Result<()> {
            Err(AutofillError::Storage("read-only".into()))
        }
    }

    /// Page whose controls reject writes.
    struct LockedPage(Page);

    impl Document for LockedPage {
        fn body(&self) -> NodeId {
            self.0.body()
        }
        fn tag(&self, node: NodeId) -> &str {
            self.0.tag(node)
        }
        fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
            self.0.attr(node, name)
        }
        fn parent(&self, node: NodeId) -> Option<NodeId> {
            self.0.parent(node)
        }
        fn descendants(&self, node: NodeId) -> Vec<NodeId> {
            self.0.descendants(node)
        }
        fn text_content(&self, node: NodeId) -> String {
            self.0.text_content(node)
        }
        fn element_by_id(&self, id: &str) -> Option<NodeId> {
            self.0.element_by_id(id)
        }
        fn value(&self, node: NodeId) -> Option<&str> {
            self.0.value(node)
        }
        fn set_native_value(&mut self, node: NodeId, _value: &str) -> Result<()> {
            Err(AutofillError::Dom(format!("{node} is locked")))
        }
        fn dispatch(&mut self, node: NodeId, event: DomEvent) -> Result<()> {
            self.0.dispatch(node, event)
        }
    }

    #[test]
    fn loads_settings_from_the_store() {
        let mut store = MemoryStore::default();
        store.set(KEY_ENABLED, "false").unwrap();
        store.set(KEY_PROMPT, "rain").unwrap();

        let controller = Controller::new(store, config());
        assert!(!controller.settings().enabled);
        assert_eq!(controller.settings().prompt, "rain");
        assert!(!controller.is_panel_visible());
    }

    #[test]
    fn toggle_flips_and_persists() {
        let mut controller = Controller::new(MemoryStore::default(), config());

        assert_eq!(controller.toggle().message, "Autofill disabled.");
        assert_eq!(controller.store().get(KEY_ENABLED).as_deref(), Some("false"));
        assert_eq!(controller.toggle().message, "Autofill enabled.");
        assert_eq!(controller.store().get(KEY_ENABLED).as_deref(), Some("true"));
    }

    #[test]
    fn save_prompt_persists() {
        let mut controller = Controller::new(MemoryStore::default(), config());
        let notice = controller.save_prompt("1=rain, 2=neon");
        assert_eq!(notice, Notice::info("Saved."));
        assert_eq!(
            controller.store().get(KEY_PROMPT).as_deref(),
            Some("1=rain, 2=neon")
        );
    }

    #[test]
    fn failed_save_keeps_previous_settings() {
        let mut controller = Controller::new(ReadOnlyStore::default(), config());
        let notice = controller.toggle();
        assert_eq!(notice.severity, Severity::Error);
        assert!(controller.settings().enabled);

        let notice = controller.save_prompt("rain");
        assert_eq!(notice.message, SAVE_FAILED);
        assert!(controller.settings().prompt.is_empty());
    }

    #[test]
    fn panel_visibility_is_idempotent() {
        let mut controller = Controller::new(MemoryStore::default(), config());
        controller.show_panel();
        assert_eq!(controller.show_panel().message, "Panel shown.");
        assert!(controller.is_panel_visible());
        assert_eq!(controller.hide_panel().message, "Panel hidden.");
        assert!(!controller.is_panel_visible());
    }

    #[tokio::test]
    async fn run_saves_the_prompt_first() {
        let mut controller = Controller::new(MemoryStore::default(), config());
        let mut page = page();

        let notice = controller.run_with_prompt(&mut page, "Alley").await;

        assert_eq!(notice, Notice::info("Autofill done: 1 fields."));
        assert_eq!(controller.store().get(KEY_PROMPT).as_deref(), Some("Alley"));
        assert_eq!(value(&page, "t"), "Alley");
        assert_eq!(controller.last_report().unwrap().writes.len(), 1);
    }

    #[tokio::test]
    async fn run_when_disabled_reports_and_writes_nothing() {
        let mut controller = Controller::new(MemoryStore::default(), config());
        controller.toggle();
        let mut page = page();

        let notice = controller.run_with_prompt(&mut page, "Alley").await;

        assert_eq!(notice.message, "Autofill is disabled.");
        assert!(value(&page, "t").is_empty());
    }

    #[tokio::test]
    async fn run_errors_become_a_generic_notice() {
        let mut store = MemoryStore::default();
        store.set(KEY_PROMPT, "Alley").unwrap();
        let mut controller = Controller::new(store, config());
        let mut page = LockedPage(page());

        let notice = controller.handle(MenuCommand::Run, &mut page).await;

        assert_eq!(notice, Notice::error(RUN_FAILED));
        assert!(controller.last_report().is_none());
        assert_eq!(controller.store().get(KEY_PROMPT).as_deref(), Some("Alley"));
        assert!(controller.settings().enabled);
    }

    #[tokio::test]
    async fn menu_commands_dispatch() {
        let mut controller = Controller::new(MemoryStore::default(), config());
        let mut page = page();

        let notice = controller.handle(MenuCommand::ShowPanel, &mut page).await;
        assert_eq!(notice.message, "Panel shown.");
        let notice = controller.handle(MenuCommand::Toggle, &mut page).await;
        assert_eq!(notice.message, "Autofill disabled.");
        let notice = controller.handle(MenuCommand::HidePanel, &mut page).await;
        assert_eq!(notice.message, "Panel hidden.");
        let notice = controller.handle(MenuCommand::Run, &mut page).await;
        assert_eq!(notice.message, "Autofill is disabled.");
    }
}
