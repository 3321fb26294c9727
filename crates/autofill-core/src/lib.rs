pub mod config;
pub mod controller;
pub mod discovery;
pub mod dom;
pub mod error;
pub mod limits;
pub mod page;
pub mod payload;
pub mod runner;
pub mod segment;
pub mod settings;

pub use config::AutofillConfig;
pub use controller::{Controller, MenuCommand, Notice};
pub use dom::{Document, NodeId};
pub use error::{AutofillError, Result};
pub use page::{El, Page};
pub use runner::{run_autofill, Outcome, RunReport, Severity};
pub use settings::{FileStore, MemoryStore, Settings, SettingsStore};
