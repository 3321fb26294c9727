use thiserror::Error;

#[derive(Error, Debug)]
pub enum AutofillError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Settings storage error: {0}")]
    Storage(String),

    #[error("Page snapshot error: {0}")]
    Page(String),

    #[error("Document operation error: {0}")]
    Dom(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AutofillError>;
