use thiserror::Error;

#[derive(Error, Debug)]
pub enum TallyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Nothing to import: the file has no content")]
    EmptyInput,

    #[error("Unknown import type: {0}")]
    UnknownImportType(String),

    #[error("Unknown account: {0}")]
    UnknownAccount(String),

    #[error("Unknown date format: {0}")]
    UnknownDateFormat(String),

    #[error("Step error: {0}")]
    StepOrder(String),

    #[error("Settings error: {0}")]
    Settings(String),
}

pub type Result<T> = std::result::Result<T, TallyError>;
