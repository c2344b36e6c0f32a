//! Error types for rollcall-core

use thiserror::Error;

/// Main error type for the rollcall-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Roster or attendance input violates a data-model invariant
    #[error("validation error: {0}")]
    Validation(String),

    /// Referenced class or student does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Text-generation service error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Sync server error
    #[error("sync error: {0}")]
    Sync(String),

    /// Imported file is not a recognised export or backup
    #[error("import error: {0}")]
    Import(String),
}

impl Error {
    /// True for failures raised by an external service (model or sync server).
    pub fn is_external(&self) -> bool {
        matches!(self, Error::Llm(_) | Error::Sync(_))
    }
}

/// Result type alias for rollcall-core
pub type Result<T> = std::result::Result<T, Error>;
