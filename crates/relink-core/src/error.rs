//! Error types for relink.

use thiserror::Error;

use crate::models::FieldErrors;

/// Result type alias using relink's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for migration operations.
///
/// Per-row conversion problems are never represented here; they are reported
/// through the migration log and counted in the report. An `Error` returned
/// from the engine stops the run.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The field registry refused to persist a field definition
    #[error("Field \"{handle}\" could not be saved: {errors}")]
    FieldRejected { handle: String, errors: FieldErrors },

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl Error {
    /// Whether this error came from a registry refusing a field save.
    pub fn is_field_rejection(&self) -> bool {
        matches!(self, Error::FieldRejected { .. })
    }
}
