//! Error types for cbt-assistant

use thiserror::Error;

/// The main error type for cbt-assistant operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Completion provider (LLM) errors, including timeouts
    #[error("Provider error: {0}")]
    Provider(String),

    /// Malformed input rejected before any session mutation
    #[error("Validation error: {0}")]
    Validation(String),

    /// A bounded resource is exhausted; the request may succeed later
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for cbt-assistant operations
pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
