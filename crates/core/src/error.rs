//! Error types for newsdesk.
//!
//! This module defines a unified error enum that covers all error categories
//! in the application: configuration, I/O, generation, retrieval, prompts,
//! serialization, and the two ways a suspended call can end early
//! (timeout and cancellation).

use thiserror::Error;

/// Unified error type for newsdesk.
///
/// All fallible functions return `Result<T, AppError>`.
/// We never panic; errors must be represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generation capability errors (transport, malformed output)
    #[error("LLM error: {0}")]
    Llm(String),

    /// Retrieval capability errors, including per-item metadata problems
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A generation or retrieval call exceeded its deadline
    #[error("Timed out: {0}")]
    Timeout(String),

    /// The turn was cancelled by the caller
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
