//! Error types for ragchat.
//!
//! This module defines a unified error enum covering configuration, I/O,
//! the external retrieval and completion services, relevance judging, and
//! prompt rendering.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for ragchat.
///
/// All fallible functions return `Result<T, AppError>`.
/// We never panic: errors must be represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Caller supplied an argument the pipeline cannot act on
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The search service could not be reached or rejected the request
    #[error("Retrieval unavailable: {0}")]
    RetrievalUnavailable(String),

    /// The search service answered with an unexpected shape
    #[error("Malformed retrieval result: {0}")]
    MalformedRetrievalResult(String),

    /// The completion service could not be reached or rejected the request
    #[error("Completion unavailable: {0}")]
    CompletionUnavailable(String),

    /// Relevance judge returned something that is not a score
    #[error("Judge error: {0}")]
    Judge(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

/// Coarse classification of an [`AppError`].
///
/// Used where an error has to be carried as data, e.g. in the tagged result
/// of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Config,
    Io,
    InvalidInput,
    RetrievalUnavailable,
    MalformedRetrievalResult,
    CompletionUnavailable,
    Judge,
    Prompt,
    Serialization,
    Other,
}

impl AppError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Config,
            Self::Io(_) => ErrorKind::Io,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::RetrievalUnavailable(_) => ErrorKind::RetrievalUnavailable,
            Self::MalformedRetrievalResult(_) => ErrorKind::MalformedRetrievalResult,
            Self::CompletionUnavailable(_) => ErrorKind::CompletionUnavailable,
            Self::Judge(_) => ErrorKind::Judge,
            Self::Prompt(_) => ErrorKind::Prompt,
            Self::Serialization(_) => ErrorKind::Serialization,
            Self::Other(_) => ErrorKind::Other,
        }
    }
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
