//! Centralized error types for gmail-query.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the gmail-query library.
#[derive(Error, Debug)]
pub enum QueryError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A message is missing the fields required for thread grouping.
    ///
    /// Consolidation is atomic: one malformed message fails the whole call.
    #[error("Malformed thread data for message '{message_id}': {reason}")]
    MalformedThread { message_id: String, reason: String },

    /// A configured rule pattern failed to compile.
    ///
    /// Surfaced before any matching so a broken rule never silently
    /// misroutes mail.
    #[error("Invalid pattern '{pattern}' in rule set '{rule}': {source}")]
    InvalidRule {
        rule: String,
        pattern: String,
        source: regex::Error,
    },

    /// The rules file could not be read or parsed.
    #[error("Invalid rules file '{path}': {reason}")]
    InvalidRules { path: PathBuf, reason: String },

    /// The stored credentials file could not be read or parsed,
    /// or the API rejected the token.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// A network-level failure talking to the Gmail API.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The Gmail API returned a non-success status.
    #[error("Gmail API returned {status}: {body}")]
    Api { status: u16, body: String },

    /// The Gmail API returned a response we could not interpret.
    #[error("Malformed API response: {0}")]
    MalformedResponse(String),
}

/// Convenience alias for `Result<T, QueryError>`.
pub type Result<T> = std::result::Result<T, QueryError>;

impl QueryError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Allow `?` on `std::io::Error` inside functions returning `QueryError`
/// when no path context is available (rare — prefer `QueryError::io`).
impl From<std::io::Error> for QueryError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}
