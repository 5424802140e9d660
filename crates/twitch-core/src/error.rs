//! Crate error types.

use thiserror::Error;

/// Crate-specific result type.
pub type Result<T> = std::result::Result<T, TwitchCoreError>;

/// Errors that can occur during credential or connection management.
#[derive(Error, Debug)]
pub enum TwitchCoreError {
    /// Transport-level or non-2xx HTTP failure
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body decode failure
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Credential file IO failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Credential persistence failure
    #[error("store error: {0}")]
    Store(String),

    /// Per-channel agent start failure
    #[error("agent error: {0}")]
    Agent(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl TwitchCoreError {
    /// Create a store error.
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create an agent error.
    pub fn agent(msg: impl Into<String>) -> Self {
        Self::Agent(msg.into())
    }

    /// Create a generic error.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Check if this error is transient and may be retried by the caller.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Store(_) | Self::Agent(_))
    }
}
