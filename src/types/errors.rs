//! Application error types.
//!
//! All errors use `thiserror` for automatic Error trait derivation and provide
//! clear error messages with context. Only the storage class is fatal to an
//! invocation; every other variant is folded into a failure envelope at the
//! adapter boundary.

use thiserror::Error;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error enum for the healthcare gateway.
#[derive(Error, Debug)]
pub enum Error {
    /// Bad or missing tool argument.
    #[error("validation error: {0}")]
    Validation(String),

    /// Unknown tool or missing resource.
    #[error("not found: {0}")]
    NotFound(String),

    /// Network failure or non-2xx status from an upstream API.
    #[error("transport error: {0}")]
    Transport(String),

    /// Upstream call exceeded the configured HTTP timeout.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Upstream body could not be interpreted at all.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Cache or usage store unavailable (fatal to the current invocation).
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Storage-layer invariant broken outside of SQLite itself.
    #[error("storage error: {0}")]
    StorageState(String),

    /// Invalid configuration value.
    #[error("config error: {0}")]
    Config(String),

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Storage failures must reach the caller; everything else becomes a
    /// failure envelope.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Storage(_) | Error::StorageState(_))
    }

    /// Stable machine-readable code for logs and CLI output.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Validation(_) => "INVALID_ARGUMENT",
            Error::NotFound(_) => "NOT_FOUND",
            Error::Transport(_) => "UNAVAILABLE",
            Error::Timeout(_) => "DEADLINE_EXCEEDED",
            Error::MalformedResponse(_) => "DATA_LOSS",
            Error::Storage(_) | Error::StorageState(_) => "INTERNAL",
            Error::Config(_) => "FAILED_PRECONDITION",
            Error::Serialization(_) => "INTERNAL",
            Error::Io(_) => "INTERNAL",
        }
    }
}

// Convenience constructors
impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    pub fn storage_state(msg: impl Into<String>) -> Self {
        Self::StorageState(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout(err.to_string())
        } else if err.is_decode() {
            Error::MalformedResponse(err.to_string())
        } else {
            Error::Transport(err.to_string())
        }
    }
}
