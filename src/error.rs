//! Error types for header-session.

use thiserror::Error;

/// Main error type for session operations.
#[derive(Error, Debug)]
pub enum SessionError {
    /// A session identifier was required but missing or empty.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// The backing key/value store reported a failure.
    #[error("store error: {0}")]
    Store(String),

    /// An administrative operation was invoked while disabled.
    #[error("operation not permitted: {0}")]
    OperationNotPermitted(&'static str),

    /// Session data could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The store connection was closed by `disconnect`.
    #[error("store connection closed")]
    ConnectionClosed,

    /// Session configuration is unusable.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SessionError {
    /// Whether this error originated in the store rather than the caller.
    pub fn is_store_error(&self) -> bool {
        matches!(self, Self::Store(_) | Self::ConnectionClosed)
    }
}

impl From<redis::RedisError> for SessionError {
    fn from(err: redis::RedisError) -> Self {
        Self::Store(err.to_string())
    }
}

/// Convenience Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
