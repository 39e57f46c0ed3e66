//! API request and response types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::session::Session;

/// Session as returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    /// Session identifier, identical to the response header value.
    pub sid: String,
    /// Stored session data, including `sid`.
    pub data: Map<String, Value>,
}

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        Self {
            sid: session.sid().to_string(),
            data: session.into_data().into_map(),
        }
    }
}

/// Response listing stored session identifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListSessionsResponse {
    /// Session identifiers.
    pub sids: Vec<String>,
    /// Total count.
    pub count: usize,
}

/// Error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message.
    pub error: String,
    /// Error code.
    pub code: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", msg)
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", msg)
    }

    pub fn store_unavailable(msg: impl Into<String>) -> Self {
        Self::new("STORE_UNAVAILABLE", msg)
    }

    pub fn internal_error(msg: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", msg)
    }
}
