use std::time::Duration;

use thiserror::Error;

// ── Error codes ─────────────────────────────────────────────────────
//
// Stable, machine-readable identifiers. Callers match on these (or on
// the enum variant), never on the human-readable message.

/// Stable error code constants, one per [`SessionError`] variant.
pub mod error_code {
    pub const AUTHENTICATION_REJECTED: &str = "AUTHENTICATION_REJECTED";
    pub const NOT_AUTHENTICATED: &str = "NOT_AUTHENTICATED";
    pub const SERVER_ERROR: &str = "SERVER_ERROR";
    pub const TRANSPORT_ERROR: &str = "TRANSPORT_ERROR";
    pub const TIMEOUT: &str = "TIMEOUT";
    pub const PERSISTENCE_ERROR: &str = "PERSISTENCE_ERROR";
    pub const DECODE_ERROR: &str = "DECODE_ERROR";
}

/// Message used when the server reports an error without one.
pub const FALLBACK_SERVER_MESSAGE: &str = "API request failed";

// ── StoreError ──────────────────────────────────────────────────────

/// Failure reading, writing or deleting the persisted session record.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage: {0}")]
    Storage(String),

    #[error("serialization: {0}")]
    Serialization(String),
}

// ── SessionError ────────────────────────────────────────────────────

/// Every way a session client operation can fail.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The server answered the authenticate call without a user id.
    #[error("authentication rejected: {0}")]
    AuthenticationRejected(String),

    /// An object call was attempted without a session.
    #[error("not authenticated")]
    NotAuthenticated,

    /// The JSON-RPC response carried an `error` member.
    #[error("{message}")]
    Server {
        message: String,
        code: Option<i64>,
        data: Option<serde_json::Value>,
    },

    /// Network failure: DNS, refused connection, bad HTTP status.
    #[error("transport: {0}")]
    Transport(String),

    /// The request did not complete within the configured duration.
    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The stored session record could not be read or written.
    #[error("persistence: {0}")]
    Persistence(#[from] StoreError),

    /// The response body was not the JSON shape expected.
    #[error("decode: {0}")]
    Decode(String),
}

impl SessionError {
    /// Stable, machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            SessionError::AuthenticationRejected(_) => error_code::AUTHENTICATION_REJECTED,
            SessionError::NotAuthenticated => error_code::NOT_AUTHENTICATED,
            SessionError::Server { .. } => error_code::SERVER_ERROR,
            SessionError::Transport(_) => error_code::TRANSPORT_ERROR,
            SessionError::Timeout(_) => error_code::TIMEOUT,
            SessionError::Persistence(_) => error_code::PERSISTENCE_ERROR,
            SessionError::Decode(_) => error_code::DECODE_ERROR,
        }
    }

    /// Whether repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SessionError::Timeout(_) | SessionError::Transport(_))
    }

    /// Build a server error, substituting the fallback for a missing message.
    pub fn server(message: Option<String>, code: Option<i64>, data: Option<serde_json::Value>) -> Self {
        let message = message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| FALLBACK_SERVER_MESSAGE.to_string());
        SessionError::Server { message, code, data }
    }
}

impl From<reqwest::Error> for SessionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SessionError::Decode(err.to_string())
        } else {
            SessionError::Transport(err.to_string())
        }
    }
}
