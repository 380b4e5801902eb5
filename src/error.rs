//! Client Error Types
//!
//! Errors raised while pulling snapshots, consuming the push stream and
//! submitting mutations. None of them is fatal to the live view: callers
//! log them and keep the previous render.

use thiserror::Error;

/// Errors that can occur while talking to the population server
#[derive(Error, Debug)]
pub enum PadronError {
    /// The request could not complete (connection refused, reset, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// The body was not valid JSON or did not have the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// Client-side precondition failed; nothing was sent
    #[error("Validation error: {0}")]
    Validation(String),

    /// The server answered a read request with a non-success status
    #[error("Server returned {status}: {body}")]
    Status { status: u16, body: String },
}

impl PadronError {
    /// Whether this error came from the transport rather than the payload
    pub fn is_network(&self) -> bool {
        matches!(self, PadronError::Network(_) | PadronError::Status { .. })
    }
}

impl From<serde_json::Error> for PadronError {
    fn from(err: serde_json::Error) -> Self {
        PadronError::Parse(err.to_string())
    }
}

impl From<reqwest::Error> for PadronError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            PadronError::Parse(err.to_string())
        } else if err.is_timeout() {
            PadronError::Network(format!("request timed out: {}", err))
        } else if err.is_connect() {
            PadronError::Network(format!("server unavailable: {}", err))
        } else {
            PadronError::Network(err.to_string())
        }
    }
}

/// Result type for client operations
pub type PadronResult<T> = Result<T, PadronError>;
