//! Error types for the SwarmHub client

use http::StatusCode;
use thiserror::Error;

/// Main error type for the SwarmHub client
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Server returned {status}: {body}")]
    ServerError { status: StatusCode, body: String },

    /// The server answered 200 but refused the command
    #[error("Rejected by server: {0}")]
    Rejected(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ClientError {
    /// Whether the failure came from the network or the server, as opposed to
    /// a local check. Network failures are worth retrying.
    pub fn is_network(&self) -> bool {
        matches!(self, ClientError::HttpError(_) | ClientError::ServerError { .. })
    }
}
