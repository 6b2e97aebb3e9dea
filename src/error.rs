//! Error types for the Bookshelf client

use reqwest::StatusCode;
use thiserror::Error;

/// Main client error type
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Request failed with status {status}: {body}")]
    RequestFailed { status: StatusCode, body: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unexpected response shape: {0}")]
    SchemaMismatch(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Session storage error: {0}")]
    Session(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl ClientError {
    /// True for a 401 that survived the refresh-and-retry cycle
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::RequestFailed { status, .. } if *status == StatusCode::UNAUTHORIZED)
    }

    /// HTTP status of a failed request, if any
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::RequestFailed { status, .. } => Some(*status),
            ClientError::Network(e) => e.status(),
            _ => None,
        }
    }
}

impl From<validator::ValidationErrors> for ClientError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ClientError::Validation(errors.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::SchemaMismatch(e.to_string())
    }
}

/// Result type alias for client operations
pub type ClientResult<T> = Result<T, ClientError>;
