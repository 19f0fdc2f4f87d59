//! Error types for the remote API crate.

use thiserror::Error;

use seniorlink_core::sync::{classify_http_status, RemoteFailure, SyncRetryClass};

/// Result type alias for remote API operations.
pub type Result<T> = std::result::Result<T, RemoteApiError>;

/// Errors that can occur while talking to the hosted database.
#[derive(Debug, Error)]
pub enum RemoteApiError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error response from the server
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Missing or malformed API token
    #[error("Authentication error: {0}")]
    Auth(String),
}

impl RemoteApiError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    /// HTTP status if this is an API error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Classify error for retry policy.
    pub fn retry_class(&self) -> SyncRetryClass {
        match self {
            Self::Api { status, .. } => classify_http_status(*status),
            Self::Http(_) => SyncRetryClass::Retryable,
            Self::Json(_) => SyncRetryClass::Retryable,
            Self::InvalidRequest(_) => SyncRetryClass::Permanent,
            Self::Auth(_) => SyncRetryClass::ReauthRequired,
        }
    }
}

impl From<RemoteApiError> for RemoteFailure {
    fn from(err: RemoteApiError) -> Self {
        match err {
            RemoteApiError::Api { status, message } => RemoteFailure::from_status(status, message),
            RemoteApiError::Http(e) if e.is_timeout() => RemoteFailure::TimedOut,
            RemoteApiError::Http(e) => RemoteFailure::unreachable(e.to_string()),
            // A body we cannot read usually comes from a proxy or captive portal.
            RemoteApiError::Json(e) => RemoteFailure::Server {
                status: 502,
                message: format!("Malformed response: {}", e),
            },
            RemoteApiError::InvalidRequest(message) => RemoteFailure::Rejected {
                status: 400,
                message,
            },
            RemoteApiError::Auth(message) => RemoteFailure::Rejected {
                status: 401,
                message,
            },
        }
    }
}
