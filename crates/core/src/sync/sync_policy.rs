//! Failure classification for remote calls made by gateways and the orchestrator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Retry policy classification for remote failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncRetryClass {
    Retryable,
    Permanent,
    ReauthRequired,
}

/// Why a remote call did not produce a usable response.
///
/// Every variant degrades a gateway call to the Local Store; the tag only
/// drives logging and the bookkeeping recorded on queue items.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RemoteFailure {
    /// No connection could be made (offline, DNS, refused).
    #[error("remote unreachable: {message}")]
    Unreachable { message: String },

    /// The deadline elapsed before a response arrived.
    #[error("remote call timed out")]
    TimedOut,

    /// The server answered with a 5xx or otherwise transient status.
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// The server rejected the request (4xx, validation, auth).
    #[error("rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The addressed record does not exist remotely.
    #[error("not found: {message}")]
    NotFound { message: String },
}

impl RemoteFailure {
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::Unreachable {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Builds a failure from an HTTP status and message.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            404 => Self::NotFound { message },
            _ => match classify_http_status(status) {
                SyncRetryClass::Retryable => Self::Server { status, message },
                SyncRetryClass::Permanent | SyncRetryClass::ReauthRequired => {
                    Self::Rejected { status, message }
                }
            },
        }
    }

    pub fn retry_class(&self) -> SyncRetryClass {
        match self {
            Self::Unreachable { .. } | Self::TimedOut | Self::Server { .. } => {
                SyncRetryClass::Retryable
            }
            Self::Rejected { status, .. } => classify_http_status(*status),
            Self::NotFound { .. } => SyncRetryClass::Permanent,
        }
    }

    /// Stable short code persisted as `last_error_code` on queue items.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unreachable { .. } => "unreachable",
            Self::TimedOut => "timed_out",
            Self::Server { .. } => "server_error",
            Self::Rejected { .. } => "rejected",
            Self::NotFound { .. } => "not_found",
        }
    }

    pub fn is_transient(&self) -> bool {
        self.retry_class() == SyncRetryClass::Retryable
    }
}

/// Classify HTTP status into retry behavior.
pub fn classify_http_status(status: u16) -> SyncRetryClass {
    match status {
        401 | 403 => SyncRetryClass::ReauthRequired,
        408 | 409 | 423 | 425 | 429 => SyncRetryClass::Retryable,
        500..=599 => SyncRetryClass::Retryable,
        _ => SyncRetryClass::Permanent,
    }
}
