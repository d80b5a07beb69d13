//! Error taxonomy for the engine.
//!
//! Ingress-facing variants carry a stable machine-readable `kind` so the
//! routing layer can serialize them without inspecting the Rust type.

mod storage_error;

pub use storage_error::StorageError;

use serde::{Deserialize, Serialize};

/// Result alias used across the workspace.
pub type VigilResult<T> = Result<T, VigilError>;

/// Top-level error for all engine operations.
#[derive(Debug, thiserror::Error)]
pub enum VigilError {
    /// Malformed or unexpected payload shape. Rejected, no state change.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Missing or incorrect scheduler secret or auth token.
    #[error("auth error: {message}")]
    Auth { message: String },

    /// Quota exceeded on an ingress point.
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimit { retry_after_secs: u64 },

    /// No patient maps to the given device or contact. Never guessed.
    #[error("not found: {what}")]
    NotFound { what: String },

    /// A send-capability or other upstream call failed.
    #[error("upstream error: {message}")]
    Upstream { message: String },

    /// Missing or invalid threshold/channel configuration.
    /// Aborts the whole tick: evaluating with undefined thresholds is unsafe.
    #[error("config error: {message}")]
    Config { message: String },

    /// Persistence-layer failure.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl VigilError {
    /// Stable error kind discriminator for machine-readable responses.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::Auth { .. } => "auth",
            Self::RateLimit { .. } => "rate_limit",
            Self::NotFound { .. } => "not_found",
            Self::Upstream { .. } => "upstream",
            Self::Config { .. } => "config",
            Self::Storage(_) => "storage",
        }
    }

    /// Render the machine-readable error body returned by ingress endpoints.
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            kind: self.kind().to_string(),
            message: self.to_string(),
            retry_after_secs: match self {
                Self::RateLimit { retry_after_secs } => Some(*retry_after_secs),
                _ => None,
            },
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for VigilError {
    fn from(e: serde_json::Error) -> Self {
        Self::Validation {
            message: e.to_string(),
        }
    }
}

/// Serialized error response for ingress endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_body_carries_retry_after() {
        let err = VigilError::RateLimit {
            retry_after_secs: 42,
        };
        let body = err.to_body();
        assert_eq!(body.kind, "rate_limit");
        assert_eq!(body.retry_after_secs, Some(42));
    }

    #[test]
    fn storage_errors_keep_their_kind_through_from() {
        let err: VigilError = StorageError::Sqlite {
            message: "locked".to_string(),
        }
        .into();
        assert_eq!(err.kind(), "storage");
    }
}
