use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Response envelopes
// ============================================================================

/// `{message, status}` acknowledgement returned by most account endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
    pub status: u16,
}

/// `{message, status, data}` envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
    pub message: String,
    pub status: u16,
}

/// Envelope whose payload may be absent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionalEnvelope<T> {
    pub data: Option<T>,
    pub message: String,
    pub status: u16,
}

// ============================================================================
// Error type
// ============================================================================

/// Errors surfaced by API calls.
///
/// Only an expired credential on an authenticated call is handled inside the
/// client (by refreshing); everything else reaches the caller as-is.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request failed with status {status}: {message}")]
    Status {
        status: StatusCode,
        message: String,
        /// Raw JSON error body, when the server sent one
        body: Option<serde_json::Value>,
    },
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Session refresh failed: {0}")]
    RefreshFailed(Arc<ApiError>),
    #[error("Session refresh timed out after {0:?}")]
    RefreshTimeout(Duration),
    #[error("Session refresh was abandoned before it settled")]
    RefreshAbandoned,
}

impl ApiError {
    /// Build a `Status` error from a non-success response body.
    pub fn from_response(status: StatusCode, body: &[u8]) -> Self {
        let body: Option<serde_json::Value> = serde_json::from_slice(body).ok();
        let message = body
            .as_ref()
            .and_then(|b| b.get("message"))
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            });

        ApiError::Status {
            status,
            message,
            body,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status(),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    /// True when the session was lost because it could not be renewed
    pub fn is_refresh_failure(&self) -> bool {
        matches!(
            self,
            ApiError::RefreshFailed(_) | ApiError::RefreshAbandoned
        )
    }

    /// The JSON error body, if any
    pub fn body(&self) -> Option<&serde_json::Value> {
        match self {
            ApiError::Status { body, .. } => body.as_ref(),
            ApiError::RefreshFailed(inner) => inner.body(),
            _ => None,
        }
    }
}
