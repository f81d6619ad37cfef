//! Error Types
//!
//! This module defines the error taxonomy for the sync core.
//!
//! # Error Categories
//!
//! - `NetworkError` - typed transport/backend failures returned by the gateway
//! - `MalformedPayloadError` - inbound webhook payloads that cannot be parsed
//! - `ClientError` - the umbrella error returned by registry and session
//!   operations
//!
//! Gateway failures are always returned as values, never panicked across the
//! boundary; the registry turns send failures into per-message delivery
//! markers instead of erroring the whole operation.

use thiserror::Error;

/// Typed network failure surfaced by gateway operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// The request exceeded the configured timeout ceiling.
    #[error("request timed out")]
    Timeout,

    /// The backend rejected the bearer token (HTTP 401/403).
    #[error("unauthorized")]
    Unauthorized,

    /// The backend answered with a non-success status code.
    #[error("server error: HTTP {0}")]
    ServerError(u16),

    /// Connection or DNS failure before any response arrived.
    #[error("backend unreachable")]
    Unreachable,
}

impl NetworkError {
    /// Whether a read-only operation may be retried after this failure.
    ///
    /// Client errors (4xx) are permanent; timeouts, connection failures and
    /// 5xx responses are transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            NetworkError::Timeout | NetworkError::Unreachable => true,
            NetworkError::ServerError(code) => *code >= 500,
            NetworkError::Unauthorized => false,
        }
    }
}

/// An inbound webhook payload that could not be parsed or validated.
///
/// These are dropped and logged by the ingestion path; they never abort it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("malformed payload: {reason}")]
pub struct MalformedPayloadError {
    /// What was missing or unparseable.
    pub reason: String,
}

impl MalformedPayloadError {
    /// Create a new malformed-payload error
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Errors returned by registry and session operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network failure from the gateway
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// Dropped inbound payload
    #[error(transparent)]
    MalformedPayload(#[from] MalformedPayloadError),

    /// Input rejected before any network call
    #[error("validation error in field '{field}': {reason}")]
    Validation {
        /// The field that failed validation
        field: String,
        /// Human-readable error message
        reason: String,
    },

    /// Local cache failure
    #[error("local store error: {0}")]
    Store(#[from] sqlx::Error),

    /// No conversation resolves to the given reference
    #[error("unknown conversation: {0}")]
    UnknownConversation(String),

    /// No message resolves to the given reference
    #[error("unknown message: {0}")]
    UnknownMessage(String),

    /// The operation requires a logged-in user, or its result belonged to a
    /// session that has since been torn down
    #[error("no active session")]
    NoActiveSession,
}

impl ClientError {
    /// Create a new validation error
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
