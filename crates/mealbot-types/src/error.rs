//! Error types for mealbot.
//!
//! [`MealbotError`] is the top-level error. [`ChannelError`], [`StoreError`]
//! and [`AuthError`] cover the messaging transport, the document-store
//! collaborator and the login handshake respectively.

use thiserror::Error;

/// Top-level error type.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum MealbotError {
    /// An operation exceeded its deadline.
    #[error("operation timed out: {operation}")]
    Timeout {
        /// Human-readable name of the operation that timed out.
        operation: String,
    },

    /// The language model provider returned an error.
    #[error("provider error: {message}")]
    Provider { message: String },

    /// Configuration is malformed or missing a required value.
    #[error("invalid config: {reason}")]
    ConfigInvalid { reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("auth error: {0}")]
    Auth(#[from] AuthError),
}

/// Messaging-platform transport failures.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ChannelError {
    /// Could not reach the messaging API.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The messaging API rejected our credentials.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// A reply or push was not accepted.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// The webhook signature header did not match the body.
    #[error("invalid signature")]
    InvalidSignature,

    /// The webhook body could not be parsed as an event envelope.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("{0}")]
    Other(String),
}

/// Failures from the document-store collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    /// The backend could not be reached or returned a server error.
    #[error("backend error: {0}")]
    Backend(String),

    /// A stored document did not have the expected shape.
    #[error("invalid document: {0}")]
    InvalidDocument(String),
}

/// Login and session failures.
///
/// `Authentication` covers both bad webhook signatures and unverifiable
/// session tokens. `InvalidState` and `MissingParameter` reject an OAuth
/// callback outright; the user has to start the login again.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AuthError {
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("missing parameter: {0}")]
    MissingParameter(String),

    /// The `state` value was never issued, already consumed, or expired.
    #[error("invalid or expired state")]
    InvalidState,

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("profile fetch failed: {0}")]
    ProfileFetch(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// A convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, MealbotError>;
