//! Provider error types.

use thiserror::Error;

/// Errors from a chat-completions call.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The provider answered with a non-success status.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// HTTP 401/403.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// HTTP 429.
    #[error("rate limited: retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// No API key was configured.
    #[error("provider not configured: {0}")]
    NotConfigured(String),

    /// The body was not a chat completion.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("timeout")]
    Timeout,

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ProviderError>;

impl From<ProviderError> for mealbot_types::MealbotError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Timeout => mealbot_types::MealbotError::Timeout {
                operation: "chat_completion".into(),
            },
            other => mealbot_types::MealbotError::Provider {
                message: other.to_string(),
            },
        }
    }
}
