//! The [`Provider`] trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ChatRequest, ChatResponse};

/// Something that can answer a chat completion request.
///
/// The agent loop only ever holds an `Arc<dyn Provider>`, so tests can
/// substitute a scripted implementation.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Short provider name used in log fields.
    fn name(&self) -> &str;

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse>;
}
