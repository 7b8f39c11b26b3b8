//! # mealbot-llm
//!
//! Chat-completions client used by the agent loop.
//!
//! [`Provider`] is the seam the loop depends on; [`OpenAiCompatProvider`]
//! talks to any endpoint that speaks the OpenAI `/chat/completions` format
//! with function-style tool calls.

pub mod config;
pub mod error;
pub mod openai_compat;
pub mod provider;
pub mod types;

pub use config::ProviderConfig;
pub use error::{ProviderError, Result};
pub use openai_compat::OpenAiCompatProvider;
pub use provider::Provider;
pub use types::{ChatMessage, ChatRequest, ChatResponse, Choice, FunctionCall, ToolCall, Usage};
