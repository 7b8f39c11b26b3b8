//! Agent loop, memory and prompt.

pub mod loop_core;
pub mod memory;
pub mod prompt;

use std::time::Duration;

use async_trait::async_trait;
use mealbot_types::config::AgentConfig;
use mealbot_types::{ChatIdentity, Profile};

/// Produces the final reply text for one inbound chat message.
///
/// Implementations never fail: every failure is folded into the reply,
/// because by the time this runs the only way to reach the user is a push.
#[async_trait]
pub trait ReplyAgent: Send + Sync {
    /// Reply to `message` from `identity`. `profile` is the sender's
    /// registered profile, if any, and is given to the model as context.
    async fn reply(&self, identity: &ChatIdentity, message: &str, profile: Option<&Profile>)
    -> String;
}

/// Limits and model parameters for one loop run.
#[derive(Debug, Clone)]
pub struct LoopSettings {
    /// Model name sent with every completion request.
    pub model: String,
    /// Completion token cap per model call.
    pub max_tokens: i32,
    pub temperature: f64,
    /// Model calls allowed per run, at least one.
    ///
    /// A run that is still calling tools when this runs out ends in
    /// [`LoopOutcome::ForcedTermination`](loop_core::LoopOutcome).
    pub max_iterations: u32,
    /// Wall-clock budget for the whole run, tool calls included.
    pub timeout: Duration,
}

impl LoopSettings {
    /// Settings from the `[agent]` section. Zero iterations or a zero
    /// timeout are raised to one.
    pub fn from_config(cfg: &AgentConfig) -> Self {
        Self {
            model: cfg.model.clone(),
            max_tokens: cfg.max_tokens,
            temperature: cfg.temperature,
            max_iterations: cfg.max_iterations.max(1),
            timeout: Duration::from_secs(cfg.loop_timeout_secs.max(1)),
        }
    }
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self::from_config(&AgentConfig::default())
    }
}
