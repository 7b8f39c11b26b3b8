//! The bounded plan/act/observe loop.
//!
//! Each model call is one iteration. A response without tool calls is the
//! final answer; otherwise every requested call is dispatched through the
//! [`ToolRegistry`], the results are appended to the request, and the loop
//! goes round again. Running out of iterations or wall-clock time ends the
//! run with [`LoopOutcome::ForcedTermination`].

use std::sync::Arc;

use async_trait::async_trait;
use mealbot_llm::{ChatMessage, ChatRequest, Provider};
use mealbot_types::{ChatIdentity, Profile};
use tracing::{debug, info, warn};

use super::memory::{ConversationMemory, MemoryCache};
use super::prompt::build_messages;
use super::{LoopSettings, ReplyAgent};
use crate::tools::registry::ToolRegistry;

/// Reply to a blank message; the model is not called.
pub const EMPTY_MESSAGE_REPLY: &str = "⚠️ กรุณาพิมพ์ข้อความก่อนนะครับ";

/// Reply when a run ends without any usable text.
pub const UNABLE_TO_COMPLETE_REPLY: &str =
    "ขออภัยครับ ตอนนี้ยังดำเนินการให้ไม่สำเร็จ กรุณาลองใหม่อีกครั้งนะครับ";

/// How a loop run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum LoopOutcome {
    /// The model produced a final answer.
    Answer(String),

    /// The iteration or time budget ran out. `partial` is the last text
    /// the model produced alongside a tool call, if any.
    ForcedTermination { partial: Option<String> },

    /// The model call itself failed.
    Failed { reason: String },
}

impl LoopOutcome {
    /// User-facing text. Never empty.
    pub fn into_reply(self) -> String {
        match self {
            LoopOutcome::Answer(text) if !text.trim().is_empty() => text,
            LoopOutcome::ForcedTermination {
                partial: Some(text),
            } if !text.trim().is_empty() => text,
            LoopOutcome::Failed { reason } => format!("⚠️ ขออภัย เกิดข้อผิดพลาด: {reason}"),
            _ => UNABLE_TO_COMPLETE_REPLY.to_owned(),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            LoopOutcome::Answer(_) => "answer",
            LoopOutcome::ForcedTermination { .. } => "forced_termination",
            LoopOutcome::Failed { .. } => "failed",
        }
    }
}

/// Runs the ordering assistant for one chat message at a time per identity.
///
/// Each run sends the system prompt, the identity's memory window, the new
/// message and the customer profile to the model, then alternates between
/// model calls and tool calls until the model answers or a budget runs out.
pub struct AgentLoop {
    provider: Arc<dyn Provider>,
    tools: Arc<ToolRegistry>,
    memory: MemoryCache,
    settings: LoopSettings,
}

impl AgentLoop {
    /// Loop over `provider` with access to every tool in `tools`.
    pub fn new(
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        memory: MemoryCache,
        settings: LoopSettings,
    ) -> Self {
        Self {
            provider,
            tools,
            memory,
            settings,
        }
    }

    /// Conversation memory shared by every run of this loop.
    pub fn memory(&self) -> &MemoryCache {
        &self.memory
    }

    /// Budgets and model parameters.
    pub fn settings(&self) -> &LoopSettings {
        &self.settings
    }

    /// Answer `message` from `identity` and record the exchange.
    ///
    /// Holds the identity's memory lock for the whole run, so concurrent
    /// messages from one identity are answered one after another while its
    /// memory stays cached. A handle evicted mid-run is put back afterwards.
    pub async fn run(
        &self,
        identity: &ChatIdentity,
        message: &str,
        profile: Option<&Profile>,
    ) -> String {
        let message = message.trim();
        if message.is_empty() {
            return EMPTY_MESSAGE_REPLY.to_owned();
        }

        let handle = self.memory.handle(identity).await;
        let mut memory = handle.lock().await;

        let outcome = self.run_bounded(&memory, message, profile).await;
        info!(chat_identity = %identity, outcome = outcome.label(), "agent loop finished");
        if let LoopOutcome::Failed { reason } = &outcome {
            warn!(chat_identity = %identity, error = %reason, "agent loop failed");
        }

        let reply = outcome.into_reply();
        memory.push(message, reply.clone());
        self.memory.keep(identity, &handle).await;
        reply
    }

    /// One run under the wall-clock timeout. A timeout counts as forced
    /// termination and keeps whatever partial text was produced.
    pub async fn run_bounded(
        &self,
        memory: &ConversationMemory,
        message: &str,
        profile: Option<&Profile>,
    ) -> LoopOutcome {
        let mut partial = None;
        let result = tokio::time::timeout(
            self.settings.timeout,
            self.run_loop(memory, message, profile, &mut partial),
        )
        .await;

        match result {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(
                    timeout_secs = self.settings.timeout.as_secs(),
                    "agent loop timed out"
                );
                LoopOutcome::ForcedTermination { partial }
            }
        }
    }

    async fn run_loop(
        &self,
        memory: &ConversationMemory,
        message: &str,
        profile: Option<&Profile>,
        partial: &mut Option<String>,
    ) -> LoopOutcome {
        let mut request = ChatRequest::new(
            self.settings.model.clone(),
            build_messages(memory.exchanges(), message, profile),
        );
        request.max_tokens = Some(self.settings.max_tokens);
        request.temperature = Some(self.settings.temperature);
        request.tools = self.tools.schemas();

        for iteration in 0..self.settings.max_iterations {
            let response = match self.provider.complete(&request).await {
                Ok(r) => r,
                Err(e) => {
                    return LoopOutcome::Failed {
                        reason: e.to_string(),
                    };
                }
            };
            let Some(reply) = response.message() else {
                return LoopOutcome::Failed {
                    reason: "empty model response".into(),
                };
            };

            let calls = reply.requested_calls().to_vec();
            if calls.is_empty() {
                debug!(iteration, "tool loop complete, returning text response");
                return LoopOutcome::Answer(reply.content.clone());
            }

            if !reply.content.trim().is_empty() {
                *partial = Some(reply.content.clone());
            }
            debug!(iteration, tool_count = calls.len(), "executing tool calls");

            request
                .messages
                .push(ChatMessage::assistant_tool_calls(reply.content.clone(), calls.clone()));
            for call in calls {
                let result = self
                    .tools
                    .invoke(&call.function.name, &call.function.arguments)
                    .await;
                request
                    .messages
                    .push(ChatMessage::tool_result(call.id, result.to_content()));
            }
        }

        warn!(
            max_iterations = self.settings.max_iterations,
            "iteration budget exhausted without a final answer"
        );
        LoopOutcome::ForcedTermination {
            partial: partial.clone(),
        }
    }
}

#[async_trait]
impl ReplyAgent for AgentLoop {
    async fn reply(
        &self,
        identity: &ChatIdentity,
        message: &str,
        profile: Option<&Profile>,
    ) -> String {
        self.run(identity, message, profile).await
    }
}
