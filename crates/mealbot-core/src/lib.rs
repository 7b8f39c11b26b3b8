//! # mealbot-core
//!
//! The bounded plan/act/observe loop that turns a chat message into a
//! reply.
//!
//! - [`agent`] -- [`AgentLoop`], [`LoopOutcome`], per-identity
//!   [`ConversationMemory`] and prompt assembly
//! - [`tools`] -- the [`Tool`] contract and [`ToolRegistry`] dispatch

pub mod agent;
pub mod tools;

pub use agent::loop_core::{AgentLoop, LoopOutcome};
pub use agent::memory::{ConversationMemory, Exchange, MemoryCache};
pub use agent::{LoopSettings, ReplyAgent};
pub use tools::registry::{Tool, ToolError, ToolRegistry, ToolResult, parse_args};
