//! # mealbot-services
//!
//! The server side of mealbot.
//!
//! - [`gateway`] -- signature check and the one synchronous reply per
//!   webhook event
//! - [`dispatch`] -- per-identity queues that run the agent and push its
//!   answer
//! - [`api`] -- axum routes for the webhook, login, registration, current
//!   user and order notifications
//! - [`error`] -- [`ApiError`] and its HTTP mapping

pub mod api;
pub mod dispatch;
pub mod error;
pub mod gateway;

pub use api::{AppState, Links, build_router};
pub use dispatch::{DeferredReply, Dispatcher, Rejected};
pub use error::ApiError;
pub use gateway::WebhookGateway;
