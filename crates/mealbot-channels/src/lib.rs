//! Messaging-platform plumbing for mealbot.
//!
//! Everything that talks to the LINE Messaging API lives here:
//!
//! - [`line::signature`] -- `X-Line-Signature` verification
//! - [`line::events`] -- webhook body parsing into [`InboundEvent`]s
//! - [`line::client`] -- the [`MessagingApi`] seam and its HTTP
//!   implementation [`LineClient`]
//! - [`pusher`] -- the best-effort [`NotificationPusher`]
//!
//! Failures are reported as [`ChannelError`](mealbot_types::ChannelError).

pub mod line;
pub mod pusher;

pub use line::client::{LineClient, MessagingApi};
pub use line::events::{InboundEvent, parse_events};
pub use line::signature::{SIGNATURE_HEADER, compute_signature, verify_signature};
pub use pusher::NotificationPusher;
