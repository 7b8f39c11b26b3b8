//! LINE webhook event types.
//!
//! A webhook body is an envelope `{ "destination": ..., "events": [...] }`.
//! Each event is decoded on its own so one unfamiliar event cannot make
//! the rest of the batch unreadable. Only message events with a reply
//! token are surfaced; follows, postbacks, unsends and anything newer
//! than this code are dropped.

use mealbot_types::{ChannelError, ChatIdentity};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    events: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    reply_token: Option<String>,
    #[serde(default)]
    source: Option<RawSource>,
    #[serde(default)]
    message: Option<RawMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSource {
    #[serde(default)]
    user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(rename = "type")]
    message_type: String,
    #[serde(default)]
    text: Option<String>,
}

/// A webhook event this service acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// A text message from an identifiable user.
    Text {
        reply_token: String,
        sender: ChatIdentity,
        text: String,
    },

    /// A sticker, image, location or other non-text message.
    NonText {
        reply_token: String,
        sender: Option<ChatIdentity>,
        kind: String,
    },
}

impl InboundEvent {
    /// Single-use token for answering this event with a reply call.
    pub fn reply_token(&self) -> &str {
        match self {
            InboundEvent::Text { reply_token, .. } | InboundEvent::NonText { reply_token, .. } => {
                reply_token
            }
        }
    }
}

/// Parse a verified webhook body.
///
/// Fails only if the body is not a JSON envelope; individual events that
/// do not match a known shape are skipped.
pub fn parse_events(body: &[u8]) -> Result<Vec<InboundEvent>, ChannelError> {
    let envelope: Envelope =
        serde_json::from_slice(body).map_err(|e| ChannelError::MalformedPayload(e.to_string()))?;

    Ok(envelope
        .events
        .into_iter()
        .filter_map(|raw| match serde_json::from_value::<RawEvent>(raw) {
            Ok(event) => classify(event),
            Err(e) => {
                debug!(error = %e, "skipping unrecognised webhook event");
                None
            }
        })
        .collect())
}

fn classify(event: RawEvent) -> Option<InboundEvent> {
    if event.event_type != "message" {
        debug!(event_type = %event.event_type, "ignoring non-message event");
        return None;
    }
    let reply_token = event.reply_token.filter(|t| !t.is_empty())?;
    let sender = event
        .source
        .and_then(|s| s.user_id)
        .filter(|id| !id.is_empty())
        .map(ChatIdentity::new);
    let message = event.message?;

    match (message.message_type.as_str(), message.text, sender) {
        ("text", Some(text), Some(sender)) => Some(InboundEvent::Text {
            reply_token,
            sender,
            text,
        }),
        ("text", _, None) => {
            debug!("ignoring text message without a user id");
            None
        }
        (kind, _, sender) => Some(InboundEvent::NonText {
            reply_token,
            sender,
            kind: kind.to_owned(),
        }),
    }
}
