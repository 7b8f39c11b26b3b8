//! HTTP client for the LINE Messaging API.
//!
//! [`MessagingApi`] is the seam the gateway and pusher depend on;
//! [`LineClient`] implements it over the `reply` and `push` endpoints.
//! The client is built once at startup and shared.

use std::time::Duration;

use async_trait::async_trait;
use mealbot_types::config::LineConfig;
use mealbot_types::{ChannelError, ChatIdentity, SecretString};
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use super::MAX_TEXT_CHARS;

/// Outbound messaging operations.
#[async_trait]
pub trait MessagingApi: Send + Sync {
    /// Answer an event using its single-use reply token.
    async fn reply_text(&self, reply_token: &str, text: &str) -> Result<(), ChannelError>;

    /// Send a message to a user outside of any reply window.
    async fn push_text(&self, to: &ChatIdentity, text: &str) -> Result<(), ChannelError>;
}

#[derive(Serialize)]
struct TextMessage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest<'a> {
    reply_token: &'a str,
    messages: [TextMessage<'a>; 1],
}

#[derive(Serialize)]
struct PushRequest<'a> {
    to: &'a str,
    messages: [TextMessage<'a>; 1],
}

/// Cut `text` to LINE's per-message limit on a char boundary.
fn clamp_text(text: &str) -> &str {
    match text.char_indices().nth(MAX_TEXT_CHARS) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn text_message(text: &str) -> [TextMessage<'_>; 1] {
    [TextMessage {
        kind: "text",
        text: clamp_text(text),
    }]
}

/// Messaging API client.
pub struct LineClient {
    http: Client,
    access_token: SecretString,
    /// `https://api.line.me` by default.
    base_url: String,
}

impl LineClient {
    /// Client sending `access_token` as the bearer on every call.
    pub fn new(
        access_token: SecretString,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ChannelError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChannelError::Other(e.to_string()))?;
        Ok(Self {
            http,
            access_token,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        })
    }

    /// Client from the `[line]` section with a ten second timeout.
    pub fn from_config(cfg: &LineConfig) -> Result<Self, ChannelError> {
        Self::new(
            cfg.channel_access_token.clone(),
            cfg.api_base_url.clone(),
            Duration::from_secs(10),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<T: Serialize>(&self, path: &str, body: &T) -> Result<(), ChannelError> {
        let url = format!("{}{path}", self.base_url);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(self.access_token.expose())
            .json(body)
            .send()
            .await
            .map_err(|e| ChannelError::ConnectionFailed(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let detail = resp.text().await.unwrap_or_default();
        Err(match status.as_u16() {
            401 | 403 => ChannelError::AuthFailed(format!("HTTP {status}: {detail}")),
            _ => ChannelError::SendFailed(format!("HTTP {status}: {detail}")),
        })
    }
}

#[async_trait]
impl MessagingApi for LineClient {
    async fn reply_text(&self, reply_token: &str, text: &str) -> Result<(), ChannelError> {
        debug!("sending reply");
        self.post(
            "/v2/bot/message/reply",
            &ReplyRequest {
                reply_token,
                messages: text_message(text),
            },
        )
        .await
    }

    async fn push_text(&self, to: &ChatIdentity, text: &str) -> Result<(), ChannelError> {
        debug!(chat_identity = %to, "sending push");
        self.post(
            "/v2/bot/message/push",
            &PushRequest {
                to: to.as_str(),
                messages: text_message(text),
            },
        )
        .await
    }
}

impl std::fmt::Debug for LineClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineClient")
            .field("base_url", &self.base_url)
            .field("access_token", &self.access_token)
            .finish()
    }
}
