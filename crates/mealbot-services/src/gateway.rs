//! Webhook intake.
//!
//! Every verified event gets exactly one reply through its reply token:
//! a login link for identities that are not registered yet, or a
//! placeholder for registered ones whose real answer is handed to the
//! [`Dispatcher`] and pushed later.

use std::sync::Arc;

use mealbot_auth::IdentityResolver;
use mealbot_channels::{InboundEvent, MessagingApi, parse_events, verify_signature};
use mealbot_types::config::GatewayConfig;
use mealbot_types::{ChannelError, ChatIdentity, MealbotError, RegistrationStatus, SecretString};
use tracing::{debug, info, warn};
use url::Url;

use crate::dispatch::{DeferredReply, Dispatcher, Rejected};

/// Immediate reply to a registered user while the agent works.
pub const PLACEHOLDER_REPLY: &str = "⏳ กำลังคิดคำตอบ...";
/// Reply to stickers, images and other non-text messages.
pub const NON_TEXT_REPLY: &str = "ผมตอบได้เฉพาะข้อความตัวอักษรนะครับ 😊";
/// Reply when the profile store fails or the dispatcher is shutting down.
pub const UNAVAILABLE_REPLY: &str = "⚠️ ระบบขัดข้องชั่วคราว กรุณาลองใหม่อีกครั้งนะครับ";
/// Reply when the user already has a full queue of unanswered messages.
pub const BUSY_REPLY: &str = "⏳ ยังตอบข้อความก่อนหน้าไม่เสร็จ รอสักครู่แล้วส่งใหม่นะครับ";

/// Verifies, classifies and answers inbound webhook events.
pub struct WebhookGateway {
    channel_secret: SecretString,
    api: Arc<dyn MessagingApi>,
    resolver: IdentityResolver,
    dispatcher: Dispatcher,
    login_url: Url,
}

impl WebhookGateway {
    /// Gateway verifying with `channel_secret` and replying through `api`.
    ///
    /// The login link sent to unregistered users is built from
    /// `gateway.public_base_url`; an unparsable URL is a config error.
    pub fn new(
        channel_secret: SecretString,
        api: Arc<dyn MessagingApi>,
        resolver: IdentityResolver,
        dispatcher: Dispatcher,
        gateway: &GatewayConfig,
    ) -> Result<Self, MealbotError> {
        let login_url =
            Url::parse(&gateway.route_url("/auth/line")).map_err(|e| MealbotError::ConfigInvalid {
                reason: format!("gateway.public_base_url: {e}"),
            })?;
        Ok(Self {
            channel_secret,
            api,
            resolver,
            dispatcher,
            login_url,
        })
    }

    /// Login link sent to an unregistered chat identity.
    pub fn login_link(&self, identity: &ChatIdentity) -> Url {
        let mut url = self.login_url.clone();
        url.query_pairs_mut()
            .append_pair("origin", "chat")
            .append_pair("user_id", identity.as_str());
        url
    }

    /// Verify `body` against `signature` and answer every event in it.
    ///
    /// Returns the number of events handled. Only a bad signature or a
    /// body that is not an event envelope is an error; per-event failures
    /// are logged.
    pub async fn handle(&self, body: &[u8], signature: Option<&str>) -> Result<usize, ChannelError> {
        let signature = signature.ok_or(ChannelError::InvalidSignature)?;
        if !verify_signature(self.channel_secret.expose(), body, signature) {
            warn!("webhook signature mismatch");
            return Err(ChannelError::InvalidSignature);
        }

        let events = parse_events(body)?;
        debug!(count = events.len(), "webhook events accepted");
        for event in &events {
            self.handle_event(event).await;
        }
        Ok(events.len())
    }

    async fn handle_event(&self, event: &InboundEvent) {
        let reply = match event {
            InboundEvent::NonText { kind, .. } => {
                debug!(kind = %kind, "non-text message");
                NON_TEXT_REPLY.to_owned()
            }
            InboundEvent::Text { sender, text, .. } => self.classify_text(sender, text).await,
        };

        if let Err(e) = self.api.reply_text(event.reply_token(), &reply).await {
            warn!(error = %e, "webhook reply failed");
        }
    }

    async fn classify_text(&self, sender: &ChatIdentity, text: &str) -> String {
        match self.resolver.resolve(sender).await {
            Ok(RegistrationStatus::Registered(profile)) => {
                let queued = self.dispatcher.enqueue(DeferredReply {
                    identity: sender.clone(),
                    text: text.to_owned(),
                    profile: Some(profile),
                });
                match queued {
                    Ok(()) => PLACEHOLDER_REPLY.to_owned(),
                    Err(Rejected::QueueFull) => BUSY_REPLY.to_owned(),
                    Err(Rejected::ShuttingDown) => UNAVAILABLE_REPLY.to_owned(),
                }
            }
            Ok(_) => {
                info!(chat_identity = %sender, "unregistered sender, sending login link");
                format!("🔐 กรุณา Login ก่อนใช้งาน\n{}", self.login_link(sender))
            }
            Err(e) => {
                warn!(chat_identity = %sender, error = %e, "identity lookup failed");
                UNAVAILABLE_REPLY.to_owned()
            }
        }
    }
}
