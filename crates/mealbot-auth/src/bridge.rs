//! LINE Login flow.
//!
//! `start_login` parks the origin and chat identity in the
//! [`CorrelationStore`] under a fresh `state` token and sends the user to
//! the provider. `complete_login` takes the callback, consumes that state
//! exactly once, exchanges the code, fetches the provider profile and
//! decides between a provisional token (new user, registration pending)
//! and a full session.

use std::sync::Arc;

use mealbot_channels::NotificationPusher;
use mealbot_types::config::{GatewayConfig, LineConfig};
use mealbot_types::{
    AuthError, ChatIdentity, MealbotError, Origin, ProfilePatch, RegistrationStatus,
};
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::correlation::CorrelationStore;
use crate::line_login::{IdentityProvider, ProviderProfile};
use crate::resolver::IdentityResolver;
use crate::session::SessionTokenIssuer;

/// Scope requested from LINE Login.
pub const LOGIN_SCOPE: &str = "profile openid email";

/// Query parameters of the provider's redirect back to us.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    /// Authorization code to exchange for an access token.
    pub code: Option<String>,
    /// The correlation token handed out by `start_login`.
    pub state: Option<String>,
    /// Set by the provider when the user declined or the request failed.
    pub error: Option<String>,
    /// Human-readable detail for `error`; only logged.
    pub error_description: Option<String>,
}

/// Result of a completed login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// First login for this identity; the token is provisional and only
    /// opens the registration form.
    NeedsRegistration {
        /// Provisional session token.
        token: String,
        /// Identity the registration form will update.
        identity: ChatIdentity,
    },

    /// A full session.
    LoggedIn {
        /// Full session token.
        token: String,
        /// Origin recorded when the login started.
        origin: Origin,
        /// Identity the session belongs to.
        identity: ChatIdentity,
    },
}

/// Fixed parts of the authorization request.
#[derive(Debug, Clone)]
pub struct LoginSettings {
    /// Provider authorization endpoint the user is redirected to.
    pub authorize_url: Url,
    /// LINE Login channel id, sent as `client_id`.
    pub client_id: String,
    /// Our callback URL; must match the one registered with the channel.
    pub redirect_uri: String,
}

impl LoginSettings {
    /// Settings from `[line]` plus the callback URL derived from `[gateway]`.
    ///
    /// Fails if `line.authorize_url` does not parse.
    pub fn from_config(line: &LineConfig, gateway: &GatewayConfig) -> Result<Self, MealbotError> {
        let authorize_url =
            Url::parse(&line.authorize_url).map_err(|e| MealbotError::ConfigInvalid {
                reason: format!("line.authorize_url: {e}"),
            })?;
        Ok(Self {
            authorize_url,
            client_id: line.login_channel_id.clone(),
            redirect_uri: gateway.callback_url(),
        })
    }
}

/// Drives the authorization-code exchange with LINE Login.
///
/// Holds no per-login state of its own; everything between the redirect
/// and the callback lives in the [`CorrelationStore`].
pub struct OAuthBridge {
    settings: LoginSettings,
    correlation: Arc<CorrelationStore>,
    provider: Arc<dyn IdentityProvider>,
    resolver: IdentityResolver,
    sessions: Arc<SessionTokenIssuer>,
    pusher: NotificationPusher,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn welcome_text(profile: &ProviderProfile) -> String {
    format!(
        "🎉 เข้าสู่ระบบเรียบร้อยแล้ว\nยินดีต้อนรับคุณ {}",
        profile.display_name
    )
}

impl OAuthBridge {
    /// Wire the bridge to its collaborators. `pusher` sends the welcome
    /// message after a chat-initiated login.
    pub fn new(
        settings: LoginSettings,
        correlation: Arc<CorrelationStore>,
        provider: Arc<dyn IdentityProvider>,
        resolver: IdentityResolver,
        sessions: Arc<SessionTokenIssuer>,
        pusher: NotificationPusher,
    ) -> Self {
        Self {
            settings,
            correlation,
            provider,
            resolver,
            sessions,
            pusher,
        }
    }

    /// Authorization URL for a new login.
    pub fn start_login(&self, origin: Origin, chat_identity: Option<ChatIdentity>) -> Url {
        let state = self.correlation.create(origin, chat_identity);

        let mut url = self.settings.authorize_url.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.settings.client_id)
            .append_pair("redirect_uri", &self.settings.redirect_uri)
            .append_pair("state", &state)
            .append_pair("scope", LOGIN_SCOPE);

        debug!(origin = %origin, "started login flow");
        url
    }

    /// Finish a login from the provider's callback parameters.
    pub async fn complete_login(&self, params: &CallbackParams) -> Result<LoginOutcome, AuthError> {
        if let Some(error) = non_blank(&params.error) {
            let detail = non_blank(&params.error_description).unwrap_or(error);
            return Err(AuthError::MissingParameter(format!(
                "provider returned an error: {detail}"
            )));
        }
        let code = non_blank(&params.code).ok_or_else(|| AuthError::MissingParameter("code".into()))?;
        let state =
            non_blank(&params.state).ok_or_else(|| AuthError::MissingParameter("state".into()))?;

        let record = self
            .correlation
            .consume(state)
            .ok_or(AuthError::InvalidState)?;

        let access_token = self.provider.exchange_code(code).await?;
        let provider_profile = self.provider.fetch_profile(&access_token).await?;
        let identity = ChatIdentity::new(provider_profile.user_id.clone());

        let display = ProfilePatch::display(
            provider_profile.display_name.clone(),
            provider_profile.picture_url.clone(),
        );

        match self.resolver.resolve(&identity).await? {
            RegistrationStatus::Unknown => {
                let patch = ProfilePatch {
                    email: provider_profile.email.clone(),
                    ..display
                };
                self.resolver.upsert_by_chat_identity(&identity, &patch).await?;
                let token = self.sessions.issue(&identity, true)?;
                info!(chat_identity = %identity, "new profile created, registration pending");
                Ok(LoginOutcome::NeedsRegistration { token, identity })
            }
            RegistrationStatus::Unregistered(_) | RegistrationStatus::Registered(_) => {
                self.resolver
                    .upsert_by_chat_identity(&identity, &display)
                    .await?;
                let token = self.sessions.issue(&identity, false)?;
                info!(chat_identity = %identity, origin = %record.origin, "login complete");

                if record.origin == Origin::Chat {
                    let to = record.chat_identity.unwrap_or_else(|| identity.clone());
                    self.pusher.push(&to, &welcome_text(&provider_profile)).await;
                }
                Ok(LoginOutcome::LoggedIn {
                    token,
                    origin: record.origin,
                    identity,
                })
            }
        }
    }

    /// The issuer this bridge mints tokens with.
    pub fn sessions(&self) -> &SessionTokenIssuer {
        &self.sessions
    }
}
