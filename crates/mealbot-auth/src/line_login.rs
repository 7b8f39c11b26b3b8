//! LINE Login endpoints: authorization-code exchange and profile fetch.

use std::time::Duration;

use async_trait::async_trait;
use mealbot_types::config::LineConfig;
use mealbot_types::{AuthError, SecretString};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

/// Profile attributes returned by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderProfile {
    /// The user's chat identity.
    pub user_id: String,
    /// Name shown in LINE; empty if the provider omitted it.
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub picture_url: Option<String>,
    /// Only present when the channel is allowed the `email` scope.
    #[serde(default)]
    pub email: Option<String>,
}

/// The two network legs of the authorization-code flow.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Trade an authorization code for an access token.
    async fn exchange_code(&self, code: &str) -> Result<SecretString, AuthError>;

    /// Fetch the profile that `access_token` was issued for.
    async fn fetch_profile(&self, access_token: &SecretString) -> Result<ProviderProfile, AuthError>;
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// LINE Login client.
pub struct LineLoginClient {
    http: Client,
    api_base_url: String,
    channel_id: String,
    channel_secret: SecretString,
    redirect_uri: String,
}

impl LineLoginClient {
    /// Client against `api_base_url` (trailing slashes trimmed) using the
    /// given channel credentials. `redirect_uri` must be the same one sent
    /// in the authorization request.
    pub fn new(
        api_base_url: impl Into<String>,
        channel_id: impl Into<String>,
        channel_secret: SecretString,
        redirect_uri: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AuthError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::TokenExchange(format!("http client: {e}")))?;
        Ok(Self {
            http,
            api_base_url: api_base_url.into().trim_end_matches('/').to_owned(),
            channel_id: channel_id.into(),
            channel_secret,
            redirect_uri: redirect_uri.into(),
        })
    }

    /// Client from the `[line]` section with a ten second timeout.
    pub fn from_config(cfg: &LineConfig, redirect_uri: impl Into<String>) -> Result<Self, AuthError> {
        Self::new(
            cfg.api_base_url.clone(),
            cfg.login_channel_id.clone(),
            cfg.login_channel_secret.clone(),
            redirect_uri,
            Duration::from_secs(10),
        )
    }
}

/// First 200 chars of an error body.
fn excerpt(body: &str) -> String {
    body.chars().take(200).collect()
}

#[async_trait]
impl IdentityProvider for LineLoginClient {
    async fn exchange_code(&self, code: &str) -> Result<SecretString, AuthError> {
        let url = format!("{}/oauth2/v2.1/token", self.api_base_url);
        let response = self
            .http
            .post(&url)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("client_id", self.channel_id.as_str()),
                ("client_secret", self.channel_secret.expose()),
            ])
            .send()
            .await
            .map_err(|e| AuthError::TokenExchange(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::TokenExchange(format!(
                "HTTP {status}: {}",
                excerpt(&body)
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::TokenExchange(format!("bad token response: {e}")))?;
        debug!("authorization code exchanged");
        Ok(SecretString::new(token.access_token))
    }

    async fn fetch_profile(&self, access_token: &SecretString) -> Result<ProviderProfile, AuthError> {
        let url = format!("{}/v2/profile", self.api_base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token.expose())
            .send()
            .await
            .map_err(|e| AuthError::ProfileFetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::ProfileFetch(format!(
                "HTTP {status}: {}",
                excerpt(&body)
            )));
        }

        let profile: ProviderProfile = response
            .json()
            .await
            .map_err(|e| AuthError::ProfileFetch(format!("bad profile response: {e}")))?;
        if profile.user_id.is_empty() {
            return Err(AuthError::ProfileFetch("profile has no userId".into()));
        }
        Ok(profile)
    }
}
