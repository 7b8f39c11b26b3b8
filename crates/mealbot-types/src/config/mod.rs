//! Configuration schema types.
//!
//! Every section deserializes with defaults, and multi-word fields accept
//! both `snake_case` and `camelCase` keys. Unknown fields are ignored.
//!
//! Secrets can be given inline or through a `*_env` field naming an
//! environment variable; see [`Config::resolve_secrets_with`].
//!
//! - [`loader`] -- config file discovery and loading

pub mod loader;

use serde::{Deserialize, Serialize};

use crate::error::MealbotError;
use crate::secret::SecretString;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Messaging channel and LINE Login credentials.
    #[serde(default)]
    pub line: LineConfig,

    /// HTTP server settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Session token and OAuth state lifetimes.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Agent loop limits and model parameters.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Chat-completions provider endpoint.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Document store backend.
    #[serde(default)]
    pub store: StoreConfig,

    /// Recommendation service endpoint.
    #[serde(default)]
    pub recommender: RecommenderConfig,
}

impl Config {
    /// Fill empty secrets from the environment variables named by the
    /// `*_env` fields, using `lookup` to read variables.
    pub fn resolve_secrets_with<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let line = &mut self.line;
        line.channel_secret = line
            .channel_secret
            .or_env_with(line.channel_secret_env.as_deref(), &lookup);
        line.channel_access_token = line
            .channel_access_token
            .or_env_with(line.channel_access_token_env.as_deref(), &lookup);
        line.login_channel_secret = line
            .login_channel_secret
            .or_env_with(line.login_channel_secret_env.as_deref(), &lookup);
        if line.login_channel_id.is_empty()
            && let Some(id) = line.login_channel_id_env.as_deref().and_then(&lookup)
        {
            line.login_channel_id = id;
        }

        self.auth.session_secret = self
            .auth
            .session_secret
            .or_env_with(self.auth.session_secret_env.as_deref(), &lookup);
        self.llm.api_key = self
            .llm
            .api_key
            .or_env_with(self.llm.api_key_env.as_deref(), &lookup);
        self
    }

    /// Resolve secrets from the process environment.
    pub fn resolve_secrets(self) -> Self {
        self.resolve_secrets_with(|name| std::env::var(name).ok())
    }

    /// Check that everything `serve` needs is present.
    ///
    /// All problems are reported together in one `ConfigInvalid`.
    pub fn validate(&self) -> Result<(), MealbotError> {
        let mut problems = Vec::new();

        if self.line.channel_secret.is_empty() {
            problems.push("line.channel_secret is not set");
        }
        if self.line.channel_access_token.is_empty() {
            problems.push("line.channel_access_token is not set");
        }
        if self.line.login_channel_id.is_empty() {
            problems.push("line.login_channel_id is not set");
        }
        if self.line.login_channel_secret.is_empty() {
            problems.push("line.login_channel_secret is not set");
        }
        if self.auth.session_secret.is_empty() {
            problems.push("auth.session_secret is not set");
        }
        if self.llm.api_key.is_empty() {
            problems.push("llm.api_key is not set");
        }
        if self.store.backend == StoreBackend::Rest && self.store.base_url.is_none() {
            problems.push("store.base_url is required for the rest backend");
        }
        if self.agent.max_iterations == 0 {
            problems.push("agent.max_iterations must be at least 1");
        }
        if self.agent.memory_window == 0 {
            problems.push("agent.memory_window must be at least 1");
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(MealbotError::ConfigInvalid {
                reason: problems.join("; "),
            })
        }
    }
}

// ── LINE ─────────────────────────────────────────────────────────────────

/// `[line]`: Messaging API and LINE Login channel credentials.
///
/// Each secret has an `*_env` companion naming the environment variable
/// that fills it when the file leaves it empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LineConfig {
    /// Messaging API channel secret, used to verify webhook signatures.
    #[serde(alias = "channelSecret")]
    pub channel_secret: SecretString,
    /// Env var for `channel_secret`; default `LINE_CHANNEL_SECRET`.
    #[serde(alias = "channelSecretEnv")]
    pub channel_secret_env: Option<String>,

    /// Messaging API bearer token for reply and push calls.
    #[serde(alias = "channelAccessToken")]
    pub channel_access_token: SecretString,
    /// Env var for `channel_access_token`; default `LINE_CHANNEL_ACCESS_TOKEN`.
    #[serde(alias = "channelAccessTokenEnv")]
    pub channel_access_token_env: Option<String>,

    /// LINE Login channel id (the OAuth `client_id`).
    #[serde(alias = "loginChannelId")]
    pub login_channel_id: String,
    /// Env var for `login_channel_id`; default `LINE_CHANNEL_LOGIN_ID`.
    #[serde(alias = "loginChannelIdEnv")]
    pub login_channel_id_env: Option<String>,

    /// LINE Login channel secret, sent on the code exchange.
    #[serde(alias = "loginChannelSecret")]
    pub login_channel_secret: SecretString,
    /// Env var for `login_channel_secret`; default `LINE_CHANNEL_LOGIN_SECRET`.
    #[serde(alias = "loginChannelSecretEnv")]
    pub login_channel_secret_env: Option<String>,

    /// Base URL for the messaging, token and profile APIs.
    #[serde(alias = "apiBaseUrl")]
    pub api_base_url: String,

    /// LINE Login authorization endpoint.
    #[serde(alias = "authorizeUrl")]
    pub authorize_url: String,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            channel_secret: SecretString::default(),
            channel_secret_env: Some("LINE_CHANNEL_SECRET".into()),
            channel_access_token: SecretString::default(),
            channel_access_token_env: Some("LINE_CHANNEL_ACCESS_TOKEN".into()),
            login_channel_id: String::new(),
            login_channel_id_env: Some("LINE_CHANNEL_LOGIN_ID".into()),
            login_channel_secret: SecretString::default(),
            login_channel_secret_env: Some("LINE_CHANNEL_LOGIN_SECRET".into()),
            api_base_url: "https://api.line.me".into(),
            authorize_url: "https://access.line.me/oauth2/v2.1/authorize".into(),
        }
    }
}

// ── Gateway ──────────────────────────────────────────────────────────────

/// `[gateway]`: HTTP listener and the URLs it advertises.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Bind address; default `0.0.0.0`.
    pub host: String,
    /// Bind port; default 8000. `mealbot serve --port` overrides it.
    pub port: u16,

    /// Externally reachable base URL, used to build login links.
    #[serde(alias = "publicBaseUrl")]
    pub public_base_url: String,

    /// Path prefix for every mealbot route except `/ping`.
    #[serde(alias = "routePrefix")]
    pub route_prefix: String,

    /// OAuth redirect URI. Defaults to `{public_base_url}{route_prefix}/auth/callback`.
    #[serde(alias = "redirectUri")]
    pub redirect_uri: Option<String>,

    /// Web frontend that receives `?token=` after a web login.
    #[serde(alias = "frontendUrl")]
    pub frontend_url: String,

    /// Allowed CORS origins. Empty means permissive.
    #[serde(alias = "corsOrigins")]
    pub cors_origins: Vec<String>,

    /// How long shutdown waits for deferred replies to finish.
    #[serde(alias = "drainGraceSecs")]
    pub drain_grace_secs: u64,
}

impl GatewayConfig {
    /// Public URL of a route under the prefix, e.g. `route_url("/auth/line")`.
    pub fn route_url(&self, path: &str) -> String {
        format!(
            "{}{}{}",
            self.public_base_url.trim_end_matches('/'),
            self.route_prefix.trim_end_matches('/'),
            path
        )
    }

    /// OAuth redirect URI: `redirect_uri` if set, else the callback route.
    pub fn callback_url(&self) -> String {
        self.redirect_uri
            .clone()
            .unwrap_or_else(|| self.route_url("/auth/callback"))
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
            public_base_url: "http://localhost:8000".into(),
            route_prefix: "/api/ai".into(),
            redirect_uri: None,
            frontend_url: "http://localhost:3000".into(),
            cors_origins: Vec::new(),
            drain_grace_secs: 30,
        }
    }
}

// ── Auth ─────────────────────────────────────────────────────────────────

/// `[auth]`: session token signing and lifetimes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC key for session tokens.
    #[serde(alias = "sessionSecret")]
    pub session_secret: SecretString,
    /// Env var for `session_secret`; default `SECRET_KEY`.
    #[serde(alias = "sessionSecretEnv")]
    pub session_secret_env: Option<String>,

    /// Lifetime of a full session token.
    #[serde(alias = "sessionTtlHours")]
    pub session_ttl_hours: u64,

    /// Lifetime of a provisional token, i.e. how long a new user has to
    /// finish registration.
    #[serde(alias = "provisionalTtlMinutes")]
    pub provisional_ttl_minutes: u64,

    /// Lifetime of an OAuth `state` record.
    #[serde(alias = "stateTtlMinutes")]
    pub state_ttl_minutes: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_secret: SecretString::default(),
            session_secret_env: Some("SECRET_KEY".into()),
            session_ttl_hours: 24,
            provisional_ttl_minutes: 30,
            state_ttl_minutes: 10,
        }
    }
}

// ── Agent ────────────────────────────────────────────────────────────────

/// `[agent]`: model parameters, loop budgets and memory bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Chat model name passed to the provider.
    pub model: String,

    /// Completion token cap per model call.
    #[serde(alias = "maxTokens")]
    pub max_tokens: i32,

    /// Sampling temperature; zero keeps tool choice deterministic.
    pub temperature: f64,

    /// Plan/act/observe cycles before forced termination.
    #[serde(alias = "maxIterations")]
    pub max_iterations: u32,

    /// Exchanges kept per chat identity.
    #[serde(alias = "memoryWindow")]
    pub memory_window: usize,

    /// Wall-clock bound on one loop run.
    #[serde(alias = "loopTimeoutSecs")]
    pub loop_timeout_secs: u64,

    /// Maximum number of chat identities with live memory.
    #[serde(alias = "memoryCapacity")]
    pub memory_capacity: u64,

    /// Memory for an identity is dropped after this long without traffic.
    #[serde(alias = "memoryIdleTtlSecs")]
    pub memory_idle_ttl_secs: u64,

    /// Pending messages buffered per identity before new ones are rejected.
    #[serde(alias = "queueDepth")]
    pub queue_depth: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "gpt-5".into(),
            max_tokens: 4096,
            temperature: 0.0,
            max_iterations: 10,
            memory_window: 10,
            loop_timeout_secs: 120,
            memory_capacity: 10_000,
            memory_idle_ttl_secs: 24 * 60 * 60,
            queue_depth: 16,
        }
    }
}

// ── LLM ──────────────────────────────────────────────────────────────────

/// `[llm]`: the OpenAI-compatible chat completion endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// OpenAI-compatible base URL (without `/chat/completions`).
    #[serde(alias = "baseUrl")]
    pub base_url: String,

    /// Bearer key for the provider.
    #[serde(alias = "apiKey")]
    pub api_key: SecretString,
    /// Env var for `api_key`; default `OPENAI_API_KEY`.
    #[serde(alias = "apiKeyEnv")]
    pub api_key_env: Option<String>,

    /// Per-request HTTP timeout.
    #[serde(alias = "timeoutSecs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            api_key: SecretString::default(),
            api_key_env: Some("OPENAI_API_KEY".into()),
            timeout_secs: 60,
        }
    }
}

// ── Store ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// In-process maps; everything is lost on restart.
    #[default]
    Memory,
    /// JSON CRUD service at `store.base_url`.
    Rest,
}

/// `[store]`: where profiles, orders and the menu live.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// `memory` (default) or `rest`.
    pub backend: StoreBackend,

    /// Base URL of the CRUD service for the `rest` backend.
    #[serde(alias = "baseUrl")]
    pub base_url: Option<String>,

    /// Per-request timeout for the `rest` backend.
    #[serde(alias = "timeoutSecs")]
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            base_url: None,
            timeout_secs: 10,
        }
    }
}

// ── Recommender ──────────────────────────────────────────────────────────

/// `[recommender]`: the menu recommendation service behind two tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommenderConfig {
    /// Service root; `/recommendations/{user_id}` and `/trending` hang off it.
    #[serde(alias = "baseUrl")]
    pub base_url: String,

    /// Per-request timeout. A slow recommender fails the tool call only.
    #[serde(alias = "timeoutSecs")]
    pub timeout_secs: u64,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".into(),
            timeout_secs: 5,
        }
    }
}
