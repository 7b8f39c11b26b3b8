//! `mealbot serve` -- build every component and run the HTTP server.
//!
//! # Lifecycle
//!
//! ```text
//! 1. Load and validate config
//! 2. Open the store backend (in-memory or REST)
//! 3. Build the LINE client, LLM provider, tool registry and agent loop
//! 4. Build the dispatcher, webhook gateway and login/registration services
//! 5. Bind the listener and serve until Ctrl+C
//! 6. Stop accepting requests, then drain deferred replies
//! ```
//!
//! # Example
//!
//! ```text
//! mealbot serve
//! mealbot serve --config /etc/mealbot/config.json
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use mealbot_auth::{
    CorrelationStore, IdentityResolver, LineLoginClient, LoginSettings, OAuthBridge,
    RegistrationService, SessionTokenIssuer,
};
use mealbot_channels::{LineClient, NotificationPusher};
use mealbot_core::{AgentLoop, LoopSettings, MemoryCache, ToolRegistry};
use mealbot_llm::{OpenAiCompatProvider, ProviderConfig};
use mealbot_services::{AppState, Dispatcher, Links, WebhookGateway, build_router};
use mealbot_store::{MemoryStore, OrderStore, ProductStore, ProfileStore, RestStore};
use mealbot_tools::recommend::RecommenderClient;
use mealbot_types::config::{Config, StoreBackend, StoreConfig};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::load_config;

/// Arguments for the `mealbot serve` subcommand.
#[derive(Args)]
pub struct ServeArgs {
    /// Config file path (overrides auto-discovery).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Listen port (overrides `gateway.port`).
    #[arg(short, long)]
    pub port: Option<u16>,
}

/// The three store views, backed by one backend.
struct Stores {
    profiles: Arc<dyn ProfileStore>,
    orders: Arc<dyn OrderStore>,
    products: Arc<dyn ProductStore>,
}

fn open_stores(cfg: &StoreConfig) -> anyhow::Result<Stores> {
    match cfg.backend {
        StoreBackend::Memory => {
            warn!("using in-memory store; data is lost on restart");
            let store = Arc::new(MemoryStore::new());
            Ok(Stores {
                profiles: store.clone(),
                orders: store.clone(),
                products: store,
            })
        }
        StoreBackend::Rest => {
            let base_url = cfg
                .base_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("store.base_url is required for the rest backend"))?;
            let store = Arc::new(RestStore::new(
                base_url,
                Duration::from_secs(cfg.timeout_secs.max(1)),
            )?);
            info!(base_url, "rest store initialized");
            Ok(Stores {
                profiles: store.clone(),
                orders: store.clone(),
                products: store,
            })
        }
    }
}

/// Build the full router and the dispatcher that backs it.
fn build_app(config: &Config) -> anyhow::Result<(axum::Router, Dispatcher)> {
    let stores = open_stores(&config.store)?;

    let line = Arc::new(LineClient::from_config(&config.line)?);
    let pusher = NotificationPusher::new(line.clone());

    let provider = Arc::new(OpenAiCompatProvider::new(
        ProviderConfig::from_llm_config(&config.llm),
        config.llm.api_key.clone(),
    )?);

    let mut registry = ToolRegistry::new();
    mealbot_tools::register_all(
        &mut registry,
        stores.orders.clone(),
        stores.products.clone(),
        Arc::new(RecommenderClient::from_config(&config.recommender)?),
    );
    info!(tools = registry.len(), "tool registry initialized");

    let memory = MemoryCache::new(
        config.agent.memory_window,
        config.agent.memory_capacity,
        Duration::from_secs(config.agent.memory_idle_ttl_secs.max(1)),
    );
    let agent = Arc::new(AgentLoop::new(
        provider,
        Arc::new(registry),
        memory,
        LoopSettings::from_config(&config.agent),
    ));

    let dispatcher = Dispatcher::new(agent, pusher.clone(), config.agent.queue_depth);
    let resolver = IdentityResolver::new(stores.profiles.clone());
    let gateway = WebhookGateway::new(
        config.line.channel_secret.clone(),
        line,
        resolver.clone(),
        dispatcher.clone(),
        &config.gateway,
    )?;

    let sessions = Arc::new(SessionTokenIssuer::from_config(&config.auth)?);
    let correlation = Arc::new(CorrelationStore::new(Duration::from_secs(
        config.auth.state_ttl_minutes.max(1) * 60,
    )));
    let login = Arc::new(LineLoginClient::from_config(
        &config.line,
        config.gateway.callback_url(),
    )?);
    let bridge = OAuthBridge::new(
        LoginSettings::from_config(&config.line, &config.gateway)?,
        correlation,
        login,
        resolver.clone(),
        sessions.clone(),
        pusher.clone(),
    );
    let registration = RegistrationService::new(sessions.clone(), resolver, pusher.clone());

    let state = AppState {
        gateway: Arc::new(gateway),
        bridge: Arc::new(bridge),
        registration: Arc::new(registration),
        sessions,
        profiles: stores.profiles,
        orders: stores.orders,
        pusher,
        links: Arc::new(Links::new(
            &config.gateway.frontend_url,
            &config.gateway.route_prefix,
        )),
    };
    let router = build_router(
        state,
        &config.gateway.route_prefix,
        &config.gateway.cors_origins,
    );
    Ok((router, dispatcher))
}

/// Run the server until Ctrl+C.
pub async fn run(args: ServeArgs) -> anyhow::Result<()> {
    info!("starting mealbot server");

    let mut config = load_config(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.gateway.port = port;
    }
    config.validate()?;

    let (router, dispatcher) = build_app(&config)?;

    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(
        addr = %addr,
        public_base_url = %config.gateway.public_base_url,
        route_prefix = %config.gateway.route_prefix,
        "listening"
    );

    let cancel = CancellationToken::new();
    let signal = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for shutdown signal");
        }
        info!("received shutdown signal");
        signal.cancel();
    });

    axum::serve(listener, router)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await?;

    let grace = Duration::from_secs(config.gateway.drain_grace_secs);
    if !dispatcher.shutdown(grace).await {
        warn!("some deferred replies were abandoned");
    }

    info!("mealbot shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rest_backend_without_url_is_rejected() {
        let cfg = StoreConfig {
            backend: StoreBackend::Rest,
            base_url: None,
            timeout_secs: 5,
        };
        assert!(open_stores(&cfg).is_err());
    }

    #[test]
    fn memory_backend_opens() {
        assert!(open_stores(&StoreConfig::default()).is_ok());
    }

    #[test]
    fn app_builds_from_complete_config() {
        let mut config = Config::default();
        config.line.channel_secret = "channel-secret".into();
        config.line.channel_access_token = "access-token".into();
        config.line.login_channel_id = "1650000000".into();
        config.line.login_channel_secret = "login-secret".into();
        config.auth.session_secret = "session-secret".into();
        config.llm.api_key = "sk-test".into();
        config.validate().unwrap();

        let (_router, dispatcher) = build_app(&config).unwrap();
        assert_eq!(dispatcher.active_identities(), 0);
    }
}
