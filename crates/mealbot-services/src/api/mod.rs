//! HTTP surface: LINE webhook, login and registration pages, user and
//! notification endpoints.

pub mod handlers;
pub mod notify;
pub mod pages;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use mealbot_auth::{OAuthBridge, RegistrationService, SessionTokenIssuer};
use mealbot_channels::NotificationPusher;
use mealbot_store::{OrderStore, ProfileStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::gateway::WebhookGateway;

/// Shared state for every handler.
#[derive(Clone)]
pub struct AppState {
    /// Webhook verification, classification and dispatch.
    pub gateway: Arc<WebhookGateway>,
    /// LINE Login start and callback.
    pub bridge: Arc<OAuthBridge>,
    pub registration: Arc<RegistrationService>,
    /// Verifies tokens on `users/me`.
    pub sessions: Arc<SessionTokenIssuer>,
    pub profiles: Arc<dyn ProfileStore>,
    /// Read by the order-update notification route.
    pub orders: Arc<dyn OrderStore>,
    pub pusher: NotificationPusher,
    pub links: Arc<Links>,
}

/// Externally visible URLs the handlers redirect to.
#[derive(Debug, Clone)]
pub struct Links {
    /// Web frontend base; web logins land on `{frontend_url}/callback?token=`.
    pub frontend_url: String,
    /// Registration form route, relative to the server root.
    pub register_path: String,
}

impl Links {
    /// Links for a server mounted under `route_prefix`. Trailing slashes
    /// on either argument are dropped.
    pub fn new(frontend_url: &str, route_prefix: &str) -> Self {
        Self {
            frontend_url: frontend_url.trim_end_matches('/').to_owned(),
            register_path: format!("{}/register", route_prefix.trim_end_matches('/')),
        }
    }
}

/// Build the router with every route mounted under `route_prefix`,
/// except `/ping`.
pub fn build_router(state: AppState, route_prefix: &str, cors_origins: &[String]) -> Router {
    let cors = if cors_origins.is_empty() {
        CorsLayer::permissive()
    } else {
        let origins: Vec<_> = cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let routes = Router::new()
        .route("/callback", post(handlers::webhook))
        .route("/auth/line", get(handlers::start_login))
        .route("/auth/callback", get(handlers::login_callback))
        .route(
            "/register",
            get(handlers::registration_form).post(handlers::submit_registration),
        )
        .route("/users/me", get(handlers::current_user))
        .route("/message/push/order-update", post(notify::order_update));

    let prefix = route_prefix.trim_end_matches('/');
    let app = if prefix.is_empty() {
        routes.route("/", get(handlers::index))
    } else {
        Router::new()
            .nest(prefix, routes)
            .route(prefix, get(handlers::index))
            .route(&format!("{prefix}/"), get(handlers::index))
    };

    app.route("/ping", get(handlers::ping))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
