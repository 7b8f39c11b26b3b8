//! Route handlers.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Form, Query, State};
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse, Redirect, Response};
use mealbot_auth::{CallbackParams, LoginOutcome, RegistrationForm};
use mealbot_channels::SIGNATURE_HEADER;
use mealbot_types::{AuthError, ChatIdentity, Origin};
use serde::{Deserialize, Serialize};
use tracing::info;
use url::form_urlencoded;

use super::{AppState, pages};
use crate::error::ApiError;

/// `GET /ping`: liveness, always `{"message": "pong"}`.
pub async fn ping() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "pong" }))
}

/// `GET {prefix}/`: `{"status": "ok"}`.
pub async fn index() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

// ── Webhook ──────────────────────────────────────────────────────────────

/// `POST {prefix}/callback`: LINE webhook delivery.
///
/// The raw body is handed to the gateway untouched so the signature can be
/// checked against the exact bytes LINE signed. Answers `OK` once every
/// event has been acknowledged; agent replies follow later by push.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<&'static str, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    state.gateway.handle(&body, signature).await?;
    Ok("OK")
}

// ── Login ────────────────────────────────────────────────────────────────

/// Query of `GET {prefix}/auth/line`.
#[derive(Debug, Default, Deserialize)]
pub struct StartLoginQuery {
    /// `chat` or `web`; missing or empty means web.
    #[serde(default)]
    pub origin: Option<String>,
    /// Chat identity from the login link the gateway sent.
    #[serde(default, alias = "chatIdentity")]
    pub user_id: Option<String>,
}

/// `GET {prefix}/auth/line`: start a login and redirect to LINE Login.
pub async fn start_login(
    State(state): State<AppState>,
    Query(query): Query<StartLoginQuery>,
) -> Result<Redirect, ApiError> {
    let origin = match query.origin.as_deref() {
        None | Some("") => Origin::Web,
        Some(raw) => raw
            .parse::<Origin>()
            .map_err(|_| AuthError::MissingParameter("origin must be chat or web".into()))?,
    };
    let chat_identity = query
        .user_id
        .filter(|id| !id.trim().is_empty())
        .map(ChatIdentity::new);

    let url = state.bridge.start_login(origin, chat_identity);
    Ok(Redirect::temporary(url.as_str()))
}

fn with_token(base: &str, token: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("token", token)
        .finish();
    format!("{base}?{query}")
}

/// `GET {prefix}/auth/callback`: the provider's redirect back.
///
/// New users go to the registration form with a provisional token. Web
/// logins go to the frontend with a full token, and chat logins get a page
/// telling them to return to LINE.
pub async fn login_callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Result<Response, ApiError> {
    let response = match state.bridge.complete_login(&params).await? {
        LoginOutcome::NeedsRegistration { token, .. } => {
            Redirect::temporary(&with_token(&state.links.register_path, &token)).into_response()
        }
        LoginOutcome::LoggedIn {
            token,
            origin: Origin::Web,
            ..
        } => {
            let target = format!("{}/callback", state.links.frontend_url);
            Redirect::temporary(&with_token(&target, &token)).into_response()
        }
        LoginOutcome::LoggedIn { .. } => Html(pages::chat_login_success()).into_response(),
    };
    Ok(response)
}

// ── Registration ─────────────────────────────────────────────────────────

/// `?token=` on browser-facing routes.
#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    /// Session token; blank counts as missing.
    #[serde(default)]
    pub token: Option<String>,
}

fn required_token(query: TokenQuery) -> Option<String> {
    query.token.filter(|t| !t.trim().is_empty())
}

/// `GET {prefix}/register`: render the registration form.
pub async fn registration_form(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> Result<Html<String>, ApiError> {
    let token = required_token(query).ok_or_else(|| AuthError::MissingParameter("token".into()))?;
    let profile = state.registration.prepare(&token).await?;
    Ok(Html(pages::registration_form(
        &state.links.register_path,
        &token,
        &profile,
    )))
}

/// `POST {prefix}/register`: store the form and push a full session token.
pub async fn submit_registration(
    State(state): State<AppState>,
    Form(form): Form<RegistrationForm>,
) -> Result<Html<String>, ApiError> {
    let outcome = state.registration.complete(&form).await?;
    info!(profile_id = %outcome.profile.id, pushed = outcome.pushed, "registration submitted");
    Ok(Html(pages::registration_complete(form.full_name.trim())))
}

// ── Current user ─────────────────────────────────────────────────────────

/// Public fields of the caller's profile.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    /// Profile document id, not the chat identity.
    pub user_id: String,
    /// Full name from registration, or empty.
    pub username: String,
    pub email: Option<String>,
    pub display_name: String,
    pub picture_url: Option<String>,
    pub student_id: Option<String>,
}

/// `GET {prefix}/users/me`: profile behind a full session token.
///
/// Provisional tokens are refused with 401.
pub async fn current_user(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<CurrentUser>, ApiError> {
    let identity = required_token(query)
        .and_then(|token| state.sessions.verify_full(&token))
        .ok_or_else(|| ApiError::Unauthorized("Invalid or expired token".into()))?;

    let profile = state
        .profiles
        .get_by_chat_identity(&identity)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    Ok(Json(CurrentUser {
        user_id: profile.id,
        username: profile
            .username
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| profile.display_name.clone()),
        email: profile.email,
        display_name: profile.display_name,
        picture_url: profile.picture_url,
        student_id: profile.student_id,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_query_encoded() {
        assert_eq!(
            with_token("http://localhost:3000/callback", "a.b+c"),
            "http://localhost:3000/callback?token=a.b%2Bc"
        );
    }
}
