//! HTTP-facing errors.
//!
//! Browser flows (login callback, registration) fail with an HTML page;
//! API callers get a small JSON body. Neither ever carries more than a
//! short reason.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use mealbot_types::{AuthError, ChannelError, StoreError};
use thiserror::Error;
use tracing::{error, warn};

use crate::api::pages;

/// Errors surfaced by HTTP handlers.
///
/// Webhook and API routes answer with a status code and a JSON `detail`;
/// browser-facing auth failures render [`pages::error_page`].
#[derive(Error, Debug)]
pub enum ApiError {
    /// Webhook signature missing or wrong.
    #[error("invalid signature")]
    InvalidSignature,

    /// Verified webhook body that is not an event envelope.
    #[error("malformed payload")]
    MalformedPayload,

    /// Failure in a browser-facing login or registration step.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Missing, invalid or provisional session token on an API route.
    #[error("{0}")]
    Unauthorized(String),

    /// Token was fine but its profile no longer exists.
    #[error("{0}")]
    NotFound(String),

    /// Store failure outside the auth flow; reported as 500.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<ChannelError> for ApiError {
    fn from(e: ChannelError) -> Self {
        match e {
            ChannelError::MalformedPayload(_) => ApiError::MalformedPayload,
            _ => ApiError::InvalidSignature,
        }
    }
}

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "detail": message }))).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::InvalidSignature => detail(StatusCode::BAD_REQUEST, "Invalid signature"),
            ApiError::MalformedPayload => detail(StatusCode::BAD_REQUEST, "Malformed payload"),
            ApiError::Unauthorized(msg) => detail(StatusCode::UNAUTHORIZED, &msg),
            ApiError::NotFound(msg) => detail(StatusCode::NOT_FOUND, &msg),
            ApiError::Store(e) => {
                error!(error = %e, "store failure");
                detail(StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
            }
            ApiError::Auth(e) => {
                let (status, reason) = match &e {
                    AuthError::Authentication(_) => {
                        (StatusCode::UNAUTHORIZED, "Invalid or expired token".to_owned())
                    }
                    AuthError::MissingParameter(_) => (StatusCode::BAD_REQUEST, e.to_string()),
                    AuthError::InvalidState => (
                        StatusCode::BAD_REQUEST,
                        "Invalid or expired state, please start the login again".to_owned(),
                    ),
                    AuthError::TokenExchange(_) | AuthError::ProfileFetch(_) => (
                        StatusCode::BAD_GATEWAY,
                        "Could not complete login with LINE, please try again".to_owned(),
                    ),
                    _ => (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_owned()),
                };
                if status.is_server_error() {
                    error!(error = %e, "login flow failed");
                } else {
                    warn!(error = %e, "login flow rejected");
                }
                (status, Html(pages::error_page(&reason))).into_response()
            }
        }
    }
}
