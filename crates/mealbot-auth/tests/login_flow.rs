//! Login flow against a mocked LINE Login server.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mealbot_auth::{
    CallbackParams, CorrelationStore, IdentityResolver, LineLoginClient, LoginOutcome,
    LoginSettings, OAuthBridge, SessionTokenIssuer,
};
use mealbot_channels::{MessagingApi, NotificationPusher};
use mealbot_store::MemoryStore;
use mealbot_types::config::{GatewayConfig, LineConfig};
use mealbot_types::{
    AuthError, ChannelError, ChatIdentity, Origin, ProfilePatch, RegistrationStatus, SecretString,
};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct RecordingApi {
    pushes: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl MessagingApi for RecordingApi {
    async fn reply_text(&self, _: &str, _: &str) -> Result<(), ChannelError> {
        Ok(())
    }
    async fn push_text(&self, to: &ChatIdentity, text: &str) -> Result<(), ChannelError> {
        self.pushes
            .lock()
            .unwrap()
            .push((to.as_str().to_owned(), text.to_owned()));
        Ok(())
    }
}

struct Harness {
    bridge: OAuthBridge,
    store: Arc<MemoryStore>,
    sessions: Arc<SessionTokenIssuer>,
    api: Arc<RecordingApi>,
}

const REDIRECT: &str = "https://bot.example.com/api/ai/auth/callback";

async fn mock_line_login(server: &MockServer, user_id: &str) {
    Mock::given(method("POST"))
        .and(path("/oauth2/v2.1/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=good-code"))
        .and(body_string_contains("client_id=1650000000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "line-access",
            "token_type": "Bearer",
            "expires_in": 2592000
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/profile"))
        .and(header("authorization", "Bearer line-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "userId": user_id,
            "displayName": "Nok",
            "pictureUrl": "https://profile.line-scdn.net/nok"
        })))
        .mount(server)
        .await;
}

fn harness(server: &MockServer) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let sessions = Arc::new(
        SessionTokenIssuer::new(
            &SecretString::new("flow-secret"),
            Duration::from_secs(24 * 3600),
            Duration::from_secs(30 * 60),
        )
        .unwrap(),
    );
    let api = Arc::new(RecordingApi::default());
    let provider = LineLoginClient::new(
        server.uri(),
        "1650000000",
        SecretString::new("login-secret"),
        REDIRECT,
        Duration::from_secs(5),
    )
    .unwrap();
    let settings = LoginSettings::from_config(
        &LineConfig {
            login_channel_id: "1650000000".into(),
            ..Default::default()
        },
        &GatewayConfig {
            redirect_uri: Some(REDIRECT.into()),
            ..Default::default()
        },
    )
    .unwrap();

    let bridge = OAuthBridge::new(
        settings,
        Arc::new(CorrelationStore::new(Duration::from_secs(600))),
        Arc::new(provider),
        IdentityResolver::new(store.clone()),
        sessions.clone(),
        NotificationPusher::new(api.clone()),
    );
    Harness {
        bridge,
        store,
        sessions,
        api,
    }
}

fn state_of(url: &url::Url) -> String {
    let pairs: HashMap<String, String> = url.query_pairs().into_owned().collect();
    pairs["state"].clone()
}

fn callback(state: &str) -> CallbackParams {
    CallbackParams {
        code: Some("good-code".into()),
        state: Some(state.into()),
        ..Default::default()
    }
}

#[tokio::test]
async fn first_login_needs_registration() {
    let server = MockServer::start().await;
    mock_line_login(&server, "U10").await;
    let h = harness(&server);

    let url = h.bridge.start_login(Origin::Web, None);
    let outcome = h.bridge.complete_login(&callback(&state_of(&url))).await.unwrap();

    let LoginOutcome::NeedsRegistration { token, identity } = outcome else {
        panic!("expected NeedsRegistration");
    };
    assert_eq!(identity, ChatIdentity::new("U10"));
    assert!(h.sessions.verify(&token).unwrap().provisional);
    assert!(h.sessions.verify_full(&token).is_none());
    assert_eq!(h.store.profile_count().await, 1);
    assert!(h.api.pushes.lock().unwrap().is_empty());
}

#[tokio::test]
async fn chat_login_for_known_user_pushes_welcome() {
    let server = MockServer::start().await;
    mock_line_login(&server, "U11").await;
    let h = harness(&server);
    IdentityResolver::new(h.store.clone())
        .upsert_by_chat_identity(
            &ChatIdentity::new("U11"),
            &ProfilePatch {
                display_name: Some("old name".into()),
                student_id: Some("6510000011".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let url = h
        .bridge
        .start_login(Origin::Chat, Some(ChatIdentity::new("U11")));
    let outcome = h.bridge.complete_login(&callback(&state_of(&url))).await.unwrap();

    let LoginOutcome::LoggedIn { token, origin, .. } = outcome else {
        panic!("expected LoggedIn");
    };
    assert_eq!(origin, Origin::Chat);
    assert_eq!(h.sessions.verify_full(&token), Some(ChatIdentity::new("U11")));

    let status = IdentityResolver::new(h.store.clone())
        .resolve(&ChatIdentity::new("U11"))
        .await
        .unwrap();
    let RegistrationStatus::Registered(profile) = status else {
        panic!("registration lost");
    };
    assert_eq!(profile.display_name, "Nok");

    let pushes = h.api.pushes.lock().unwrap();
    assert_eq!(pushes.len(), 1);
    assert_eq!(pushes[0].0, "U11");
    assert!(pushes[0].1.contains("Nok"));
}

#[tokio::test]
async fn callback_with_unissued_state_creates_nothing() {
    let server = MockServer::start().await;
    mock_line_login(&server, "U12").await;
    let h = harness(&server);

    let err = h
        .bridge
        .complete_login(&callback("forged-state"))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::InvalidState));
    assert_eq!(h.store.profile_count().await, 0);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn replayed_state_fails_like_unissued_state() {
    let server = MockServer::start().await;
    mock_line_login(&server, "U13").await;
    let h = harness(&server);

    let state = state_of(&h.bridge.start_login(Origin::Web, None));
    h.bridge.complete_login(&callback(&state)).await.unwrap();
    let profiles_after_first = h.store.profile_count().await;

    let err = h.bridge.complete_login(&callback(&state)).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidState));
    assert_eq!(h.store.profile_count().await, profiles_after_first);
}

#[tokio::test]
async fn rejected_code_is_token_exchange_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/v2.1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant",
            "error_description": "invalid authorization code"
        })))
        .mount(&server)
        .await;
    let h = harness(&server);

    let state = state_of(&h.bridge.start_login(Origin::Web, None));
    let err = h.bridge.complete_login(&callback(&state)).await.unwrap_err();

    match err {
        AuthError::TokenExchange(msg) => assert!(msg.contains("400")),
        other => panic!("expected TokenExchange, got {other:?}"),
    }
    assert_eq!(h.store.profile_count().await, 0);
}

#[tokio::test]
async fn failed_profile_fetch_is_profile_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/v2.1/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "access_token": "line-access" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/profile"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    let h = harness(&server);

    let state = state_of(&h.bridge.start_login(Origin::Web, None));
    let err = h.bridge.complete_login(&callback(&state)).await.unwrap_err();
    assert!(matches!(err, AuthError::ProfileFetch(_)));
}
