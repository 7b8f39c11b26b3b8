//! LineClient against a mock Messaging API.

use std::time::Duration;

use mealbot_channels::{LineClient, MessagingApi};
use mealbot_types::{ChannelError, ChatIdentity, SecretString};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> LineClient {
    LineClient::new(
        SecretString::new("test-token"),
        server.uri(),
        Duration::from_secs(2),
    )
    .unwrap()
}

#[tokio::test]
async fn reply_posts_reply_token_and_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/bot/message/reply"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_json(json!({
            "replyToken": "r1",
            "messages": [{"type": "text", "text": "⏳ กำลังคิดคำตอบ..."}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .reply_text("r1", "⏳ กำลังคิดคำตอบ...")
        .await
        .unwrap();
}

#[tokio::test]
async fn push_posts_recipient() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/bot/message/push"))
        .and(body_json(json!({
            "to": "U2",
            "messages": [{"type": "text", "text": "answer"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"sentMessages": []})))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .push_text(&ChatIdentity::new("U2"), "answer")
        .await
        .unwrap();
}

#[tokio::test]
async fn expired_reply_token_is_send_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/bot/message/reply"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"message": "Invalid reply token"})),
        )
        .mount(&server)
        .await;

    let err = client(&server).reply_text("stale", "hi").await.unwrap_err();
    assert!(matches!(err, ChannelError::SendFailed(msg) if msg.contains("Invalid reply token")));
}

#[tokio::test]
async fn bad_access_token_is_auth_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/bot/message/push"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client(&server)
        .push_text(&ChatIdentity::new("U2"), "hi")
        .await
        .unwrap_err();
    assert!(matches!(err, ChannelError::AuthFailed(_)));
}

#[tokio::test]
async fn unreachable_server_is_connection_failure() {
    let client = LineClient::new(
        SecretString::new("t"),
        "http://127.0.0.1:1",
        Duration::from_millis(500),
    )
    .unwrap();
    let err = client.reply_text("r1", "hi").await.unwrap_err();
    assert!(matches!(err, ChannelError::ConnectionFailed(_)));
}
