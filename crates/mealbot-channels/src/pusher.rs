//! Out-of-band delivery to a chat identity.

use std::sync::Arc;

use mealbot_types::ChatIdentity;
use tracing::{debug, warn};

use crate::line::client::MessagingApi;

/// Best-effort push notifications.
///
/// Used once the synchronous part of a flow is over: agent answers, login
/// welcomes, registration confirmations and order updates. Failures are
/// logged and reported as `false`; nothing is retried.
#[derive(Clone)]
pub struct NotificationPusher {
    api: Arc<dyn MessagingApi>,
}

impl NotificationPusher {
    /// Pusher sending through `api`.
    pub fn new(api: Arc<dyn MessagingApi>) -> Self {
        Self { api }
    }

    /// Push `text` to `to`. Returns whether the platform accepted it.
    pub async fn push(&self, to: &ChatIdentity, text: &str) -> bool {
        match self.api.push_text(to, text).await {
            Ok(()) => {
                debug!(chat_identity = %to, "push delivered");
                true
            }
            Err(e) => {
                warn!(chat_identity = %to, error = %e, "push notification failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use mealbot_types::ChannelError;

    use super::*;

    #[derive(Default)]
    struct RecordingApi {
        fail: bool,
        pushes: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl MessagingApi for RecordingApi {
        async fn reply_text(&self, _reply_token: &str, _text: &str) -> Result<(), ChannelError> {
            Ok(())
        }

        async fn push_text(&self, to: &ChatIdentity, text: &str) -> Result<(), ChannelError> {
            if self.fail {
                return Err(ChannelError::SendFailed("HTTP 500".into()));
            }
            self.pushes
                .lock()
                .unwrap()
                .push((to.to_string(), text.to_owned()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn push_delivers() {
        let api = Arc::new(RecordingApi::default());
        let pusher = NotificationPusher::new(api.clone());
        assert!(pusher.push(&ChatIdentity::new("U2"), "done").await);
        assert_eq!(
            api.pushes.lock().unwrap().as_slice(),
            [("U2".to_string(), "done".to_string())]
        );
    }

    #[tokio::test]
    async fn failure_is_swallowed() {
        let api = Arc::new(RecordingApi {
            fail: true,
            ..Default::default()
        });
        let pusher = NotificationPusher::new(api);
        assert!(!pusher.push(&ChatIdentity::new("U2"), "done").await);
    }
}
