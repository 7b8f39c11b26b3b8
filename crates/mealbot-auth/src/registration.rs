//! Registration behind a provisional token.
//!
//! Both steps accept provisional and full tokens. Completing the form
//! stores the registration attributes, mints a full session and pushes it
//! to the chat identity.

use std::sync::Arc;

use mealbot_channels::NotificationPusher;
use mealbot_types::{AuthError, ChatIdentity, Profile, ProfilePatch};
use serde::Deserialize;
use tracing::info;

use crate::resolver::IdentityResolver;
use crate::session::SessionTokenIssuer;

/// Display name given to a profile created by opening the form directly.
pub const PLACEHOLDER_NAME: &str = "Guest";

/// Submitted registration form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrationForm {
    /// Session token from the hidden form field; provisional or full.
    #[serde(default)]
    pub token: String,
    /// Stored as the profile's username.
    #[serde(default)]
    pub full_name: String,
    /// Posted as `studentId`; `student_id` is accepted too.
    #[serde(default, rename = "studentId", alias = "student_id")]
    pub student_id: String,
    #[serde(default)]
    pub email: String,
}

impl RegistrationForm {
    fn validate(&self) -> Result<(), AuthError> {
        for (name, value) in [
            ("full_name", &self.full_name),
            ("studentId", &self.student_id),
            ("email", &self.email),
        ] {
            if value.trim().is_empty() {
                return Err(AuthError::MissingParameter(name.into()));
            }
        }
        Ok(())
    }
}

/// A completed registration.
#[derive(Debug, Clone)]
pub struct RegistrationOutcome {
    /// The profile after the registration fields were written.
    pub profile: Profile,
    /// Full session token, also delivered by push.
    pub token: String,
    /// Whether the push carrying the token was accepted.
    pub pushed: bool,
}

/// Shows and completes the registration form.
///
/// Every step starts by verifying the form's token; the chat identity it
/// names is the only profile the service ever touches.
pub struct RegistrationService {
    sessions: Arc<SessionTokenIssuer>,
    resolver: IdentityResolver,
    pusher: NotificationPusher,
}

impl RegistrationService {
    /// `pusher` delivers the full session token to the chat once the form
    /// is complete.
    pub fn new(
        sessions: Arc<SessionTokenIssuer>,
        resolver: IdentityResolver,
        pusher: NotificationPusher,
    ) -> Self {
        Self {
            sessions,
            resolver,
            pusher,
        }
    }

    fn identity_for(&self, token: &str) -> Result<ChatIdentity, AuthError> {
        self.sessions
            .verify_for_registration(token)
            .ok_or_else(|| AuthError::Authentication("invalid or expired token".into()))
    }

    /// Profile to show on the form, creating a placeholder if none exists.
    pub async fn prepare(&self, token: &str) -> Result<Profile, AuthError> {
        let identity = self.identity_for(token)?;
        let status = self.resolver.resolve(&identity).await?;
        if let Some(profile) = status.profile() {
            return Ok(profile.clone());
        }
        let profile = self
            .resolver
            .upsert_by_chat_identity(&identity, &ProfilePatch::display(PLACEHOLDER_NAME, None))
            .await?;
        info!(chat_identity = %identity, "placeholder profile created for registration");
        Ok(profile)
    }

    /// Store the form's fields and mint a full session.
    ///
    /// The student id, email and username are written in one upsert.
    /// An existing display name and picture are kept; a profile created
    /// here takes the full name as its display name. The new token is
    /// pushed to the chat identity with a greeting.
    ///
    /// # Errors
    ///
    /// [`AuthError::Authentication`] for a bad token,
    /// [`AuthError::MissingParameter`] for a blank field, and any store
    /// failure from the upsert.
    pub async fn complete(&self, form: &RegistrationForm) -> Result<RegistrationOutcome, AuthError> {
        let identity = self.identity_for(&form.token)?;
        form.validate()?;

        let full_name = form.full_name.trim();
        let existing = self.resolver.resolve(&identity).await?;
        let patch = ProfilePatch {
            // Keep the LINE display name when there is one.
            display_name: existing
                .profile()
                .is_none()
                .then(|| full_name.to_owned()),
            student_id: Some(form.student_id.trim().to_owned()),
            email: Some(form.email.trim().to_owned()),
            username: Some(full_name.to_owned()),
            ..Default::default()
        };
        let profile = self.resolver.upsert_by_chat_identity(&identity, &patch).await?;
        let token = self.sessions.issue(&identity, false)?;
        info!(chat_identity = %identity, "registration complete");

        let greeting = format!("✅ ลงทะเบียนสำเร็จ! สวัสดีคุณ {full_name}\n\nSession token: {token}");
        let pushed = self.pusher.push(&identity, &greeting).await;

        Ok(RegistrationOutcome {
            profile,
            token,
            pushed,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use mealbot_channels::MessagingApi;
    use mealbot_store::MemoryStore;
    use mealbot_types::{ChannelError, RegistrationStatus, SecretString};

    use super::*;

    #[derive(Default)]
    struct RecordingApi {
        pushes: Mutex<Vec<(String, String)>>,
    }

    #[async_trait::async_trait]
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

    struct Fixture {
        service: RegistrationService,
        sessions: Arc<SessionTokenIssuer>,
        resolver: IdentityResolver,
        api: Arc<RecordingApi>,
    }

    fn fixture() -> Fixture {
        let sessions = Arc::new(
            SessionTokenIssuer::new(
                &SecretString::new("registration-secret"),
                Duration::from_secs(3600),
                Duration::from_secs(1800),
            )
            .unwrap(),
        );
        let resolver = IdentityResolver::new(Arc::new(MemoryStore::new()));
        let api = Arc::new(RecordingApi::default());
        let service = RegistrationService::new(
            sessions.clone(),
            resolver.clone(),
            NotificationPusher::new(api.clone()),
        );
        Fixture {
            service,
            sessions,
            resolver,
            api,
        }
    }

    fn form(token: String) -> RegistrationForm {
        RegistrationForm {
            token,
            full_name: "Somchai Jaidee".into(),
            student_id: "6510000001".into(),
            email: "somchai@example.com".into(),
        }
    }

    #[tokio::test]
    async fn provisional_registration_completes() {
        let f = fixture();
        let id = ChatIdentity::new("U5");
        f.resolver
            .upsert_by_chat_identity(&id, &ProfilePatch::display("Som", None))
            .await
            .unwrap();
        let provisional = f.sessions.issue(&id, true).unwrap();

        let outcome = f.service.complete(&form(provisional)).await.unwrap();

        assert!(outcome.profile.is_registered());
        assert_eq!(outcome.profile.display_name, "Som");
        assert_eq!(outcome.profile.username.as_deref(), Some("Somchai Jaidee"));
        assert_eq!(f.sessions.verify_full(&outcome.token), Some(id.clone()));
        assert!(outcome.pushed);

        let pushes = f.api.pushes.lock().unwrap();
        assert_eq!(pushes.len(), 1);
        assert_eq!(pushes[0].0, "U5");
        assert!(pushes[0].1.contains(&outcome.token));
    }

    #[tokio::test]
    async fn registration_without_profile_uses_full_name() {
        let f = fixture();
        let token = f.sessions.issue(&ChatIdentity::new("U6"), true).unwrap();
        let outcome = f.service.complete(&form(token)).await.unwrap();
        assert_eq!(outcome.profile.display_name, "Somchai Jaidee");
    }

    #[tokio::test]
    async fn missing_field_is_rejected_and_nothing_stored() {
        let f = fixture();
        let id = ChatIdentity::new("U7");
        let mut bad = form(f.sessions.issue(&id, true).unwrap());
        bad.student_id = "  ".into();

        let err = f.service.complete(&bad).await.unwrap_err();
        assert!(matches!(err, AuthError::MissingParameter(p) if p == "studentId"));
        assert_eq!(f.resolver.resolve(&id).await.unwrap(), RegistrationStatus::Unknown);
        assert!(f.api.pushes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn bad_token_is_authentication_error() {
        let f = fixture();
        let err = f.service.complete(&form("garbage".into())).await.unwrap_err();
        assert!(matches!(err, AuthError::Authentication(_)));
        assert!(matches!(
            f.service.prepare("garbage").await.unwrap_err(),
            AuthError::Authentication(_)
        ));
    }

    #[tokio::test]
    async fn prepare_creates_placeholder_once() {
        let f = fixture();
        let token = f.sessions.issue(&ChatIdentity::new("U8"), true).unwrap();

        let first = f.service.prepare(&token).await.unwrap();
        let second = f.service.prepare(&token).await.unwrap();
        assert_eq!(first.display_name, PLACEHOLDER_NAME);
        assert_eq!(first.id, second.id);
        assert!(!first.is_registered());
    }
}
