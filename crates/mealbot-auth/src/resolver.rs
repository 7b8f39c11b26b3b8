//! Chat identity to profile.

use std::sync::Arc;

use mealbot_store::ProfileStore;
use mealbot_types::{ChatIdentity, Profile, ProfilePatch, RegistrationStatus, StoreError};
use tracing::debug;

/// Looks up and updates profiles by chat identity.
#[derive(Clone)]
pub struct IdentityResolver {
    store: Arc<dyn ProfileStore>,
}

impl IdentityResolver {
    /// Resolver reading and writing profiles through `store`.
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self { store }
    }

    /// Unknown, unregistered or registered.
    pub async fn resolve(&self, identity: &ChatIdentity) -> Result<RegistrationStatus, StoreError> {
        let profile = self.store.get_by_chat_identity(identity).await?;
        let status = RegistrationStatus::from_profile(profile);
        debug!(
            chat_identity = %identity,
            registered = status.is_registered(),
            known = status.profile().is_some(),
            "identity resolved"
        );
        Ok(status)
    }

    /// Create the profile if absent, otherwise merge `patch` into it.
    /// Blank registration attributes in `patch` never overwrite stored ones.
    pub async fn upsert_by_chat_identity(
        &self,
        identity: &ChatIdentity,
        patch: &ProfilePatch,
    ) -> Result<Profile, StoreError> {
        self.store.upsert_by_chat_identity(identity, patch).await
    }
}
