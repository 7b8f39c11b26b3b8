//! Collaborator interfaces consumed by the pipeline and the tools.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mealbot_types::{ChatIdentity, Profile, ProfilePatch, StoreError};

use crate::model::{NewOrder, Order, Product};

/// Profile records keyed by internal id and by chat identity.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Profile linked to `identity`, if any.
    async fn get_by_chat_identity(
        &self,
        identity: &ChatIdentity,
    ) -> Result<Option<Profile>, StoreError>;

    /// Profile by document id. Orders refer to customers this way.
    async fn get_by_id(&self, id: &str) -> Result<Option<Profile>, StoreError>;

    /// Create the profile if absent, otherwise merge `patch` into it.
    ///
    /// Must be atomic: two concurrent upserts for one identity produce one
    /// record, and neither can erase registration attributes written by
    /// the other.
    async fn upsert_by_chat_identity(
        &self,
        identity: &ChatIdentity,
        patch: &ProfilePatch,
    ) -> Result<Profile, StoreError>;
}

/// Customer orders.
///
/// `user_id` everywhere is the profile document id, never the chat
/// identity.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Store a new order and return it with its id and creation time.
    async fn create(&self, order: NewOrder) -> Result<Order, StoreError>;

    /// Order by id.
    async fn get(&self, id: &str) -> Result<Option<Order>, StoreError>;

    /// Orders for a user, optionally filtered by status.
    async fn list_by_user(
        &self,
        user_id: &str,
        status: Option<&str>,
    ) -> Result<Vec<Order>, StoreError>;

    /// The user's order with the newest `created_at`.
    async fn latest_for_user(&self, user_id: &str) -> Result<Option<Order>, StoreError>;

    /// Orders created within `[start, end]`.
    async fn list_by_date_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Order>, StoreError>;

    /// Returns `false` if no such order exists.
    async fn update_status(&self, id: &str, status: &str) -> Result<bool, StoreError>;

    /// Soft-cancel. Returns `false` if no such order exists.
    async fn cancel(&self, id: &str) -> Result<bool, StoreError>;
}

/// The menu. Read-only from the pipeline's side.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Menu item by id.
    async fn get(&self, id: &str) -> Result<Option<Product>, StoreError>;

    /// Exact-name lookup; the first match wins.
    async fn find_by_name(&self, name: &str) -> Result<Option<Product>, StoreError>;

    /// Every menu item, whatever its status.
    async fn list_all(&self) -> Result<Vec<Product>, StoreError>;

    /// Products whose status equals `status` exactly, e.g. `available`.
    async fn list_by_status(&self, status: &str) -> Result<Vec<Product>, StoreError>;
}
