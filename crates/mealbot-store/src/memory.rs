//! In-process store backend.
//!
//! All three collections sit behind one lock so profile upserts are atomic.
//! Contents are lost on restart.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mealbot_types::{ChatIdentity, Profile, ProfilePatch, StoreError};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::model::{NewOrder, Order, Product, STATUS_CANCELLED};
use crate::traits::{OrderStore, ProductStore, ProfileStore};

#[derive(Default)]
struct Collections {
    profiles: HashMap<String, Profile>,
    by_identity: HashMap<ChatIdentity, String>,
    orders: HashMap<String, Order>,
    products: HashMap<String, Product>,
}

/// Store backed by in-memory maps.
///
/// Implements all three store traits behind one lock. Used by default and
/// in tests; nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    /// Empty store with no menu.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the product catalog.
    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let products = products.into_iter().map(|p| (p.id.clone(), p)).collect();
        Self {
            inner: RwLock::new(Collections {
                products,
                ..Default::default()
            }),
        }
    }

    /// Insert or replace a profile as-is.
    pub async fn insert_profile(&self, profile: Profile) {
        let mut inner = self.inner.write().await;
        if let Some(identity) = &profile.chat_identity {
            inner.by_identity.insert(identity.clone(), profile.id.clone());
        }
        inner.profiles.insert(profile.id.clone(), profile);
    }

    /// Insert or replace an order as-is.
    pub async fn insert_order(&self, order: Order) {
        self.inner.write().await.orders.insert(order.id.clone(), order);
    }

    /// Number of stored profiles.
    pub async fn profile_count(&self) -> usize {
        self.inner.read().await.profiles.len()
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn get_by_chat_identity(
        &self,
        identity: &ChatIdentity,
    ) -> Result<Option<Profile>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_identity
            .get(identity)
            .and_then(|id| inner.profiles.get(id))
            .cloned())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Profile>, StoreError> {
        Ok(self.inner.read().await.profiles.get(id).cloned())
    }

    async fn upsert_by_chat_identity(
        &self,
        identity: &ChatIdentity,
        patch: &ProfilePatch,
    ) -> Result<Profile, StoreError> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();

        if let Some(id) = inner.by_identity.get(identity).cloned()
            && let Some(profile) = inner.profiles.get_mut(&id)
        {
            if patch.apply_to(profile) {
                profile.updated_at = Some(now);
                debug!(chat_identity = %identity, profile_id = %id, "profile updated");
            }
            return Ok(profile.clone());
        }

        let id = Uuid::new_v4().simple().to_string();
        let profile = Profile::from_patch(id.clone(), Some(identity.clone()), patch, now);
        inner.by_identity.insert(identity.clone(), id.clone());
        inner.profiles.insert(id.clone(), profile.clone());
        debug!(chat_identity = %identity, profile_id = %id, "profile created");
        Ok(profile)
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn create(&self, order: NewOrder) -> Result<Order, StoreError> {
        if !(order.price >= 0.0) {
            return Err(StoreError::InvalidDocument(
                "price must be non-negative".into(),
            ));
        }
        let order = order.into_order(Uuid::new_v4().simple().to_string(), Utc::now());
        self.inner
            .write()
            .await
            .orders
            .insert(order.id.clone(), order.clone());
        Ok(order)
    }

    async fn get(&self, id: &str) -> Result<Option<Order>, StoreError> {
        Ok(self.inner.read().await.orders.get(id).cloned())
    }

    async fn list_by_user(
        &self,
        user_id: &str,
        status: Option<&str>,
    ) -> Result<Vec<Order>, StoreError> {
        let inner = self.inner.read().await;
        let mut orders: Vec<Order> = inner
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .filter(|o| status.is_none_or(|s| o.status == s))
            .cloned()
            .collect();
        orders.sort_by_key(|o| o.created_at);
        Ok(orders)
    }

    async fn latest_for_user(&self, user_id: &str) -> Result<Option<Order>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .max_by_key(|o| o.created_at)
            .cloned())
    }

    async fn list_by_date_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Order>, StoreError> {
        let inner = self.inner.read().await;
        let mut orders: Vec<Order> = inner
            .orders
            .values()
            .filter(|o| o.created_at >= start && o.created_at <= end)
            .cloned()
            .collect();
        orders.sort_by_key(|o| o.created_at);
        Ok(orders)
    }

    async fn update_status(&self, id: &str, status: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        match inner.orders.get_mut(id) {
            Some(order) => {
                order.set_status(status, Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn cancel(&self, id: &str) -> Result<bool, StoreError> {
        self.update_status(id, STATUS_CANCELLED).await
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn get(&self, id: &str) -> Result<Option<Product>, StoreError> {
        Ok(self.inner.read().await.products.get(id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Product>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .products
            .values()
            .find(|p| p.product_name == name)
            .cloned())
    }

    async fn list_all(&self) -> Result<Vec<Product>, StoreError> {
        let inner = self.inner.read().await;
        let mut products: Vec<Product> = inner.products.values().cloned().collect();
        products.sort_by(|a, b| a.product_name.cmp(&b.product_name));
        Ok(products)
    }

    async fn list_by_status(&self, status: &str) -> Result<Vec<Product>, StoreError> {
        let mut products = self.list_all().await?;
        products.retain(|p| p.status == status);
        Ok(products)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;

    use super::*;

    fn new_order(user: &str) -> NewOrder {
        NewOrder {
            product_name: "ข้าวผัด".into(),
            user_id: user.into(),
            price: 45.0,
            addon: Vec::new(),
            status: "pending".into(),
            description: String::new(),
        }
    }

    #[tokio::test]
    async fn upsert_creates_then_merges() {
        let store = MemoryStore::new();
        let id = ChatIdentity::new("U1");

        let created = store
            .upsert_by_chat_identity(&id, &ProfilePatch::display("Alice", None))
            .await
            .unwrap();
        assert!(!created.is_registered());

        let registered = store
            .upsert_by_chat_identity(
                &id,
                &ProfilePatch {
                    student_id: Some("6400001".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(registered.id, created.id);
        assert!(registered.is_registered());

        let refreshed = store
            .upsert_by_chat_identity(&id, &ProfilePatch::display("Alice B", None))
            .await
            .unwrap();
        assert_eq!(refreshed.display_name, "Alice B");
        assert!(refreshed.is_registered());
        assert_eq!(store.profile_count().await, 1);
    }

    #[tokio::test]
    async fn concurrent_upserts_create_one_profile() {
        let store = Arc::new(MemoryStore::new());
        let id = ChatIdentity::new("U7");

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                let patch = if i % 2 == 0 {
                    ProfilePatch::display("Guest", None)
                } else {
                    ProfilePatch {
                        student_id: Some("6400007".into()),
                        ..Default::default()
                    }
                };
                store.upsert_by_chat_identity(&id, &patch).await.unwrap()
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(store.profile_count().await, 1);
        let profile = store.get_by_chat_identity(&id).await.unwrap().unwrap();
        assert!(profile.is_registered());
    }

    #[tokio::test]
    async fn get_by_id_after_upsert() {
        let store = MemoryStore::new();
        let p = store
            .upsert_by_chat_identity(&"U3".into(), &ProfilePatch::display("C", None))
            .await
            .unwrap();
        assert_eq!(store.get_by_id(&p.id).await.unwrap().unwrap(), p);
        assert!(store.get_by_id("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn orders_by_user_status_and_latest() {
        let store = MemoryStore::new();
        let first = store.create(new_order("p1")).await.unwrap();
        let mut second = new_order("p1").into_order("o2".into(), first.created_at + Duration::seconds(5));
        second.status = "making".into();
        store.insert_order(second.clone()).await;
        store.create(new_order("p2")).await.unwrap();

        assert_eq!(store.list_by_user("p1", None).await.unwrap().len(), 2);
        let making = store.list_by_user("p1", Some("making")).await.unwrap();
        assert_eq!(making, vec![second.clone()]);
        assert_eq!(store.latest_for_user("p1").await.unwrap().unwrap().id, "o2");
    }

    #[tokio::test]
    async fn cancel_marks_status_and_finish() {
        let store = MemoryStore::new();
        let order = store.create(new_order("p1")).await.unwrap();
        assert!(store.cancel(&order.id).await.unwrap());
        let order = OrderStore::get(&store, &order.id).await.unwrap().unwrap();
        assert_eq!(order.status, "cancelled");
        assert!(order.finished_at.is_some());
        assert!(!store.cancel("missing").await.unwrap());
    }

    #[tokio::test]
    async fn negative_price_rejected() {
        let store = MemoryStore::new();
        let mut order = new_order("p1");
        order.price = -1.0;
        assert!(matches!(
            store.create(order).await,
            Err(StoreError::InvalidDocument(_))
        ));
    }

    #[tokio::test]
    async fn date_range_is_inclusive() {
        let store = MemoryStore::new();
        let t0 = Utc::now();
        store.insert_order(new_order("p1").into_order("a".into(), t0)).await;
        store
            .insert_order(new_order("p1").into_order("b".into(), t0 + Duration::days(2)))
            .await;

        let hits = store
            .list_by_date_range(t0, t0 + Duration::days(1))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "a");
    }

    #[tokio::test]
    async fn products_lookup() {
        let store = MemoryStore::with_products([Product {
            id: "x1".into(),
            product_name: "ชาเย็น".into(),
            price: 25.0,
            status: "available".into(),
            description: None,
            image: None,
        }]);
        assert!(store.find_by_name("ชาเย็น").await.unwrap().is_some());
        assert!(ProductStore::get(&store, "x1").await.unwrap().is_some());
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn products_by_status() {
        let item = |id: &str, status: &str| Product {
            id: id.into(),
            product_name: format!("เมนู {id}"),
            price: 40.0,
            status: status.into(),
            description: None,
            image: None,
        };
        let store = MemoryStore::with_products([
            item("a", "available"),
            item("b", "out_of_stock"),
            item("c", "available"),
        ]);
        let ids: Vec<_> = store
            .list_by_status("available")
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert!(store.list_by_status("retired").await.unwrap().is_empty());
    }
}
