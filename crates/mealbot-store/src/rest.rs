//! REST backend for an external CRUD service.
//!
//! Routes, relative to the configured base URL:
//!
//! | Operation | Route |
//! |---|---|
//! | profile by identity | `GET /users/by-chat/{identity}` |
//! | profile by id | `GET /users/{id}` |
//! | upsert by identity | `PUT /users/by-chat/{identity}` (body: patch) |
//! | create order | `POST /orders` |
//! | order by id | `GET /orders/{id}` |
//! | list orders | `GET /orders?userId=&status=` or `GET /orders?start=&end=` |
//! | latest order | `GET /orders/latest?userId=` |
//! | update status | `PATCH /orders/{id}` (body: `{"status": ...}`) |
//! | cancel | `POST /orders/{id}/cancel` |
//! | products | `GET /products`, `GET /products/{id}`, `GET /products?name=`, `GET /products?status=` |
//!
//! A 404 maps to "absent"; other failures map to [`StoreError::Backend`].

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mealbot_types::{ChatIdentity, Profile, ProfilePatch, StoreError};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::model::{NewOrder, Order, Product};
use crate::traits::{OrderStore, ProductStore, ProfileStore};

/// Store client for the CRUD service.
pub struct RestStore {
    http: Client,
    base_url: Url,
}

impl RestStore {
    /// Client for the service rooted at `base_url`.
    ///
    /// `timeout` bounds each request; a timed-out call is a
    /// [`StoreError::Backend`].
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, StoreError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| StoreError::Backend(format!("invalid base url {base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::Backend(format!("not a base url: {base_url}")));
        }
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(Self { http, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Send and decode, mapping 404 to `None`.
    async fn fetch_optional<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
    ) -> Result<Option<T>, StoreError> {
        let resp = req.send().await.map_err(backend)?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Backend(format!("HTTP {status}: {body}")));
        }
        resp.json::<T>()
            .await
            .map(Some)
            .map_err(|e| StoreError::InvalidDocument(e.to_string()))
    }

    async fn fetch<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, StoreError> {
        self.fetch_optional(req)
            .await?
            .ok_or_else(|| StoreError::NotFound("resource".into()))
    }

    /// Send a write whose body we do not need; `false` on 404.
    async fn send_write(&self, req: RequestBuilder) -> Result<bool, StoreError> {
        let resp = req.send().await.map_err(backend)?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Backend(format!("HTTP {status}: {body}")));
        }
        Ok(true)
    }
}

fn backend(e: reqwest::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

#[async_trait]
impl ProfileStore for RestStore {
    async fn get_by_chat_identity(
        &self,
        identity: &ChatIdentity,
    ) -> Result<Option<Profile>, StoreError> {
        let url = self.endpoint(&["users", "by-chat", identity.as_str()]);
        self.fetch_optional(self.http.get(url)).await
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Profile>, StoreError> {
        let url = self.endpoint(&["users", id]);
        self.fetch_optional(self.http.get(url)).await
    }

    async fn upsert_by_chat_identity(
        &self,
        identity: &ChatIdentity,
        patch: &ProfilePatch,
    ) -> Result<Profile, StoreError> {
        debug!(chat_identity = %identity, "upserting profile");
        let url = self.endpoint(&["users", "by-chat", identity.as_str()]);
        self.fetch(self.http.put(url).json(patch)).await
    }
}

#[async_trait]
impl OrderStore for RestStore {
    async fn create(&self, order: NewOrder) -> Result<Order, StoreError> {
        let url = self.endpoint(&["orders"]);
        self.fetch(self.http.post(url).json(&order)).await
    }

    async fn get(&self, id: &str) -> Result<Option<Order>, StoreError> {
        let url = self.endpoint(&["orders", id]);
        self.fetch_optional(self.http.get(url)).await
    }

    async fn list_by_user(
        &self,
        user_id: &str,
        status: Option<&str>,
    ) -> Result<Vec<Order>, StoreError> {
        let mut query = vec![("userId", user_id)];
        if let Some(status) = status {
            query.push(("status", status));
        }
        let url = self.endpoint(&["orders"]);
        Ok(self
            .fetch_optional(self.http.get(url).query(&query))
            .await?
            .unwrap_or_default())
    }

    async fn latest_for_user(&self, user_id: &str) -> Result<Option<Order>, StoreError> {
        let url = self.endpoint(&["orders", "latest"]);
        self.fetch_optional(self.http.get(url).query(&[("userId", user_id)]))
            .await
    }

    async fn list_by_date_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Order>, StoreError> {
        let url = self.endpoint(&["orders"]);
        let query = [("start", start.to_rfc3339()), ("end", end.to_rfc3339())];
        Ok(self
            .fetch_optional(self.http.get(url).query(&query))
            .await?
            .unwrap_or_default())
    }

    async fn update_status(&self, id: &str, status: &str) -> Result<bool, StoreError> {
        let url = self.endpoint(&["orders", id]);
        self.send_write(
            self.http
                .patch(url)
                .json(&serde_json::json!({ "status": status })),
        )
        .await
    }

    async fn cancel(&self, id: &str) -> Result<bool, StoreError> {
        let url = self.endpoint(&["orders", id, "cancel"]);
        self.send_write(self.http.post(url)).await
    }
}

#[async_trait]
impl ProductStore for RestStore {
    async fn get(&self, id: &str) -> Result<Option<Product>, StoreError> {
        let url = self.endpoint(&["products", id]);
        self.fetch_optional(self.http.get(url)).await
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Product>, StoreError> {
        let url = self.endpoint(&["products"]);
        let hits: Vec<Product> = self
            .fetch_optional(self.http.get(url).query(&[("name", name)]))
            .await?
            .unwrap_or_default();
        Ok(hits.into_iter().next())
    }

    async fn list_all(&self) -> Result<Vec<Product>, StoreError> {
        let url = self.endpoint(&["products"]);
        Ok(self
            .fetch_optional(self.http.get(url))
            .await?
            .unwrap_or_default())
    }

    async fn list_by_status(&self, status: &str) -> Result<Vec<Product>, StoreError> {
        let url = self.endpoint(&["products"]);
        Ok(self
            .fetch_optional(self.http.get(url).query(&[("status", status)]))
            .await?
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_escapes_segments() {
        let store = RestStore::new("http://store.local/api/", Duration::from_secs(1)).unwrap();
        let url = store.endpoint(&["users", "by-chat", "U1/../x"]);
        assert_eq!(
            url.as_str(),
            "http://store.local/api/users/by-chat/U1%2F..%2Fx"
        );
    }

    #[test]
    fn rejects_non_base_url() {
        assert!(RestStore::new("mailto:a@b", Duration::from_secs(1)).is_err());
        assert!(RestStore::new("not a url", Duration::from_secs(1)).is_err());
    }
}
