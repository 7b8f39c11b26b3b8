//! Order and product documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Statuses that close an order and stamp `finished_at`.
const TERMINAL_STATUSES: &[&str] = &["complete", "completed", "finished", "cancelled", "canceled"];

/// Status of a freshly created order.
pub const STATUS_PENDING: &str = "pending";
/// Status set by `cancel_order`.
pub const STATUS_CANCELLED: &str = "cancelled";

/// A stored order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Store-assigned document id.
    pub id: String,
    pub product_name: String,
    /// Internal profile id of the customer.
    pub user_id: String,
    /// Total in baht, add-ons included.
    pub price: f64,
    /// Add-on names; each one is priced into `price`.
    #[serde(default)]
    pub addon: Vec<String>,
    /// Free-form; `pending`, `making`, `complete` and `cancelled` are the
    /// ones the kitchen uses.
    pub status: String,
    /// Customer's note for the kitchen.
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
    /// Set when the order reaches a terminal status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Last status change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Set a new status, stamping `updated_at` and, for terminal
    /// statuses, `finished_at`.
    pub fn set_status(&mut self, status: &str, now: DateTime<Utc>) {
        self.status = status.to_owned();
        self.updated_at = Some(now);
        if is_terminal(status) {
            self.finished_at = Some(now);
        }
    }
}

/// Whether `status` closes an order. Case-insensitive; both spellings of
/// completed and cancelled count.
pub fn is_terminal(status: &str) -> bool {
    TERMINAL_STATUSES.contains(&status.to_ascii_lowercase().as_str())
}

/// Fields supplied when creating an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub product_name: String,
    /// Internal profile id of the customer.
    pub user_id: String,
    pub price: f64,
    #[serde(default)]
    pub addon: Vec<String>,
    /// Defaults to [`STATUS_PENDING`].
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub description: String,
}

fn default_status() -> String {
    STATUS_PENDING.into()
}

impl NewOrder {
    /// The stored order under `id`, created at `now`.
    pub fn into_order(self, id: String, now: DateTime<Utc>) -> Order {
        Order {
            id,
            product_name: self.product_name,
            user_id: self.user_id,
            price: self.price,
            addon: self.addon,
            status: self.status,
            description: self.description,
            created_at: now,
            finished_at: None,
            updated_at: None,
        }
    }
}

/// A menu item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    /// Name customers order by; matched exactly by `find_by_name`.
    pub product_name: String,
    /// Base price in baht, without add-ons.
    pub price: f64,
    /// `available` unless the menu says otherwise.
    #[serde(default = "default_product_status")]
    pub status: String,
    /// Searched by `search_products` along with the name.
    #[serde(default)]
    pub description: Option<String>,
    /// Image URL.
    #[serde(default)]
    pub image: Option<String>,
}

fn default_product_status() -> String {
    "available".into()
}
