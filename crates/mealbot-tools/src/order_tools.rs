//! Order tools.
//!
//! Thin typed wrappers over [`OrderStore`]. Lookups that find nothing
//! return `null` rather than failing, so the model can tell "no such
//! order" apart from "the store is down".

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use mealbot_core::tools::registry::{Tool, ToolError, parse_args};
use mealbot_store::model::STATUS_PENDING;
use mealbot_store::{NewOrder, OrderStore};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::{store_failure, to_value};

#[derive(Deserialize)]
struct OrderIdArgs {
    order_id: String,
}

#[derive(Deserialize)]
struct UserIdArgs {
    user_id: String,
}

// ---------------------------------------------------------------------------
// CreateOrderTool
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct CreateOrderArgs {
    user_id: String,
    product_name: String,
    price: f64,
    #[serde(default)]
    addon: Vec<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    status: Option<String>,
}

/// Create an order for a customer.
pub struct CreateOrderTool {
    orders: Arc<dyn OrderStore>,
}

impl CreateOrderTool {
    pub fn new(orders: Arc<dyn OrderStore>) -> Self {
        Self { orders }
    }
}

#[async_trait]
impl Tool for CreateOrderTool {
    fn name(&self) -> &str {
        "create_order"
    }

    fn description(&self) -> &str {
        "Create a new order. Each add-on costs 10 baht and must be included in price. \
         Returns the new order id."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "user_id": {"type": "string", "description": "Customer profile id"},
                "product_name": {"type": "string"},
                "price": {"type": "number", "minimum": 0},
                "addon": {"type": "array", "items": {"type": "string"}},
                "description": {"type": "string", "description": "Preferences such as less spicy"},
                "status": {"type": "string", "description": "Defaults to pending"}
            },
            "required": ["user_id", "product_name", "price"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: CreateOrderArgs = parse_args(args)?;
        if !args.price.is_finite() || args.price < 0.0 {
            return Err(ToolError::InvalidArgs("price must be >= 0".into()));
        }
        if args.product_name.trim().is_empty() {
            return Err(ToolError::InvalidArgs("product_name must not be empty".into()));
        }

        let order = self
            .orders
            .create(NewOrder {
                product_name: args.product_name,
                user_id: args.user_id,
                price: args.price,
                addon: args.addon,
                status: args
                    .status
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| STATUS_PENDING.into()),
                description: args.description,
            })
            .await
            .map_err(store_failure)?;

        debug!(order_id = %order.id, user_id = %order.user_id, "order created");
        Ok(json!({ "order_id": order.id }))
    }
}

// ---------------------------------------------------------------------------
// GetOrderTool
// ---------------------------------------------------------------------------

/// `get_order`: one order by id.
pub struct GetOrderTool {
    orders: Arc<dyn OrderStore>,
}

impl GetOrderTool {
    pub fn new(orders: Arc<dyn OrderStore>) -> Self {
        Self { orders }
    }
}

#[async_trait]
impl Tool for GetOrderTool {
    fn name(&self) -> &str {
        "get_order"
    }

    fn description(&self) -> &str {
        "Get one order by its id. Returns null if it does not exist."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"order_id": {"type": "string"}},
            "required": ["order_id"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: OrderIdArgs = parse_args(args)?;
        let order = self.orders.get(&args.order_id).await.map_err(store_failure)?;
        to_value(&order)
    }
}

// ---------------------------------------------------------------------------
// GetUserOrdersTool
// ---------------------------------------------------------------------------

/// `get_user_orders`: every order of one customer.
pub struct GetUserOrdersTool {
    orders: Arc<dyn OrderStore>,
}

impl GetUserOrdersTool {
    pub fn new(orders: Arc<dyn OrderStore>) -> Self {
        Self { orders }
    }
}

#[async_trait]
impl Tool for GetUserOrdersTool {
    fn name(&self) -> &str {
        "get_user_orders"
    }

    fn description(&self) -> &str {
        "List every order placed by a customer."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"user_id": {"type": "string"}},
            "required": ["user_id"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: UserIdArgs = parse_args(args)?;
        let orders = self
            .orders
            .list_by_user(&args.user_id, None)
            .await
            .map_err(store_failure)?;
        to_value(&orders)
    }
}

// ---------------------------------------------------------------------------
// GetUserOrdersByStatusTool
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct UserStatusArgs {
    user_id: String,
    status: String,
}

/// `get_user_orders_by_status`: a customer's orders with one status.
pub struct GetUserOrdersByStatusTool {
    orders: Arc<dyn OrderStore>,
}

impl GetUserOrdersByStatusTool {
    pub fn new(orders: Arc<dyn OrderStore>) -> Self {
        Self { orders }
    }
}

#[async_trait]
impl Tool for GetUserOrdersByStatusTool {
    fn name(&self) -> &str {
        "get_user_orders_by_status"
    }

    fn description(&self) -> &str {
        "List a customer's orders that have the given status (pending, making, complete, cancelled)."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "user_id": {"type": "string"},
                "status": {"type": "string"}
            },
            "required": ["user_id", "status"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: UserStatusArgs = parse_args(args)?;
        let orders = self
            .orders
            .list_by_user(&args.user_id, Some(&args.status))
            .await
            .map_err(store_failure)?;
        to_value(&orders)
    }
}

// ---------------------------------------------------------------------------
// GetLatestUserOrderTool
// ---------------------------------------------------------------------------

/// `get_latest_user_order`: the customer's most recent order, for "my order".
pub struct GetLatestUserOrderTool {
    orders: Arc<dyn OrderStore>,
}

impl GetLatestUserOrderTool {
    pub fn new(orders: Arc<dyn OrderStore>) -> Self {
        Self { orders }
    }
}

#[async_trait]
impl Tool for GetLatestUserOrderTool {
    fn name(&self) -> &str {
        "get_latest_user_order"
    }

    fn description(&self) -> &str {
        "Get a customer's most recent order, or null if they have none."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"user_id": {"type": "string"}},
            "required": ["user_id"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: UserIdArgs = parse_args(args)?;
        let order = self
            .orders
            .latest_for_user(&args.user_id)
            .await
            .map_err(store_failure)?;
        to_value(&order)
    }
}

// ---------------------------------------------------------------------------
// UpdateOrderStatusTool
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct UpdateStatusArgs {
    order_id: String,
    status: String,
}

/// `update_order_status`: set an order's status.
pub struct UpdateOrderStatusTool {
    orders: Arc<dyn OrderStore>,
}

impl UpdateOrderStatusTool {
    pub fn new(orders: Arc<dyn OrderStore>) -> Self {
        Self { orders }
    }
}

#[async_trait]
impl Tool for UpdateOrderStatusTool {
    fn name(&self) -> &str {
        "update_order_status"
    }

    fn description(&self) -> &str {
        "Change an order's status."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "order_id": {"type": "string"},
                "status": {"type": "string"}
            },
            "required": ["order_id", "status"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: UpdateStatusArgs = parse_args(args)?;
        if args.status.trim().is_empty() {
            return Err(ToolError::InvalidArgs("status must not be empty".into()));
        }
        let updated = self
            .orders
            .update_status(&args.order_id, args.status.trim())
            .await
            .map_err(store_failure)?;

        let message = if updated {
            format!(
                "updated order {} to status '{}'",
                args.order_id,
                args.status.trim()
            )
        } else {
            format!("order {} does not exist", args.order_id)
        };
        Ok(json!({ "updated": updated, "message": message }))
    }
}

// ---------------------------------------------------------------------------
// CancelOrderTool
// ---------------------------------------------------------------------------

/// `cancel_order`: mark an order cancelled.
pub struct CancelOrderTool {
    orders: Arc<dyn OrderStore>,
}

impl CancelOrderTool {
    pub fn new(orders: Arc<dyn OrderStore>) -> Self {
        Self { orders }
    }
}

#[async_trait]
impl Tool for CancelOrderTool {
    fn name(&self) -> &str {
        "cancel_order"
    }

    fn description(&self) -> &str {
        "Cancel an order. Confirm with the customer before calling this."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"order_id": {"type": "string"}},
            "required": ["order_id"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: OrderIdArgs = parse_args(args)?;
        let cancelled = self
            .orders
            .cancel(&args.order_id)
            .await
            .map_err(store_failure)?;
        Ok(json!({ "cancelled": cancelled }))
    }
}

// ---------------------------------------------------------------------------
// OrdersByDateRangeTool
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct DateRangeArgs {
    start_date: String,
    end_date: String,
}

/// `get_orders_by_date_range`: orders created between two ISO dates, end day included.
pub struct OrdersByDateRangeTool {
    orders: Arc<dyn OrderStore>,
}

impl OrdersByDateRangeTool {
    pub fn new(orders: Arc<dyn OrderStore>) -> Self {
        Self { orders }
    }
}

/// Parse `YYYY-MM-DD` or a full RFC 3339 timestamp. A bare date maps to
/// the start of that day, or its last instant when `end_of_day` is set.
fn parse_bound(raw: &str, end_of_day: bool) -> Result<DateTime<Utc>, ToolError> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        let time = if end_of_day {
            NaiveTime::from_hms_milli_opt(23, 59, 59, 999)
        } else {
            Some(NaiveTime::MIN)
        };
        let time = time.ok_or_else(|| ToolError::InvalidArgs(format!("bad date: {raw}")))?;
        return Ok(date.and_time(time).and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ToolError::InvalidArgs(format!("expected YYYY-MM-DD, got '{raw}'")))
}

#[async_trait]
impl Tool for OrdersByDateRangeTool {
    fn name(&self) -> &str {
        "get_orders_by_date_range"
    }

    fn description(&self) -> &str {
        "List orders created between two dates (ISO format YYYY-MM-DD, both inclusive)."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "start_date": {"type": "string", "format": "date"},
                "end_date": {"type": "string", "format": "date"}
            },
            "required": ["start_date", "end_date"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: DateRangeArgs = parse_args(args)?;
        let start = parse_bound(&args.start_date, false)?;
        let end = parse_bound(&args.end_date, true)?;
        if end < start {
            return Err(ToolError::InvalidArgs(
                "end_date is before start_date".into(),
            ));
        }
        let orders = self
            .orders
            .list_by_date_range(start, end)
            .await
            .map_err(store_failure)?;
        to_value(&orders)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use mealbot_store::{MemoryStore, Order};

    use super::*;

    fn store() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::new())
    }

    fn order(id: &str, user: &str, day: u32) -> Order {
        Order {
            id: id.into(),
            product_name: "ข้าวกะเพรา".into(),
            user_id: user.into(),
            price: 50.0,
            addon: Vec::new(),
            status: "pending".into(),
            description: String::new(),
            created_at: Utc.with_ymd_and_hms(2025, 3, day, 12, 0, 0).unwrap(),
            finished_at: None,
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn create_then_get() {
        let store = store();
        let created = CreateOrderTool::new(store.clone())
            .execute(json!({
                "user_id": "p1",
                "product_name": "ข้าวกะเพรา",
                "price": 60,
                "addon": ["ไข่ดาว"],
                "description": "เผ็ดน้อย"
            }))
            .await
            .unwrap();
        let id = created["order_id"].as_str().unwrap().to_owned();

        let fetched = GetOrderTool::new(store)
            .execute(json!({"order_id": id}))
            .await
            .unwrap();
        assert_eq!(fetched["status"], "pending");
        assert_eq!(fetched["addon"], json!(["ไข่ดาว"]));
        assert_eq!(fetched["userId"], "p1");
    }

    #[tokio::test]
    async fn negative_price_is_invalid_args() {
        let err = CreateOrderTool::new(store())
            .execute(json!({"user_id": "p1", "product_name": "x", "price": -1}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgs(_)));
    }

    #[tokio::test]
    async fn addon_must_be_list_of_strings() {
        let err = CreateOrderTool::new(store())
            .execute(json!({"user_id": "p1", "product_name": "x", "price": 1, "addon": "egg"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgs(_)));
    }

    #[tokio::test]
    async fn missing_order_is_null() {
        let out = GetOrderTool::new(store())
            .execute(json!({"order_id": "nope"}))
            .await
            .unwrap();
        assert!(out.is_null());
    }

    #[tokio::test]
    async fn status_filter_and_latest() {
        let store = store();
        store.insert_order(order("o1", "p1", 1)).await;
        let mut done = order("o2", "p1", 2);
        done.status = "complete".into();
        store.insert_order(done).await;
        store.insert_order(order("o3", "p2", 3)).await;

        let pending = GetUserOrdersByStatusTool::new(store.clone())
            .execute(json!({"user_id": "p1", "status": "pending"}))
            .await
            .unwrap();
        assert_eq!(pending.as_array().unwrap().len(), 1);
        assert_eq!(pending[0]["id"], "o1");

        let latest = GetLatestUserOrderTool::new(store.clone())
            .execute(json!({"user_id": "p1"}))
            .await
            .unwrap();
        assert_eq!(latest["id"], "o2");

        let all = GetUserOrdersTool::new(store)
            .execute(json!({"user_id": "p1"}))
            .await
            .unwrap();
        assert_eq!(all.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn update_and_cancel_report_missing_orders() {
        let store = store();
        store.insert_order(order("o1", "p1", 1)).await;

        let out = UpdateOrderStatusTool::new(store.clone())
            .execute(json!({"order_id": "o1", "status": "making"}))
            .await
            .unwrap();
        assert_eq!(out["updated"], true);

        let out = UpdateOrderStatusTool::new(store.clone())
            .execute(json!({"order_id": "zz", "status": "making"}))
            .await
            .unwrap();
        assert_eq!(out["updated"], false);

        let out = CancelOrderTool::new(store.clone())
            .execute(json!({"order_id": "o1"}))
            .await
            .unwrap();
        assert_eq!(out["cancelled"], true);
        let o = OrderStore::get(store.as_ref(), "o1").await.unwrap().unwrap();
        assert_eq!(o.status, "cancelled");
    }

    #[tokio::test]
    async fn date_range_includes_whole_end_day() {
        let store = store();
        store.insert_order(order("o1", "p1", 1)).await;
        store.insert_order(order("o2", "p1", 2)).await;
        store.insert_order(order("o3", "p1", 3)).await;

        let out = OrdersByDateRangeTool::new(store)
            .execute(json!({"start_date": "2025-03-02", "end_date": "2025-03-03"}))
            .await
            .unwrap();
        let mut ids: Vec<&str> = out
            .as_array()
            .unwrap()
            .iter()
            .map(|o| o["id"].as_str().unwrap())
            .collect();
        ids.sort();
        assert_eq!(ids, ["o2", "o3"]);
    }

    #[tokio::test]
    async fn bad_date_is_invalid_args() {
        let err = OrdersByDateRangeTool::new(store())
            .execute(json!({"start_date": "yesterday", "end_date": "2025-03-03"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgs(_)));
    }
}
