//! Order status notifications from the kitchen side.

use axum::Json;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use mealbot_types::ChatIdentity;
use serde::Deserialize;
use tracing::{info, warn};

use super::AppState;

/// JSON body of `POST {prefix}/message/push/order-update`.
#[derive(Debug, Deserialize)]
pub struct OrderUpdate {
    /// Accepts `orderId` as sent by the kitchen frontend.
    #[serde(alias = "orderId")]
    pub order_id: String,
    /// New order status; picks the message text.
    pub status: String,
}

/// Query of the order-update route.
#[derive(Debug, Default, Deserialize)]
pub struct OrderUpdateQuery {
    /// Replaces the status line when present.
    #[serde(default, alias = "customMessage")]
    pub custom_message: Option<String>,
}

/// Body returned with 200 when the order or its owner cannot be found.
pub const USER_NOT_FOUND: &str = "User not found";

/// Status line for an order update.
pub fn status_message(status: &str) -> String {
    match status {
        "pending" => "✅ คำสั่งซื้อของคุณได้รับการยืนยันแล้ว".to_owned(),
        "making" => "👨‍🍳 กำลังเตรียมอาหารของคุณ".to_owned(),
        "complete" => "🎉 อาหารของคุณทำเสร็จแล้ว!!".to_owned(),
        "cancelled" => "❌ คำสั่งซื้อของคุณถูกยกเลิก".to_owned(),
        other => format!("สถานะคำสั่งซื้อ: {other}"),
    }
}

/// Push an order update to the customer's chat.
///
/// Any failure (unknown order, owner without a chat identity, store or
/// push error) answers a plain `"User not found"` with status 200; the
/// caller is a backend that does not act on it.
pub async fn order_update(
    State(state): State<AppState>,
    Query(query): Query<OrderUpdateQuery>,
    Json(update): Json<OrderUpdate>,
) -> Response {
    let order = match state.orders.get(&update.order_id).await {
        Ok(Some(order)) => order,
        Ok(None) => {
            warn!(order_id = %update.order_id, "order update for unknown order");
            return USER_NOT_FOUND.into_response();
        }
        Err(e) => {
            warn!(order_id = %update.order_id, error = %e, "order lookup failed");
            return USER_NOT_FOUND.into_response();
        }
    };
    let target: Option<ChatIdentity> = match state.profiles.get_by_id(&order.user_id).await {
        Ok(profile) => profile.and_then(|p| p.chat_identity),
        Err(e) => {
            warn!(user_id = %order.user_id, error = %e, "order owner lookup failed");
            None
        }
    };
    let Some(target) = target else {
        warn!(order_id = %order.id, user_id = %order.user_id, "order owner has no chat identity");
        return USER_NOT_FOUND.into_response();
    };

    let headline = query
        .custom_message
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| status_message(&update.status));
    let text = format!("{headline}\n\nหมายเลขคำสั่งซื้อ: {}", order.id);

    if !state.pusher.push(&target, &text).await {
        return USER_NOT_FOUND.into_response();
    }
    info!(order_id = %order.id, status = %update.status, "order update sent");
    Json(serde_json::json!({
        "status": "success",
        "message": "Order update notification sent"
    }))
    .into_response()
}
