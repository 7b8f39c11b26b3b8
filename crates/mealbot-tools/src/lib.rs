//! Tool implementations for the mealbot agent.
//!
//! # Tools
//!
//! - **Order tools** ([`order_tools`]): `create_order`, `get_order`,
//!   `get_user_orders`, `get_user_orders_by_status`,
//!   `get_latest_user_order`, `update_order_status`, `cancel_order`,
//!   `get_orders_by_date_range`
//! - **Product tools** ([`product_tools`]): `find_product_by_name`,
//!   `get_product_by_id`, `list_all_products`, `filter_products_by_status`,
//!   `search_products`
//! - **Recommendation tools** ([`recommend`]): `get_recommendations`,
//!   `get_trending_items`
//!
//! Every tool decodes its arguments into a typed record; a mismatch comes
//! back to the model as a failed tool result.

pub mod order_tools;
pub mod product_tools;
pub mod recommend;

use std::sync::Arc;

use mealbot_core::tools::registry::{ToolError, ToolRegistry};
use mealbot_store::{OrderStore, ProductStore};
use mealbot_types::StoreError;

use crate::recommend::RecommenderClient;

/// Register every tool in this crate with `registry`.
pub fn register_all(
    registry: &mut ToolRegistry,
    orders: Arc<dyn OrderStore>,
    products: Arc<dyn ProductStore>,
    recommender: Arc<RecommenderClient>,
) {
    registry.register(Arc::new(order_tools::CreateOrderTool::new(orders.clone())));
    registry.register(Arc::new(order_tools::GetOrderTool::new(orders.clone())));
    registry.register(Arc::new(order_tools::GetUserOrdersTool::new(orders.clone())));
    registry.register(Arc::new(order_tools::GetUserOrdersByStatusTool::new(
        orders.clone(),
    )));
    registry.register(Arc::new(order_tools::GetLatestUserOrderTool::new(
        orders.clone(),
    )));
    registry.register(Arc::new(order_tools::UpdateOrderStatusTool::new(
        orders.clone(),
    )));
    registry.register(Arc::new(order_tools::CancelOrderTool::new(orders.clone())));
    registry.register(Arc::new(order_tools::OrdersByDateRangeTool::new(orders)));

    registry.register(Arc::new(product_tools::FindProductByNameTool::new(
        products.clone(),
    )));
    registry.register(Arc::new(product_tools::GetProductByIdTool::new(
        products.clone(),
    )));
    registry.register(Arc::new(product_tools::ListAllProductsTool::new(
        products.clone(),
    )));
    registry.register(Arc::new(product_tools::FilterProductsByStatusTool::new(
        products.clone(),
    )));
    registry.register(Arc::new(product_tools::SearchProductsTool::new(products)));

    registry.register(Arc::new(recommend::RecommendationsTool::new(
        recommender.clone(),
    )));
    registry.register(Arc::new(recommend::TrendingItemsTool::new(recommender)));
}

pub(crate) fn store_failure(err: StoreError) -> ToolError {
    ToolError::ExecutionFailed(err.to_string())
}

pub(crate) fn to_value<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, ToolError> {
    serde_json::to_value(value).map_err(|e| ToolError::ExecutionFailed(e.to_string()))
}
