//! Menu lookup tools.

use std::sync::Arc;

use async_trait::async_trait;
use mealbot_core::tools::registry::{Tool, ToolError, parse_args};
use mealbot_store::{Product, ProductStore};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{store_failure, to_value};

// ---------------------------------------------------------------------------
// FindProductByNameTool
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ProductNameArgs {
    product_name: String,
}

/// `find_product_by_name`: exact-name menu lookup.
pub struct FindProductByNameTool {
    products: Arc<dyn ProductStore>,
}

impl FindProductByNameTool {
    pub fn new(products: Arc<dyn ProductStore>) -> Self {
        Self { products }
    }
}

#[async_trait]
impl Tool for FindProductByNameTool {
    fn name(&self) -> &str {
        "find_product_by_name"
    }

    fn description(&self) -> &str {
        "Look up a menu item by its exact name. Returns null if it is not on the menu."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"product_name": {"type": "string"}},
            "required": ["product_name"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: ProductNameArgs = parse_args(args)?;
        let product = self
            .products
            .find_by_name(args.product_name.trim())
            .await
            .map_err(store_failure)?;
        to_value(&product)
    }
}

// ---------------------------------------------------------------------------
// GetProductByIdTool
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ProductIdArgs {
    product_id: String,
}

/// `get_product_by_id`: one menu item by id.
pub struct GetProductByIdTool {
    products: Arc<dyn ProductStore>,
}

impl GetProductByIdTool {
    pub fn new(products: Arc<dyn ProductStore>) -> Self {
        Self { products }
    }
}

#[async_trait]
impl Tool for GetProductByIdTool {
    fn name(&self) -> &str {
        "get_product_by_id"
    }

    fn description(&self) -> &str {
        "Get a menu item by id."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"product_id": {"type": "string"}},
            "required": ["product_id"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: ProductIdArgs = parse_args(args)?;
        let product = self
            .products
            .get(&args.product_id)
            .await
            .map_err(store_failure)?;
        to_value(&product)
    }
}

// ---------------------------------------------------------------------------
// ListAllProductsTool
// ---------------------------------------------------------------------------

/// `list_all_products`: the whole menu.
pub struct ListAllProductsTool {
    products: Arc<dyn ProductStore>,
}

impl ListAllProductsTool {
    pub fn new(products: Arc<dyn ProductStore>) -> Self {
        Self { products }
    }
}

#[async_trait]
impl Tool for ListAllProductsTool {
    fn name(&self) -> &str {
        "list_all_products"
    }

    fn description(&self) -> &str {
        "List the whole menu. Use this to suggest alternatives when a dish is not found."
    }

    fn parameters(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn execute(&self, _args: Value) -> Result<Value, ToolError> {
        let products = self.products.list_all().await.map_err(store_failure)?;
        to_value(&products)
    }
}

// ---------------------------------------------------------------------------
// FilterProductsByStatusTool
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ProductStatusArgs {
    status: String,
}

/// `filter_products_by_status`: menu items with one status.
pub struct FilterProductsByStatusTool {
    products: Arc<dyn ProductStore>,
}

impl FilterProductsByStatusTool {
    pub fn new(products: Arc<dyn ProductStore>) -> Self {
        Self { products }
    }
}

#[async_trait]
impl Tool for FilterProductsByStatusTool {
    fn name(&self) -> &str {
        "filter_products_by_status"
    }

    fn description(&self) -> &str {
        "List menu items with the given status, e.g. 'available' or 'out_of_stock'."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"status": {"type": "string"}},
            "required": ["status"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: ProductStatusArgs = parse_args(args)?;
        let status = args.status.trim();
        if status.is_empty() {
            return Err(ToolError::InvalidArgs("status must not be empty".into()));
        }
        let products = self
            .products
            .list_by_status(status)
            .await
            .map_err(store_failure)?;
        to_value(&products)
    }
}

// ---------------------------------------------------------------------------
// SearchProductsTool
// ---------------------------------------------------------------------------

/// Maximum number of matches handed back to the model in one search.
const SEARCH_LIMIT: usize = 10;

#[derive(Deserialize)]
struct SearchArgs {
    keyword: String,
    #[serde(default)]
    status_filter: Option<String>,
    #[serde(default)]
    min_price: Option<f64>,
    #[serde(default)]
    max_price: Option<f64>,
}

impl SearchArgs {
    fn matches(&self, keyword: &str, product: &Product) -> bool {
        let in_name = product.product_name.to_lowercase().contains(keyword);
        let in_description = product
            .description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(keyword));
        if !(in_name || in_description) {
            return false;
        }
        if let Some(status) = self.status_filter.as_deref()
            && product.status != status
        {
            return false;
        }
        self.min_price.is_none_or(|min| product.price >= min)
            && self.max_price.is_none_or(|max| product.price <= max)
    }
}

/// Keyword search over names and descriptions, with optional status and
/// inclusive price bounds.
pub struct SearchProductsTool {
    products: Arc<dyn ProductStore>,
}

impl SearchProductsTool {
    pub fn new(products: Arc<dyn ProductStore>) -> Self {
        Self { products }
    }
}

#[async_trait]
impl Tool for SearchProductsTool {
    fn name(&self) -> &str {
        "search_products"
    }

    fn description(&self) -> &str {
        "Search the menu by keyword (case-insensitive, matches name or description). \
         Optionally narrow by status and an inclusive price range. \
         Returns at most 10 items plus the total number of matches."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "keyword": {"type": "string"},
                "status_filter": {"type": "string"},
                "min_price": {"type": "number", "minimum": 0},
                "max_price": {"type": "number", "minimum": 0}
            },
            "required": ["keyword"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: SearchArgs = parse_args(args)?;
        let keyword = args.keyword.trim().to_lowercase();
        if keyword.is_empty() {
            return Err(ToolError::InvalidArgs("keyword must not be empty".into()));
        }
        if args.min_price.is_some_and(|p| p < 0.0) || args.max_price.is_some_and(|p| p < 0.0) {
            return Err(ToolError::InvalidArgs("prices must not be negative".into()));
        }
        if let (Some(min), Some(max)) = (args.min_price, args.max_price)
            && min > max
        {
            return Err(ToolError::InvalidArgs(format!(
                "min_price {min} is above max_price {max}"
            )));
        }

        let mut hits = self.products.list_all().await.map_err(store_failure)?;
        hits.retain(|p| args.matches(&keyword, p));
        let total = hits.len();
        hits.truncate(SEARCH_LIMIT);
        Ok(json!({ "total": total, "products": to_value(&hits)? }))
    }
}

#[cfg(test)]
mod tests {
    use mealbot_store::MemoryStore;

    use super::*;

    fn menu() -> Arc<MemoryStore> {
        let product = |id: &str, name: &str, price: f64| Product {
            id: id.into(),
            product_name: name.into(),
            price,
            status: "available".into(),
            description: None,
            image: None,
        };
        Arc::new(MemoryStore::with_products([
            product("m1", "ข้าวกะเพรา", 50.0),
            product("m2", "ชาเย็น", 25.0),
        ]))
    }

    #[tokio::test]
    async fn find_by_name_trims_input() {
        let out = FindProductByNameTool::new(menu())
            .execute(json!({"product_name": " ชาเย็น "}))
            .await
            .unwrap();
        assert_eq!(out["id"], "m2");
        assert_eq!(out["price"], 25.0);
    }

    #[tokio::test]
    async fn unknown_name_is_null() {
        let out = FindProductByNameTool::new(menu())
            .execute(json!({"product_name": "พิซซ่า"}))
            .await
            .unwrap();
        assert!(out.is_null());
    }

    #[tokio::test]
    async fn get_by_id_and_list() {
        let store = menu();
        let out = GetProductByIdTool::new(store.clone())
            .execute(json!({"product_id": "m1"}))
            .await
            .unwrap();
        assert_eq!(out["productName"], "ข้าวกะเพรา");

        let all = ListAllProductsTool::new(store)
            .execute(json!({}))
            .await
            .unwrap();
        assert_eq!(all.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn numeric_id_is_invalid_args() {
        let err = GetProductByIdTool::new(menu())
            .execute(json!({"product_id": 1}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgs(_)));
    }

    fn canteen() -> Arc<MemoryStore> {
        let product = |id: &str, name: &str, price: f64, status: &str, description: Option<&str>| {
            Product {
                id: id.into(),
                product_name: name.into(),
                price,
                status: status.into(),
                description: description.map(Into::into),
                image: None,
            }
        };
        Arc::new(MemoryStore::with_products([
            product("c1", "Green Curry", 60.0, "available", Some("spicy coconut curry")),
            product("c2", "Massaman", 70.0, "out_of_stock", Some("mild curry with potato")),
            product("c3", "Pad Thai", 55.0, "available", None),
            product("c4", "Red Curry Noodles", 45.0, "available", None),
        ]))
    }

    fn ids(out: &Value) -> Vec<&str> {
        out["products"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["id"].as_str().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn filter_by_status() {
        let tool = FilterProductsByStatusTool::new(canteen());
        let out = tool.execute(json!({"status": "out_of_stock"})).await.unwrap();
        let items = out.as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["id"], "c2");

        let err = tool.execute(json!({"status": "  "})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgs(_)));
    }

    #[tokio::test]
    async fn search_matches_name_or_description_ignoring_case() {
        let out = SearchProductsTool::new(canteen())
            .execute(json!({"keyword": "CURRY"}))
            .await
            .unwrap();
        assert_eq!(out["total"], 3);
        assert_eq!(ids(&out), ["c1", "c2", "c4"]);
    }

    #[tokio::test]
    async fn search_applies_status_and_inclusive_price_bounds() {
        let tool = SearchProductsTool::new(canteen());
        let out = tool
            .execute(json!({
                "keyword": "curry",
                "status_filter": "available",
                "min_price": 45,
                "max_price": 60
            }))
            .await
            .unwrap();
        assert_eq!(ids(&out), ["c1", "c4"]);

        let out = tool
            .execute(json!({"keyword": "curry", "max_price": 44.99}))
            .await
            .unwrap();
        assert_eq!(out["total"], 0);
    }

    #[tokio::test]
    async fn search_caps_results_but_reports_total() {
        let products = (0..14).map(|i| Product {
            id: format!("s{i:02}"),
            product_name: format!("Somtam {i:02}"),
            price: 40.0,
            status: "available".into(),
            description: None,
            image: None,
        });
        let out = SearchProductsTool::new(Arc::new(MemoryStore::with_products(products)))
            .execute(json!({"keyword": "somtam"}))
            .await
            .unwrap();
        assert_eq!(out["total"], 14);
        assert_eq!(ids(&out).len(), SEARCH_LIMIT);
    }

    #[tokio::test]
    async fn search_rejects_bad_bounds() {
        let tool = SearchProductsTool::new(canteen());
        for args in [
            json!({"keyword": ""}),
            json!({"keyword": "curry", "min_price": 80, "max_price": 50}),
            json!({"keyword": "curry", "min_price": -1}),
        ] {
            let err = tool.execute(args).await.unwrap_err();
            assert!(matches!(err, ToolError::InvalidArgs(_)));
        }
    }
}
