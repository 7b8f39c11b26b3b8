//! Recommendation tools backed by an external recommender service.
//!
//! The service exposes two endpoints:
//!
//! - `GET /recommendations/{user_id}?n_recommendations=N`
//! - `GET /trending?n_recommendations=N`
//!
//! Both answer with a JSON array of `{ "item_name": ..., "score": ... }`.
//! Only the item names are handed to the model.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mealbot_core::tools::registry::{Tool, ToolError, parse_args};
use mealbot_types::MealbotError;
use mealbot_types::config::RecommenderConfig;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;
use url::Url;

const DEFAULT_COUNT: u32 = 5;
const MAX_COUNT: u32 = 50;

#[derive(Debug, Deserialize)]
struct RecommendedItem {
    item_name: String,
}

/// HTTP client for the recommender service.
pub struct RecommenderClient {
    http: reqwest::Client,
    base_url: Url,
}

impl RecommenderClient {
    /// Client for the service rooted at `base_url`.
    ///
    /// Fails on an unparsable URL or one that cannot carry paths.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, MealbotError> {
        let base_url = Url::parse(base_url).map_err(|e| MealbotError::ConfigInvalid {
            reason: format!("recommender base url '{base_url}': {e}"),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(MealbotError::ConfigInvalid {
                reason: format!("recommender base url '{base_url}' cannot be a base"),
            });
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MealbotError::ConfigInvalid {
                reason: format!("recommender http client: {e}"),
            })?;
        Ok(Self { http, base_url })
    }

    /// Client from the `[recommender]` section.
    pub fn from_config(cfg: &RecommenderConfig) -> Result<Self, MealbotError> {
        Self::new(&cfg.base_url, Duration::from_secs(cfg.timeout_secs.max(1)))
    }

    /// Personalised item names for `user_id`.
    pub async fn recommendations(&self, user_id: &str, n: u32) -> Result<Vec<String>, ToolError> {
        let url = self.endpoint(&["recommendations", user_id], n)?;
        self.fetch(url).await
    }

    /// Currently trending item names.
    pub async fn trending(&self, n: u32) -> Result<Vec<String>, ToolError> {
        let url = self.endpoint(&["trending"], n)?;
        self.fetch(url).await
    }

    fn endpoint(&self, segments: &[&str], n: u32) -> Result<Url, ToolError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ToolError::ExecutionFailed("recommender url cannot be a base".into()))?
            .pop_if_empty()
            .extend(segments);
        url.query_pairs_mut()
            .append_pair("n_recommendations", &n.to_string());
        Ok(url)
    }

    async fn fetch(&self, url: Url) -> Result<Vec<String>, ToolError> {
        debug!(url = %url, "querying recommender");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ToolError::ExecutionFailed(format!("recommender unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::ExecutionFailed(format!(
                "recommender returned HTTP {status}"
            )));
        }

        let items: Vec<RecommendedItem> = response
            .json()
            .await
            .map_err(|e| ToolError::ExecutionFailed(format!("bad recommender response: {e}")))?;
        Ok(items.into_iter().map(|i| i.item_name).collect())
    }
}

fn default_count() -> u32 {
    DEFAULT_COUNT
}

fn clamp_count(n: u32) -> u32 {
    n.clamp(1, MAX_COUNT)
}

// ---------------------------------------------------------------------------
// RecommendationsTool
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct RecommendationsArgs {
    user_id: String,
    #[serde(default = "default_count")]
    n_recommendations: u32,
}

/// `get_recommendations`: personalised dish names for one customer.
pub struct RecommendationsTool {
    client: Arc<RecommenderClient>,
}

impl RecommendationsTool {
    pub fn new(client: Arc<RecommenderClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for RecommendationsTool {
    fn name(&self) -> &str {
        "get_recommendations"
    }

    fn description(&self) -> &str {
        "Suggest menu items for a customer based on what similar customers order."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "user_id": {"type": "string"},
                "n_recommendations": {"type": "integer", "minimum": 1, "default": DEFAULT_COUNT}
            },
            "required": ["user_id"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: RecommendationsArgs = parse_args(args)?;
        let names = self
            .client
            .recommendations(&args.user_id, clamp_count(args.n_recommendations))
            .await?;
        Ok(json!(names))
    }
}

// ---------------------------------------------------------------------------
// TrendingItemsTool
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct TrendingArgs {
    #[serde(default = "default_count")]
    n_recommendations: u32,
}

/// `get_trending_items`: dishes popular across all customers.
pub struct TrendingItemsTool {
    client: Arc<RecommenderClient>,
}

impl TrendingItemsTool {
    pub fn new(client: Arc<RecommenderClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for TrendingItemsTool {
    fn name(&self) -> &str {
        "get_trending_items"
    }

    fn description(&self) -> &str {
        "List the menu items that are popular right now."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "n_recommendations": {"type": "integer", "minimum": 1, "default": DEFAULT_COUNT}
            }
        })
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: TrendingArgs = parse_args(args)?;
        let names = self
            .client
            .trending(clamp_count(args.n_recommendations))
            .await?;
        Ok(json!(names))
    }
}
