//! [`Tool`] trait, [`ToolRegistry`] and [`ToolResult`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

/// Error type for tool execution.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// The model asked for a tool that is not registered.
    #[error("tool not found: {0}")]
    NotFound(String),

    /// Arguments are missing a required field or have the wrong type.
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    /// The tool ran but its backend failed; the message is shown to the model.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),
}

/// Decode tool arguments into a typed record.
pub fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArgs(e.to_string()))
}

/// A named operation the model may call mid-reasoning.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Function name the model calls. Unique within a registry.
    fn name(&self) -> &str;

    /// Sent to the model; say when the tool should be used.
    fn description(&self) -> &str;

    /// JSON Schema for the arguments object.
    fn parameters(&self) -> Value;

    /// Run with the model's decoded arguments and return a JSON result.
    async fn execute(&self, args: Value) -> Result<Value, ToolError>;
}

/// Outcome of one tool call, as fed back to the model.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolResult {
    /// The tool's JSON output.
    Success(Value),
    /// Error text; the model decides how to recover.
    Failure(String),
}

impl ToolResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ToolResult::Success(_))
    }

    /// JSON text for the `tool` message content.
    pub fn to_content(&self) -> String {
        let body = match self {
            ToolResult::Success(value) => serde_json::json!({ "success": true, "value": value }),
            ToolResult::Failure(error) => serde_json::json!({ "success": false, "error": error }),
        };
        body.to_string()
    }
}

impl From<Result<Value, ToolError>> for ToolResult {
    fn from(result: Result<Value, ToolError>) -> Self {
        match result {
            Ok(value) => ToolResult::Success(value),
            Err(e) => ToolResult::Failure(e.to_string()),
        }
    }
}

/// Tools by name.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_owned();
        debug!(tool = %name, "registering tool");
        self.tools.insert(name, tool);
    }

    /// Tool registered under `name`.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Sorted tool names.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Tool definitions in OpenAI function-calling format, sorted by name.
    pub fn schemas(&self) -> Vec<Value> {
        self.list()
            .into_iter()
            .filter_map(|name| {
                let tool = self.tools.get(&name)?;
                Some(serde_json::json!({
                    "type": "function",
                    "function": {
                        "name": name,
                        "description": tool.description(),
                        "parameters": tool.parameters(),
                    }
                }))
            })
            .collect()
    }

    /// Validate and execute a call whose arguments are still JSON text.
    pub async fn execute(&self, name: &str, raw_args: &str) -> Result<Value, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_owned()))?;

        let args: Value = if raw_args.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(raw_args)
                .map_err(|e| ToolError::InvalidArgs(format!("arguments are not JSON: {e}")))?
        };
        check_structure(&tool.parameters(), &args)?;

        debug!(tool = %name, "executing tool");
        tool.execute(args).await
    }

    /// Like [`execute`](Self::execute), but never fails: errors become a
    /// [`ToolResult::Failure`] for the model to read.
    pub async fn invoke(&self, name: &str, raw_args: &str) -> ToolResult {
        let result = self.execute(name, raw_args).await;
        if let Err(e) = &result {
            warn!(tool = %name, error = %e, "tool call failed");
        }
        result.into()
    }
}

/// Reject non-object arguments and missing `required` properties.
fn check_structure(schema: &Value, args: &Value) -> Result<(), ToolError> {
    let Some(obj) = args.as_object() else {
        return Err(ToolError::InvalidArgs("arguments must be an object".into()));
    };
    let required = schema
        .get("required")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    for field in required.iter().filter_map(Value::as_str) {
        if obj.get(field).is_none_or(Value::is_null) {
            return Err(ToolError::InvalidArgs(format!("missing required field: {field}")));
        }
    }
    Ok(())
}
