//! Request and response types in the OpenAI chat-completions format.

use serde::{Deserialize, Deserializer, Serialize};

/// A message in a chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    /// "system", "user", "assistant" or "tool".
    pub role: String,

    /// Message text. Providers send `null` alongside tool calls; that
    /// deserializes to an empty string.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: String,

    /// For tool-result messages, the id of the call being answered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Calls the assistant asked for in this turn.
    ///
    /// Only set on assistant messages; absent means "answer is final".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl ChatMessage {
    /// A plain message with `role` and no tool fields.
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            tool_call_id: None,
            tool_calls: None,
        }
    }

    /// A `system` message: persona, rules or injected context.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    /// A `user` message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    /// An `assistant` message without tool calls.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }

    /// The assistant turn that requested `calls`, echoed back so the
    /// following tool messages have something to answer.
    pub fn assistant_tool_calls(content: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: Some(calls),
            ..Self::assistant(content)
        }
    }

    /// A `tool` message carrying the result of call `call_id`.
    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(call_id.into()),
            ..Self::new("tool", content)
        }
    }

    /// Tool calls requested in this message, if any.
    pub fn requested_calls(&self) -> &[ToolCall] {
        self.tool_calls.as_deref().unwrap_or_default()
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}

/// A tool call requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    /// Provider-assigned id, echoed in the matching tool result.
    pub id: String,

    /// Always "function".
    #[serde(rename = "type", default = "function_type")]
    pub call_type: String,

    /// Which tool to run, and with what.
    pub function: FunctionCall,
}

fn function_type() -> String {
    "function".into()
}

impl ToolCall {
    /// A function call to `name` with JSON-encoded `arguments`.
    pub fn function(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            call_type: function_type(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

/// Name and arguments of a requested tool call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionCall {
    /// Registered tool name.
    pub name: String,

    /// Arguments as a JSON-encoded string.
    #[serde(default)]
    pub arguments: String,
}

/// A chat completion request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    /// Model name, e.g. `gpt-5`.
    pub model: String,

    /// Whole conversation so far, system messages first.
    pub messages: Vec<ChatMessage>,

    /// Completion token cap; omitted when `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<i32>,

    /// Sampling temperature; omitted when `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    /// Tool definitions in OpenAI function format.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<serde_json::Value>,
}

impl ChatRequest {
    /// Request with no limits and no tools.
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            max_tokens: None,
            temperature: None,
            tools: Vec::new(),
        }
    }
}

/// A chat completion response.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatResponse {
    /// Provider response id; empty if the endpoint leaves it out.
    #[serde(default)]
    pub id: String,

    /// Candidate completions; we always ask for one.
    pub choices: Vec<Choice>,

    /// Token accounting, when the provider reports it.
    #[serde(default)]
    pub usage: Option<Usage>,

    /// Model that actually served the request.
    #[serde(default)]
    pub model: String,
}

impl ChatResponse {
    /// The first choice's message, which is the only one we request.
    pub fn message(&self) -> Option<&ChatMessage> {
        self.choices.first().map(|c| &c.message)
    }
}

/// One candidate completion.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Choice {
    /// Position among the choices.
    #[serde(default)]
    pub index: i32,

    /// The assistant turn, possibly with tool calls.
    pub message: ChatMessage,

    /// "stop", "tool_calls", "length", ...
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Token counts for one completion, logged at debug level.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Usage {
    /// Tokens in the request messages and tool definitions.
    pub prompt_tokens: i32,
    /// Tokens generated.
    pub completion_tokens: i32,
    pub total_tokens: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_content_with_tool_calls_parses() {
        let json = r#"{
            "role": "assistant",
            "content": null,
            "tool_calls": [{
                "id": "call_1",
                "type": "function",
                "function": {"name": "get_order", "arguments": "{\"order_id\":\"123\"}"}
            }]
        }"#;
        let msg: ChatMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.content, "");
        assert_eq!(msg.requested_calls().len(), 1);
        assert_eq!(msg.requested_calls()[0].function.name, "get_order");
    }

    #[test]
    fn tool_result_serializes_call_id() {
        let msg = ChatMessage::tool_result("call_1", "{\"ok\":true}");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "tool");
        assert_eq!(json["tool_call_id"], "call_1");
        assert!(json.get("tool_calls").is_none());
    }

    #[test]
    fn request_omits_empty_tools() {
        let req = ChatRequest::new("gpt-5", vec![ChatMessage::user("hi")]);
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("tools").is_none());
        assert!(json.get("temperature").is_none());
    }

    #[test]
    fn response_message_is_first_choice() {
        let json = r#"{"choices": [{"message": {"role": "assistant", "content": "hello"}}]}"#;
        let resp: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.message().map(|m| m.content.as_str()), Some("hello"));
    }

    #[test]
    fn plain_message_has_no_calls() {
        assert!(ChatMessage::user("x").requested_calls().is_empty());
    }
}
