//! Tool/function calling types

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A named, schema-described capability offered by a tool provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Tool name (function name)
    pub name: String,
    /// Description of what the tool does
    #[serde(default)]
    pub description: String,
    /// JSON Schema for the input parameters
    #[serde(rename = "inputSchema", default = "empty_object_schema")]
    pub input_schema: Value,
}

fn empty_object_schema() -> Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

impl ToolDescriptor {
    /// Create a tool descriptor with an empty object schema
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: empty_object_schema(),
        }
    }

    /// Set the input schema
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }
}

/// Tool call requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this tool call
    pub id: String,
    /// Name of the tool being called
    pub name: String,
    /// Input arguments for the tool
    pub input: Value,
}

impl ToolCall {
    /// Create a new tool call
    pub fn new(id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            input,
        }
    }

    /// Get an input argument by key
    pub fn get_arg(&self, key: &str) -> Option<&Value> {
        self.input.get(key)
    }

    /// Get an input argument as a string
    pub fn get_arg_str(&self, key: &str) -> Option<&str> {
        self.input.get(key).and_then(|v| v.as_str())
    }

    /// Get an input argument as a list of strings.
    ///
    /// Returns `None` when the argument is missing or any element is not a string.
    pub fn get_arg_str_list(&self, key: &str) -> Option<Vec<String>> {
        self.input
            .get(key)?
            .as_array()?
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect()
    }
}

/// Tool result to send back to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// ID of the tool call this is responding to
    #[serde(rename = "callId")]
    pub call_id: String,
    /// The result content
    pub content: String,
    /// Whether this result represents an error
    #[serde(rename = "isError", default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolResult {
    /// Create a successful tool result
    pub fn success(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            content: content.into(),
            is_error: false,
        }
    }

    /// Create an error tool result
    pub fn error(call_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            content: error.into(),
            is_error: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_descriptor_defaults_to_object_schema() {
        let tool = ToolDescriptor::new("echo", "Echo the input");
        assert_eq!(tool.input_schema["type"], "object");

        let parsed: ToolDescriptor = serde_json::from_value(json!({ "name": "bare" })).unwrap();
        assert_eq!(parsed.description, "");
        assert_eq!(parsed.input_schema["type"], "object");
    }

    #[test]
    fn test_tool_call_args() {
        let call = ToolCall::new(
            "call_123",
            "add_provider",
            json!({
                "name": "calc",
                "args": ["--stdio", "-v"],
                "bad": [1, "x"]
            }),
        );

        assert_eq!(call.get_arg_str("name"), Some("calc"));
        assert_eq!(call.get_arg_str("nonexistent"), None);
        assert_eq!(
            call.get_arg_str_list("args"),
            Some(vec!["--stdio".to_string(), "-v".to_string()])
        );
        assert_eq!(call.get_arg_str_list("bad"), None);
        assert!(call.get_arg("args").is_some());
    }

    #[test]
    fn test_tool_result() {
        let success = ToolResult::success("call_123", "4");
        assert!(!success.is_error);

        let error = ToolResult::error("call_456", "Tool not found: nope");
        assert!(error.is_error);
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("\"isError\":true"));
    }
}
