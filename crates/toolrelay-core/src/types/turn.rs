//! Conversation turn types

use serde::{Deserialize, Serialize};

use super::tool::{ToolCall, ToolResult};

/// Role of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    User,
    Assistant,
    ToolResult,
}

impl std::fmt::Display for TurnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TurnRole::User => write!(f, "user"),
            TurnRole::Assistant => write!(f, "assistant"),
            TurnRole::ToolResult => write!(f, "tool_result"),
        }
    }
}

/// One entry in a thread's ordered history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Who produced this turn
    pub role: TurnRole,
    /// Text or structured tool payload
    pub content: TurnContent,
}

impl ConversationTurn {
    /// Create a user turn
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: TurnContent::Text(content.into()),
        }
    }

    /// Create an assistant text turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: TurnContent::Text(content.into()),
        }
    }

    /// Create an assistant turn that requests tools.
    ///
    /// Any text the model produced alongside the requests is kept as a
    /// leading text part.
    pub fn tool_requests(text: impl Into<String>, calls: &[ToolCall]) -> Self {
        let text = text.into();
        let mut parts = Vec::with_capacity(calls.len() + 1);
        if !text.is_empty() {
            parts.push(ContentPart::text(text));
        }
        parts.extend(
            calls
                .iter()
                .map(|c| ContentPart::tool_use(c.id.clone(), c.name.clone(), c.input.clone())),
        );
        Self {
            role: TurnRole::Assistant,
            content: TurnContent::Parts(parts),
        }
    }

    /// Create a tool result turn
    pub fn tool_result(result: ToolResult) -> Self {
        Self {
            role: TurnRole::ToolResult,
            content: TurnContent::Parts(vec![ContentPart::ToolResult {
                tool_use_id: result.call_id,
                content: result.content,
                is_error: result.is_error,
            }]),
        }
    }

    /// Get the text content if this is a simple text turn
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            TurnContent::Text(s) => Some(s),
            TurnContent::Parts(_) => None,
        }
    }

    /// Tool calls carried by an assistant turn
    pub fn tool_calls(&self) -> Vec<ToolCall> {
        match &self.content {
            TurnContent::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::ToolUse { id, name, input } => {
                        Some(ToolCall::new(id.clone(), name.clone(), input.clone()))
                    }
                    _ => None,
                })
                .collect(),
            TurnContent::Text(_) => Vec::new(),
        }
    }

    /// Tool result carried by a tool result turn
    pub fn as_tool_result(&self) -> Option<ToolResult> {
        match &self.content {
            TurnContent::Parts(parts) => parts.iter().find_map(|p| match p {
                ContentPart::ToolResult {
                    tool_use_id,
                    content,
                    is_error,
                } => Some(ToolResult {
                    call_id: tool_use_id.clone(),
                    content: content.clone(),
                    is_error: *is_error,
                }),
                _ => None,
            }),
            TurnContent::Text(_) => None,
        }
    }
}

/// Turn content - either simple text or structured parts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TurnContent {
    /// Simple text content
    Text(String),
    /// Structured content with multiple parts
    Parts(Vec<ContentPart>),
}

impl From<String> for TurnContent {
    fn from(s: String) -> Self {
        TurnContent::Text(s)
    }
}

impl From<&str> for TurnContent {
    fn from(s: &str) -> Self {
        TurnContent::Text(s.to_string())
    }
}

impl From<Vec<ContentPart>> for TurnContent {
    fn from(parts: Vec<ContentPart>) -> Self {
        TurnContent::Parts(parts)
    }
}

/// Content part for tool-carrying turns
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Text content
    Text {
        text: String,
    },
    /// Tool use (assistant calling a tool)
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    /// Tool result (returning tool output)
    ToolResult {
        #[serde(rename = "tool_use_id")]
        tool_use_id: String,
        content: String,
        #[serde(rename = "isError", default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

impl ContentPart {
    /// Create a text content part
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    /// Create a tool use content part
    pub fn tool_use(id: impl Into<String>, name: impl Into<String>, input: serde_json::Value) -> Self {
        ContentPart::ToolUse {
            id: id.into(),
            name: name.into(),
            input,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_turn_creation() {
        let user = ConversationTurn::user("Hello");
        assert_eq!(user.role, TurnRole::User);
        assert_eq!(user.text(), Some("Hello"));

        let asst = ConversationTurn::assistant("Hi there!");
        assert_eq!(asst.role, TurnRole::Assistant);
        assert!(asst.tool_calls().is_empty());
    }

    #[test]
    fn test_tool_request_turn_keeps_calls_in_order() {
        let calls = vec![
            ToolCall::new("c1", "add", json!({"a": 2, "b": 2})),
            ToolCall::new("c2", "echo", json!({"text": "hi"})),
        ];
        let turn = ConversationTurn::tool_requests("Let me check.", &calls);

        assert_eq!(turn.role, TurnRole::Assistant);
        assert_eq!(turn.text(), None);
        let names: Vec<_> = turn.tool_calls().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["add", "echo"]);
    }

    #[test]
    fn test_tool_result_turn() {
        let turn = ConversationTurn::tool_result(ToolResult::error("c1", "boom"));
        assert_eq!(turn.role, TurnRole::ToolResult);

        let result = turn.as_tool_result().expect("tool result part");
        assert_eq!(result.call_id, "c1");
        assert!(result.is_error);
    }

    #[test]
    fn test_turn_serialization() {
        let turn = ConversationTurn::user("Hello");
        let json = serde_json::to_string(&turn).unwrap();
        assert!(json.contains("\"role\":\"user\""));
        assert!(json.contains("\"content\":\"Hello\""));

        let part = ContentPart::text("Hello");
        let json = serde_json::to_string(&part).unwrap();
        assert!(json.contains("\"type\":\"text\""));
    }
}
