//! Streaming response types

use serde::{Deserialize, Serialize};
use super::tool::ToolCall;

/// Streaming chunk from a model response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamChunk {
    /// Text content chunk
    Text {
        text: String,
    },
    /// Complete tool call
    ToolCall {
        #[serde(rename = "toolCall")]
        tool_call: ToolCall,
    },
    /// Partial tool call (for streaming tool arguments)
    ToolCallDelta {
        id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(rename = "inputDelta", skip_serializing_if = "Option::is_none")]
        input_delta: Option<String>,
    },
}

impl StreamChunk {
    /// Create a text chunk
    pub fn text(text: impl Into<String>) -> Self {
        StreamChunk::Text { text: text.into() }
    }

    /// Create a tool call chunk
    pub fn tool_call(tool_call: ToolCall) -> Self {
        StreamChunk::ToolCall { tool_call }
    }

    /// Check if this is a text chunk
    pub fn is_text(&self) -> bool {
        matches!(self, StreamChunk::Text { .. })
    }

    /// Check if this is a tool call chunk
    pub fn is_tool_call(&self) -> bool {
        matches!(self, StreamChunk::ToolCall { .. })
    }
}

/// A model response collected from its stream
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelResponse {
    /// Concatenated text chunks
    pub text: String,
    /// Complete tool calls, in the order they were emitted
    pub tool_calls: Vec<ToolCall>,
}

impl ModelResponse {
    /// A text-only response is terminal
    pub fn is_terminal(&self) -> bool {
        self.tool_calls.is_empty()
    }

    /// Fold one chunk into the response. Deltas are ignored; providers
    /// always emit the complete call once arguments are known.
    pub fn push(&mut self, chunk: StreamChunk) {
        match chunk {
            StreamChunk::Text { text } => self.text.push_str(&text),
            StreamChunk::ToolCall { tool_call } => self.tool_calls.push(tool_call),
            StreamChunk::ToolCallDelta { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_chunk() {
        let chunk = StreamChunk::text("Hello");
        assert!(chunk.is_text());
        assert!(!chunk.is_tool_call());
    }

    #[test]
    fn test_response_collects_chunks() {
        let mut response = ModelResponse::default();
        response.push(StreamChunk::text("Let me "));
        response.push(StreamChunk::text("add that."));
        response.push(StreamChunk::ToolCallDelta {
            id: "c1".into(),
            name: Some("add".into()),
            input_delta: Some("{\"a\":".into()),
        });
        response.push(StreamChunk::tool_call(ToolCall::new("c1", "add", json!({"a": 2, "b": 2}))));

        assert_eq!(response.text, "Let me add that.");
        assert_eq!(response.tool_calls.len(), 1);
        assert!(!response.is_terminal());
    }

    #[test]
    fn test_chunk_serialization() {
        let chunk = StreamChunk::text("Hello world");
        let json = serde_json::to_string(&chunk).unwrap();
        assert!(json.contains("\"type\":\"text\""));
        assert!(json.contains("\"text\":\"Hello world\""));
    }
}
