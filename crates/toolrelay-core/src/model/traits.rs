//! Model client trait definition

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use std::pin::Pin;

use crate::types::{ConversationTurn, ModelResponse, StreamChunk, ToolDescriptor};
use super::error::ModelResult;

/// Which model to use and how to reach it
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    /// Model identifier, optionally prefixed with its service (`anthropic/claude-sonnet-4`)
    pub model: String,
    /// API key for authentication
    pub api_key: Option<String>,
    /// Custom API base URL
    pub api_base: Option<String>,
}

impl ModelConfig {
    /// Create a new model config
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            api_key: None,
            api_base: None,
        }
    }

    /// Set the API key
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the API base URL
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = Some(base.into());
        self
    }

    /// Service prefix of the model string (`"openai/gpt-4o"` -> `"openai"`)
    pub fn service(&self) -> Option<&str> {
        self.model.split_once('/').map(|(service, _)| service)
    }

    /// Model name without its service prefix
    pub fn model_name(&self) -> &str {
        self.model
            .split_once('/')
            .map(|(_, name)| name)
            .unwrap_or(&self.model)
    }
}

/// Sampling options
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelOptions {
    /// Temperature for response generation (0.0 - 2.0)
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
}

impl ModelOptions {
    /// Set temperature
    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    /// Set max tokens
    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }
}

/// Everything sent to the model for one step of a run
#[derive(Debug, Clone, Default)]
pub struct ModelRequest {
    pub system_prompt: Option<String>,
    /// Conversation so far, oldest first
    pub history: Vec<ConversationTurn>,
    /// Tools the model may request
    pub tools: Vec<ToolDescriptor>,
    pub options: ModelOptions,
}

/// Type alias for the streaming response
pub type StreamResponse = Pin<Box<dyn Stream<Item = ModelResult<StreamChunk>> + Send>>;

/// A language model service
///
/// Implementations stream text and complete tool calls; `complete` folds the
/// stream into a single response.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Service name (e.g. "anthropic", "mock")
    fn name(&self) -> &str;

    /// Stream a response to `request`
    async fn stream(&self, request: ModelRequest) -> ModelResult<StreamResponse>;

    /// Collect a full response
    async fn complete(&self, request: ModelRequest) -> ModelResult<ModelResponse> {
        let stream = self.stream(request).await?;
        collect_response(stream).await
    }
}

/// Drain a response stream, stopping at the first error
pub async fn collect_response(mut stream: StreamResponse) -> ModelResult<ModelResponse> {
    let mut response = ModelResponse::default();
    while let Some(chunk) = stream.next().await {
        response.push(chunk?);
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelError;
    use crate::types::ToolCall;
    use futures::stream;
    use serde_json::json;

    #[test]
    fn test_model_config_prefix() {
        let config = ModelConfig::new("anthropic/claude-sonnet-4");
        assert_eq!(config.service(), Some("anthropic"));
        assert_eq!(config.model_name(), "claude-sonnet-4");

        let bare = ModelConfig::new("gpt-4o");
        assert_eq!(bare.service(), None);
        assert_eq!(bare.model_name(), "gpt-4o");
    }

    #[tokio::test]
    async fn test_collect_response() {
        let chunks: Vec<ModelResult<StreamChunk>> = vec![
            Ok(StreamChunk::text("Adding ")),
            Ok(StreamChunk::tool_call(ToolCall::new("c1", "add", json!({"a": 1, "b": 2})))),
        ];
        let response = collect_response(Box::pin(stream::iter(chunks))).await.unwrap();
        assert_eq!(response.text, "Adding ");
        assert_eq!(response.tool_calls.len(), 1);
    }

    #[tokio::test]
    async fn test_collect_stops_on_error() {
        let chunks: Vec<ModelResult<StreamChunk>> = vec![
            Ok(StreamChunk::text("partial")),
            Err(ModelError::Other("connection reset".into())),
        ];
        let err = collect_response(Box::pin(stream::iter(chunks))).await.unwrap_err();
        assert_eq!(err.to_string(), "connection reset");
    }
}
