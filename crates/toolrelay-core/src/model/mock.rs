//! Mock model for testing
//!
//! Deterministic, scripted replies without network access. Each call to
//! `stream` takes the next reply from the script; once the script runs out
//! the fallback reply is used for every further call. Every request is
//! recorded so tests can inspect what the model was shown.

use async_trait::async_trait;
use futures::stream;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::Value;

use super::error::{ModelError, ModelResult};
use super::traits::{ModelClient, ModelRequest, StreamResponse};
use crate::logging::SharedLogger;
use crate::types::{StreamChunk, ToolCall, TurnRole};

/// One scripted model reply
#[derive(Debug, Clone, PartialEq)]
pub enum MockReply {
    /// Echo back the last user message
    Echo,
    /// Return fixed text
    Text(String),
    /// Request tools; empty call ids are filled in
    ToolCalls(Vec<ToolCall>),
    /// Answer with the content of the most recent tool result
    EchoToolResult,
    /// Fail the request
    Error(String),
    /// Return nothing
    Empty,
}

impl MockReply {
    /// Fixed text reply
    pub fn text(text: impl Into<String>) -> Self {
        MockReply::Text(text.into())
    }

    /// Reply requesting a single tool
    pub fn tool_call(name: impl Into<String>, input: Value) -> Self {
        MockReply::ToolCalls(vec![ToolCall::new("", name, input)])
    }
}

/// Scripted model client
pub struct MockModel {
    script: Mutex<VecDeque<MockReply>>,
    fallback: MockReply,
    chunk_size: usize,
    next_call_id: AtomicUsize,
    requests: Mutex<Vec<ModelRequest>>,
    logger: SharedLogger,
}

impl MockModel {
    fn with_fallback(fallback: MockReply, logger: SharedLogger) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback,
            chunk_size: 10,
            next_call_id: AtomicUsize::new(1),
            requests: Mutex::new(Vec::new()),
            logger,
        }
    }

    /// Echo every user message
    pub fn echo(logger: SharedLogger) -> Self {
        Self::with_fallback(MockReply::Echo, logger)
    }

    /// Always return `text`
    pub fn fixed(text: impl Into<String>, logger: SharedLogger) -> Self {
        Self::with_fallback(MockReply::Text(text.into()), logger)
    }

    /// Play `replies` in order, then fail every further request
    pub fn scripted(replies: impl IntoIterator<Item = MockReply>, logger: SharedLogger) -> Self {
        let model = Self::with_fallback(MockReply::Error("script exhausted".to_string()), logger);
        model.script.lock().extend(replies);
        model
    }

    /// Return the same reply forever
    pub fn repeating(reply: MockReply, logger: SharedLogger) -> Self {
        Self::with_fallback(reply, logger)
    }

    /// Fail every request
    pub fn error(message: impl Into<String>, logger: SharedLogger) -> Self {
        Self::with_fallback(MockReply::Error(message.into()), logger)
    }

    /// Set chunk size for splitting text replies
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().clone()
    }

    /// Number of requests received so far
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    fn next_reply(&self) -> MockReply {
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }

    fn last_user_message(request: &ModelRequest) -> String {
        request
            .history
            .iter()
            .rev()
            .filter(|t| t.role == TurnRole::User)
            .find_map(|t| t.text().map(str::to_string))
            .unwrap_or_else(|| "Hello from MockModel!".to_string())
    }

    fn last_tool_result(request: &ModelRequest) -> Option<String> {
        request
            .history
            .iter()
            .rev()
            .find_map(|t| t.as_tool_result())
            .map(|r| r.content)
    }

    /// Split text into chunks
    fn split_into_chunks(&self, text: &str) -> Vec<String> {
        if self.chunk_size == 0 || text.is_empty() {
            return vec![text.to_string()];
        }

        text.chars()
            .collect::<Vec<_>>()
            .chunks(self.chunk_size)
            .map(|c| c.iter().collect())
            .collect()
    }

    fn text_chunks(&self, text: &str) -> Vec<ModelResult<StreamChunk>> {
        self.split_into_chunks(text)
            .into_iter()
            .map(|t| Ok(StreamChunk::text(t)))
            .collect()
    }
}

#[async_trait]
impl ModelClient for MockModel {
    fn name(&self) -> &str {
        "mock"
    }

    async fn stream(&self, request: ModelRequest) -> ModelResult<StreamResponse> {
        let reply = self.next_reply();
        self.logger.debug(&format!("[MockModel] Replying with {:?}", reply));

        let chunks: Vec<ModelResult<StreamChunk>> = match &reply {
            MockReply::Echo => self.text_chunks(&format!("Echo: {}", Self::last_user_message(&request))),
            MockReply::Text(text) => self.text_chunks(text),
            MockReply::EchoToolResult => {
                let text = match Self::last_tool_result(&request) {
                    Some(content) => format!("The result is {}", content),
                    None => "No tool result to report.".to_string(),
                };
                self.text_chunks(&text)
            }
            MockReply::ToolCalls(calls) => calls
                .iter()
                .map(|call| {
                    let mut call = call.clone();
                    if call.id.is_empty() {
                        let n = self.next_call_id.fetch_add(1, Ordering::SeqCst);
                        call.id = format!("mock_call_{}", n);
                    }
                    Ok(StreamChunk::tool_call(call))
                })
                .collect(),
            MockReply::Error(message) => vec![Err(ModelError::Other(format!("Mock error: {}", message)))],
            MockReply::Empty => Vec::new(),
        };

        self.requests.lock().push(request);
        Ok(Box::pin(stream::iter(chunks)))
    }
}
