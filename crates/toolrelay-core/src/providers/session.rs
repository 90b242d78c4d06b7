//! Transport seam between a `ProviderConnection` and the process behind it

use async_trait::async_trait;
use serde_json::Value;

use crate::types::ToolDescriptor;
use super::error::ProviderResult;
use super::spec::ProviderSpec;

/// Output of a successful tool invocation
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    /// Text rendering of the result, as shown to the model
    pub content: String,
    /// Structured result, when the provider returned one
    pub structured: Option<Value>,
}

impl ToolOutput {
    /// Create a text-only output
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            structured: None,
        }
    }
}

/// A live, handshaken channel to one provider process
///
/// Dropping a session must release its process: implementations terminate
/// the child when they go out of scope.
#[async_trait]
pub trait ProviderSession: Send + Sync {
    /// Ask the provider for its tool catalog
    async fn list_tools(&self) -> ProviderResult<Vec<ToolDescriptor>>;

    /// Invoke one tool
    async fn call_tool(&self, name: &str, arguments: Value) -> ProviderResult<ToolOutput>;

    /// Signal the provider to shut down and wait for it
    async fn shutdown(self: Box<Self>) -> ProviderResult<()>;
}

/// Spawns providers and performs the protocol handshake
///
/// If the returned future is dropped before completing (e.g. on a handshake
/// timeout) nothing may be left running.
#[async_trait]
pub trait ProviderLauncher: Send + Sync {
    /// Spawn the process described by `spec` and complete the handshake
    async fn launch(&self, spec: &ProviderSpec) -> ProviderResult<Box<dyn ProviderSession>>;
}
