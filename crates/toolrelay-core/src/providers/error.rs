//! Tool provider error types

use std::time::Duration;

use thiserror::Error;

/// Errors raised by provider connections, the registry and the catalog
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// A provider with this name is already registered (or being registered)
    #[error("Provider already exists: {0}")]
    DuplicateProvider(String),

    /// No provider with this name is registered
    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    /// Spawn or handshake failure
    #[error("Failed to connect to provider '{provider}': {message}")]
    Connection { provider: String, message: String },

    /// The provider answered with something that is not a valid response
    #[error("Protocol error from provider '{provider}': {message}")]
    Protocol { provider: String, message: String },

    /// No routable provider offers this tool
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// The provider reported a failure, or the call timed out
    #[error("Tool '{tool}' failed: {message}")]
    ToolExecution { tool: String, message: String },
}

impl ProviderError {
    /// Create a connection error
    pub fn connection(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a protocol error
    pub fn protocol(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Protocol {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a tool execution error
    pub fn tool_execution(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolExecution {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create a tool execution error for a call that ran out of time
    pub fn tool_timeout(tool: impl Into<String>, after: Duration) -> Self {
        Self::tool_execution(tool, format!("timed out after {:?}", after))
    }

    /// Whether this error is about the shape of the registry rather than a
    /// single call (duplicate or unknown provider names)
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::DuplicateProvider(_) | Self::ProviderNotFound(_))
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;
