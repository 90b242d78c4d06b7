//! toolrelay core
//!
//! Connects a language model to a set of tool providers: external processes
//! speaking the Model Context Protocol over stdio. Providers can be added and
//! removed while conversations are running, including by the model itself
//! through the built-in management tools.
//!
//! ## Conversation flow
//!
//! ```rust,ignore
//! use toolrelay_core::{ConversationOrchestrator, ProviderRegistry, ProviderSpec, ToolCatalog};
//!
//! let registry = Arc::new(ProviderRegistry::new(Arc::new(McpLauncher::new(logger.clone())), logger.clone()));
//! registry.register(ProviderSpec::new("calc", "calc-server")).await?;
//!
//! let catalog = Arc::new(ToolCatalog::new(registry.clone(), logger.clone()));
//! let orchestrator = ConversationOrchestrator::new(catalog, model, logger);
//!
//! let outcome = orchestrator.run(&[ConversationTurn::user("What is 2 + 2?")]).await;
//! println!("{}", outcome.text);
//!
//! registry.shutdown().await;
//! ```

pub mod types;
pub mod secrets;
pub mod logging;
pub mod config;
pub mod providers;
pub mod mcp;
pub mod tools;
pub mod model;
pub mod orchestrator;

// Re-export commonly used types
pub use types::{
    ConversationTurn, ContentPart, TurnRole,
    ToolCall, ToolDescriptor, ToolResult,
    ModelResponse, StreamChunk,
};

pub use secrets::{SecretStore, EnvSecretStore, MemorySecretStore};

pub use logging::{Logger, SharedLogger, NoOpLogger, TracingLogger};

pub use config::{
    ConfigProvider, ConfigError, ConfigResult, FileConfigProvider, MemoryConfigProvider,
    RelaySettings, bootstrap_providers,
};

pub use providers::{
    ConnectionState, ConnectionTimeouts, ProviderConnection, ProviderError, ProviderResult,
    ProviderRegistry, ProviderSpec, ProviderSummary,
};

pub use mcp::McpLauncher;

pub use tools::{RefreshReport, ToolCatalog};

pub use model::{create_model, ModelClient, ModelConfig, ModelError, ModelResult, MockModel};

pub use orchestrator::{ConversationHub, ConversationOrchestrator, OrchestratorSettings, RunOutcome};
