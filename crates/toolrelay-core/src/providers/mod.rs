//! Tool providers
//!
//! A provider is an external process, described by a `ProviderSpec`, that
//! offers tools over the MCP stdio protocol. This module covers one
//! provider's lifecycle (`ProviderConnection`) and the shared table of live
//! providers (`ProviderRegistry`).
//!
//! # Example
//!
//! ```rust,ignore
//! use toolrelay_core::providers::{ProviderRegistry, ProviderSpec};
//! use toolrelay_core::mcp::McpLauncher;
//!
//! let registry = ProviderRegistry::new(Arc::new(McpLauncher::new(logger.clone())), logger);
//! registry.register(ProviderSpec::new("calc", "calc-mcp").with_args(["--stdio"])).await?;
//! ```

mod connection;
mod error;
pub mod mock;
mod registry;
mod session;
mod spec;

pub use connection::{ConnectionState, ConnectionTimeouts, ProviderConnection};
pub use error::{ProviderError, ProviderResult};
pub use registry::{ProviderRegistry, ProviderSummary};
pub use session::{ProviderLauncher, ProviderSession, ToolOutput};
pub use spec::{ExpandedEnv, ProviderSpec};
