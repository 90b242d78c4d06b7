//! Configuration
//!
//! Supports multiple configuration sources:
//! - `MemoryConfigProvider`: In-memory for testing
//! - `FileConfigProvider`: YAML file-based (user/workspace level)
//!
//! `bootstrap_providers` brings the configured tool providers up at startup.

mod traits;
mod settings;
mod memory;
mod file;
mod bootstrap;

pub use traits::{ConfigProvider, ConfigError, ConfigResult};
pub use settings::{RelaySettings, DEFAULT_MODEL};
pub use memory::MemoryConfigProvider;
pub use file::{FileConfigProvider, ConfigFile, ConfigLevel};
pub use bootstrap::{bootstrap_providers, merge_providers};
