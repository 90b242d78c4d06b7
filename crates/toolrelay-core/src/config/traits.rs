//! Configuration provider trait

use async_trait::async_trait;

use crate::providers::ProviderSpec;
use super::settings::RelaySettings;

/// Configuration provider abstraction
///
/// Implementations:
/// - `MemoryConfigProvider`: In-memory for testing
/// - `FileConfigProvider`: YAML file (~/.config/toolrelay/config.yaml)
///
/// Provider names are unique ignoring case.
#[async_trait]
pub trait ConfigProvider: Send + Sync {
    /// Get all configured tool providers
    async fn get_providers(&self) -> Vec<ProviderSpec>;

    /// Replace a provider's launch spec
    async fn update_provider(&self, name: &str, spec: ProviderSpec) -> ConfigResult<()>;

    /// Add a new provider
    async fn add_provider(&self, spec: ProviderSpec) -> ConfigResult<()>;

    /// Remove a provider
    async fn remove_provider(&self, name: &str) -> ConfigResult<()>;

    /// Model and orchestration settings
    async fn settings(&self) -> RelaySettings;
}

/// Errors that can occur during configuration operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    #[error("Provider already exists: {0}")]
    ProviderExists(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Other(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

pub(crate) fn same_name(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Shared list edits for the provider vec, used by every backend
pub(crate) fn insert_provider(providers: &mut Vec<ProviderSpec>, spec: ProviderSpec) -> ConfigResult<()> {
    if spec.name.trim().is_empty() {
        return Err(ConfigError::Other("provider name must not be empty".to_string()));
    }
    if providers.iter().any(|p| same_name(&p.name, &spec.name)) {
        return Err(ConfigError::ProviderExists(spec.name));
    }
    providers.push(spec);
    Ok(())
}

pub(crate) fn replace_provider(
    providers: &mut [ProviderSpec],
    name: &str,
    spec: ProviderSpec,
) -> ConfigResult<()> {
    // A rename must not collide with another entry
    if providers
        .iter()
        .any(|p| same_name(&p.name, &spec.name) && !same_name(&p.name, name))
    {
        return Err(ConfigError::ProviderExists(spec.name));
    }
    let slot = providers
        .iter_mut()
        .find(|p| same_name(&p.name, name))
        .ok_or_else(|| ConfigError::ProviderNotFound(name.to_string()))?;
    *slot = spec;
    Ok(())
}

pub(crate) fn delete_provider(providers: &mut Vec<ProviderSpec>, name: &str) -> ConfigResult<()> {
    let original_len = providers.len();
    providers.retain(|p| !same_name(&p.name, name));
    if providers.len() == original_len {
        Err(ConfigError::ProviderNotFound(name.to_string()))
    } else {
        Ok(())
    }
}
