//! In-memory configuration provider

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::providers::ProviderSpec;
use super::settings::RelaySettings;
use super::traits::{delete_provider, insert_provider, replace_provider, ConfigProvider, ConfigResult};

/// In-memory configuration provider for testing
#[derive(Debug, Default)]
pub struct MemoryConfigProvider {
    providers: RwLock<Vec<ProviderSpec>>,
    settings: RwLock<RelaySettings>,
}

impl MemoryConfigProvider {
    /// Create a new empty memory config provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a memory config provider with initial providers
    pub fn with_providers(providers: Vec<ProviderSpec>) -> Self {
        Self {
            providers: RwLock::new(providers),
            ..Default::default()
        }
    }

    pub fn with_settings(self, settings: RelaySettings) -> Self {
        *self.settings.write() = settings;
        self
    }

    /// Replace all providers
    pub fn set_providers(&self, providers: Vec<ProviderSpec>) {
        *self.providers.write() = providers;
    }
}

#[async_trait]
impl ConfigProvider for MemoryConfigProvider {
    async fn get_providers(&self) -> Vec<ProviderSpec> {
        self.providers.read().clone()
    }

    async fn update_provider(&self, name: &str, spec: ProviderSpec) -> ConfigResult<()> {
        replace_provider(&mut self.providers.write(), name, spec)
    }

    async fn add_provider(&self, spec: ProviderSpec) -> ConfigResult<()> {
        insert_provider(&mut self.providers.write(), spec)
    }

    async fn remove_provider(&self, name: &str) -> ConfigResult<()> {
        delete_provider(&mut self.providers.write(), name)
    }

    async fn settings(&self) -> RelaySettings {
        self.settings.read().clone()
    }
}
