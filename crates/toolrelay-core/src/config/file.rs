//! File-based configuration provider (YAML)
//!
//! Supports user-level (~/.config/toolrelay/config.yaml) and workspace-level
//! (.config/toolrelay/config.yaml) config.
//!
//! ```yaml
//! settings:
//!   model: anthropic/claude-sonnet-4
//!   max_tool_rounds: 8
//! providers:
//!   - name: calc
//!     command: npx
//!     args: ["-y", "@acme/calc-server"]
//!     env:
//!       CALC_TOKEN: ${CALC_TOKEN}
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::providers::ProviderSpec;
use super::settings::RelaySettings;
use super::traits::{
    delete_provider, insert_provider, replace_provider, ConfigError, ConfigProvider, ConfigResult,
};

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub settings: RelaySettings,

    /// Configured tool providers
    #[serde(default)]
    pub providers: Vec<ProviderSpec>,
}

/// Config level (user or workspace)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLevel {
    /// User-level config (~/.config/toolrelay/config.yaml)
    User,
    /// Workspace-level config (.config/toolrelay/config.yaml in workspace root)
    Workspace,
}

impl ConfigLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigLevel::User => "user",
            ConfigLevel::Workspace => "workspace",
        }
    }
}

/// File-based configuration provider
///
/// Reads and writes configuration from a YAML file. A missing file reads as
/// an empty config; the file (and its directory) is created on first write.
///
/// # Example
///
/// ```no_run
/// use toolrelay_core::config::FileConfigProvider;
///
/// let user_config = FileConfigProvider::user();
/// let workspace_config = FileConfigProvider::workspace("/path/to/workspace");
/// ```
pub struct FileConfigProvider {
    path: PathBuf,
    level: ConfigLevel,
    cache: RwLock<Option<ConfigFile>>,
}

impl FileConfigProvider {
    /// Create a new file config provider for a specific path
    pub fn new(path: impl Into<PathBuf>, level: ConfigLevel) -> Self {
        Self {
            path: path.into(),
            level,
            cache: RwLock::new(None),
        }
    }

    /// Create a user-level config provider (~/.config/toolrelay/config.yaml)
    pub fn user() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".config"));
        Self::new(config_dir.join("toolrelay").join("config.yaml"), ConfigLevel::User)
    }

    /// Create a workspace-level config provider (.config/toolrelay/config.yaml)
    pub fn workspace(workspace_root: impl AsRef<Path>) -> Self {
        let path = workspace_root
            .as_ref()
            .join(".config")
            .join("toolrelay")
            .join("config.yaml");
        Self::new(path, ConfigLevel::Workspace)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn level(&self) -> ConfigLevel {
        self.level
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn load(&self) -> ConfigResult<ConfigFile> {
        if !self.path.exists() {
            return Ok(ConfigFile::default());
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(ConfigFile::default());
        }
        Ok(serde_yaml::from_str(&content)?)
    }

    fn save(&self, config: &ConfigFile) -> ConfigResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&self.path, serde_yaml::to_string(config)?)?;
        *self.cache.write() = Some(config.clone());
        Ok(())
    }

    /// Cached config, loading from disk on first use
    pub fn config(&self) -> ConfigResult<ConfigFile> {
        if let Some(config) = self.cache.read().as_ref() {
            return Ok(config.clone());
        }
        self.reload()
    }

    /// Reload config from disk (invalidate cache)
    pub fn reload(&self) -> ConfigResult<ConfigFile> {
        let config = self.load()?;
        *self.cache.write() = Some(config.clone());
        Ok(config)
    }

    /// Replace the settings section
    pub fn set_settings(&self, settings: RelaySettings) -> ConfigResult<()> {
        let mut config = self.config()?;
        config.settings = settings;
        self.save(&config)
    }

    fn edit_providers(
        &self,
        edit: impl FnOnce(&mut Vec<ProviderSpec>) -> ConfigResult<()>,
    ) -> ConfigResult<()> {
        let mut config = self.config()?;
        edit(&mut config.providers)?;
        self.save(&config)
    }
}

impl std::fmt::Debug for FileConfigProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileConfigProvider")
            .field("path", &self.path)
            .field("level", &self.level)
            .field("exists", &self.exists())
            .finish()
    }
}

#[async_trait]
impl ConfigProvider for FileConfigProvider {
    /// Unreadable files yield no providers; use `config()` to see the error
    async fn get_providers(&self) -> Vec<ProviderSpec> {
        self.config().map(|c| c.providers).unwrap_or_default()
    }

    async fn update_provider(&self, name: &str, spec: ProviderSpec) -> ConfigResult<()> {
        self.edit_providers(|providers| replace_provider(providers, name, spec))
    }

    async fn add_provider(&self, spec: ProviderSpec) -> ConfigResult<()> {
        self.edit_providers(|providers| insert_provider(providers, spec))
    }

    async fn remove_provider(&self, name: &str) -> ConfigResult<()> {
        self.edit_providers(|providers| delete_provider(providers, name))
    }

    async fn settings(&self) -> RelaySettings {
        self.config().map(|c| c.settings).unwrap_or_default()
    }
}
