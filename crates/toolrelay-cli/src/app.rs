//! Config discovery and runtime assembly shared by the subcommands

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use toolrelay_core::config::{merge_providers, ConfigLevel};
use toolrelay_core::model::create_model;
use toolrelay_core::{
    bootstrap_providers, ConfigProvider, ConversationOrchestrator, EnvSecretStore,
    FileConfigProvider, McpLauncher, ModelClient, ProviderRegistry, ProviderSpec, RelaySettings,
    SecretStore, SharedLogger, ToolCatalog, TracingLogger,
};

/// The config files in effect: a base file and an optional overlay
pub struct ConfigSources {
    base: FileConfigProvider,
    overlay: Option<FileConfigProvider>,
}

impl ConfigSources {
    /// An explicit `--config` path wins outright; otherwise the user file is
    /// overlaid with the workspace file of the current directory.
    pub fn discover(explicit: Option<PathBuf>) -> Result<Self> {
        let sources = match explicit {
            Some(path) => Self {
                base: FileConfigProvider::new(path, ConfigLevel::User),
                overlay: None,
            },
            None => {
                let cwd = std::env::current_dir().context("Failed to get current directory")?;
                Self {
                    base: FileConfigProvider::user(),
                    overlay: Some(FileConfigProvider::workspace(cwd)),
                }
            }
        };

        // Surface broken YAML here; the provider trait reads it as empty
        for layer in sources.layers() {
            layer
                .config()
                .with_context(|| format!("Failed to read {}", layer.path().display()))?;
        }
        Ok(sources)
    }

    /// Lowest priority first
    fn layers(&self) -> impl Iterator<Item = &FileConfigProvider> {
        std::iter::once(&self.base).chain(self.overlay.as_ref())
    }

    /// File that `providers add|remove` edits: the overlay if it exists,
    /// otherwise the base file
    pub fn target(&self) -> &FileConfigProvider {
        match &self.overlay {
            Some(overlay) if overlay.exists() => overlay,
            _ => &self.base,
        }
    }

    pub async fn providers(&self) -> Vec<ProviderSpec> {
        let sources: Vec<&dyn ConfigProvider> =
            self.layers().map(|l| l as &dyn ConfigProvider).collect();
        merge_providers(&sources).await
    }

    /// Settings of the most specific existing file
    pub async fn settings(&self) -> RelaySettings {
        self.target().settings().await
    }
}

/// Environment the run needs: the model service key (unless one is
/// configured inline) and every `$VAR` the provider environments refer to.
///
/// All missing entries are reported in one error.
pub fn check_environment(
    settings: &RelaySettings,
    specs: &[ProviderSpec],
    secrets: &dyn SecretStore,
    mock: bool,
) -> Result<()> {
    let mut required = Vec::new();

    let model = settings.model_config();
    if !mock && model.api_key.is_none() {
        if let Some(service) = model.service() {
            let known_with_key = EnvSecretStore::env_vars_for_service(service)
                .is_some_and(|vars| !vars.is_empty());
            if known_with_key {
                required.push(service.to_string());
            }
        }
    }
    for var in specs.iter().flat_map(ProviderSpec::referenced_vars) {
        if !required.contains(&var) {
            required.push(var);
        }
    }

    let missing = secrets.missing_required(&required);
    if missing.is_empty() {
        return Ok(());
    }

    let described: Vec<String> = missing
        .iter()
        .map(|key| match EnvSecretStore::env_vars_for_service(key) {
            Some(vars) if !vars.is_empty() => format!("{} (model service {})", vars.join(" or "), key),
            _ => key.clone(),
        })
        .collect();
    bail!("Missing required environment variables: {}", described.join(", "))
}

/// Registry and catalog with the configured providers started
pub struct Relay {
    pub registry: Arc<ProviderRegistry>,
    pub catalog: Arc<ToolCatalog>,
    pub settings: RelaySettings,
    pub secrets: Arc<dyn SecretStore>,
    pub logger: SharedLogger,
}

impl Relay {
    pub async fn start(sources: &ConfigSources, mock: bool) -> Result<Self> {
        let logger: SharedLogger = Arc::new(TracingLogger::new());
        let secrets: Arc<dyn SecretStore> = Arc::new(EnvSecretStore::new());

        let settings = sources.settings().await;
        let specs = sources.providers().await;
        check_environment(&settings, &specs, secrets.as_ref(), mock)?;

        let launcher = Arc::new(McpLauncher::new(logger.clone()));
        let registry = Arc::new(
            ProviderRegistry::new(launcher, logger.clone()).with_timeouts(settings.timeouts()),
        );
        bootstrap_providers(&registry, specs, &logger).await;

        let catalog = Arc::new(ToolCatalog::new(registry.clone(), logger.clone()));
        Ok(Self {
            registry,
            catalog,
            settings,
            secrets,
            logger,
        })
    }

    pub fn orchestrator(&self, model_override: Option<String>, mock: bool) -> ConversationOrchestrator {
        let mut config = self.settings.model_config();
        if let Some(model) = model_override {
            config.model = model;
        }
        if mock {
            config.model = "mock".to_string();
        }

        let model: Arc<dyn ModelClient> = create_model(config, self.secrets.clone(), self.logger.clone());
        ConversationOrchestrator::new(self.catalog.clone(), model, self.logger.clone())
            .with_settings(self.settings.orchestrator_settings())
    }

    pub async fn shutdown(&self) {
        self.registry.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolrelay_core::MemorySecretStore;

    #[test]
    fn test_reports_every_missing_variable() {
        let settings = RelaySettings::default();
        let specs = vec![
            ProviderSpec::new("gh", "gh-mcp").with_env("TOKEN", "${GH_TOKEN}"),
            ProviderSpec::new("docs", "docs-mcp").with_env("URL", "https://$DOCS_HOST/"),
        ];
        let secrets = MemorySecretStore::with_secrets([("DOCS_HOST", "docs.local")]);

        let err = check_environment(&settings, &specs, &secrets, false).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("ANTHROPIC_API_KEY (model service anthropic)"));
        assert!(message.contains("GH_TOKEN"));
        assert!(!message.contains("DOCS_HOST"));
    }

    #[test]
    fn test_mock_and_inline_key_skip_model_check() {
        let specs: Vec<ProviderSpec> = Vec::new();
        let secrets = MemorySecretStore::new();

        assert!(check_environment(&RelaySettings::default(), &specs, &secrets, true).is_ok());

        let inline = RelaySettings {
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        assert!(check_environment(&inline, &specs, &secrets, false).is_ok());

        let local = RelaySettings {
            model: "ollama/llama3".to_string(),
            ..Default::default()
        };
        assert!(check_environment(&local, &specs, &secrets, false).is_ok());
    }
}
