//! Model and orchestration settings

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::model::ModelConfig;
use crate::orchestrator::OrchestratorSettings;
use crate::providers::ConnectionTimeouts;

pub const DEFAULT_MODEL: &str = "anthropic/claude-sonnet-4";

/// The `settings:` section of a config file.
///
/// Every field has a default, so a partial section (or none at all) is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaySettings {
    /// `service/model` string, e.g. `openai/gpt-4o`
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    pub max_tool_rounds: usize,
    pub handshake_timeout_secs: u64,
    pub list_timeout_secs: u64,
    pub call_timeout_secs: u64,
    pub close_grace_secs: u64,
}

impl Default for RelaySettings {
    fn default() -> Self {
        let timeouts = ConnectionTimeouts::default();
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            api_base: None,
            system_prompt: None,
            max_tool_rounds: OrchestratorSettings::default().max_tool_rounds,
            handshake_timeout_secs: timeouts.handshake.as_secs(),
            list_timeout_secs: timeouts.list.as_secs(),
            call_timeout_secs: timeouts.call.as_secs(),
            close_grace_secs: timeouts.close_grace.as_secs(),
        }
    }
}

impl RelaySettings {
    pub fn timeouts(&self) -> ConnectionTimeouts {
        ConnectionTimeouts {
            handshake: Duration::from_secs(self.handshake_timeout_secs),
            list: Duration::from_secs(self.list_timeout_secs),
            call: Duration::from_secs(self.call_timeout_secs),
            close_grace: Duration::from_secs(self.close_grace_secs),
        }
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            system_prompt: self.system_prompt.clone(),
            max_tool_rounds: self.max_tool_rounds,
            ..Default::default()
        }
    }

    pub fn model_config(&self) -> ModelConfig {
        let mut config = ModelConfig::new(&self.model);
        if let Some(key) = &self.api_key {
            config = config.with_api_key(key);
        }
        if let Some(base) = &self.api_base {
            config = config.with_api_base(base);
        }
        config
    }
}
