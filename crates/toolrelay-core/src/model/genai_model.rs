//! GenaiModel - model client over the genai crate
//!
//! Handles every genai-supported service (OpenAI, Anthropic, Gemini, etc.)
//! plus OpenAI-compatible services (OpenRouter, Mistral, custom base URLs)
//! through the ServiceTargetResolver.

use async_trait::async_trait;
use futures::{stream, StreamExt};
use std::sync::Arc;

use genai::chat::{ChatRequest, ChatStreamEvent};
use genai::Client;

use crate::logging::SharedLogger;
use crate::secrets::{EnvSecretStore, SecretStore};

use super::error::{ModelError, ModelResult};
use super::genai_adapter::{create_client, from_genai_event, to_genai_messages, to_genai_options, to_genai_tools};
use super::traits::{ModelClient, ModelConfig, ModelRequest, StreamResponse};

/// Model client for all genai-reachable services
pub struct GenaiModel {
    config: ModelConfig,
    service: String,
    secrets: Arc<dyn SecretStore>,
    client: Client,
    logger: SharedLogger,
}

impl GenaiModel {
    /// Create a client for `config`, resolving keys through `secrets`
    pub fn new(config: ModelConfig, secrets: Arc<dyn SecretStore>, logger: SharedLogger) -> Self {
        let client = create_client(&config, secrets.clone());
        let service = config.service().unwrap_or("genai").to_lowercase();
        Self {
            config,
            service,
            secrets,
            client,
            logger,
        }
    }

    /// The configured model
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Fail early when the service needs a key and none can be found
    fn ensure_credentials(&self) -> ModelResult<()> {
        if self.config.api_key.is_some() || self.config.service().is_none() {
            return Ok(());
        }
        if EnvSecretStore::requires_key(&self.service) && !self.secrets.has(&self.service) {
            return Err(ModelError::missing_api_key(&self.service));
        }
        Ok(())
    }
}

#[async_trait]
impl ModelClient for GenaiModel {
    fn name(&self) -> &str {
        &self.service
    }

    async fn stream(&self, request: ModelRequest) -> ModelResult<StreamResponse> {
        self.ensure_credentials()?;

        let model_name = self.config.model_name();
        self.logger.info(&format!(
            "[GenaiModel] stream called: service={}, model={}, turns={}, tools={}",
            self.service,
            model_name,
            request.history.len(),
            request.tools.len()
        ));

        let messages = to_genai_messages(request.system_prompt.as_deref(), &request.history)?;

        let mut chat_req = ChatRequest::new(messages);
        if !request.tools.is_empty() {
            chat_req = chat_req.with_tools(to_genai_tools(&request.tools));
        }

        let genai_options = to_genai_options(&request.options);

        let chat_stream = self
            .client
            .exec_chat_stream(model_name, chat_req, Some(&genai_options))
            .await
            .map_err(|e| ModelError::api(&self.service, e.to_string()))?;

        self.logger.debug("[GenaiModel] Stream started");

        let logger = self.logger.clone();
        let service = self.service.clone();

        let stream = chat_stream
            .stream
            .map(move |result| match result {
                Ok(event) => {
                    match &event {
                        ChatStreamEvent::Chunk(c) => {
                            logger.debug(&format!("[GenaiModel] Chunk ({} chars)", c.content.len()));
                        }
                        ChatStreamEvent::End(_) => {
                            logger.debug("[GenaiModel] End");
                        }
                        _ => {}
                    }
                    from_genai_event(event)
                }
                Err(e) => {
                    logger.error(&format!("[GenaiModel] Stream error: {}", e));
                    vec![Err(ModelError::api(&service, e.to_string()))]
                }
            })
            .flat_map(stream::iter);

        Ok(Box::pin(stream))
    }
}
