//! The conversation turn loop
//!
//! ```text
//! AWAITING_MODEL -> MODEL_RESPONDED -> TERMINAL
//!                         |
//!                         +-> EXECUTING_TOOLS -> AWAITING_MODEL
//! ```
//!
//! A run never fails outward: model errors, empty answers and runaway tool
//! loops all end in a fallback answer, with the cause kept on the outcome.

use std::sync::Arc;

use thiserror::Error;

use crate::logging::SharedLogger;
use crate::model::{ModelClient, ModelError, ModelOptions, ModelRequest};
use crate::tools::{is_management_tool, management, ToolCatalog};
use crate::types::{ConversationTurn, ToolCall, ToolResult};

/// Answer used when the model service fails
pub const MODEL_FAILURE_REPLY: &str =
    "Sorry, I ran into a problem talking to the language model. Please try again.";

/// Answer used when the model keeps requesting tools past the round limit
pub const ROUND_LIMIT_REPLY: &str =
    "Sorry, I was unable to complete that request within the allowed number of tool calls.";

/// Answer used when the model returns no text
pub const EMPTY_REPLY: &str = "Sorry, I don't have an answer for that.";

/// Why a run ended with a fallback answer
#[derive(Error, Debug)]
pub enum RunError {
    #[error("model still requested tools after {0} rounds")]
    ToolRoundLimitExceeded(usize),

    #[error("model error: {0}")]
    Model(#[from] ModelError),

    #[error("model returned an empty answer")]
    EmptyAnswer,
}

/// Run-level knobs
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorSettings {
    pub system_prompt: Option<String>,
    /// Tool rounds allowed before the run gives up
    pub max_tool_rounds: usize,
    pub options: ModelOptions,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            system_prompt: None,
            max_tool_rounds: 8,
            options: ModelOptions::default(),
        }
    }
}

/// Result of one run
#[derive(Debug)]
pub struct RunOutcome {
    /// Final answer text, possibly a fallback
    pub text: String,
    /// Tool rounds executed
    pub rounds: usize,
    /// Turns produced by the run, ending with the assistant answer
    pub turns: Vec<ConversationTurn>,
    /// Set when `text` is a fallback
    pub error: Option<RunError>,
}

impl RunOutcome {
    /// Whether the model produced the answer itself
    pub fn is_answered(&self) -> bool {
        self.error.is_none()
    }
}

/// Drives a conversation between the model and the tool catalog
pub struct ConversationOrchestrator {
    catalog: Arc<ToolCatalog>,
    model: Arc<dyn ModelClient>,
    settings: OrchestratorSettings,
    logger: SharedLogger,
}

impl ConversationOrchestrator {
    pub fn new(catalog: Arc<ToolCatalog>, model: Arc<dyn ModelClient>, logger: SharedLogger) -> Self {
        Self {
            catalog,
            model,
            settings: OrchestratorSettings::default(),
            logger,
        }
    }

    /// Override run settings
    pub fn with_settings(mut self, settings: OrchestratorSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    pub fn catalog(&self) -> &Arc<ToolCatalog> {
        &self.catalog
    }

    /// Run the loop over `history` until the model gives a text answer.
    ///
    /// `history` is left untouched; the turns this run adds are returned on
    /// the outcome.
    pub async fn run(&self, history: &[ConversationTurn]) -> RunOutcome {
        let mut turns = history.to_vec();
        let start = turns.len();
        let mut rounds = 0;

        self.catalog.refresh().await;

        loop {
            let request = ModelRequest {
                system_prompt: self.settings.system_prompt.clone(),
                history: turns.clone(),
                tools: self.catalog.tools(),
                options: self.settings.options.clone(),
            };

            let response = match self.model.complete(request).await {
                Ok(response) => response,
                Err(e) => {
                    self.logger.error(&format!("[Orchestrator] Model request failed: {}", e));
                    return Self::finish(turns, start, rounds, MODEL_FAILURE_REPLY, Some(RunError::Model(e)));
                }
            };

            if response.is_terminal() {
                let text = response.text.trim();
                if text.is_empty() {
                    self.logger.warn("[Orchestrator] Model returned an empty answer");
                    return Self::finish(turns, start, rounds, EMPTY_REPLY, Some(RunError::EmptyAnswer));
                }
                self.logger.info(&format!("[Orchestrator] Answered after {} tool rounds", rounds));
                return Self::finish(turns, start, rounds, text, None);
            }

            if rounds >= self.settings.max_tool_rounds {
                self.logger.warn(&format!(
                    "[Orchestrator] Giving up: model still requesting tools after {} rounds",
                    rounds
                ));
                return Self::finish(
                    turns,
                    start,
                    rounds,
                    ROUND_LIMIT_REPLY,
                    Some(RunError::ToolRoundLimitExceeded(rounds)),
                );
            }

            rounds += 1;
            self.logger.info(&format!(
                "[Orchestrator] Round {}: {} tool calls",
                rounds,
                response.tool_calls.len()
            ));

            turns.push(ConversationTurn::tool_requests(
                response.text.clone(),
                &response.tool_calls,
            ));

            let mut registry_changed = false;
            for call in &response.tool_calls {
                let result = self.execute(call, &mut registry_changed).await;
                turns.push(ConversationTurn::tool_result(result));
            }

            if registry_changed {
                self.catalog.refresh().await;
            }
        }
    }

    /// Execute one tool call, capturing any failure as an error result
    async fn execute(&self, call: &ToolCall, registry_changed: &mut bool) -> ToolResult {
        if is_management_tool(&call.name) {
            let outcome = management::execute(self.catalog.registry(), call).await;
            *registry_changed |= outcome.changed;
            return match outcome.result {
                Ok(text) => ToolResult::success(&call.id, text),
                Err(e) => {
                    self.logger.warn(&format!("[Orchestrator] {} failed: {}", call.name, e));
                    ToolResult::error(&call.id, e)
                }
            };
        }

        match self.catalog.dispatch(&call.name, call.input.clone()).await {
            Ok(output) => ToolResult::success(&call.id, output.content),
            Err(e) => {
                self.logger.warn(&format!("[Orchestrator] {}", e));
                ToolResult::error(&call.id, e.to_string())
            }
        }
    }

    fn finish(
        mut turns: Vec<ConversationTurn>,
        start: usize,
        rounds: usize,
        text: &str,
        error: Option<RunError>,
    ) -> RunOutcome {
        turns.push(ConversationTurn::assistant(text));
        RunOutcome {
            text: text.to_string(),
            rounds,
            turns: turns.split_off(start),
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;
    use crate::model::{MockModel, MockReply};
    use crate::providers::mock::{MockLauncher, MockToolServer};
    use crate::providers::{ProviderRegistry, ProviderSpec};
    use crate::types::TurnRole;
    use serde_json::json;

    fn logger() -> SharedLogger {
        Arc::new(NoOpLogger::new())
    }

    fn catalog() -> Arc<ToolCatalog> {
        let launcher = MockLauncher::new()
            .with_server("calc-server", MockToolServer::calculator())
            .with_server("echo-server", MockToolServer::echo());
        let registry = Arc::new(ProviderRegistry::new(Arc::new(launcher), logger()));
        Arc::new(ToolCatalog::new(registry, logger()))
    }

    fn orchestrator(catalog: &Arc<ToolCatalog>, model: &Arc<MockModel>) -> ConversationOrchestrator {
        let model: Arc<dyn ModelClient> = model.clone();
        ConversationOrchestrator::new(catalog.clone(), model, logger())
    }

    fn tool_results(outcome: &RunOutcome) -> Vec<ToolResult> {
        outcome.turns.iter().filter_map(|t| t.as_tool_result()).collect()
    }

    #[tokio::test]
    async fn test_text_answer_is_terminal() {
        let catalog = catalog();
        let model = Arc::new(MockModel::fixed("Hello there.", logger()));

        let outcome = orchestrator(&catalog, &model)
            .run(&[ConversationTurn::user("hi")])
            .await;

        assert_eq!(outcome.text, "Hello there.");
        assert_eq!(outcome.rounds, 0);
        assert!(outcome.is_answered());
        assert_eq!(outcome.turns.len(), 1);
        assert_eq!(outcome.turns[0].role, TurnRole::Assistant);
    }

    #[tokio::test]
    async fn test_calc_add_end_to_end() {
        let catalog = catalog();
        catalog
            .registry()
            .register(ProviderSpec::new("calc", "calc-server"))
            .await
            .unwrap();
        let model = Arc::new(MockModel::scripted(
            vec![
                MockReply::tool_call("add", json!({"a": 2, "b": 2})),
                MockReply::EchoToolResult,
            ],
            logger(),
        ));

        let outcome = orchestrator(&catalog, &model)
            .run(&[ConversationTurn::user("What is 2 + 2?")])
            .await;

        assert!(outcome.is_answered());
        assert!(outcome.text.contains('4'));
        assert_eq!(outcome.rounds, 1);

        let results = tool_results(&outcome);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].content, "4");
        assert!(!results[0].is_error);

        // The model was offered the provider's tools and the management tools
        let tools: Vec<_> = model.requests()[0].tools.iter().map(|t| t.name.clone()).collect();
        assert!(tools.contains(&"add".to_string()));
        assert!(tools.contains(&"add_provider".to_string()));
    }

    #[tokio::test]
    async fn test_unknown_tool_becomes_error_result() {
        let catalog = catalog();
        let model = Arc::new(MockModel::scripted(
            vec![
                MockReply::tool_call("does_not_exist", json!({})),
                MockReply::text("I could not find that tool."),
            ],
            logger(),
        ));

        let outcome = orchestrator(&catalog, &model)
            .run(&[ConversationTurn::user("use the missing tool")])
            .await;

        assert!(outcome.is_answered());
        assert_eq!(outcome.text, "I could not find that tool.");
        let results = tool_results(&outcome);
        assert!(results[0].is_error);
        assert_eq!(results[0].content, "Tool not found: does_not_exist");
    }

    #[tokio::test]
    async fn test_provider_failure_is_data() {
        let catalog = catalog();
        catalog
            .registry()
            .register(ProviderSpec::new("echo", "echo-server"))
            .await
            .unwrap();
        let model = Arc::new(MockModel::scripted(
            vec![MockReply::tool_call("fail", json!({})), MockReply::EchoToolResult],
            logger(),
        ));

        let outcome = orchestrator(&catalog, &model)
            .run(&[ConversationTurn::user("go")])
            .await;

        assert!(outcome.is_answered());
        assert!(outcome.text.contains("deliberate failure"));
        assert!(tool_results(&outcome)[0].is_error);
    }

    #[tokio::test]
    async fn test_round_limit_stops_after_exactly_n_rounds() {
        let catalog = catalog();
        catalog
            .registry()
            .register(ProviderSpec::new("echo", "echo-server"))
            .await
            .unwrap();
        let model = Arc::new(MockModel::repeating(
            MockReply::tool_call("echo", json!({"text": "again"})),
            logger(),
        ));
        let orchestrator = orchestrator(&catalog, &model).with_settings(OrchestratorSettings {
            max_tool_rounds: 3,
            ..Default::default()
        });

        let outcome = orchestrator.run(&[ConversationTurn::user("loop")]).await;

        assert_eq!(outcome.rounds, 3);
        assert_eq!(outcome.text, ROUND_LIMIT_REPLY);
        assert!(matches!(outcome.error, Some(RunError::ToolRoundLimitExceeded(3))));
        assert_eq!(tool_results(&outcome).len(), 3);
        assert_eq!(model.request_count(), 4);
    }

    #[tokio::test]
    async fn test_model_error_yields_apology() {
        let catalog = catalog();
        let model = Arc::new(MockModel::error("service unavailable", logger()));

        let outcome = orchestrator(&catalog, &model)
            .run(&[ConversationTurn::user("hi")])
            .await;

        assert_eq!(outcome.text, MODEL_FAILURE_REPLY);
        assert!(matches!(outcome.error, Some(RunError::Model(_))));
    }

    #[tokio::test]
    async fn test_empty_answer_yields_fallback() {
        let catalog = catalog();
        let model = Arc::new(MockModel::repeating(MockReply::text("   "), logger()));

        let outcome = orchestrator(&catalog, &model)
            .run(&[ConversationTurn::user("hi")])
            .await;

        assert_eq!(outcome.text, EMPTY_REPLY);
        assert!(matches!(outcome.error, Some(RunError::EmptyAnswer)));
    }

    #[tokio::test]
    async fn test_added_provider_is_usable_in_same_run() {
        let catalog = catalog();
        let model = Arc::new(MockModel::scripted(
            vec![
                MockReply::tool_call(
                    "add_provider",
                    json!({"name": "calc", "command": "calc-server"}),
                ),
                MockReply::tool_call("add", json!({"a": 2, "b": 2})),
                MockReply::EchoToolResult,
            ],
            logger(),
        ));

        let outcome = orchestrator(&catalog, &model)
            .run(&[ConversationTurn::user("add a calculator and use it")])
            .await;

        assert!(outcome.text.contains('4'));
        assert_eq!(outcome.rounds, 2);

        let requests = model.requests();
        assert!(requests[0].tools.iter().all(|t| t.name != "add"));
        assert!(requests[1].tools.iter().any(|t| t.name == "add"));
    }

    #[tokio::test]
    async fn test_removed_provider_is_unroutable_in_same_run() {
        let catalog = catalog();
        catalog
            .registry()
            .register(ProviderSpec::new("calc", "calc-server"))
            .await
            .unwrap();
        let model = Arc::new(MockModel::scripted(
            vec![
                MockReply::tool_call("remove_provider", json!({"name": "calc"})),
                MockReply::tool_call("add", json!({"a": 1, "b": 1})),
                MockReply::EchoToolResult,
            ],
            logger(),
        ));

        let outcome = orchestrator(&catalog, &model)
            .run(&[ConversationTurn::user("remove calc then add")])
            .await;

        let results = tool_results(&outcome);
        assert_eq!(results[0].content, "Provider 'calc' removed");
        assert_eq!(results[1].content, "Tool not found: add");
        assert!(catalog.registry().is_empty());
    }
}
