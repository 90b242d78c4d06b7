//! Model service clients
//!
//! ## Architecture
//!
//! `ModelClient` is the seam between the orchestrator and the language
//! model. `GenaiModel` uses the `genai` crate, which handles:
//! - Streaming SSE parsing
//! - Service-specific protocols (OpenAI, Anthropic, Gemini, etc.)
//! - Tool calling
//!
//! Services not native to genai (OpenRouter, Mistral, custom base URLs) go
//! through genai's `ServiceTargetResolver` using the OpenAI protocol. Auth
//! flows through our `SecretStore`.
//!
//! `MockModel` plays scripted replies for tests and offline runs.

mod traits;
mod error;
mod genai_adapter;
mod genai_model;
mod mock;

pub use traits::{collect_response, ModelClient, ModelConfig, ModelOptions, ModelRequest, StreamResponse};
pub use error::{ModelError, ModelResult};
pub use genai_model::GenaiModel;
pub use genai_adapter::{is_supported_service, native_adapter};
pub use mock::{MockModel, MockReply};

use std::sync::Arc;

use crate::logging::SharedLogger;
use crate::secrets::SecretStore;

/// Create the model client for a `service/model` string.
///
/// `mock` (or any `mock/...` model) yields an echoing `MockModel`; anything
/// else goes through `GenaiModel`, with unknown services treated as
/// OpenAI-compatible.
pub fn create_model(
    config: ModelConfig,
    secrets: Arc<dyn SecretStore>,
    logger: SharedLogger,
) -> Arc<dyn ModelClient> {
    let is_mock = config.model == "mock" || config.service() == Some("mock");
    if is_mock {
        Arc::new(MockModel::echo(logger))
    } else {
        Arc::new(GenaiModel::new(config, secrets, logger))
    }
}
