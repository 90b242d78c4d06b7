//! Adapter between toolrelay types and genai types
//!
//! Conversion functions between conversation turns and genai's chat types,
//! plus client construction. Auth resolves through our `SecretStore`, not
//! genai's own env var lookup, so `.env` values and explicit keys in the
//! config file behave the same way.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use genai::chat::{
    ChatMessage as GenaiMessage, ChatOptions as GenaiOptions, ChatStreamEvent, Tool as GenaiTool,
    ToolCall as GenaiToolCall, ToolResponse as GenaiToolResponse,
};
use genai::resolver::{AuthData, AuthResolver, Endpoint, ServiceTargetResolver};
use genai::{adapter::AdapterKind, Client, ModelIden, ServiceTarget};
use serde_json::json;

use crate::secrets::SecretStore;
use crate::types::{ContentPart, ConversationTurn, StreamChunk, ToolCall, ToolDescriptor, TurnContent, TurnRole};

use super::error::{ModelError, ModelResult};
use super::traits::{ModelConfig, ModelOptions};

// ============================================================================
// Turn Conversion: toolrelay -> genai
// ============================================================================

fn joined_text(parts: &[ContentPart]) -> String {
    parts
        .iter()
        .filter_map(|p| match p {
            ContentPart::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Convert our ToolCall to a genai ToolCall.
///
/// Built through serde so provider-specific optional fields take their
/// defaults.
pub fn to_genai_tool_call(call: &ToolCall) -> ModelResult<GenaiToolCall> {
    Ok(serde_json::from_value(json!({
        "call_id": call.id,
        "fn_name": call.name,
        "fn_arguments": call.input,
    }))?)
}

/// Convert one turn into the genai message(s) carrying it
pub fn to_genai_turn(turn: &ConversationTurn) -> ModelResult<Vec<GenaiMessage>> {
    let messages = match (&turn.role, &turn.content) {
        (TurnRole::User, TurnContent::Text(text)) => vec![GenaiMessage::user(text.clone())],
        (TurnRole::User, TurnContent::Parts(parts)) => vec![GenaiMessage::user(joined_text(parts))],
        (TurnRole::Assistant, TurnContent::Text(text)) => vec![GenaiMessage::assistant(text.clone())],
        (TurnRole::Assistant, TurnContent::Parts(parts)) => {
            let mut messages = Vec::new();
            let text = joined_text(parts);
            if !text.is_empty() {
                messages.push(GenaiMessage::assistant(text));
            }
            let calls = turn
                .tool_calls()
                .iter()
                .map(to_genai_tool_call)
                .collect::<ModelResult<Vec<_>>>()?;
            if !calls.is_empty() {
                messages.push(GenaiMessage::from(calls));
            }
            messages
        }
        (TurnRole::ToolResult, _) => match turn.as_tool_result() {
            Some(result) => {
                let content = if result.is_error {
                    format!("Error: {}", result.content)
                } else {
                    result.content
                };
                vec![GenaiMessage::from(GenaiToolResponse::new(result.call_id, content))]
            }
            None => {
                return Err(ModelError::Other(
                    "tool result turn without a tool result part".to_string(),
                ))
            }
        },
    };
    Ok(messages)
}

/// Convert a system prompt and history to genai messages
pub fn to_genai_messages(
    system_prompt: Option<&str>,
    history: &[ConversationTurn],
) -> ModelResult<Vec<GenaiMessage>> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    if let Some(prompt) = system_prompt.filter(|p| !p.is_empty()) {
        messages.push(GenaiMessage::system(prompt));
    }
    for turn in history {
        messages.extend(to_genai_turn(turn)?);
    }
    Ok(messages)
}

// ============================================================================
// Tool and Options Conversion: toolrelay -> genai
// ============================================================================

/// Convert a ToolDescriptor to a genai Tool
pub fn to_genai_tool(tool: &ToolDescriptor) -> GenaiTool {
    GenaiTool::new(&tool.name)
        .with_description(&tool.description)
        .with_schema(tool.input_schema.clone())
}

/// Convert descriptors to genai tools
pub fn to_genai_tools(tools: &[ToolDescriptor]) -> Vec<GenaiTool> {
    tools.iter().map(to_genai_tool).collect()
}

/// Convert ModelOptions to genai ChatOptions
pub fn to_genai_options(options: &ModelOptions) -> GenaiOptions {
    let mut genai_opts = GenaiOptions::default();

    if let Some(temp) = options.temperature {
        genai_opts = genai_opts.with_temperature(temp as f64);
    }

    if let Some(max_tokens) = options.max_tokens {
        genai_opts = genai_opts.with_max_tokens(max_tokens);
    }

    // Captured tool calls arrive complete on the End event
    genai_opts.with_capture_tool_calls(true)
}

// ============================================================================
// Response Conversion: genai -> toolrelay
// ============================================================================

/// Convert a genai ToolCall to ours
pub fn from_genai_tool_call(tc: &GenaiToolCall) -> ToolCall {
    ToolCall::new(tc.call_id.clone(), tc.fn_name.clone(), tc.fn_arguments.clone())
}

/// Convert one genai stream event to zero or more chunks.
///
/// Every captured tool call on the End event becomes its own chunk.
pub fn from_genai_event(event: ChatStreamEvent) -> Vec<ModelResult<StreamChunk>> {
    match event {
        ChatStreamEvent::Chunk(chunk) => vec![Ok(StreamChunk::text(chunk.content))],
        ChatStreamEvent::ToolCallChunk(chunk) => vec![Ok(StreamChunk::ToolCallDelta {
            id: chunk.tool_call.call_id,
            name: Some(chunk.tool_call.fn_name),
            input_delta: Some(chunk.tool_call.fn_arguments.to_string()),
        })],
        ChatStreamEvent::End(end) => match end.captured_tool_calls() {
            Some(tool_calls) => tool_calls
                .iter()
                .map(|tc| Ok(StreamChunk::tool_call(from_genai_tool_call(tc))))
                .collect(),
            None => Vec::new(),
        },
        ChatStreamEvent::Start => Vec::new(),
        ChatStreamEvent::ReasoningChunk(_) => Vec::new(),
        ChatStreamEvent::ThoughtSignatureChunk(_) => Vec::new(),
    }
}

// ============================================================================
// Service Resolution
// ============================================================================

/// genai adapter for a service prefix, for services genai speaks natively
pub fn native_adapter(service: &str) -> Option<AdapterKind> {
    let kind = match service.to_lowercase().as_str() {
        "openai" => AdapterKind::OpenAI,
        "anthropic" => AdapterKind::Anthropic,
        "gemini" | "google" => AdapterKind::Gemini,
        "ollama" => AdapterKind::Ollama,
        "groq" => AdapterKind::Groq,
        "xai" => AdapterKind::Xai,
        "deepseek" => AdapterKind::DeepSeek,
        "cohere" => AdapterKind::Cohere,
        "fireworks" => AdapterKind::Fireworks,
        "together" => AdapterKind::Together,
        _ => return None,
    };
    Some(kind)
}

/// Fixed endpoints for OpenAI-compatible services genai does not know
fn compatible_endpoint(service: &str) -> Option<&'static str> {
    match service.to_lowercase().as_str() {
        "openrouter" => Some("https://openrouter.ai/api/v1/"),
        "mistral" => Some("https://api.mistral.ai/v1/"),
        _ => None,
    }
}

/// Whether a service can be reached through genai
pub fn is_supported_service(service: &str) -> bool {
    native_adapter(service).is_some() || compatible_endpoint(service).is_some()
}

/// Secret store key for a genai adapter
pub fn adapter_kind_to_service(adapter: AdapterKind) -> String {
    match adapter {
        AdapterKind::OpenAI => "openai".to_string(),
        AdapterKind::Anthropic => "anthropic".to_string(),
        AdapterKind::Gemini => "gemini".to_string(),
        AdapterKind::Ollama => "ollama".to_string(),
        AdapterKind::Groq => "groq".to_string(),
        AdapterKind::Xai => "xai".to_string(),
        AdapterKind::DeepSeek => "deepseek".to_string(),
        _ => format!("{:?}", adapter).to_lowercase(),
    }
}

// ============================================================================
// Client Creation with Custom Auth
// ============================================================================

/// Create a genai Client with custom auth and endpoint resolution
pub fn create_client(config: &ModelConfig, secrets: Arc<dyn SecretStore>) -> Client {
    let service = config.service().map(str::to_lowercase);
    let explicit_api_key = config.api_key.clone();
    let api_base = config.api_base.clone();

    let auth_service = service.clone();
    let auth_resolver = AuthResolver::from_resolver_async_fn(
        move |model_iden: ModelIden| -> Pin<Box<dyn Future<Output = genai::resolver::Result<Option<AuthData>>> + Send>> {
            let service = auth_service.clone();
            let explicit_key = explicit_api_key.clone();
            let secrets = secrets.clone();
            let adapter_kind = model_iden.adapter_kind;

            Box::pin(async move {
                if let Some(key) = explicit_key {
                    return Ok(Some(AuthData::from_single(key)));
                }

                let key_name = service.unwrap_or_else(|| adapter_kind_to_service(adapter_kind));
                // None is fine for services without auth (ollama)
                Ok(secrets.get(&key_name).map(AuthData::from_single))
            })
        },
    );

    let target_resolver = ServiceTargetResolver::from_resolver_fn(
        move |target: ServiceTarget| -> Result<ServiceTarget, genai::resolver::Error> {
            let Some(service) = service.as_deref() else {
                return Ok(target);
            };

            let endpoint = match (&api_base, compatible_endpoint(service)) {
                (Some(base), _) => Endpoint::from_owned(base.clone()),
                (None, Some(fixed)) => Endpoint::from_static(fixed),
                // Native services resolve from the model name
                (None, None) => return Ok(target),
            };
            let adapter_kind = native_adapter(service).unwrap_or(AdapterKind::OpenAI);

            Ok(ServiceTarget {
                endpoint,
                auth: target.auth, // handled by AuthResolver
                model: ModelIden::new(adapter_kind, target.model.model_name.clone()),
            })
        },
    );

    Client::builder()
        .with_auth_resolver(auth_resolver)
        .with_service_target_resolver(target_resolver)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ToolResult;
    use genai::chat::ChatRole as GenaiRole;

    #[test]
    fn test_message_conversion() {
        let history = vec![ConversationTurn::user("Hello, world!"), ConversationTurn::assistant("Hi!")];
        let messages = to_genai_messages(Some("Be brief."), &history).unwrap();

        assert_eq!(messages.len(), 3);
        assert!(matches!(messages[0].role, GenaiRole::System));
        assert!(matches!(messages[1].role, GenaiRole::User));
        assert!(matches!(messages[2].role, GenaiRole::Assistant));
    }

    #[test]
    fn test_tool_turns_conversion() {
        let call = ToolCall::new("c1", "add", serde_json::json!({"a": 2, "b": 2}));
        let history = vec![
            ConversationTurn::user("What is 2+2?"),
            ConversationTurn::tool_requests("Let me add.", &[call]),
            ConversationTurn::tool_result(ToolResult::success("c1", "4")),
        ];
        let messages = to_genai_messages(None, &history).unwrap();

        // user, assistant text, assistant tool calls, tool response
        assert_eq!(messages.len(), 4);
        assert!(matches!(messages[2].role, GenaiRole::Assistant));
        assert!(matches!(messages[3].role, GenaiRole::Tool));
    }

    #[test]
    fn test_tool_call_round_trip() {
        let call = ToolCall::new("c9", "echo", serde_json::json!({"text": "hi"}));
        let genai_call = to_genai_tool_call(&call).unwrap();
        assert_eq!(genai_call.fn_name, "echo");
        assert_eq!(from_genai_tool_call(&genai_call), call);
    }

    #[test]
    fn test_tool_conversion() {
        let tool = ToolDescriptor::new("get_weather", "Get weather for a location").with_schema(
            serde_json::json!({
                "type": "object",
                "properties": {
                    "location": { "type": "string" }
                }
            }),
        );

        let genai_tool = to_genai_tool(&tool);
        assert_eq!(genai_tool.name, "get_weather");
    }

    #[test]
    fn test_service_detection() {
        assert!(native_adapter("openai").is_some());
        assert!(native_adapter("Anthropic").is_some());
        assert!(native_adapter("openrouter").is_none());

        assert!(is_supported_service("gemini"));
        assert!(is_supported_service("openrouter"));
        assert!(is_supported_service("mistral"));
        assert!(!is_supported_service("unknown_service"));
    }
}
