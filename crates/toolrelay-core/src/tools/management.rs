//! Built-in tools that let the model manage providers
//!
//! These are never routed to a provider: the orchestrator executes them
//! directly against the registry. Structural failures (duplicate name,
//! unknown provider, bad arguments) come back as error tool results.

use std::collections::HashMap;

use serde_json::{json, Value};

use crate::providers::{ProviderRegistry, ProviderSpec};
use crate::types::{ToolCall, ToolDescriptor};

pub const ADD_PROVIDER: &str = "add_provider";
pub const REMOVE_PROVIDER: &str = "remove_provider";
pub const LIST_PROVIDERS: &str = "list_providers";

/// Names reserved for management tools
pub const MANAGEMENT_TOOL_NAMES: [&str; 3] = [ADD_PROVIDER, REMOVE_PROVIDER, LIST_PROVIDERS];

/// Whether `name` is a built-in management tool
pub fn is_management_tool(name: &str) -> bool {
    MANAGEMENT_TOOL_NAMES.contains(&name)
}

/// Descriptors for the management tools, as offered to the model
pub fn management_tools() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new(
            ADD_PROVIDER,
            "Launch a new tool provider process and make its tools available.",
        )
        .with_schema(json!({
            "type": "object",
            "properties": {
                "name": { "type": "string", "description": "Unique provider name" },
                "command": { "type": "string", "description": "Executable to run" },
                "args": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Command line arguments"
                },
                "env": {
                    "type": "object",
                    "additionalProperties": { "type": "string" },
                    "description": "Extra environment variables"
                }
            },
            "required": ["name", "command"]
        })),
        ToolDescriptor::new(REMOVE_PROVIDER, "Stop a tool provider and remove its tools.")
            .with_schema(json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string", "description": "Provider name" }
                },
                "required": ["name"]
            })),
        ToolDescriptor::new(LIST_PROVIDERS, "List the registered tool providers."),
    ]
}

/// Result of one management call
#[derive(Debug, Clone, PartialEq)]
pub struct ManagementOutcome {
    /// Text for the tool result turn, `Err` for an error result
    pub result: Result<String, String>,
    /// Whether the registry changed, so the catalog must be rebuilt
    pub changed: bool,
}

impl ManagementOutcome {
    fn ok(text: impl Into<String>, changed: bool) -> Self {
        Self {
            result: Ok(text.into()),
            changed,
        }
    }

    fn err(text: impl Into<String>) -> Self {
        Self {
            result: Err(text.into()),
            changed: false,
        }
    }
}

/// Execute a management tool call against the registry
pub async fn execute(registry: &ProviderRegistry, call: &ToolCall) -> ManagementOutcome {
    match call.name.as_str() {
        ADD_PROVIDER => add_provider(registry, call).await,
        REMOVE_PROVIDER => remove_provider(registry, call).await,
        LIST_PROVIDERS => list_providers(registry),
        other => ManagementOutcome::err(format!("Unknown management tool: {}", other)),
    }
}

fn spec_from_call(call: &ToolCall) -> Result<ProviderSpec, String> {
    let name = call
        .get_arg_str("name")
        .filter(|s| !s.trim().is_empty())
        .ok_or("missing required argument 'name'")?;
    let command = call
        .get_arg_str("command")
        .filter(|s| !s.trim().is_empty())
        .ok_or("missing required argument 'command'")?;

    let args = match call.get_arg("args") {
        None | Some(Value::Null) => Vec::new(),
        Some(_) => call
            .get_arg_str_list("args")
            .ok_or("'args' must be a list of strings")?,
    };

    let env: HashMap<String, String> = match call.get_arg("env") {
        None | Some(Value::Null) => HashMap::new(),
        Some(Value::Object(map)) => map
            .iter()
            .map(|(k, v)| {
                v.as_str()
                    .map(|s| (k.clone(), s.to_string()))
                    .ok_or_else(|| format!("env value for '{}' must be a string", k))
            })
            .collect::<Result<_, _>>()?,
        Some(_) => return Err("'env' must be an object of strings".to_string()),
    };

    let mut spec = ProviderSpec::new(name, command).with_args(args);
    spec.env = env;
    Ok(spec)
}

async fn add_provider(registry: &ProviderRegistry, call: &ToolCall) -> ManagementOutcome {
    let spec = match spec_from_call(call) {
        Ok(spec) => spec,
        Err(e) => return ManagementOutcome::err(format!("Invalid arguments: {}", e)),
    };
    let name = spec.name.clone();

    let env = spec.expanded_env();
    if !env.is_complete() {
        return ManagementOutcome::err(format!(
            "Provider '{}' needs unset environment variables: {}",
            name,
            env.missing.join(", ")
        ));
    }

    match registry.register(spec).await {
        Ok(()) => ManagementOutcome::ok(format!("Provider '{}' added", name), true),
        Err(e) => ManagementOutcome::err(e.to_string()),
    }
}

async fn remove_provider(registry: &ProviderRegistry, call: &ToolCall) -> ManagementOutcome {
    let Some(name) = call.get_arg_str("name") else {
        return ManagementOutcome::err("Invalid arguments: missing required argument 'name'");
    };

    match registry.deregister(name).await {
        Ok(()) => ManagementOutcome::ok(format!("Provider '{}' removed", name), true),
        Err(e) => ManagementOutcome::err(e.to_string()),
    }
}

fn list_providers(registry: &ProviderRegistry) -> ManagementOutcome {
    let providers: Vec<Value> = registry
        .list()
        .into_iter()
        .map(|p| json!({ "name": p.name, "command": p.command, "args": p.args }))
        .collect();
    ManagementOutcome::ok(Value::Array(providers).to_string(), false)
}
