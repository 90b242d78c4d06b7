//! Stdio MCP sessions using the official rmcp SDK
//!
//! Each provider is a child process speaking MCP over stdin/stdout. The
//! rmcp transport owns the child and kills it when the session is dropped.

use async_trait::async_trait;
use rmcp::{
    model::{
        CallToolRequestParams, CallToolResult, ClientCapabilities, ClientInfo, Implementation,
        RawContent, ResourceContents, Tool,
    },
    service::RunningService,
    transport::TokioChildProcess,
    RoleClient, ServiceExt,
};
use serde_json::{Map, Value};

use crate::logging::SharedLogger;
use crate::providers::{
    ProviderError, ProviderLauncher, ProviderResult, ProviderSession, ProviderSpec, ToolOutput,
};
use crate::types::ToolDescriptor;

/// Launches providers as stdio child processes
pub struct McpLauncher {
    logger: SharedLogger,
}

impl McpLauncher {
    pub fn new(logger: SharedLogger) -> Self {
        Self { logger }
    }
}

fn client_info() -> ClientInfo {
    ClientInfo {
        meta: None,
        protocol_version: Default::default(),
        capabilities: ClientCapabilities::default(),
        client_info: Implementation {
            name: "toolrelay".to_string(),
            title: Some("Tool Relay".to_string()),
            version: env!("CARGO_PKG_VERSION").to_string(),
            website_url: None,
            icons: None,
        },
    }
}

#[async_trait]
impl ProviderLauncher for McpLauncher {
    async fn launch(&self, spec: &ProviderSpec) -> ProviderResult<Box<dyn ProviderSession>> {
        let mut cmd = tokio::process::Command::new(&spec.command);
        cmd.args(&spec.args);
        let env = spec.expanded_env();
        if !env.is_complete() {
            return Err(ProviderError::connection(
                &spec.name,
                format!("missing environment variables: {}", env.missing.join(", ")),
            ));
        }
        cmd.envs(env.vars);

        let transport = TokioChildProcess::new(cmd).map_err(|e| {
            ProviderError::connection(
                &spec.name,
                format!("failed to spawn '{}': {}", spec.command, e),
            )
        })?;

        let client = client_info()
            .serve(transport)
            .await
            .map_err(|e| ProviderError::connection(&spec.name, format!("initialization failed: {}", e)))?;

        if let Some(info) = client.peer_info() {
            self.logger.debug(&format!(
                "[McpLauncher] '{}' is {} {}",
                spec.name, info.server_info.name, info.server_info.version
            ));
        }

        Ok(Box::new(McpSession {
            provider: spec.name.clone(),
            client,
            logger: self.logger.clone(),
        }))
    }
}

/// A handshaken MCP client bound to one child process
pub struct McpSession {
    provider: String,
    client: RunningService<RoleClient, ClientInfo>,
    logger: SharedLogger,
}

#[async_trait]
impl ProviderSession for McpSession {
    async fn list_tools(&self) -> ProviderResult<Vec<ToolDescriptor>> {
        let tools = self
            .client
            .list_all_tools()
            .await
            .map_err(|e| ProviderError::protocol(&self.provider, e.to_string()))?;

        self.logger.debug(&format!(
            "[McpSession] '{}' listed {} tools",
            self.provider,
            tools.len()
        ));

        Ok(tools.into_iter().map(descriptor_from_mcp).collect())
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> ProviderResult<ToolOutput> {
        let params = CallToolRequestParams {
            meta: None,
            name: name.to_owned().into(),
            arguments: call_arguments(name, arguments)?,
            task: None,
        };

        let result = self
            .client
            .call_tool(params)
            .await
            .map_err(|e| ProviderError::tool_execution(name, e.to_string()))?;

        output_from_mcp(name, result)
    }

    async fn shutdown(self: Box<Self>) -> ProviderResult<()> {
        let provider = self.provider.clone();
        self.client
            .cancel()
            .await
            .map_err(|e| ProviderError::protocol(provider, e.to_string()))?;
        Ok(())
    }
}

/// MCP tool arguments are a JSON object; `null` means none
fn call_arguments(tool: &str, arguments: Value) -> ProviderResult<Option<Map<String, Value>>> {
    match arguments {
        Value::Object(map) => Ok(Some(map)),
        Value::Null => Ok(None),
        other => Err(ProviderError::tool_execution(
            tool,
            format!("arguments must be a JSON object, got {}", other),
        )),
    }
}

fn descriptor_from_mcp(tool: Tool) -> ToolDescriptor {
    ToolDescriptor {
        name: tool.name.to_string(),
        description: tool.description.map(|d| d.to_string()).unwrap_or_default(),
        // input_schema is Arc<JsonObject>
        input_schema: serde_json::to_value(tool.input_schema.as_ref()).unwrap_or_default(),
    }
}

/// Flatten an MCP call result into text for the model.
///
/// A result flagged `isError` becomes a `ToolExecution` error carrying the
/// provider's message.
fn output_from_mcp(tool: &str, result: CallToolResult) -> ProviderResult<ToolOutput> {
    let mut text = result
        .content
        .iter()
        .filter_map(|c| match &c.raw {
            RawContent::Text(t) => Some(t.text.clone()),
            RawContent::Image(img) => Some(format!("[image: {}]", img.mime_type)),
            RawContent::Resource(res) => Some(match &res.resource {
                ResourceContents::TextResourceContents { text, .. } => text.clone(),
                ResourceContents::BlobResourceContents { uri, .. } => format!("[resource: {}]", uri),
            }),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n");

    if text.is_empty() {
        if let Some(structured) = &result.structured_content {
            text = structured.to_string();
        }
    }

    if result.is_error.unwrap_or(false) {
        let message = if text.is_empty() {
            "provider reported an error".to_string()
        } else {
            text
        };
        return Err(ProviderError::tool_execution(tool, message));
    }

    Ok(ToolOutput {
        content: text,
        structured: result.structured_content,
    })
}
