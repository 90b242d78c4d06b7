//! In-process providers for testing
//!
//! `MockLauncher` stands in for process spawning: each `ProviderSpec`
//! command is looked up in a table of scripted `MockToolServer`s. Counters
//! record launches, live sessions and graceful shutdowns so tests can check
//! that nothing leaks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{json, Value};

use crate::types::ToolDescriptor;
use super::error::{ProviderError, ProviderResult};
use super::session::{ProviderLauncher, ProviderSession, ToolOutput};
use super::spec::ProviderSpec;

/// Handler backing one mock tool
pub type ToolHandler = Arc<dyn Fn(&Value) -> Result<Value, String> + Send + Sync>;

/// Scripted behaviour of one fake provider process
#[derive(Clone, Default)]
pub struct MockToolServer {
    tools: Vec<(ToolDescriptor, ToolHandler)>,
    hang_handshake: bool,
    handshake_delay: Duration,
    list_delay: Duration,
    call_delay: Duration,
    list_error: Option<String>,
    ignore_shutdown: bool,
}

impl MockToolServer {
    /// A server with no tools
    pub fn new() -> Self {
        Self::default()
    }

    /// A server offering `add` and `subtract` over numbers `a` and `b`
    pub fn calculator() -> Self {
        let schema = json!({
            "type": "object",
            "properties": {
                "a": { "type": "number" },
                "b": { "type": "number" }
            },
            "required": ["a", "b"]
        });

        Self::new()
            .with_tool(
                ToolDescriptor::new("add", "Add two numbers").with_schema(schema.clone()),
                |args| binary_op(args, |a, b| a + b),
            )
            .with_tool(
                ToolDescriptor::new("subtract", "Subtract b from a").with_schema(schema),
                |args| binary_op(args, |a, b| a - b),
            )
    }

    /// A server offering `echo`, which returns its `text` argument, and
    /// `fail`, which always reports an error
    pub fn echo() -> Self {
        Self::new()
            .with_tool(
                ToolDescriptor::new("echo", "Echo the text back").with_schema(json!({
                    "type": "object",
                    "properties": { "text": { "type": "string" } }
                })),
                |args| Ok(args.get("text").cloned().unwrap_or(Value::Null)),
            )
            .with_tool(ToolDescriptor::new("fail", "Always fails"), |_| {
                Err("deliberate failure".to_string())
            })
    }

    /// Add a tool
    pub fn with_tool<F>(mut self, descriptor: ToolDescriptor, handler: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.tools.push((descriptor, Arc::new(handler)));
        self
    }

    /// Never finish the handshake
    pub fn hanging_handshake(mut self) -> Self {
        self.hang_handshake = true;
        self
    }

    /// Delay the handshake
    pub fn with_handshake_delay(mut self, delay: Duration) -> Self {
        self.handshake_delay = delay;
        self
    }

    /// Delay every `tools/list` answer
    pub fn with_list_delay(mut self, delay: Duration) -> Self {
        self.list_delay = delay;
        self
    }

    /// Delay every tool call
    pub fn with_call_delay(mut self, delay: Duration) -> Self {
        self.call_delay = delay;
        self
    }

    /// Answer `tools/list` with garbage
    pub fn failing_list(mut self, message: impl Into<String>) -> Self {
        self.list_error = Some(message.into());
        self
    }

    /// Never exit voluntarily on shutdown
    pub fn ignoring_shutdown(mut self) -> Self {
        self.ignore_shutdown = true;
        self
    }
}

fn binary_op(args: &Value, op: impl Fn(f64, f64) -> f64) -> Result<Value, String> {
    let a = args.get("a").and_then(Value::as_f64).ok_or("missing number 'a'")?;
    let b = args.get("b").and_then(Value::as_f64).ok_or("missing number 'b'")?;
    let result = op(a, b);
    if result.fract() == 0.0 && result.abs() < i64::MAX as f64 {
        Ok(json!(result as i64))
    } else {
        Ok(json!(result))
    }
}

#[derive(Default)]
struct MockStats {
    launches: AtomicUsize,
    live: AtomicUsize,
    shutdowns: AtomicUsize,
    calls: AtomicUsize,
}

/// Launcher resolving commands to scripted servers
#[derive(Default)]
pub struct MockLauncher {
    servers: RwLock<HashMap<String, MockToolServer>>,
    stats: Arc<MockStats>,
}

impl MockLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `command` with `server`
    pub fn with_server(self, command: impl Into<String>, server: MockToolServer) -> Self {
        self.add_server(command, server);
        self
    }

    /// Serve `command` with `server`, after construction
    pub fn add_server(&self, command: impl Into<String>, server: MockToolServer) {
        self.servers.write().insert(command.into(), server);
    }

    /// Launch attempts for known commands
    pub fn launches(&self) -> usize {
        self.stats.launches.load(Ordering::SeqCst)
    }

    /// Sessions created and not yet dropped
    pub fn live_sessions(&self) -> usize {
        self.stats.live.load(Ordering::SeqCst)
    }

    /// Sessions that exited on request
    pub fn graceful_shutdowns(&self) -> usize {
        self.stats.shutdowns.load(Ordering::SeqCst)
    }

    /// Tool calls received across all sessions
    pub fn calls(&self) -> usize {
        self.stats.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderLauncher for MockLauncher {
    async fn launch(&self, spec: &ProviderSpec) -> ProviderResult<Box<dyn ProviderSession>> {
        let server = self.servers.read().get(&spec.command).cloned();
        let server = server.ok_or_else(|| {
            ProviderError::connection(
                &spec.name,
                format!("failed to spawn '{}': command not found", spec.command),
            )
        })?;

        self.stats.launches.fetch_add(1, Ordering::SeqCst);

        if server.hang_handshake {
            futures::future::pending::<()>().await;
        }
        if !server.handshake_delay.is_zero() {
            tokio::time::sleep(server.handshake_delay).await;
        }

        self.stats.live.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSession {
            provider: spec.name.clone(),
            server,
            stats: self.stats.clone(),
        }))
    }
}

struct MockSession {
    provider: String,
    server: MockToolServer,
    stats: Arc<MockStats>,
}

impl Drop for MockSession {
    fn drop(&mut self) {
        self.stats.live.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProviderSession for MockSession {
    async fn list_tools(&self) -> ProviderResult<Vec<ToolDescriptor>> {
        if !self.server.list_delay.is_zero() {
            tokio::time::sleep(self.server.list_delay).await;
        }
        if let Some(message) = &self.server.list_error {
            return Err(ProviderError::protocol(&self.provider, message.clone()));
        }
        Ok(self.server.tools.iter().map(|(d, _)| d.clone()).collect())
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> ProviderResult<ToolOutput> {
        if !self.server.call_delay.is_zero() {
            tokio::time::sleep(self.server.call_delay).await;
        }
        self.stats.calls.fetch_add(1, Ordering::SeqCst);

        let (_, handler) = self
            .server
            .tools
            .iter()
            .find(|(d, _)| d.name == name)
            .ok_or_else(|| ProviderError::tool_execution(name, "unknown tool"))?;

        match handler(&arguments) {
            Ok(Value::String(text)) => Ok(ToolOutput::text(text)),
            Ok(value) => Ok(ToolOutput {
                content: value.to_string(),
                structured: value.is_object().then(|| value.clone()),
            }),
            Err(message) => Err(ProviderError::tool_execution(name, message)),
        }
    }

    async fn shutdown(self: Box<Self>) -> ProviderResult<()> {
        if self.server.ignore_shutdown {
            futures::future::pending::<()>().await;
        }
        self.stats.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_calculator_tools() {
        let launcher = MockLauncher::new().with_server("calc", MockToolServer::calculator());
        let session = launcher.launch(&ProviderSpec::new("calc", "calc")).await.unwrap();

        let tools = session.list_tools().await.unwrap();
        let names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["add", "subtract"]);

        let out = session.call_tool("add", json!({"a": 2, "b": 2})).await.unwrap();
        assert_eq!(out.content, "4");
        let out = session.call_tool("subtract", json!({"a": 1, "b": 0.5})).await.unwrap();
        assert_eq!(out.content, "0.5");

        let err = session.call_tool("add", json!({"a": 2})).await.unwrap_err();
        assert!(err.to_string().contains("missing number 'b'"));
        assert_eq!(launcher.calls(), 3);
    }

    #[tokio::test]
    async fn test_session_drop_releases() {
        let launcher = MockLauncher::new().with_server("echo", MockToolServer::echo());
        let session = launcher.launch(&ProviderSpec::new("echo", "echo")).await.unwrap();
        assert_eq!(launcher.live_sessions(), 1);

        drop(session);
        assert_eq!(launcher.live_sessions(), 0);
        assert_eq!(launcher.graceful_shutdowns(), 0);
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let launcher = MockLauncher::new();
        let err = launcher
            .launch(&ProviderSpec::new("x", "nope"))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ProviderError::Connection { .. }));
        assert_eq!(launcher.launches(), 0);
    }
}
