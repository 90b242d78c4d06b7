//! Lifecycle of one spawned tool provider

use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::logging::SharedLogger;
use crate::types::ToolDescriptor;
use super::error::{ProviderError, ProviderResult};
use super::session::{ProviderLauncher, ProviderSession, ToolOutput};
use super::spec::ProviderSpec;

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connecting,
    Ready,
    Closing,
    Closed,
    Failed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Ready => "ready",
            ConnectionState::Closing => "closing",
            ConnectionState::Closed => "closed",
            ConnectionState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Time bounds applied to every provider connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionTimeouts {
    /// Spawn + protocol handshake
    pub handshake: Duration,
    /// One `tools/list` request
    pub list: Duration,
    /// One `tools/call` request
    pub call: Duration,
    /// How long `close` waits for a graceful exit before killing the process
    pub close_grace: Duration,
}

impl Default for ConnectionTimeouts {
    fn default() -> Self {
        Self {
            handshake: Duration::from_secs(30),
            list: Duration::from_secs(10),
            call: Duration::from_secs(60),
            close_grace: Duration::from_secs(2),
        }
    }
}

/// One live provider process and its request channel
///
/// Requests on a connection are serialized: a provider only ever sees one
/// outstanding request from us. Different connections never share a lock.
pub struct ProviderConnection {
    spec: ProviderSpec,
    state: Mutex<ConnectionState>,
    session: tokio::sync::Mutex<Option<Box<dyn ProviderSession>>>,
    timeouts: ConnectionTimeouts,
    logger: SharedLogger,
}

impl ProviderConnection {
    /// Spawn the provider and complete the handshake.
    ///
    /// On failure the connection ends in `Failed` and is dropped with
    /// nothing left running.
    pub async fn establish(
        spec: ProviderSpec,
        launcher: &dyn ProviderLauncher,
        timeouts: ConnectionTimeouts,
        logger: SharedLogger,
    ) -> ProviderResult<Self> {
        let connection = Self {
            spec,
            state: Mutex::new(ConnectionState::Connecting),
            session: tokio::sync::Mutex::new(None),
            timeouts,
            logger,
        };
        connection.connect(launcher).await?;
        Ok(connection)
    }

    async fn connect(&self, launcher: &dyn ProviderLauncher) -> ProviderResult<()> {
        let name = self.name().to_string();
        self.logger.info(&format!(
            "[ProviderConnection] Connecting to '{}': {} {}",
            name,
            self.spec.command,
            self.spec.args.join(" ")
        ));

        let outcome = tokio::time::timeout(self.timeouts.handshake, launcher.launch(&self.spec)).await;
        let session = match outcome {
            Ok(Ok(session)) => session,
            Ok(Err(e)) => {
                self.set_state(ConnectionState::Failed);
                self.logger.error(&format!("[ProviderConnection] '{}' failed: {}", name, e));
                return Err(match e {
                    ProviderError::Connection { .. } => e,
                    other => ProviderError::connection(&name, other.to_string()),
                });
            }
            Err(_) => {
                self.set_state(ConnectionState::Failed);
                let message = format!("handshake timed out after {:?}", self.timeouts.handshake);
                self.logger.error(&format!("[ProviderConnection] '{}' {}", name, message));
                return Err(ProviderError::connection(&name, message));
            }
        };

        *self.session.lock().await = Some(session);
        self.set_state(ConnectionState::Ready);
        self.logger.info(&format!("[ProviderConnection] '{}' ready", name));
        Ok(())
    }

    /// Provider name
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// Launch spec this connection came from
    pub fn spec(&self) -> &ProviderSpec {
        &self.spec
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// Whether the connection accepts requests
    pub fn is_ready(&self) -> bool {
        self.state() == ConnectionState::Ready
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.lock() = state;
    }

    /// Request the provider's tool catalog
    pub async fn list_tools(&self) -> ProviderResult<Vec<ToolDescriptor>> {
        self.ensure_ready()?;

        let request = async {
            let session = self.session.lock().await;
            match session.as_ref() {
                Some(session) => session.list_tools().await,
                None => Err(ProviderError::connection(self.name(), "connection closed")),
            }
        };

        match tokio::time::timeout(self.timeouts.list, request).await {
            Ok(Ok(tools)) => {
                self.logger.debug(&format!(
                    "[ProviderConnection] '{}' listed {} tools",
                    self.name(),
                    tools.len()
                ));
                Ok(tools)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(ProviderError::protocol(
                self.name(),
                format!("no tools/list response within {:?}", self.timeouts.list),
            )),
        }
    }

    /// Invoke a tool on this provider
    pub async fn invoke(&self, tool_name: &str, arguments: Value) -> ProviderResult<ToolOutput> {
        if !self.is_ready() {
            return Err(ProviderError::tool_execution(
                tool_name,
                format!("provider '{}' is {}", self.name(), self.state()),
            ));
        }

        self.logger.info(&format!(
            "[ProviderConnection] Calling '{}' on '{}'",
            tool_name,
            self.name()
        ));

        let request = async {
            let session = self.session.lock().await;
            match session.as_ref() {
                Some(session) => session.call_tool(tool_name, arguments).await,
                None => Err(ProviderError::tool_execution(
                    tool_name,
                    format!("provider '{}' closed", self.name()),
                )),
            }
        };

        match tokio::time::timeout(self.timeouts.call, request).await {
            Ok(result) => result,
            Err(_) => {
                self.logger.warn(&format!(
                    "[ProviderConnection] '{}' on '{}' timed out",
                    tool_name,
                    self.name()
                ));
                Err(ProviderError::tool_timeout(tool_name, self.timeouts.call))
            }
        }
    }

    /// Shut the provider down.
    ///
    /// Waits for any in-flight request, signals the provider, gives it
    /// `close_grace` to exit and then drops the session, which kills the
    /// process. Calling this on a closed connection is a no-op.
    pub async fn close(&self) {
        {
            let mut state = self.state.lock();
            match *state {
                ConnectionState::Closing | ConnectionState::Closed => return,
                _ => *state = ConnectionState::Closing,
            }
        }

        let session = self.session.lock().await.take();
        if let Some(session) = session {
            match tokio::time::timeout(self.timeouts.close_grace, session.shutdown()).await {
                Ok(Ok(())) => {
                    self.logger.info(&format!("[ProviderConnection] '{}' closed", self.name()));
                }
                Ok(Err(e)) => {
                    self.logger.warn(&format!(
                        "[ProviderConnection] '{}' shutdown error: {}",
                        self.name(),
                        e
                    ));
                }
                Err(_) => {
                    self.logger.warn(&format!(
                        "[ProviderConnection] '{}' did not exit within {:?}, terminated",
                        self.name(),
                        self.timeouts.close_grace
                    ));
                }
            }
        }

        self.set_state(ConnectionState::Closed);
    }

    fn ensure_ready(&self) -> ProviderResult<()> {
        match self.state() {
            ConnectionState::Ready => Ok(()),
            state => Err(ProviderError::connection(
                self.name(),
                format!("connection is {}", state),
            )),
        }
    }
}

impl std::fmt::Debug for ProviderConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConnection")
            .field("name", &self.spec.name)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;
    use crate::providers::mock::{MockLauncher, MockToolServer};
    use serde_json::json;
    use std::sync::Arc;

    fn logger() -> SharedLogger {
        Arc::new(NoOpLogger::new())
    }

    fn calc_launcher() -> MockLauncher {
        MockLauncher::new().with_server("calc-server", MockToolServer::calculator())
    }

    #[tokio::test]
    async fn test_establish_and_invoke() {
        let launcher = calc_launcher();
        let conn = ProviderConnection::establish(
            ProviderSpec::new("calc", "calc-server"),
            &launcher,
            ConnectionTimeouts::default(),
            logger(),
        )
        .await
        .expect("connection should establish");

        assert_eq!(conn.state(), ConnectionState::Ready);

        let tools = conn.list_tools().await.unwrap();
        assert_eq!(tools[0].name, "add");

        let output = conn.invoke("add", json!({"a": 2, "b": 2})).await.unwrap();
        assert_eq!(output.content, "4");
    }

    #[tokio::test]
    async fn test_spawn_failure_is_connection_error() {
        let launcher = MockLauncher::new();
        let err = ProviderConnection::establish(
            ProviderSpec::new("ghost", "does-not-exist"),
            &launcher,
            ConnectionTimeouts::default(),
            logger(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ProviderError::Connection { ref provider, .. } if provider == "ghost"));
        assert_eq!(launcher.live_sessions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handshake_timeout_leaves_nothing_running() {
        let launcher = MockLauncher::new().with_server("stuck", MockToolServer::new().hanging_handshake());
        let timeouts = ConnectionTimeouts {
            handshake: Duration::from_millis(100),
            ..Default::default()
        };

        let err = ProviderConnection::establish(
            ProviderSpec::new("stuck", "stuck"),
            &launcher,
            timeouts,
            logger(),
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("handshake timed out"));
        assert_eq!(launcher.live_sessions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_timeout_is_tool_execution_error() {
        let launcher = MockLauncher::new().with_server(
            "slow",
            MockToolServer::calculator().with_call_delay(Duration::from_secs(5)),
        );
        let timeouts = ConnectionTimeouts {
            call: Duration::from_millis(200),
            ..Default::default()
        };
        let conn = ProviderConnection::establish(ProviderSpec::new("slow", "slow"), &launcher, timeouts, logger())
            .await
            .unwrap();

        let err = conn.invoke("add", json!({"a": 1, "b": 1})).await.unwrap_err();
        assert!(matches!(err, ProviderError::ToolExecution { ref tool, .. } if tool == "add"));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let launcher = calc_launcher();
        let conn = ProviderConnection::establish(
            ProviderSpec::new("calc", "calc-server"),
            &launcher,
            ConnectionTimeouts::default(),
            logger(),
        )
        .await
        .unwrap();
        assert_eq!(launcher.live_sessions(), 1);

        conn.close().await;
        conn.close().await;

        assert_eq!(conn.state(), ConnectionState::Closed);
        assert_eq!(launcher.live_sessions(), 0);
        assert_eq!(launcher.graceful_shutdowns(), 1);

        let err = conn.invoke("add", json!({"a": 1, "b": 1})).await.unwrap_err();
        assert!(err.to_string().contains("closed"));
        assert!(conn.list_tools().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_forces_unresponsive_provider() {
        let launcher = MockLauncher::new().with_server("stubborn", MockToolServer::calculator().ignoring_shutdown());
        let conn = ProviderConnection::establish(
            ProviderSpec::new("stubborn", "stubborn"),
            &launcher,
            ConnectionTimeouts::default(),
            logger(),
        )
        .await
        .unwrap();

        conn.close().await;

        assert_eq!(conn.state(), ConnectionState::Closed);
        assert_eq!(launcher.live_sessions(), 0);
        assert_eq!(launcher.graceful_shutdowns(), 0);
    }
}
