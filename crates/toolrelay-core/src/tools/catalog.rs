//! Tool catalog
//!
//! The catalog is the central component for:
//! - Collecting tool descriptors from every ready provider
//! - Validating them and resolving name collisions
//! - Routing a tool name back to its owning provider
//! - Presenting the model with one flat tool list
//!
//! The routing table is rebuilt from scratch on every refresh and swapped
//! in atomically; a refresh that started before the installed table's never
//! replaces it. Each route remembers the provider instance it was listed
//! from, so neither a removed provider nor a new process registered under
//! the same name is routed to until the next refresh.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;

use crate::logging::SharedLogger;
use crate::providers::{
    ProviderConnection, ProviderError, ProviderRegistry, ProviderResult, ToolOutput,
};
use crate::types::ToolDescriptor;
use super::management::{is_management_tool, management_tools};
use super::validation::validate_descriptor;

/// A routed tool and the provider that owns it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutingEntry {
    pub tool_name: String,
    pub provider_name: String,
    pub descriptor: ToolDescriptor,
    /// Registration number of the provider instance that listed the tool
    #[serde(skip)]
    pub(crate) instance: u64,
}

/// A provider whose catalog could not be fetched
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefreshFailure {
    pub provider: String,
    pub error: String,
}

/// A descriptor excluded because it failed validation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuarantinedTool {
    pub provider: String,
    pub tool: String,
    pub reason: String,
}

/// A tool name offered by more than one provider
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCollision {
    pub tool: String,
    /// Provider that keeps the name
    pub kept: String,
    /// Provider whose copy was excluded
    pub dropped: String,
}

/// Outcome of one catalog refresh
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RefreshReport {
    /// Number of routed provider tools
    pub routed: usize,
    pub failures: Vec<RefreshFailure>,
    pub quarantined: Vec<QuarantinedTool>,
    pub collisions: Vec<ToolCollision>,
}

impl RefreshReport {
    /// Whether every provider answered with a clean catalog
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.quarantined.is_empty() && self.collisions.is_empty()
    }
}

#[derive(Debug, Default)]
struct RoutingTable {
    /// Refresh that built this table
    generation: u64,
    entries: HashMap<String, RoutingEntry>,
    /// Tool names in routing order
    order: Vec<String>,
}

/// Aggregated view over every registered provider's tools
pub struct ToolCatalog {
    registry: Arc<ProviderRegistry>,
    table: RwLock<Arc<RoutingTable>>,
    generations: AtomicU64,
    logger: SharedLogger,
}

impl ToolCatalog {
    /// Create an empty catalog over `registry`
    pub fn new(registry: Arc<ProviderRegistry>, logger: SharedLogger) -> Self {
        Self {
            registry,
            table: RwLock::new(Arc::new(RoutingTable::default())),
            generations: AtomicU64::new(0),
            logger,
        }
    }

    /// The registry this catalog routes into
    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Rebuild the routing table from every ready provider.
    ///
    /// Providers are queried concurrently. A provider that fails or times
    /// out is left out and reported; it never aborts the refresh.
    pub async fn refresh(&self) -> RefreshReport {
        let generation = self.generations.fetch_add(1, Ordering::SeqCst) + 1;
        let connections: Vec<_> = self
            .registry
            .instances()
            .into_iter()
            .filter(|(_, c)| c.is_ready())
            .collect();

        let listings = join_all(connections.iter().map(|(_, c)| c.list_tools())).await;

        let mut report = RefreshReport::default();
        let mut table = RoutingTable {
            generation,
            ..Default::default()
        };

        // Registration order decides collisions: first provider wins
        for ((instance, connection), listing) in connections.iter().zip(listings) {
            let provider = connection.name();
            let tools = match listing {
                Ok(tools) => tools,
                Err(e) => {
                    self.logger.warn(&format!(
                        "[ToolCatalog] Excluding provider '{}': {}",
                        provider, e
                    ));
                    report.failures.push(RefreshFailure {
                        provider: provider.to_string(),
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            for descriptor in tools {
                if let Err(reason) = self.check(&descriptor) {
                    self.logger.warn(&format!(
                        "[ToolCatalog] Quarantined '{}' from '{}': {}",
                        descriptor.name, provider, reason
                    ));
                    report.quarantined.push(QuarantinedTool {
                        provider: provider.to_string(),
                        tool: descriptor.name,
                        reason,
                    });
                    continue;
                }

                if let Some(existing) = table.entries.get(&descriptor.name) {
                    self.logger.warn(&format!(
                        "[ToolCatalog] Tool '{}' from '{}' collides with '{}', keeping '{}'",
                        descriptor.name, provider, existing.provider_name, existing.provider_name
                    ));
                    report.collisions.push(ToolCollision {
                        tool: descriptor.name,
                        kept: existing.provider_name.clone(),
                        dropped: provider.to_string(),
                    });
                    continue;
                }

                table.order.push(descriptor.name.clone());
                table.entries.insert(
                    descriptor.name.clone(),
                    RoutingEntry {
                        tool_name: descriptor.name.clone(),
                        provider_name: provider.to_string(),
                        descriptor,
                        instance: *instance,
                    },
                );
            }
        }

        report.routed = table.order.len();
        self.logger.info(&format!(
            "[ToolCatalog] Routing {} tools from {} providers ({} failed)",
            report.routed,
            connections.len() - report.failures.len(),
            report.failures.len()
        ));

        let mut current = self.table.write();
        if current.generation < generation {
            *current = Arc::new(table);
        } else {
            self.logger.debug(&format!(
                "[ToolCatalog] Refresh {} superseded by {}, table kept",
                generation, current.generation
            ));
        }
        report
    }

    fn check(&self, descriptor: &ToolDescriptor) -> Result<(), String> {
        if is_management_tool(&descriptor.name) {
            return Err(format!("'{}' is reserved for a built-in tool", descriptor.name));
        }
        validate_descriptor(descriptor)
    }

    fn route(&self, tool: &str) -> Option<Arc<ProviderConnection>> {
        let table = self.table.read().clone();
        let entry = table.entries.get(tool)?;
        self.registry.instance(&entry.provider_name, entry.instance)
    }

    /// Provider currently owning `tool`, if it is still routable
    pub fn resolve(&self, tool: &str) -> Option<String> {
        self.route(tool).map(|c| c.name().to_string())
    }

    /// Routing entries whose provider instances are still ready, in routing order
    pub fn entries(&self) -> Vec<RoutingEntry> {
        let table = self.table.read().clone();
        table
            .order
            .iter()
            .filter_map(|name| table.entries.get(name))
            .filter(|e| self.registry.instance(&e.provider_name, e.instance).is_some())
            .cloned()
            .collect()
    }

    /// Every tool the model may call: routed provider tools followed by the
    /// built-in management tools
    pub fn tools(&self) -> Vec<ToolDescriptor> {
        let mut tools: Vec<ToolDescriptor> = self.entries().into_iter().map(|e| e.descriptor).collect();
        tools.extend(management_tools());
        tools
    }

    /// Resolve `tool` and invoke it on its provider
    pub async fn dispatch(&self, tool: &str, arguments: Value) -> ProviderResult<ToolOutput> {
        let connection = self
            .route(tool)
            .ok_or_else(|| ProviderError::ToolNotFound(tool.to_string()))?;
        connection.invoke(tool, arguments).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;
    use crate::providers::mock::{MockLauncher, MockToolServer};
    use crate::providers::{ConnectionTimeouts, ProviderSpec};
    use serde_json::json;
    use std::time::Duration;

    fn setup(launcher: MockLauncher) -> ToolCatalog {
        let logger: SharedLogger = Arc::new(NoOpLogger::new());
        let registry = Arc::new(
            ProviderRegistry::new(Arc::new(launcher), logger.clone()).with_timeouts(ConnectionTimeouts {
                list: Duration::from_millis(500),
                ..Default::default()
            }),
        );
        ToolCatalog::new(registry, logger)
    }

    #[tokio::test]
    async fn test_empty_registry() {
        let catalog = setup(MockLauncher::new());
        let report = catalog.refresh().await;

        assert_eq!(report, RefreshReport::default());
        let names: Vec<_> = catalog.tools().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["add_provider", "remove_provider", "list_providers"]);
    }

    #[tokio::test]
    async fn test_resolve_follows_registry() {
        let catalog = setup(MockLauncher::new().with_server("echo-server", MockToolServer::echo()));
        let registry = catalog.registry().clone();

        registry.register(ProviderSpec::new("P", "echo-server")).await.unwrap();
        catalog.refresh().await;
        assert_eq!(catalog.resolve("echo"), Some("P".to_string()));

        registry.deregister("P").await.unwrap();
        // No refresh in between: liveness is checked at routing time
        assert_eq!(catalog.resolve("echo"), None);
        assert!(catalog.tools().iter().all(|t| t.name != "echo"));

        let err = catalog.dispatch("echo", json!({"text": "hi"})).await.unwrap_err();
        assert_eq!(err, ProviderError::ToolNotFound("echo".into()));
    }

    #[tokio::test]
    async fn test_reregistered_name_starts_without_routes() {
        let catalog = setup(
            MockLauncher::new()
                .with_server("calc-server", MockToolServer::calculator())
                .with_server("echo-server", MockToolServer::echo()),
        );
        let registry = catalog.registry().clone();

        registry.register(ProviderSpec::new("P", "calc-server")).await.unwrap();
        catalog.refresh().await;
        assert_eq!(catalog.resolve("add"), Some("P".to_string()));

        registry.deregister("P").await.unwrap();
        registry.register(ProviderSpec::new("P", "echo-server")).await.unwrap();

        // Routes listed from the previous "P" do not carry over
        assert_eq!(catalog.resolve("add"), None);
        assert!(catalog.entries().is_empty());
        let err = catalog.dispatch("add", json!({"a": 1, "b": 2})).await.unwrap_err();
        assert_eq!(err, ProviderError::ToolNotFound("add".into()));

        catalog.refresh().await;
        assert_eq!(catalog.resolve("echo"), Some("P".to_string()));
        assert_eq!(catalog.resolve("add"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_older_refresh_does_not_replace_newer_table() {
        let catalog = setup(
            MockLauncher::new()
                .with_server(
                    "slow-server",
                    MockToolServer::new()
                        .with_tool(ToolDescriptor::new("slow_tool", "listed slowly"), |_| Ok(Value::Null))
                        .with_list_delay(Duration::from_millis(200)),
                )
                .with_server("echo-server", MockToolServer::echo()),
        );
        let registry = catalog.registry().clone();
        registry.register(ProviderSpec::new("slow", "slow-server")).await.unwrap();

        let (older, newer) = tokio::join!(catalog.refresh(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            registry.register(ProviderSpec::new("quick", "echo-server")).await.unwrap();

            // The first poll unpublishes "slow"; closing it waits for the
            // older refresh's request to finish
            let mut removal = Box::pin(registry.deregister("slow"));
            assert!(futures::poll!(removal.as_mut()).is_pending());

            let report = catalog.refresh().await;
            removal.await.unwrap();
            report
        });

        assert_eq!(older.routed, 1);
        assert_eq!(newer.routed, 2);
        assert_eq!(catalog.resolve("echo"), Some("quick".to_string()));
        assert_eq!(catalog.resolve("slow_tool"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_provider_is_excluded() {
        let catalog = setup(
            MockLauncher::new()
                .with_server("calc-server", MockToolServer::calculator())
                .with_server(
                    "slow-server",
                    MockToolServer::new()
                        .with_tool(ToolDescriptor::new("slow_tool", "never listed"), |_| Ok(Value::Null))
                        .with_list_delay(Duration::from_secs(30)),
                )
                .with_server("echo-server", MockToolServer::echo()),
        );
        let registry = catalog.registry().clone();
        registry.register(ProviderSpec::new("calc", "calc-server")).await.unwrap();
        registry.register(ProviderSpec::new("slow", "slow-server")).await.unwrap();
        registry.register(ProviderSpec::new("echo", "echo-server")).await.unwrap();

        let report = catalog.refresh().await;

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].provider, "slow");
        assert_eq!(report.routed, 4);
        assert_eq!(catalog.resolve("add"), Some("calc".to_string()));
        assert_eq!(catalog.resolve("echo"), Some("echo".to_string()));
        assert_eq!(catalog.resolve("slow_tool"), None);
    }

    #[tokio::test]
    async fn test_protocol_failure_is_reported() {
        let catalog = setup(
            MockLauncher::new()
                .with_server("bad", MockToolServer::new().failing_list("invalid JSON-RPC response"))
                .with_server("echo-server", MockToolServer::echo()),
        );
        let registry = catalog.registry().clone();
        registry.register(ProviderSpec::new("bad", "bad")).await.unwrap();
        registry.register(ProviderSpec::new("echo", "echo-server")).await.unwrap();

        let report = catalog.refresh().await;

        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].error.contains("invalid JSON-RPC response"));
        assert_eq!(catalog.resolve("echo"), Some("echo".to_string()));
    }

    #[tokio::test]
    async fn test_first_registered_provider_keeps_colliding_name() {
        let catalog = setup(
            MockLauncher::new()
                .with_server("a", MockToolServer::echo())
                .with_server("b", MockToolServer::echo()),
        );
        let registry = catalog.registry().clone();
        registry.register(ProviderSpec::new("first", "a")).await.unwrap();
        registry.register(ProviderSpec::new("second", "b")).await.unwrap();

        let report = catalog.refresh().await;

        assert_eq!(catalog.resolve("echo"), Some("first".to_string()));
        assert_eq!(report.collisions.len(), 2);
        assert_eq!(
            report.collisions[0],
            ToolCollision {
                tool: "echo".into(),
                kept: "first".into(),
                dropped: "second".into(),
            }
        );

        // Once the winner is gone, the next refresh hands the name over
        registry.deregister("first").await.unwrap();
        let report = catalog.refresh().await;
        assert!(report.collisions.is_empty());
        assert_eq!(catalog.resolve("echo"), Some("second".to_string()));
    }

    #[tokio::test]
    async fn test_invalid_descriptors_quarantined() {
        let server = MockToolServer::new()
            .with_tool(ToolDescriptor::new("good", "fine"), |_| Ok(Value::Null))
            .with_tool(ToolDescriptor::new("bad name", "spaces"), |_| Ok(Value::Null))
            .with_tool(
                ToolDescriptor::new("bad_schema", "array schema").with_schema(json!([])),
                |_| Ok(Value::Null),
            )
            .with_tool(ToolDescriptor::new("add_provider", "shadowing"), |_| Ok(Value::Null));
        let catalog = setup(MockLauncher::new().with_server("mixed", server));
        catalog
            .registry()
            .register(ProviderSpec::new("mixed", "mixed"))
            .await
            .unwrap();

        let report = catalog.refresh().await;

        assert_eq!(report.routed, 1);
        let quarantined: Vec<_> = report.quarantined.iter().map(|q| q.tool.as_str()).collect();
        assert_eq!(quarantined, vec!["bad name", "bad_schema", "add_provider"]);
        assert_eq!(catalog.resolve("add_provider"), None);
        assert!(!report.is_clean());
    }

    #[tokio::test]
    async fn test_dispatch_routes_to_owner() {
        let catalog = setup(MockLauncher::new().with_server("calc-server", MockToolServer::calculator()));
        catalog
            .registry()
            .register(ProviderSpec::new("calc", "calc-server"))
            .await
            .unwrap();
        catalog.refresh().await;

        let out = catalog.dispatch("add", json!({"a": 2, "b": 2})).await.unwrap();
        assert_eq!(out.content, "4");

        let err = catalog.dispatch("multiply", json!({})).await.unwrap_err();
        assert_eq!(err, ProviderError::ToolNotFound("multiply".into()));
    }
}
