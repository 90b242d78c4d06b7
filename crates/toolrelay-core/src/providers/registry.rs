//! Provider registry
//!
//! The registry owns every live provider connection, keyed by name. It is
//! shared by the catalog, the orchestrator and the management tools.
//!
//! Spawning and handshaking happen outside the table lock: a name is
//! reserved first, the connection is established, and only then is the
//! entry published. Two concurrent registrations of the same name cannot
//! both succeed, and a slow handshake never blocks lookups.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::join_all;
use parking_lot::RwLock;
use serde::Serialize;

use crate::logging::SharedLogger;
use super::connection::{ConnectionState, ConnectionTimeouts, ProviderConnection};
use super::error::{ProviderError, ProviderResult};
use super::session::ProviderLauncher;
use super::spec::ProviderSpec;

/// Snapshot of one registered provider
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderSummary {
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    pub state: ConnectionState,
}

struct Entry {
    seq: u64,
    connection: Arc<ProviderConnection>,
}

#[derive(Default)]
struct Table {
    entries: HashMap<String, Entry>,
    reserved: HashSet<String>,
    next_seq: u64,
}

/// Releases a name reservation if registration is abandoned midway
struct Reservation<'a> {
    table: &'a RwLock<Table>,
    name: String,
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        self.table.write().reserved.remove(&self.name);
    }
}

/// Concurrent map of provider name to live connection
pub struct ProviderRegistry {
    table: RwLock<Table>,
    launcher: Arc<dyn ProviderLauncher>,
    timeouts: ConnectionTimeouts,
    logger: SharedLogger,
}

impl ProviderRegistry {
    /// Create an empty registry
    pub fn new(launcher: Arc<dyn ProviderLauncher>, logger: SharedLogger) -> Self {
        Self {
            table: RwLock::new(Table::default()),
            launcher,
            timeouts: ConnectionTimeouts::default(),
            logger,
        }
    }

    /// Override connection timeouts
    pub fn with_timeouts(mut self, timeouts: ConnectionTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Timeouts applied to new connections
    pub fn timeouts(&self) -> ConnectionTimeouts {
        self.timeouts
    }

    /// Spawn, handshake and publish a provider.
    ///
    /// Fails with `DuplicateProvider` if the name is live or mid-registration,
    /// and with `Connection` if the process cannot be brought up. On failure
    /// the registry is unchanged.
    pub async fn register(&self, spec: ProviderSpec) -> ProviderResult<()> {
        let reservation = self.reserve(&spec.name)?;

        let connection = ProviderConnection::establish(
            spec,
            self.launcher.as_ref(),
            self.timeouts,
            self.logger.clone(),
        )
        .await?;

        let mut table = self.table.write();
        let seq = table.next_seq;
        table.next_seq += 1;
        table.entries.insert(
            reservation.name.clone(),
            Entry {
                seq,
                connection: Arc::new(connection),
            },
        );
        drop(table);

        self.logger.info(&format!(
            "[ProviderRegistry] Registered provider '{}'",
            reservation.name
        ));
        Ok(())
    }

    /// Register several providers in parallel, reporting each outcome in
    /// input order
    pub async fn register_all(
        &self,
        specs: impl IntoIterator<Item = ProviderSpec>,
    ) -> Vec<(String, ProviderResult<()>)> {
        let futures = specs.into_iter().map(|spec| async move {
            let name = spec.name.clone();
            (name, self.register(spec).await)
        });
        join_all(futures).await
    }

    fn reserve(&self, name: &str) -> ProviderResult<Reservation<'_>> {
        let mut table = self.table.write();
        if table.entries.contains_key(name) || table.reserved.contains(name) {
            return Err(ProviderError::DuplicateProvider(name.to_string()));
        }
        table.reserved.insert(name.to_string());
        Ok(Reservation {
            table: &self.table,
            name: name.to_string(),
        })
    }

    /// Remove a provider and shut it down.
    ///
    /// The entry disappears from the table before the process is stopped, so
    /// no new request can reach it. Requests already in flight finish first.
    pub async fn deregister(&self, name: &str) -> ProviderResult<()> {
        let entry = self
            .table
            .write()
            .entries
            .remove(name)
            .ok_or_else(|| ProviderError::ProviderNotFound(name.to_string()))?;

        entry.connection.close().await;
        self.logger.info(&format!("[ProviderRegistry] Deregistered provider '{}'", name));
        Ok(())
    }

    /// Look up a live connection
    pub fn get(&self, name: &str) -> Option<Arc<ProviderConnection>> {
        self.table.read().entries.get(name).map(|e| e.connection.clone())
    }

    /// Whether a provider is registered
    pub fn contains(&self, name: &str) -> bool {
        self.table.read().entries.contains_key(name)
    }

    /// Whether requests can currently be routed to a provider
    pub fn is_routable(&self, name: &str) -> bool {
        self.table
            .read()
            .entries
            .get(name)
            .map(|e| e.connection.is_ready())
            .unwrap_or(false)
    }

    /// Connections in registration order
    pub fn connections(&self) -> Vec<Arc<ProviderConnection>> {
        self.instances().into_iter().map(|(_, c)| c).collect()
    }

    /// Connections in registration order, each tagged with its registration
    /// number. A name registered again gets a new number.
    pub(crate) fn instances(&self) -> Vec<(u64, Arc<ProviderConnection>)> {
        let table = self.table.read();
        let mut entries: Vec<_> = table.entries.values().collect();
        entries.sort_by_key(|e| e.seq);
        entries.into_iter().map(|e| (e.seq, e.connection.clone())).collect()
    }

    /// The connection for `name` if it is still registration `seq` and ready
    pub(crate) fn instance(&self, name: &str, seq: u64) -> Option<Arc<ProviderConnection>> {
        self.table
            .read()
            .entries
            .get(name)
            .filter(|e| e.seq == seq && e.connection.is_ready())
            .map(|e| e.connection.clone())
    }

    /// Summaries in registration order
    pub fn list(&self) -> Vec<ProviderSummary> {
        self.connections()
            .iter()
            .map(|c| ProviderSummary {
                name: c.name().to_string(),
                command: c.spec().command.clone(),
                args: c.spec().args.clone(),
                state: c.state(),
            })
            .collect()
    }

    /// Number of registered providers
    pub fn len(&self) -> usize {
        self.table.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Close every provider. The registry is empty afterwards.
    pub async fn shutdown(&self) {
        let entries: Vec<Entry> = {
            let mut table = self.table.write();
            table.entries.drain().map(|(_, e)| e).collect()
        };
        if entries.is_empty() {
            return;
        }

        self.logger.info(&format!(
            "[ProviderRegistry] Shutting down {} providers",
            entries.len()
        ));
        join_all(entries.iter().map(|e| e.connection.close())).await;
    }
}
