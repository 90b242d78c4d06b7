//! In-memory secret store

use std::collections::HashMap;

use super::traits::SecretStore;

/// Fixed set of secrets kept in memory, for tests and offline runs
///
/// ```
/// use toolrelay_core::secrets::{SecretStore, MemorySecretStore};
///
/// let store = MemorySecretStore::with_secrets([("ANTHROPIC_API_KEY", "sk-test")]);
/// assert!(store.missing_required(&["ANTHROPIC_API_KEY".to_string()]).is_empty());
/// ```
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    secrets: HashMap<String, String>,
}

impl MemorySecretStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a memory store with initial values
    pub fn with_secrets<I, K, V>(initial: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            secrets: initial
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Get the number of secrets in the store
    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SecretStore for MemorySecretStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn get(&self, key: &str) -> Option<String> {
        self.secrets.get(key).cloned()
    }
}
