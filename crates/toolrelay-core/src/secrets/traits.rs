//! Secret lookup

/// Source of API keys and other values the relay needs before it starts
///
/// A key is either a literal variable name (`GH_TOKEN`) or a model service
/// name (`anthropic`) that the store maps to its own naming.
///
/// ```
/// use toolrelay_core::secrets::{SecretStore, EnvSecretStore};
///
/// let store = EnvSecretStore::new();
/// let _anthropic = store.get("anthropic"); // ANTHROPIC_API_KEY
/// ```
pub trait SecretStore: Send + Sync {
    fn name(&self) -> &str;

    fn get(&self, key: &str) -> Option<String>;

    fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Keys from `required` that this store cannot resolve, in the given order
    fn missing_required(&self, required: &[String]) -> Vec<String> {
        required
            .iter()
            .filter(|key| !self.has(key))
            .cloned()
            .collect()
    }
}
