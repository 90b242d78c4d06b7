//! Environment variable secret store

use std::collections::HashMap;
use std::env;

use once_cell::sync::Lazy;

use super::traits::SecretStore;

/// Mapping from model service names to the environment variables holding their API key
static ENV_VAR_MAP: Lazy<HashMap<&'static str, Vec<&'static str>>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("openai", vec!["OPENAI_API_KEY"]);
    m.insert("anthropic", vec!["ANTHROPIC_API_KEY"]);
    m.insert("gemini", vec!["GEMINI_API_KEY", "GOOGLE_API_KEY"]);
    m.insert("groq", vec!["GROQ_API_KEY"]);
    m.insert("xai", vec!["XAI_API_KEY"]);
    m.insert("deepseek", vec!["DEEPSEEK_API_KEY"]);
    m.insert("ollama", vec![]); // local, no key
    m.insert("mock", vec![]);
    m
});

/// Secret store backed by the process environment
///
/// Keys may be a literal variable name (`ANTHROPIC_API_KEY`) or a model
/// service name (`anthropic`), which is mapped to its variable(s). A
/// lowercase key the map does not know is read as `<KEY>_API_KEY`. Values
/// loaded from a `.env` file by the binary are visible here too.
///
/// # Example
///
/// ```
/// use toolrelay_core::secrets::{SecretStore, EnvSecretStore};
///
/// let store = EnvSecretStore::new();
/// let _key = store.get("anthropic"); // reads ANTHROPIC_API_KEY
/// ```
#[derive(Debug, Default)]
pub struct EnvSecretStore {
    _private: (),
}

impl EnvSecretStore {
    /// Create a new environment variable secret store
    pub fn new() -> Self {
        Self { _private: () }
    }

    /// Environment variables consulted for a model service.
    ///
    /// `None` for services this store does not know; an empty slice for
    /// services that need no key.
    pub fn env_vars_for_service(service: &str) -> Option<&'static [&'static str]> {
        ENV_VAR_MAP.get(service.to_lowercase().as_str()).map(|v| v.as_slice())
    }

    /// Whether a model service needs an API key at all
    pub fn requires_key(service: &str) -> bool {
        Self::env_vars_for_service(service).map_or(true, |vars| !vars.is_empty())
    }

    fn non_empty(var: &str) -> Option<String> {
        env::var(var).ok().filter(|v| !v.is_empty())
    }
}

impl SecretStore for EnvSecretStore {
    fn name(&self) -> &str {
        "env"
    }

    fn get(&self, key: &str) -> Option<String> {
        if let Some(value) = Self::non_empty(key) {
            return Some(value);
        }

        if let Some(vars) = Self::env_vars_for_service(key) {
            return vars.iter().find_map(|var| Self::non_empty(var));
        }

        // Variable names are never widened to `<NAME>_API_KEY`
        if key.chars().any(|c| c.is_ascii_uppercase()) {
            return None;
        }
        Self::non_empty(&format!("{}_API_KEY", key.to_uppercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_fallback_only_for_service_names() {
        env::set_var("TOOLRELAY_TEST_TOKEN_API_KEY", "wrong");
        env::set_var("TOOLRELAYSVC_API_KEY", "svc-key");

        let store = EnvSecretStore::new();
        assert_eq!(store.name(), "env");
        assert_eq!(store.get("TOOLRELAY_TEST_TOKEN"), None);
        assert_eq!(
            store.missing_required(&["TOOLRELAY_TEST_TOKEN".to_string()]),
            vec!["TOOLRELAY_TEST_TOKEN".to_string()]
        );
        assert_eq!(store.get("toolrelaysvc"), Some("svc-key".to_string()));

        env::remove_var("TOOLRELAY_TEST_TOKEN_API_KEY");
        env::remove_var("TOOLRELAYSVC_API_KEY");
    }

    #[test]
    fn test_env_store_get_direct_and_mapped() {
        env::set_var("TOOLRELAY_TEST_DIRECT_KEY", "direct");
        env::set_var("XAI_API_KEY", "xai-test");

        let store = EnvSecretStore::new();
        assert_eq!(store.get("TOOLRELAY_TEST_DIRECT_KEY"), Some("direct".to_string()));
        assert_eq!(store.get("xai"), Some("xai-test".to_string()));
        assert_eq!(store.get("XAI"), Some("xai-test".to_string()));

        env::remove_var("TOOLRELAY_TEST_DIRECT_KEY");
        env::remove_var("XAI_API_KEY");
    }

    #[test]
    fn test_env_store_ignores_empty_values() {
        env::set_var("TOOLRELAY_TEST_EMPTY", "");
        let store = EnvSecretStore::new();
        assert!(!store.has("TOOLRELAY_TEST_EMPTY"));
        env::remove_var("TOOLRELAY_TEST_EMPTY");
    }

    #[test]
    fn test_requires_key() {
        assert!(EnvSecretStore::requires_key("anthropic"));
        assert!(!EnvSecretStore::requires_key("ollama"));
        assert!(!EnvSecretStore::requires_key("mock"));
        assert!(EnvSecretStore::requires_key("somethingelse"));
    }
}
