//! Provider launch specification

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

/// How to launch one tool provider
///
/// Immutable once a connection has been established from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSpec {
    /// Unique provider name
    pub name: String,
    /// Executable to spawn
    pub command: String,
    /// Ordered arguments
    #[serde(default)]
    pub args: Vec<String>,
    /// Extra environment for the child; values may reference `$VAR` / `${VAR}`
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,
}

impl ProviderSpec {
    /// Create a spec with no arguments or environment
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: Vec::new(),
            env: HashMap::new(),
        }
    }

    /// Set the arguments
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Add one environment variable
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Expand `$VAR` / `${VAR}` references in the environment using `lookup`.
    ///
    /// References `lookup` cannot answer are left as written and reported in
    /// `missing`. Positional forms such as `$5` are never looked up.
    pub fn expand_env_with<F>(&self, mut lookup: F) -> ExpandedEnv
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut missing = BTreeSet::new();
        let mut vars = Vec::with_capacity(self.env.len());

        for (key, value) in &self.env {
            let expanded = shellexpand::env_with_context_no_errors(value.as_str(), |name: &str| {
                if name.starts_with(|c: char| c.is_ascii_digit()) {
                    return None;
                }
                let found = lookup(name);
                if found.is_none() {
                    missing.insert(name.to_string());
                }
                found
            });
            vars.push((key.clone(), expanded.into_owned()));
        }

        vars.sort();
        ExpandedEnv {
            vars,
            missing: missing.into_iter().collect(),
        }
    }

    /// Environment expanded from the host process environment
    pub fn expanded_env(&self) -> ExpandedEnv {
        self.expand_env_with(|name| std::env::var(name).ok())
    }

    /// Host variables the environment refers to, sorted
    pub fn referenced_vars(&self) -> Vec<String> {
        self.expand_env_with(|_| None).missing
    }
}

/// A spec's environment after variable expansion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpandedEnv {
    /// Child environment, sorted by key
    pub vars: Vec<(String, String)>,
    /// Referenced variables that had no value, sorted
    pub missing: Vec<String>,
}

impl ExpandedEnv {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_builder() {
        let spec = ProviderSpec::new("docs", "npx")
            .with_args(["-y", "@acme/docs-server"])
            .with_env("DOCS_URL", "https://example.com");

        assert_eq!(spec.args, vec!["-y", "@acme/docs-server"]);
        assert_eq!(spec.env.get("DOCS_URL").map(String::as_str), Some("https://example.com"));
    }

    #[test]
    fn test_expanded_env() {
        std::env::set_var("TOOLRELAY_SPEC_TOKEN", "abc123");
        let spec = ProviderSpec::new("gh", "gh-mcp")
            .with_env("TOKEN", "${TOOLRELAY_SPEC_TOKEN}")
            .with_env("MISSING", "$TOOLRELAY_SPEC_DOES_NOT_EXIST")
            .with_env("PLAIN", "value");

        let env = spec.expanded_env();
        assert_eq!(
            env.vars,
            vec![
                ("MISSING".to_string(), "$TOOLRELAY_SPEC_DOES_NOT_EXIST".to_string()),
                ("PLAIN".to_string(), "value".to_string()),
                ("TOKEN".to_string(), "abc123".to_string()),
            ]
        );
        assert_eq!(env.missing, vec!["TOOLRELAY_SPEC_DOES_NOT_EXIST"]);
        assert!(!env.is_complete());
        std::env::remove_var("TOOLRELAY_SPEC_TOKEN");
    }

    #[test]
    fn test_positional_reference_does_not_hide_real_variable() {
        let spec = ProviderSpec::new("gh", "gh-mcp").with_env("HDR", "token=${GH_TOKEN} price=$5");

        let unset = spec.expand_env_with(|_| None);
        assert_eq!(unset.missing, vec!["GH_TOKEN"]);
        assert_eq!(unset.vars[0].1, "token=${GH_TOKEN} price=$5");

        let set = spec.expand_env_with(|name| (name == "GH_TOKEN").then(|| "ghp_1".to_string()));
        assert!(set.is_complete());
        assert_eq!(set.vars[0].1, "token=ghp_1 price=$5");
    }

    #[test]
    fn test_spec_yaml_roundtrip_omits_empty_env() {
        let spec = ProviderSpec::new("calc", "calc-server").with_args(["--stdio"]);
        let yaml = serde_yaml::to_string(&spec).unwrap();
        assert!(!yaml.contains("env"));

        let parsed: ProviderSpec = serde_yaml::from_str("name: calc\ncommand: calc-server\n").unwrap();
        assert!(parsed.args.is_empty());
        assert!(parsed.env.is_empty());
    }

    #[test]
    fn test_referenced_vars() {
        let spec = ProviderSpec::new("gh", "gh-mcp")
            .with_env("TOKEN", "${GH_TOKEN}")
            .with_env("URL", "https://$GH_HOST/api/${GH_TOKEN}")
            .with_env("PRICE", "costs $5")
            .with_env("PLAIN", "value");

        assert_eq!(spec.referenced_vars(), vec!["GH_HOST", "GH_TOKEN"]);
    }
}
