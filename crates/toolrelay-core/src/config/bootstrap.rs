//! Startup: merge configured providers and register them
//!
//! Source priority (later sources override earlier, matched by name ignoring case):
//! 1. User config (~/.config/toolrelay/config.yaml)
//! 2. Workspace config (.config/toolrelay/config.yaml)

use crate::logging::SharedLogger;
use crate::providers::{ProviderRegistry, ProviderSpec};
use super::traits::{same_name, ConfigProvider};

/// Merge provider lists from several sources, lowest priority first.
///
/// A later spec with the same name replaces the earlier one in place, so the
/// result keeps first-seen order.
pub async fn merge_providers(sources: &[&dyn ConfigProvider]) -> Vec<ProviderSpec> {
    let mut merged: Vec<ProviderSpec> = Vec::new();
    for source in sources {
        for spec in source.get_providers().await {
            match merged.iter_mut().find(|p| same_name(&p.name, &spec.name)) {
                Some(existing) => *existing = spec,
                None => merged.push(spec),
            }
        }
    }
    merged
}

/// Register every spec in parallel. Failures are logged and skipped.
///
/// Returns the names that came up.
pub async fn bootstrap_providers(
    registry: &ProviderRegistry,
    specs: Vec<ProviderSpec>,
    logger: &SharedLogger,
) -> Vec<String> {
    if specs.is_empty() {
        logger.debug("[Bootstrap] No providers configured");
        return Vec::new();
    }

    let total = specs.len();
    let mut started = Vec::new();
    for (name, result) in registry.register_all(specs).await {
        match result {
            Ok(()) => started.push(name),
            Err(e) => logger.warn(&format!("[Bootstrap] Skipping provider '{}': {}", name, e)),
        }
    }

    logger.info(&format!(
        "[Bootstrap] {}/{} providers started",
        started.len(),
        total
    ));
    started
}
