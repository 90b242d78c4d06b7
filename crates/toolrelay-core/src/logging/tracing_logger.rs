//! Logger that forwards to `tracing`

use super::traits::{LogLevel, Logger};

/// A logger that emits `tracing` events under the `toolrelay` target
///
/// Install a subscriber (e.g. `tracing_subscriber::fmt`) in the binary to see them.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl TracingLogger {
    /// Create a tracing logger
    pub fn new() -> Self {
        Self
    }
}

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Debug => tracing::debug!(target: "toolrelay", "{}", message),
            LogLevel::Info => tracing::info!(target: "toolrelay", "{}", message),
            LogLevel::Warn => tracing::warn!(target: "toolrelay", "{}", message),
            LogLevel::Error => tracing::error!(target: "toolrelay", "{}", message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracing_logger_logs_without_subscriber() {
        // No subscriber installed: events are dropped, nothing panics
        let logger = TracingLogger::new();
        logger.debug("debug message");
        logger.info("info message");
        logger.warn("warn message");
        logger.error("error message");
    }
}
