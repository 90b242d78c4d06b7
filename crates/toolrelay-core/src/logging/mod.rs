//! Logging abstractions
//!
//! Components take an `Arc<dyn Logger>` so the host decides where log lines go.
//! Binaries use `TracingLogger`; tests use `NoOpLogger` or `MemoryLogger`.

mod traits;
mod noop;
mod memory;
mod tracing_logger;

pub use traits::{LogLevel, Logger, SharedLogger};
pub use noop::NoOpLogger;
pub use memory::MemoryLogger;
pub use tracing_logger::TracingLogger;
