//! Telemetry and logging infrastructure

pub mod logging;

pub use logging::{init_logging, LogConfig, LogFormat};

// Re-export WorkerGuard so callers can store it
pub use tracing_appender::non_blocking::WorkerGuard as LogGuard;
