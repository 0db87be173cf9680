//! Logging setup
//!
//! Structured logging with tracing. Console output goes to stderr so the
//! command line front end can keep stdout for its report.

use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// Env var for the log filter, checked before `RUST_LOG`
pub const LOG_FILTER_ENV: &str = "HOLO_LOG";
/// Env var selecting the console format ("json" or "compact")
pub const LOG_FORMAT_ENV: &str = "HOLO_LOG_FORMAT";

/// Console output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl LogFormat {
    /// Parse a format name; unknown names give `None`
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "json" => Some(LogFormat::Json),
            "compact" | "text" => Some(LogFormat::Compact),
            _ => None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Write to stderr
    pub console_enabled: bool,
    /// Also write to a file
    pub file_path: Option<PathBuf>,
    /// Console format unless overridden by `HOLO_LOG_FORMAT`
    pub format: LogFormat,
    /// Filter used when neither `HOLO_LOG` nor `RUST_LOG` is set
    pub default_level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            console_enabled: true,
            file_path: None,
            format: LogFormat::Compact,
            default_level: "info".to_string(),
        }
    }
}

impl LogConfig {
    /// Format after applying the env override
    fn effective_format(&self) -> LogFormat {
        std::env::var(LOG_FORMAT_ENV)
            .ok()
            .and_then(|v| LogFormat::from_name(&v))
            .unwrap_or(self.format)
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_env(LOG_FILTER_ENV)
            .or_else(|_| EnvFilter::try_from_env("RUST_LOG"))
            .unwrap_or_else(|_| EnvFilter::new(&self.default_level))
    }
}

/// Initialize the global subscriber.
///
/// Returns the file writer guard when file logging is on; keep it alive
/// until exit so buffered lines are flushed.
pub fn init_logging(
    config: &LogConfig,
) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error + Send + Sync>> {
    let format = config.effective_format();

    let (file_layer, guard) = match &config.file_path {
        Some(path) => {
            let file = std::fs::File::create(path)?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let console_enabled = config.console_enabled;
    let json_layer = (console_enabled && format == LogFormat::Json).then(|| {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(true)
    });
    let compact_layer = (console_enabled && format == LogFormat::Compact).then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .compact()
    });

    tracing_subscriber::registry()
        .with(config.env_filter())
        .with(file_layer)
        .with(json_layer)
        .with(compact_layer)
        .try_init()?;

    tracing::info!(
        target: "holo_camera",
        version = env!("CARGO_PKG_VERSION"),
        format = ?format,
        file = ?config.file_path,
        "Logging initialized"
    );

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_default() {
        let config = LogConfig::default();
        assert!(config.console_enabled);
        assert!(config.file_path.is_none());
        assert_eq!(config.format, LogFormat::Compact);
        assert_eq!(config.default_level, "info");
    }

    #[test]
    fn test_format_names() {
        assert_eq!(LogFormat::from_name("JSON"), Some(LogFormat::Json));
        assert_eq!(LogFormat::from_name(" compact "), Some(LogFormat::Compact));
        assert_eq!(LogFormat::from_name("xml"), None);
    }
}
