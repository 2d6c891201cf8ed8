//! Tracing setup for the `sitevault` binary
//!
//! Human-readable output goes to stderr so stdout stays clean for command results.
//! `RUST_LOG` takes precedence over the configured filter.

use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const DEFAULT_FILTER: &str = "info,sitevault_backup=info,sitevault_core=info,sitevault_drivers=info";

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Emit JSON lines on stderr instead of human-readable output
    pub json: bool,
    /// Also write daily-rotated JSON logs here
    pub log_dir: Option<PathBuf>,
    /// Filter used when `RUST_LOG` is unset
    pub default_filter: String,
    /// Log span close events with timings
    pub enable_spans: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            json: false,
            log_dir: None,
            default_filter: DEFAULT_FILTER.to_string(),
            enable_spans: cfg!(debug_assertions),
        }
    }
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer when dropped; keep it alive for the
/// lifetime of the process.
pub fn init(config: LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let make_filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.default_filter))
    };

    let span_events = if config.enable_spans {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let mut layers = Vec::new();

    let console_layer = if config.json {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_span_events(span_events.clone())
            .json()
            .with_current_span(true)
            .with_filter(make_filter())
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_span_events(span_events.clone())
            .with_ansi(true)
            .compact()
            .with_filter(make_filter())
            .boxed()
    };
    layers.push(console_layer);

    let mut guard = None;
    if let Some(log_dir) = &config.log_dir {
        std::fs::create_dir_all(log_dir)?;
        let file_appender = tracing_appender::rolling::daily(log_dir, "sitevault.log");
        let (non_blocking, worker_guard) = tracing_appender::non_blocking(file_appender);
        guard = Some(worker_guard);

        let file_layer = fmt::layer()
            .with_target(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_span_events(span_events)
            .with_ansi(false)
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(non_blocking)
            .with_filter(make_filter())
            .boxed();
        layers.push(file_layer);
    }

    tracing_subscriber::registry().with(layers).try_init()?;

    tracing::debug!(
        json = config.json,
        log_dir = ?config.log_dir,
        "logging initialized"
    );
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_human_readable_console_only() {
        let config = LoggingConfig::default();
        assert!(!config.json);
        assert!(config.log_dir.is_none());
        assert!(config.default_filter.starts_with("info"));
    }
}
