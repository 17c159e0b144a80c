//! Tracing subscriber setup for applications embedding the call control core

use crate::error::{CallControlError, CallControlResult};
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, EnvFilter};

/// Configuration for the logging system
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// The log level to use when `RUST_LOG` is unset or empty
    pub level: Level,
    /// Whether to enable JSON formatting
    pub json: bool,
    /// Whether to include file and line information
    pub file_info: bool,
    /// Whether to log span enter/exit (pipeline runs, route loops)
    pub log_spans: bool,
    /// Application name included in the welcome line
    pub app_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: Level::INFO,
            json: false,
            file_info: false,
            log_spans: false,
            app_name: "call-control".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Create a new logging configuration
    pub fn new(level: Level, app_name: impl Into<String>) -> Self {
        LoggingConfig {
            level,
            app_name: app_name.into(),
            ..Default::default()
        }
    }

    /// Enable JSON formatting
    pub fn with_json(mut self) -> Self {
        self.json = true;
        self
    }

    /// Enable file and line information in logs
    pub fn with_file_info(mut self) -> Self {
        self.file_info = true;
        self
    }

    /// Enable span logging
    pub fn with_spans(mut self) -> Self {
        self.log_spans = true;
        self
    }
}

/// Install a global `tracing` subscriber built from `config`.
///
/// Fails instead of panicking when a global subscriber is already set.
pub fn setup_logging(config: LoggingConfig) -> CallControlResult<()> {
    let filter = env_filter(config.level, std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref());

    let span_events = if config.log_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_span_events(span_events)
        .with_file(config.file_info)
        .with_line_number(config.file_info);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| CallControlError::logging(e.to_string()))?;

    log_welcome(&config.app_name, crate::VERSION);
    Ok(())
}

/// `RUST_LOG` directives when present, otherwise `level` for everything
fn env_filter(level: Level, rust_log: Option<&str>) -> EnvFilter {
    match rust_log {
        Some(directives) if !directives.trim().is_empty() => EnvFilter::new(directives),
        _ => EnvFilter::new("").add_directive(level.into()),
    }
}

/// Parse a log level from a string
pub fn parse_log_level(level: &str) -> CallControlResult<Level> {
    Level::from_str(level).map_err(|_| CallControlError::config(format!("Invalid log level: {}", level)))
}

fn log_welcome(app_name: &str, version: &str) {
    tracing::info!("Starting {} (call control core v{})", app_name, version);
}
