//! Centralized logging configuration for the xbot binary
//!
//! Two sinks are supported:
//! - An append-only log file with timestamped lines (always ANSI-free)
//! - stderr in text, JSON or pretty format, enabled for verbose runs or when
//!   no log file is configured
//!
//! `RUST_LOG` overrides the configured level for both sinks.
//!
//! # Examples
//!
//! ```no_run
//! use libxbot::logging::{LoggingConfig, LogFormat};
//!
//! let config = LoggingConfig::new(LogFormat::Text, "info".to_string(), false)
//!     .with_file("bot.log");
//! config.init().expect("logging");
//! ```

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Mutex;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

use crate::config::LogFileConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable text output (no colors, for piping)
    Text,
    /// Machine-parseable JSON (one JSON object per line)
    Json,
    /// Pretty-printed with colors (for development)
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            _ => Err(format!(
                "Invalid log format: '{}'. Valid options: text, json, pretty",
                s
            )),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
            LogFormat::Pretty => write!(f, "pretty"),
        }
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Configuration for logging initialization
pub struct LoggingConfig {
    pub format: LogFormat,
    pub level: String,
    pub verbose: bool,
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Create a new logging configuration
    ///
    /// # Arguments
    ///
    /// * `format` - stderr output format (text, json, or pretty)
    /// * `level` - Minimum log level (error, warn, info, debug, trace)
    /// * `verbose` - If true, defaults to debug level and always logs to stderr
    pub fn new(format: LogFormat, level: String, verbose: bool) -> Self {
        Self {
            format,
            level,
            verbose,
            file: None,
        }
    }

    /// Also append log lines to `path`
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    fn filter(&self) -> EnvFilter {
        let level = if self.verbose { "debug" } else { &self.level };
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    }

    fn console_layer(&self) -> BoxedLayer {
        match self.format {
            LogFormat::Json => fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_current_span(true)
                .with_span_list(true)
                .flatten_event(true)
                .with_target(true)
                .with_line_number(true)
                .with_file(true)
                .boxed(),
            LogFormat::Pretty => fmt::layer()
                .pretty()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_line_number(true)
                .with_file(true)
                .boxed(),
            LogFormat::Text => fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(true)
                .boxed(),
        }
    }

    /// Initialize logging with the configured settings
    ///
    /// This should be called once at the start of the program.
    ///
    /// # Errors
    ///
    /// Fails if the log file cannot be opened for appending or a global
    /// subscriber is already installed.
    pub fn init(&self) -> std::io::Result<()> {
        let mut layers: Vec<BoxedLayer> = Vec::new();

        if let Some(path) = &self.file {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            layers.push(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file))
                    .boxed(),
            );
        }

        if self.verbose || self.file.is_none() {
            layers.push(self.console_layer());
        }

        tracing_subscriber::registry()
            .with(layers)
            .with(self.filter())
            .try_init()
            .map_err(std::io::Error::other)
    }
}

/// Initialize logging from the `[logging]` config section
///
/// Respects the `XBOT_LOG_FORMAT` environment variable for the stderr sink.
/// Falls back to text format if not set.
pub fn init_from_config(config: &LogFileConfig, verbose: bool) -> std::io::Result<()> {
    let format = std::env::var("XBOT_LOG_FORMAT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(LogFormat::Text);

    let mut logging = LoggingConfig::new(format, config.level.clone(), verbose);
    if !config.file.trim().is_empty() {
        logging = logging.with_file(crate::config::expand_path(&config.file));
    }
    logging.init()
}
