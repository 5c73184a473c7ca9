//! Process tracing setup.
//!
//! Installs a `tracing-subscriber` registry with one `fmt` layer in the
//! configured format. `RUST_LOG` takes precedence over the configured level.
//! Operator journal entries arrive here too, under the
//! `door_console::journal` target.
//!
//! # Example
//! ```no_run
//! use door_console::{config::ConsoleConfig, logging};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConsoleConfig::load()?;
//! logging::init_from_config(&config)?;
//! tracing::info!("Console starting");
//! # Ok(())
//! # }
//! ```

use crate::config::ConsoleConfig;
use crate::error::{ConsoleError, Result};
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Output format for tracing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Multi-line, coloured output for interactive use
    Pretty,
    /// Single-line output without colours
    Compact,
    /// One JSON object per event
    Json,
}

impl FromStr for OutputFormat {
    type Err = ConsoleError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(ConsoleError::Configuration(format!(
                "Invalid log format '{other}'. Must be one of: pretty, compact, json"
            ))),
        }
    }
}

/// Tracing configuration options
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Maximum level when `RUST_LOG` is unset
    pub level: Level,
    /// Output format
    pub format: OutputFormat,
    /// Include file and line numbers
    pub with_file_and_line: bool,
    /// Enable ANSI colours (pretty format only)
    pub with_ansi: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: OutputFormat::Pretty,
            with_file_and_line: false,
            with_ansi: true,
        }
    }
}

impl TracingConfig {
    /// Build from the `[logging]` section
    pub fn from_console_config(config: &ConsoleConfig) -> Result<Self> {
        Ok(Self {
            level: parse_log_level(&config.logging.level)?,
            format: config.logging.format.parse()?,
            ..Default::default()
        })
    }

    /// Set output format
    #[must_use]
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Enable or disable ANSI colours
    #[must_use]
    pub fn with_ansi(mut self, enabled: bool) -> Self {
        self.with_ansi = enabled;
        self
    }
}

/// Initialize tracing from the console configuration
pub fn init_from_config(config: &ConsoleConfig) -> Result<()> {
    init(TracingConfig::from_console_config(config)?)
}

/// Initialize tracing
///
/// Idempotent: if a global subscriber is already installed (tests, embedding
/// applications) this returns `Ok(())`. Events go to stderr; stdout belongs
/// to the headless console.
pub fn init(config: TracingConfig) -> Result<()> {
    let layer = fmt_layer(&config, std::io::stderr);

    match tracing_subscriber::registry().with(layer).try_init() {
        Ok(()) => Ok(()),
        // Another subscriber won the race; keep it.
        Err(e) if e.to_string().contains("already been set") => Ok(()),
        Err(e) => Err(ConsoleError::Configuration(format!(
            "Failed to initialize tracing: {e}"
        ))),
    }
}

/// The `fmt` layer for `config`, writing to `writer`.
fn fmt_layer<S, W>(config: &TracingConfig, writer: W) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str().to_lowercase()));

    match config.format {
        OutputFormat::Pretty => fmt::layer()
            .pretty()
            .with_writer(writer)
            .with_file(config.with_file_and_line)
            .with_line_number(config.with_file_and_line)
            .with_ansi(config.with_ansi)
            .with_filter(env_filter)
            .boxed(),
        OutputFormat::Compact => fmt::layer()
            .compact()
            .with_writer(writer)
            .with_file(config.with_file_and_line)
            .with_line_number(config.with_file_and_line)
            .with_ansi(false)
            .with_filter(env_filter)
            .boxed(),
        OutputFormat::Json => fmt::layer()
            .json()
            .with_writer(writer)
            .with_file(config.with_file_and_line)
            .with_line_number(config.with_file_and_line)
            .with_filter(env_filter)
            .boxed(),
    }
}

/// Parse a log level name, case-insensitively
pub fn parse_log_level(level: &str) -> Result<Level> {
    Level::from_str(level).map_err(|_| {
        ConsoleError::Configuration(format!(
            "Invalid log level '{level}'. Must be one of: trace, debug, info, warn, error"
        ))
    })
}
