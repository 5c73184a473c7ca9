//! CLI Entry Point for door-console
//!
//! Opens the desktop window by default, or a terminal console with
//! `--headless`.
//!
//! # Usage
//!
//! ```bash
//! door-console --url 192.168.1.20:5000
//! door-console --headless --log-format compact
//! door-console --config site.toml --print-config
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use door_console::config::{ConsoleConfig, DEFAULT_CONFIG_PATH};
use door_console::controller::spawn_console;
use door_console::session::Session;
use door_console::{headless, logging};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "door-console")]
#[command(about = "Operator console for the door camera service", long_about = None)]
struct Cli {
    /// Device service address (`host:port`, `http://...`, `ws://...`)
    #[arg(long)]
    url: Option<String>,

    /// Configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Terminal console instead of the desktop window
    #[arg(long)]
    headless: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Log format (pretty, compact, json)
    #[arg(long)]
    log_format: Option<String>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

impl Cli {
    fn apply_overrides(&self, config: &mut ConsoleConfig) {
        if let Some(url) = &self.url {
            config.server.url.clone_from(url);
        }
        if let Some(level) = &self.log_level {
            config.logging.level.clone_from(level);
        }
        if let Some(format) = &self.log_format {
            config.logging.format.clone_from(format);
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ConsoleConfig::load_from(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    cli.apply_overrides(&mut config);
    config.validate().context("Invalid configuration")?;

    if cli.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    logging::init_from_config(&config).context("Failed to initialize logging")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("door-console")
        .build()
        .context("Failed to build tokio runtime")?;

    let transport = config.transport()?;
    tracing::info!(server = %transport.address, "Starting door console");

    let console = {
        let _guard = runtime.enter();
        spawn_console(Session::new(config.settings.into()), transport)
    };

    if cli.headless {
        runtime.block_on(headless::run(console.handle))?;
    } else {
        run_window(console.handle, &runtime, &config)?;
    }

    // All handles are gone; the controller winds down and closes the transport.
    runtime.block_on(async {
        let _ = console.controller.await;
        let _ = console.transport.await;
    });
    tracing::info!("Door console stopped");
    Ok(())
}

#[cfg(feature = "standalone")]
fn run_window(
    handle: door_console::controller::ControllerHandle,
    runtime: &tokio::runtime::Runtime,
    config: &ConsoleConfig,
) -> Result<()> {
    door_console::gui::run(handle, runtime.handle().clone(), config.window)
        .map_err(|e| anyhow::anyhow!("GUI error: {e}"))
}

#[cfg(not(feature = "standalone"))]
fn run_window(
    _handle: door_console::controller::ControllerHandle,
    _runtime: &tokio::runtime::Runtime,
    _config: &ConsoleConfig,
) -> Result<()> {
    anyhow::bail!("Built without the desktop window; rerun with --headless")
}
