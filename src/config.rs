//! Console configuration using Figment
//!
//! Configuration is layered, later sources overriding earlier ones:
//! 1. Built-in defaults
//! 2. `config/door-console.toml` (or the file passed with `--config`)
//! 3. Environment variables prefixed with `DOOR_CONSOLE_`, nested keys split on `__`
//!
//! # Example
//! ```no_run
//! use door_console::config::ConsoleConfig;
//!
//! let config = ConsoleConfig::load()?;
//! config.validate()?;
//! println!("Device service: {}", config.server.url);
//! # Ok::<(), door_console::error::ConsoleError>(())
//! ```
//!
//! `DOOR_CONSOLE_SERVER__URL=192.168.1.20:5000` overrides `server.url`.

use crate::connection::{ReconnectConfig, ServerAddress, DEFAULT_SERVER_URL};
use crate::error::{ConsoleError, Result};
use crate::protocol::DetectorSettings;
use crate::session::{MIN_AREA_RANGE, THRESHOLD_RANGE};
use crate::transport::TransportConfig;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/door-console.toml";

/// Prefix of overriding environment variables.
pub const ENV_PREFIX: &str = "DOOR_CONSOLE_";

const VALID_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const VALID_FORMATS: [&str; 3] = ["pretty", "compact", "json"];

/// Top-level console configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Device service endpoint
    pub server: ServerConfig,
    /// Transport reconnect policy
    pub reconnect: ReconnectSettings,
    /// Process logging
    pub logging: LoggingConfig,
    /// Initial detector settings draft
    pub settings: InitialSettings,
    /// Desktop window geometry
    pub window: WindowConfig,
}

/// Device service endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address of the device service (`host:port`, `http://...`, `ws://...`)
    pub url: String,
    /// Upper bound on one connect + handshake, in milliseconds
    pub connect_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SERVER_URL.to_string(),
            connect_timeout_ms: 5000,
        }
    }
}

/// Reconnect policy as written in the config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectSettings {
    /// Whether the transport reconnects at all
    pub enabled: bool,
    /// First retry delay in milliseconds
    pub initial_delay_ms: u64,
    /// Cap on the retry delay in milliseconds
    pub max_delay_ms: u64,
    /// Growth factor between retries
    pub backoff_multiplier: f64,
    /// Attempts before giving up (0 = unlimited)
    pub max_attempts: u32,
    /// Randomize delays by up to 25%
    pub jitter: bool,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        let defaults = ReconnectConfig::default();
        Self {
            enabled: defaults.enabled,
            initial_delay_ms: duration_ms(defaults.initial_delay),
            max_delay_ms: duration_ms(defaults.max_delay),
            backoff_multiplier: defaults.backoff_multiplier,
            max_attempts: defaults.max_attempts,
            jitter: defaults.jitter,
        }
    }
}

impl From<&ReconnectSettings> for ReconnectConfig {
    fn from(settings: &ReconnectSettings) -> Self {
        Self {
            initial_delay: Duration::from_millis(settings.initial_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
            backoff_multiplier: settings.backoff_multiplier,
            max_attempts: settings.max_attempts,
            jitter: settings.jitter,
            enabled: settings.enabled,
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Process logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (pretty, compact, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Detector settings the panel starts from until the device reports its own
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialSettings {
    /// Binarization threshold (0-255)
    pub threshold: i32,
    /// Minimum changed area in percent (0-100)
    pub min_area_percent: i32,
}

impl Default for InitialSettings {
    fn default() -> Self {
        Self {
            threshold: 30,
            min_area_percent: 5,
        }
    }
}

impl From<InitialSettings> for DetectorSettings {
    fn from(settings: InitialSettings) -> Self {
        Self {
            threshold: settings.threshold,
            min_area_percent: settings.min_area_percent,
        }
    }
}

/// Desktop window geometry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Initial width in points
    pub width: f32,
    /// Initial height in points
    pub height: f32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1100.0,
            height: 760.0,
        }
    }
}

impl ConsoleConfig {
    /// Load from the default file and environment
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load from a specific file path and environment
    ///
    /// A missing file is not an error; defaults and environment still apply.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::figment(path.as_ref()).extract()?)
    }

    /// The layered provider stack, exposed for callers that add their own layers
    #[must_use]
    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<()> {
        ServerAddress::parse(&self.server.url)?;

        if self.server.connect_timeout_ms == 0 {
            return Err(invalid("server.connect_timeout_ms must be greater than 0"));
        }

        if !VALID_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(invalid(format!(
                "Invalid logging.level '{}'. Must be one of: {}",
                self.logging.level,
                VALID_LEVELS.join(", ")
            )));
        }

        if !VALID_FORMATS.contains(&self.logging.format.to_lowercase().as_str()) {
            return Err(invalid(format!(
                "Invalid logging.format '{}'. Must be one of: {}",
                self.logging.format,
                VALID_FORMATS.join(", ")
            )));
        }

        if !THRESHOLD_RANGE.contains(&self.settings.threshold) {
            return Err(invalid(format!(
                "Invalid settings.threshold {}. Must be 0-255",
                self.settings.threshold
            )));
        }

        if !MIN_AREA_RANGE.contains(&self.settings.min_area_percent) {
            return Err(invalid(format!(
                "Invalid settings.min_area_percent {}. Must be 0-100",
                self.settings.min_area_percent
            )));
        }

        let reconnect = &self.reconnect;
        if reconnect.initial_delay_ms == 0 {
            return Err(invalid("reconnect.initial_delay_ms must be greater than 0"));
        }
        if reconnect.max_delay_ms < reconnect.initial_delay_ms {
            return Err(invalid(format!(
                "reconnect.max_delay_ms ({}) is below reconnect.initial_delay_ms ({})",
                reconnect.max_delay_ms, reconnect.initial_delay_ms
            )));
        }
        if reconnect.backoff_multiplier.is_nan() || reconnect.backoff_multiplier <= 0.0 {
            return Err(invalid(format!(
                "Invalid reconnect.backoff_multiplier {}. Must be positive",
                reconnect.backoff_multiplier
            )));
        }

        Ok(())
    }

    /// Parsed device service address
    pub fn server_address(&self) -> Result<ServerAddress> {
        Ok(ServerAddress::parse(&self.server.url)?)
    }

    /// Transport settings derived from this configuration
    pub fn transport(&self) -> Result<TransportConfig> {
        Ok(TransportConfig {
            address: self.server_address()?,
            reconnect: ReconnectConfig::from(&self.reconnect),
            connect_timeout: Duration::from_millis(self.server.connect_timeout_ms),
        })
    }

    /// Render as TOML, e.g. for `--print-config`
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| invalid(format!("Cannot render config: {e}")))
    }
}

fn invalid(message: impl Into<String>) -> ConsoleError {
    ConsoleError::Configuration(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ConsoleConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.url, "http://127.0.0.1:5000");
        assert_eq!(config.settings.threshold, 30);
        assert_eq!(config.settings.min_area_percent, 5);
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = ConsoleConfig::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_format() {
        let mut config = ConsoleConfig::default();
        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_settings_out_of_range() {
        let mut config = ConsoleConfig::default();
        config.settings.threshold = 256;
        assert!(config.validate().is_err());

        let mut config = ConsoleConfig::default();
        config.settings.min_area_percent = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reconnect_delays() {
        let mut config = ConsoleConfig::default();
        config.reconnect.initial_delay_ms = 0;
        assert!(config.validate().is_err());

        let mut config = ConsoleConfig::default();
        config.reconnect.max_delay_ms = 500;
        assert!(config.validate().is_err());

        let mut config = ConsoleConfig::default();
        config.reconnect.backoff_multiplier = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_server_url() {
        let mut config = ConsoleConfig::default();
        config.server.url = "ftp://door-cam".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_transport_config() {
        let mut config = ConsoleConfig::default();
        config.server.url = "door-cam.local".to_string();
        config.reconnect.jitter = false;

        let transport = config.transport().unwrap();
        assert_eq!(transport.address.as_str(), "http://door-cam.local:5000/");
        assert_eq!(transport.reconnect.initial_delay, Duration::from_secs(1));
        assert!(!transport.reconnect.jitter);
        assert_eq!(transport.connect_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_toml_rendering() {
        let rendered = ConsoleConfig::default().to_toml().unwrap();
        assert!(rendered.contains("[server]"));
        assert!(rendered.contains("threshold = 30"));
    }
}
