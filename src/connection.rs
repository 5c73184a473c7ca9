//! Server address normalization, connection state and reconnect policy.
//!
//! - [`ServerAddress`]: validated device-service URL and its Socket.IO endpoint
//! - [`AddressError`]: user-friendly validation errors
//! - [`ConnectionState`]: the two-state view the session exposes to command issuers
//! - [`ReconnectConfig`]: backoff policy used by the transport
//!
//! # URL Normalization
//!
//! [`normalize_url`] accepts the forms operators actually type:
//! - Bare host:port (e.g., `192.168.1.20:5000` → `http://192.168.1.20:5000/`)
//! - Missing port (e.g., `http://door-cam.local` → `http://door-cam.local:5000/`)
//! - Websocket schemes (`ws://`, `wss://`) are folded into `http`/`https`
//!
//! # Example
//!
//! ```
//! use door_console::connection::ServerAddress;
//!
//! let addr = ServerAddress::parse("192.168.1.20:5000")?;
//! assert_eq!(addr.as_str(), "http://192.168.1.20:5000/");
//! assert_eq!(
//!     addr.socket_url().as_str(),
//!     "ws://192.168.1.20:5000/socket.io/?EIO=4&transport=websocket"
//! );
//! # Ok::<(), door_console::connection::AddressError>(())
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use url::Url;

/// Default port of the device service.
pub const DEFAULT_SERVER_PORT: u16 = 5000;

/// Default server address when no configuration is provided.
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";

/// Engine.IO endpoint path and query for a websocket-only session.
const SOCKET_IO_PATH: &str = "/socket.io/";
const SOCKET_IO_QUERY: &str = "EIO=4&transport=websocket";

/// Connectivity as seen by the session.
///
/// Only the transport's connect/disconnect events change it. Commands are
/// only ever emitted while `Connected`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No live Socket.IO session.
    #[default]
    Disconnected,
    /// Namespace connect acknowledged by the device service.
    Connected,
}

impl ConnectionState {
    /// Returns true if connected.
    #[must_use]
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Returns a short status label for UI display.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Connected => "Connected",
        }
    }
}

/// Validated device-service address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    /// The normalized URL (always has scheme and port)
    url: Url,
}

impl ServerAddress {
    /// Parse and normalize a server URL.
    pub fn parse(input: &str) -> Result<Self, AddressError> {
        Ok(Self {
            url: normalize_url(input)?,
        })
    }

    /// Returns the normalized URL string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    /// Returns `true` if this address uses TLS (https scheme).
    #[must_use]
    pub fn is_tls(&self) -> bool {
        self.url.scheme() == "https"
    }

    /// The Engine.IO websocket endpoint for this server.
    #[must_use]
    pub fn socket_url(&self) -> Url {
        let scheme = if self.is_tls() { "wss" } else { "ws" };
        let mut url = self.url.clone();
        // http(s) -> ws(s) stays within the special schemes, which `set_scheme` allows.
        let _ = url.set_scheme(scheme);
        url.set_path(SOCKET_IO_PATH);
        url.set_query(Some(SOCKET_IO_QUERY));
        url
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

/// URL validation error with user-friendly messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// Input was empty or whitespace-only
    EmptyInput,
    /// URL parsing failed
    InvalidUrl(String),
    /// No host was found in the URL
    MissingHost,
    /// Port could not be set
    InvalidPort(String),
    /// Unsupported URL scheme
    UnsupportedScheme(String),
}

impl std::error::Error for AddressError {}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyInput => write!(f, "Address cannot be empty"),
            Self::InvalidUrl(e) => write!(f, "Invalid URL: {e}"),
            Self::MissingHost => write!(f, "URL must include a host"),
            Self::InvalidPort(e) => write!(f, "Invalid port: {e}"),
            Self::UnsupportedScheme(s) => {
                write!(f, "Unsupported scheme '{s}' (use http, https, ws or wss)")
            }
        }
    }
}

/// Normalize a server URL string.
///
/// - Adds `http://` scheme if missing
/// - Maps `ws`/`wss` to `http`/`https`
/// - Adds default port (5000) if missing
/// - Drops any path, query or fragment
pub fn normalize_url(input: &str) -> Result<Url, AddressError> {
    let input = input.trim();

    if input.is_empty() {
        return Err(AddressError::EmptyInput);
    }

    let with_scheme = if input.contains("://") {
        input.to_string()
    } else {
        format!("http://{input}")
    };

    let parsed = Url::parse(&with_scheme).map_err(|e| AddressError::InvalidUrl(e.to_string()))?;

    let scheme = match parsed.scheme().to_lowercase().as_str() {
        "http" | "ws" => "http",
        "https" | "wss" => "https",
        other => return Err(AddressError::UnsupportedScheme(other.to_string())),
    };

    let host = parsed.host_str().ok_or(AddressError::MissingHost)?;
    let port = parsed.port().unwrap_or(DEFAULT_SERVER_PORT);

    let mut url = Url::parse(&format!("{scheme}://{host}"))
        .map_err(|e| AddressError::InvalidUrl(e.to_string()))?;
    url.set_port(Some(port))
        .map_err(|()| AddressError::InvalidPort("Cannot set port on this URL".to_string()))?;

    Ok(url)
}

/// Configuration for the transport's auto-reconnect behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectConfig {
    /// Initial delay before first reconnect attempt.
    pub initial_delay: Duration,
    /// Maximum delay between reconnect attempts.
    pub max_delay: Duration,
    /// Backoff multiplier (e.g., 2.0 for doubling).
    pub backoff_multiplier: f64,
    /// Maximum number of reconnect attempts (0 = unlimited).
    pub max_attempts: u32,
    /// Whether to add jitter to delays.
    pub jitter: bool,
    /// Whether auto-reconnect is enabled.
    pub enabled: bool,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            max_attempts: 0, // Unlimited
            jitter: true,
            enabled: true,
        }
    }
}

impl ReconnectConfig {
    /// Calculate the delay for a given attempt number (1-based).
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let base_delay = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        let capped_delay = base_delay.min(self.max_delay.as_secs_f64());

        let final_delay = if self.jitter {
            // Add up to 25% jitter
            let jitter_factor = 1.0 + (rand_jitter() * 0.25);
            capped_delay * jitter_factor
        } else {
            capped_delay
        };

        Duration::from_secs_f64(final_delay)
    }

    /// Check if another reconnect attempt should be made.
    #[must_use]
    pub fn should_retry(&self, attempt: u32) -> bool {
        self.enabled && (self.max_attempts == 0 || attempt < self.max_attempts)
    }
}

/// Simple pseudo-random jitter using time-based seed.
fn rand_jitter() -> f64 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    f64::from(nanos % 1000) / 1000.0
}
