//! Custom error types for the console.
//!
//! `ConsoleError` is the single error enum of the library. Using the `thiserror`
//! crate it consolidates the failure sources of the transport, the wire codec
//! and configuration loading:
//!
//! - **`Io`** / **`WebSocket`**: the socket went away or could not be opened.
//! - **`Protocol`**: a packet from the device service could not be decoded.
//! - **`Handshake`**: the Engine.IO/Socket.IO handshake did not complete.
//! - **`InvalidAddress`**: the configured server address is unusable.
//! - **`Config`** / **`Configuration`**: configuration failed to load or validate.
//!
//! None of these are fatal to the session itself. The transport turns them into
//! a `Disconnected` event and retries; the session only ever sees connectivity.

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Convenience alias for results using the console error type.
pub type Result<T> = std::result::Result<T, ConsoleError>;

/// Errors produced by the console library.
#[derive(Error, Debug)]
pub enum ConsoleError {
    /// Underlying socket I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Websocket layer failure (connect, read or write).
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// Malformed JSON inside a packet.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Packet could not be decoded.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Engine.IO or Socket.IO handshake failed.
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// Server address rejected during normalization.
    #[error("Invalid server address: {0}")]
    InvalidAddress(#[from] crate::connection::AddressError),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// Configuration loaded but failed validation.
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// The peer task on the other side of a channel has gone away.
    #[error("Channel closed: {0}")]
    ChannelClosed(&'static str),
}

impl From<figment::Error> for ConsoleError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl ConsoleError {
    /// Whether the transport should try again after this error.
    ///
    /// Address and configuration problems will not fix themselves.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        !matches!(
            self,
            Self::InvalidAddress(_)
                | Self::Config(_)
                | Self::Configuration(_)
                | Self::UrlParse(_)
                | Self::WebSocket(tungstenite::Error::Url(_))
        )
    }
}
