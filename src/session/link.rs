//! Connectivity as reflected by the session.
//!
//! The transport owns the socket and all retry logic. This component only
//! mirrors its connect/disconnect events.

use super::journal::Journal;
use super::video::VideoRenderer;
use crate::connection::ConnectionState;

/// Mirrors transport connectivity for the command-issuing components.
#[derive(Debug, Clone, Default)]
pub struct ConnectionManager {
    state: ConnectionState,
}

impl ConnectionManager {
    /// Starts disconnected.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Transport reports a live session.
    pub fn on_connect(&mut self, journal: &mut Journal) {
        self.state = ConnectionState::Connected;
        journal.info("Connected to server");
    }

    /// Transport reports the session lost.
    pub fn on_disconnect(&mut self, reason: &str, journal: &mut Journal, video: &mut VideoRenderer) {
        tracing::debug!(%reason, "Transport disconnected");
        self.state = ConnectionState::Disconnected;
        journal.error("Connection to server lost");
        video.on_disconnect();
    }
}
