//! Door status state machine.
//!
//! ```text
//! any state ──"open"────────► Open
//! any state ──"closed"──────► Closed
//! any state ──anything else─► Unknown   (initial)
//! ```
//!
//! The next state depends only on the received value, never on the current one.

use super::journal::Journal;
use serde::Serialize;

/// Door state as displayed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum DoorStatus {
    /// Detector reports the door open.
    Open,
    /// Detector reports the door closed.
    Closed,
    /// No recognized report yet, or an unrecognized value.
    #[default]
    Unknown,
}

/// Discrete style of the status dot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    /// Door open style.
    Open,
    /// Door closed style.
    Closed,
    /// Base style with no state modifier.
    Neutral,
}

impl DoorStatus {
    /// Transition function: map a raw report to a state.
    #[must_use]
    pub fn from_report(raw: Option<&str>) -> Self {
        match raw {
            Some("open") => Self::Open,
            Some("closed") => Self::Closed,
            _ => Self::Unknown,
        }
    }

    /// Status line shown next to the indicator.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Open => "Status: door open",
            Self::Closed => "Status: door closed",
            Self::Unknown => "Status: detecting...",
        }
    }

    /// Indicator style for this state.
    #[must_use]
    pub fn indicator(self) -> Indicator {
        match self {
            Self::Open => Indicator::Open,
            Self::Closed => Indicator::Closed,
            Self::Unknown => Indicator::Neutral,
        }
    }
}

/// Owns the displayed [`DoorStatus`].
#[derive(Debug, Clone, Default)]
pub struct DoorStatusModel {
    status: DoorStatus,
}

impl DoorStatusModel {
    /// Model in the initial `Unknown` state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    #[must_use]
    pub fn status(&self) -> DoorStatus {
        self.status
    }

    /// Apply an inbound report. Repeats of the current state are journaled too.
    pub fn apply(&mut self, raw: Option<&str>, journal: &mut Journal) -> DoorStatus {
        self.status = DoorStatus::from_report(raw);
        journal.info(format!("Door status: {}", raw.unwrap_or("(none)")));
        self.status
    }
}
