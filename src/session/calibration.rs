//! Calibration trigger with a client-side cooldown.
//!
//! Issuing `calibrate` takes a lock that is released by a scheduled, one-shot
//! transition [`CALIBRATION_COOLDOWN`] later. The release is not tied to the
//! device finishing; it is a fixed window. While the lock is held, further
//! triggers are refused locally.
//!
//! The controller arms the deadline carried by [`ScheduledRelease`] and feeds
//! the ticket back when it fires. A ticket that no longer matches the held
//! lock is ignored.

use super::journal::Journal;
use crate::connection::ConnectionState;
use crate::protocol::OutboundCommand;
use std::time::Duration;
use tokio::time::Instant;

/// Length of the lockout window after a calibration command.
pub const CALIBRATION_COOLDOWN: Duration = Duration::from_millis(5000);

/// Identifies one lock acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CooldownTicket(u64);

/// A pending lock release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledRelease {
    /// Lock acquisition this release belongs to.
    pub ticket: CooldownTicket,
    /// When the lock must be released.
    pub at: Instant,
}

/// Result of pressing the calibrate control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// Not connected; journaled, nothing sent.
    Rejected,
    /// Lock already held; nothing sent.
    AlreadyRunning,
    /// Command issued; the release must be scheduled.
    Started {
        /// Command to transmit.
        command: OutboundCommand,
        /// Release to arm.
        release: ScheduledRelease,
    },
}

/// Owns the calibration lock.
#[derive(Debug, Clone, Default)]
pub struct CalibrationController {
    lock: Option<ScheduledRelease>,
    next_ticket: u64,
}

impl CalibrationController {
    /// Controller with the lock free.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the lock is held (control disabled, spinner shown).
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.lock.is_some()
    }

    /// Handle a press of the calibrate control.
    pub fn trigger(
        &mut self,
        connection: ConnectionState,
        now: Instant,
        journal: &mut Journal,
    ) -> TriggerOutcome {
        if !connection.is_connected() {
            journal.error("No connection to server");
            return TriggerOutcome::Rejected;
        }

        if self.lock.is_some() {
            journal.info("Calibration already in progress");
            return TriggerOutcome::AlreadyRunning;
        }

        let release = ScheduledRelease {
            ticket: CooldownTicket(self.next_ticket),
            at: now + CALIBRATION_COOLDOWN,
        };
        self.next_ticket += 1;
        self.lock = Some(release);

        journal.info("Calibration started...");
        TriggerOutcome::Started {
            command: OutboundCommand::Calibrate,
            release,
        }
    }

    /// Release the lock if `ticket` is the one currently held.
    pub fn release(&mut self, ticket: CooldownTicket) -> bool {
        match self.lock {
            Some(held) if held.ticket == ticket => {
                self.lock = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_takes_lock() {
        let mut journal = Journal::new();
        let mut calibration = CalibrationController::new();
        let now = Instant::now();

        let outcome = calibration.trigger(ConnectionState::Connected, now, &mut journal);
        let TriggerOutcome::Started { command, release } = outcome else {
            panic!("expected Started, got {outcome:?}");
        };
        assert_eq!(command, OutboundCommand::Calibrate);
        assert_eq!(release.at, now + Duration::from_millis(5000));
        assert!(calibration.is_locked());
        assert!(journal.contains("Calibration started..."));
    }

    #[test]
    fn test_second_trigger_is_refused() {
        let mut journal = Journal::new();
        let mut calibration = CalibrationController::new();
        let now = Instant::now();

        let TriggerOutcome::Started { release, .. } =
            calibration.trigger(ConnectionState::Connected, now, &mut journal)
        else {
            panic!("expected Started");
        };
        let outcome = calibration.trigger(
            ConnectionState::Connected,
            now + Duration::from_millis(1200),
            &mut journal,
        );
        assert_eq!(outcome, TriggerOutcome::AlreadyRunning);
        assert!(journal.contains("Calibration already in progress"));
        // The first release still owns the lock.
        assert!(calibration.release(release.ticket));
        assert!(!calibration.is_locked());
    }

    #[test]
    fn test_rejected_when_disconnected() {
        let mut journal = Journal::new();
        let mut calibration = CalibrationController::new();
        let outcome =
            calibration.trigger(ConnectionState::Disconnected, Instant::now(), &mut journal);
        assert_eq!(outcome, TriggerOutcome::Rejected);
        assert!(!calibration.is_locked());
        assert!(journal.latest().is_some_and(|e| e.is_error()));
    }

    #[test]
    fn test_stale_ticket_is_ignored() {
        let mut journal = Journal::new();
        let mut calibration = CalibrationController::new();
        let now = Instant::now();

        let TriggerOutcome::Started { release: first, .. } =
            calibration.trigger(ConnectionState::Connected, now, &mut journal)
        else {
            panic!("expected Started");
        };
        assert!(calibration.release(first.ticket));
        assert!(!calibration.release(first.ticket));

        calibration.trigger(ConnectionState::Connected, now, &mut journal);
        assert!(!calibration.release(first.ticket));
        assert!(calibration.is_locked());
    }
}
