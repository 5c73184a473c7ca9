//! Session state and its transitions.
//!
//! All console state lives in one [`Session`] owned by the controller task.
//! Every input (transport event, operator action, cooldown expiry) goes
//! through [`Session::handle`], which runs to completion and returns the
//! effects the controller must perform. Time is passed in, never read, so the
//! whole state machine can be driven deterministically from tests.

pub mod alerts;
pub mod calibration;
pub mod door;
pub mod journal;
pub mod link;
pub mod settings;
pub mod video;

pub use alerts::dispatch_error;
pub use calibration::{
    CalibrationController, CooldownTicket, ScheduledRelease, TriggerOutcome, CALIBRATION_COOLDOWN,
};
pub use door::{DoorStatus, DoorStatusModel, Indicator};
pub use journal::{Journal, LogEntry, Severity, LOG_CAPACITY};
pub use link::ConnectionManager;
pub use settings::{SettingsPanel, DEFAULT_SETTINGS, MIN_AREA_RANGE, THRESHOLD_RANGE};
pub use video::{DecodedFrame, Placeholder, SurfaceId, VideoRenderer, VideoSurface};

use crate::connection::ConnectionState;
use crate::protocol::{DetectorSettings, InboundEvent, OutboundCommand};
use serde::Serialize;
use tokio::time::Instant;

/// What the transport reports.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Socket.IO session established.
    Connected,
    /// Session lost. The transport is already retrying.
    Disconnected {
        /// Short description for tracing.
        reason: String,
    },
    /// A decoded inbound event.
    Message(InboundEvent),
}

/// Operator input from any front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    /// Press the calibrate control.
    Calibrate,
    /// Expand/collapse the settings panel.
    ToggleSettings,
    /// Move the threshold slider.
    SetThreshold(i32),
    /// Move the minimum area slider.
    SetMinAreaPercent(i32),
    /// Press save in the settings panel.
    SaveSettings,
}

/// Input to [`Session::handle`].
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// From the transport task.
    Transport(TransportEvent),
    /// From the operator.
    User(UserAction),
    /// A scheduled calibration release fired.
    CooldownElapsed(CooldownTicket),
}

/// Work the controller performs on behalf of the session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Effect {
    /// Transmit a command. Only ever produced while connected.
    Send(OutboundCommand),
    /// Arm a one-shot timer and feed back [`Event::CooldownElapsed`].
    ScheduleRelease(ScheduledRelease),
}

/// The console state, owned by exactly one task.
#[derive(Debug, Clone)]
pub struct Session {
    link: ConnectionManager,
    journal: Journal,
    door: DoorStatusModel,
    video: VideoRenderer,
    settings: SettingsPanel,
    calibration: CalibrationController,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(DEFAULT_SETTINGS)
    }
}

impl Session {
    /// Fresh session: disconnected, door unknown, waiting for video.
    #[must_use]
    pub fn new(initial_settings: DetectorSettings) -> Self {
        let mut journal = Journal::new();
        journal.info("Console initialised");
        Self {
            link: ConnectionManager::new(),
            journal,
            door: DoorStatusModel::new(),
            video: VideoRenderer::new(),
            settings: SettingsPanel::new(initial_settings),
            calibration: CalibrationController::new(),
        }
    }

    /// Apply one event.
    pub fn handle(&mut self, event: Event, now: Instant) -> Vec<Effect> {
        match event {
            Event::Transport(event) => {
                self.on_transport(event);
                Vec::new()
            }
            Event::User(action) => self.on_user(action, now),
            Event::CooldownElapsed(ticket) => {
                if self.calibration.release(ticket) {
                    tracing::debug!(?ticket, "Calibration lock released");
                } else {
                    tracing::trace!(?ticket, "Ignoring stale cooldown ticket");
                }
                Vec::new()
            }
        }
    }

    fn on_transport(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connected => self.link.on_connect(&mut self.journal),
            TransportEvent::Disconnected { reason } => {
                self.link
                    .on_disconnect(&reason, &mut self.journal, &mut self.video);
            }
            TransportEvent::Message(message) => self.on_message(message),
        }
    }

    fn on_message(&mut self, message: InboundEvent) {
        match message {
            InboundEvent::VideoFeed(feed) => {
                if let Some(image) = feed.image.as_deref() {
                    self.video.on_frame(image);
                }
            }
            InboundEvent::DoorStatus(report) => {
                self.door.apply(report.status.as_deref(), &mut self.journal);
            }
            InboundEvent::ErrorMessage(error) => {
                dispatch_error(&error, &mut self.journal, &mut self.video);
            }
            InboundEvent::Settings(reported) => {
                self.settings
                    .adopt_device_settings(reported, &mut self.journal);
            }
            InboundEvent::CalibrationComplete(outcome) => {
                if outcome.success {
                    self.journal.info("Calibration finished");
                } else {
                    self.journal.error("Calibration failed");
                }
            }
            InboundEvent::SettingsUpdated(outcome) => {
                if outcome.success {
                    self.journal.info("Settings applied by device");
                } else {
                    self.journal.error("Device rejected settings");
                }
            }
        }
    }

    fn on_user(&mut self, action: UserAction, now: Instant) -> Vec<Effect> {
        let connection = self.link.state();
        match action {
            UserAction::Calibrate => {
                match self.calibration.trigger(connection, now, &mut self.journal) {
                    TriggerOutcome::Started { command, release } => vec![
                        Effect::Send(command),
                        Effect::ScheduleRelease(release),
                    ],
                    TriggerOutcome::Rejected | TriggerOutcome::AlreadyRunning => Vec::new(),
                }
            }
            UserAction::ToggleSettings => {
                self.settings.toggle();
                Vec::new()
            }
            UserAction::SetThreshold(value) => {
                self.settings.set_threshold(value);
                Vec::new()
            }
            UserAction::SetMinAreaPercent(value) => {
                self.settings.set_min_area_percent(value);
                Vec::new()
            }
            UserAction::SaveSettings => self
                .settings
                .save(connection, &mut self.journal)
                .map(Effect::Send)
                .into_iter()
                .collect(),
        }
    }

    /// Connectivity as last reported by the transport.
    #[must_use]
    pub fn connection(&self) -> ConnectionState {
        self.link.state()
    }

    /// Operator journal.
    #[must_use]
    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// Door indicator model.
    #[must_use]
    pub fn door(&self) -> &DoorStatusModel {
        &self.door
    }

    /// Video surface owner.
    #[must_use]
    pub fn video(&self) -> &VideoRenderer {
        &self.video
    }

    /// Settings panel state.
    #[must_use]
    pub fn settings(&self) -> &SettingsPanel {
        &self.settings
    }

    /// Calibration lock state.
    #[must_use]
    pub fn calibration(&self) -> &CalibrationController {
        &self.calibration
    }

    /// Immutable copy of what the views render.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            connection: self.link.state(),
            door: self.door.status(),
            log: self.journal.entries().cloned().collect(),
            log_revision: self.journal.revision(),
            video: self.video.surface().clone(),
            frames_rendered: self.video.frames_rendered(),
            settings_draft: self.settings.draft(),
            settings_sent: self.settings.sent(),
            settings_dirty: self.settings.is_dirty(),
            threshold_label: self.settings.threshold_label(),
            min_area_label: self.settings.min_area_label(),
            settings_open: self.settings.is_open(),
            calibrating: self.calibration.is_locked(),
        }
    }
}

/// Render-ready view of a [`Session`], published after every transition.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Connectivity.
    pub connection: ConnectionState,
    /// Door indicator.
    pub door: DoorStatus,
    /// Journal, oldest first.
    pub log: Vec<LogEntry>,
    /// Changes on every append; views scroll to the bottom when it moves.
    pub log_revision: u64,
    /// Video area content.
    pub video: VideoSurface,
    /// Frames shown since start; views re-upload pixels when it moves.
    pub frames_rendered: u64,
    /// Slider values.
    pub settings_draft: DetectorSettings,
    /// Values last sent or reported by the device.
    pub settings_sent: DetectorSettings,
    /// Draft differs from the sent copy.
    pub settings_dirty: bool,
    /// Live label next to the threshold slider.
    pub threshold_label: String,
    /// Live label next to the minimum area slider (with `%`).
    pub min_area_label: String,
    /// Whether the settings panel is expanded.
    pub settings_open: bool,
    /// Calibration lock held (control disabled, spinner shown).
    pub calibrating: bool,
}

impl Default for Snapshot {
    fn default() -> Self {
        Session::default().snapshot()
    }
}

/// Compact status line for the headless console and `status` command.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSummary {
    /// `connected` / `disconnected`.
    pub connection: &'static str,
    /// Door label.
    pub door: &'static str,
    /// Calibration lock held.
    pub calibrating: bool,
    /// Current slider values.
    pub settings: DetectorSettings,
    /// Size of the displayed frame, if any.
    pub video: Option<[u32; 2]>,
}

impl Snapshot {
    /// Summary suitable for one line of JSON output.
    #[must_use]
    pub fn summary(&self) -> StatusSummary {
        StatusSummary {
            connection: if self.connection.is_connected() {
                "connected"
            } else {
                "disconnected"
            },
            door: self.door.label(),
            calibrating: self.calibrating,
            settings: self.settings_draft,
            video: self.video.frame().map(|f| [f.width(), f.height()]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::video::test_frames::jpeg_base64;
    use super::*;
    use crate::protocol::{DeviceError, DoorStatusReport, Outcome, VideoFeed};
    use std::time::Duration;

    fn connected() -> Session {
        let mut session = Session::default();
        session.handle(Event::Transport(TransportEvent::Connected), Instant::now());
        session
    }

    fn message(event: InboundEvent) -> Event {
        Event::Transport(TransportEvent::Message(event))
    }

    #[test]
    fn test_new_session_logs_initialisation() {
        let session = Session::default();
        assert_eq!(session.journal().len(), 1);
        assert!(session.journal().contains("Console initialised"));
        assert_eq!(session.connection(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_calibrate_emits_send_and_release() {
        let mut session = connected();
        let now = Instant::now();
        let effects = session.handle(Event::User(UserAction::Calibrate), now);

        assert_eq!(effects.len(), 2);
        assert_eq!(effects[0], Effect::Send(OutboundCommand::Calibrate));
        let Effect::ScheduleRelease(release) = effects[1] else {
            panic!("expected ScheduleRelease, got {:?}", effects[1]);
        };
        assert_eq!(release.at, now + CALIBRATION_COOLDOWN);
        assert!(session.snapshot().calibrating);

        session.handle(Event::CooldownElapsed(release.ticket), release.at);
        assert!(!session.snapshot().calibrating);
    }

    #[test]
    fn test_commands_never_sent_while_disconnected() {
        let mut session = Session::default();
        let now = Instant::now();
        for action in [
            UserAction::SetThreshold(80),
            UserAction::SaveSettings,
            UserAction::Calibrate,
            UserAction::SaveSettings,
        ] {
            assert!(session.handle(Event::User(action), now).is_empty());
        }
        assert!(!session.snapshot().calibrating);
    }

    #[test]
    fn test_missing_image_is_skipped() {
        let mut session = connected();
        let before = session.journal().len();
        session.handle(
            message(InboundEvent::VideoFeed(VideoFeed { image: None })),
            Instant::now(),
        );
        assert_eq!(session.journal().len(), before);
        assert_eq!(
            session.snapshot().video,
            VideoSurface::Placeholder(Placeholder::Waiting)
        );
    }

    #[test]
    fn test_last_frame_wins() {
        let mut session = connected();
        let now = Instant::now();
        for (w, h) in [(2, 2), (4, 2), (6, 4)] {
            session.handle(
                message(InboundEvent::VideoFeed(VideoFeed {
                    image: Some(jpeg_base64(w, h, [50, 50, 50])),
                })),
                now,
            );
        }
        let frame = session.snapshot().video.frame().cloned().unwrap();
        assert_eq!((frame.width(), frame.height()), (6, 4));
    }

    #[test]
    fn test_door_status_survives_disconnect() {
        let mut session = connected();
        let now = Instant::now();
        session.handle(
            message(InboundEvent::DoorStatus(DoorStatusReport {
                status: Some("open".into()),
            })),
            now,
        );
        session.handle(
            Event::Transport(TransportEvent::Disconnected {
                reason: "io error".into(),
            }),
            now,
        );
        let snapshot = session.snapshot();
        assert_eq!(snapshot.door, DoorStatus::Open);
        assert_eq!(
            snapshot.video,
            VideoSurface::Placeholder(Placeholder::Reconnecting)
        );
    }

    #[test]
    fn test_device_outcomes_are_journaled() {
        let mut session = connected();
        let now = Instant::now();
        session.handle(
            message(InboundEvent::CalibrationComplete(Outcome { success: false })),
            now,
        );
        assert!(session.journal().latest().is_some_and(|e| e.is_error()));
        session.handle(
            message(InboundEvent::SettingsUpdated(Outcome { success: true })),
            now,
        );
        assert!(session.journal().contains("Settings applied by device"));
    }

    #[test]
    fn test_calibration_complete_does_not_release_lock() {
        let mut session = connected();
        let now = Instant::now();
        session.handle(Event::User(UserAction::Calibrate), now);
        session.handle(
            message(InboundEvent::CalibrationComplete(Outcome { success: true })),
            now + Duration::from_millis(100),
        );
        assert!(session.snapshot().calibrating);
    }

    #[test]
    fn test_error_message_routes_to_dispatch() {
        let mut session = connected();
        session.handle(
            message(InboundEvent::ErrorMessage(DeviceError {
                message: "Camera unavailable".into(),
                kind: "camera_error".into(),
            })),
            Instant::now(),
        );
        assert_eq!(
            session.snapshot().video,
            VideoSurface::Placeholder(Placeholder::CameraError)
        );
    }

    #[test]
    fn test_summary() {
        let session = connected();
        let summary = session.snapshot().summary();
        assert_eq!(summary.connection, "connected");
        assert_eq!(summary.door, "Status: detecting...");
        assert!(summary.video.is_none());
    }

    #[test]
    fn test_snapshot_carries_slider_labels() {
        let mut session = connected();
        let now = Instant::now();
        session.handle(Event::User(UserAction::SetThreshold(88)), now);
        session.handle(Event::User(UserAction::SetMinAreaPercent(14)), now);

        let snapshot = session.snapshot();
        assert_eq!(snapshot.threshold_label, "88");
        assert_eq!(snapshot.min_area_label, "14%");
        assert!(snapshot.settings_dirty);

        session.handle(Event::User(UserAction::SaveSettings), now);
        assert!(!session.snapshot().settings_dirty);
    }
}
