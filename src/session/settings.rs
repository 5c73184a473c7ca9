//! Detector settings panel.
//!
//! Two copies of the detector parameters live here: the draft the sliders
//! edit, and the values last sent to the device. Slider input only touches the
//! draft; only [`SettingsPanel::save`] transmits it.

use super::journal::Journal;
use crate::connection::ConnectionState;
use crate::protocol::{DetectorSettings, OutboundCommand};
use std::ops::RangeInclusive;

/// Slider range for the binarization threshold.
pub const THRESHOLD_RANGE: RangeInclusive<i32> = 0..=255;

/// Slider range for the minimum changed area, in percent.
pub const MIN_AREA_RANGE: RangeInclusive<i32> = 0..=100;

/// Detector defaults used until the device reports its own values.
pub const DEFAULT_SETTINGS: DetectorSettings = DetectorSettings {
    threshold: 30,
    min_area_percent: 5,
};

/// Local mirror of the detector parameters.
#[derive(Debug, Clone)]
pub struct SettingsPanel {
    draft: DetectorSettings,
    sent: DetectorSettings,
    open: bool,
}

impl Default for SettingsPanel {
    fn default() -> Self {
        Self::new(DEFAULT_SETTINGS)
    }
}

impl SettingsPanel {
    /// Closed panel whose draft and sent copies both start at `initial`.
    #[must_use]
    pub fn new(initial: DetectorSettings) -> Self {
        let initial = clamp(initial);
        Self {
            draft: initial,
            sent: initial,
            open: false,
        }
    }

    /// Values currently on the sliders.
    #[must_use]
    pub fn draft(&self) -> DetectorSettings {
        self.draft
    }

    /// Values last transmitted (or reported by the device).
    #[must_use]
    pub fn sent(&self) -> DetectorSettings {
        self.sent
    }

    /// Whether the draft differs from what the device last got.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.draft != self.sent
    }

    /// Whether the panel is expanded.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Show/hide the panel. Independent of the draft.
    pub fn toggle(&mut self) {
        self.open = !self.open;
    }

    /// Slider input for the threshold.
    pub fn set_threshold(&mut self, value: i32) {
        self.draft.threshold = value.clamp(*THRESHOLD_RANGE.start(), *THRESHOLD_RANGE.end());
    }

    /// Slider input for the minimum area.
    pub fn set_min_area_percent(&mut self, value: i32) {
        self.draft.min_area_percent = value.clamp(*MIN_AREA_RANGE.start(), *MIN_AREA_RANGE.end());
    }

    /// Live label next to the threshold slider.
    #[must_use]
    pub fn threshold_label(&self) -> String {
        self.draft.threshold.to_string()
    }

    /// Live label next to the minimum area slider.
    #[must_use]
    pub fn min_area_label(&self) -> String {
        format!("{}%", self.draft.min_area_percent)
    }

    /// Transmit the draft if connected.
    ///
    /// While disconnected this only journals an error and returns `None`.
    pub fn save(
        &mut self,
        connection: ConnectionState,
        journal: &mut Journal,
    ) -> Option<OutboundCommand> {
        if !connection.is_connected() {
            journal.error("No connection to server");
            return None;
        }

        self.sent = self.draft;
        self.open = false;
        journal.info("Settings saved");
        Some(OutboundCommand::UpdateSettings(self.draft))
    }

    /// Adopt the values the device reports as current.
    pub fn adopt_device_settings(&mut self, reported: DetectorSettings, journal: &mut Journal) {
        let reported = clamp(reported);
        self.draft = reported;
        self.sent = reported;
        journal.info(format!(
            "Device settings: threshold {}, min area {}%",
            reported.threshold, reported.min_area_percent
        ));
    }
}

fn clamp(settings: DetectorSettings) -> DetectorSettings {
    DetectorSettings {
        threshold: settings
            .threshold
            .clamp(*THRESHOLD_RANGE.start(), *THRESHOLD_RANGE.end()),
        min_area_percent: settings
            .min_area_percent
            .clamp(*MIN_AREA_RANGE.start(), *MIN_AREA_RANGE.end()),
    }
}
