//! Renders the operator journal at the bottom of the window.
//!
//! Entries are listed oldest first. Whenever the journal revision moves the
//! view jumps to the newest entry; in between, the operator may scroll freely.

use super::colors;
use crate::session::Snapshot;
use eframe::egui::{self, RichText, ScrollArea, Ui};

#[derive(Default)]
pub(super) struct LogPanel {
    seen_revision: u64,
}

impl LogPanel {
    pub(super) fn render(&mut self, ui: &mut Ui, snapshot: &Snapshot) {
        ui.heading("Event Log");
        ui.separator();

        let appended = snapshot.log_revision != self.seen_revision;
        self.seen_revision = snapshot.log_revision;

        ScrollArea::vertical()
            .auto_shrink([false; 2])
            .stick_to_bottom(true)
            .show(ui, |ui| {
                let last = snapshot.log.len().saturating_sub(1);
                for (index, entry) in snapshot.log.iter().enumerate() {
                    let text = RichText::new(entry.to_string()).monospace();
                    let response = if entry.is_error() {
                        ui.label(text.color(colors::ERROR))
                    } else {
                        ui.label(text)
                    };
                    if appended && index == last {
                        response.scroll_to_me(Some(egui::Align::BOTTOM));
                    }
                }
            });
    }
}
