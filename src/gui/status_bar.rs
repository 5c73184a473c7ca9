//! Connection state and door indicator.

use super::colors;
use crate::session::{Indicator, Snapshot};
use eframe::egui::{self, Color32, RichText, Ui};

pub(super) fn render(ui: &mut Ui, snapshot: &Snapshot) {
    ui.horizontal(|ui| {
        let (text, color) = if snapshot.connection.is_connected() {
            ("Connected", colors::CONNECTED)
        } else {
            ("Disconnected", colors::DISCONNECTED)
        };
        dot(ui, color);
        ui.label(RichText::new(text).color(color));

        ui.separator();

        let door_color = match snapshot.door.indicator() {
            Indicator::Open => colors::OPEN,
            Indicator::Closed => colors::CLOSED,
            Indicator::Neutral => colors::NEUTRAL,
        };
        dot(ui, door_color);
        ui.label(RichText::new(snapshot.door.label()).strong());
    });
}

fn dot(ui: &mut Ui, color: Color32) {
    let (rect, _) = ui.allocate_exact_size(egui::vec2(12.0, 12.0), egui::Sense::hover());
    ui.painter().circle_filled(rect.center(), 6.0, color);
}
