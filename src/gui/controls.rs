//! Calibration button and the collapsible settings panel.

use crate::session::{Snapshot, UserAction, MIN_AREA_RANGE, THRESHOLD_RANGE};
use eframe::egui::{self, Ui};

pub(super) fn render(ui: &mut Ui, snapshot: &Snapshot, actions: &mut Vec<UserAction>) {
    ui.heading("Calibration");
    ui.horizontal(|ui| {
        let button = egui::Button::new("Calibrate");
        if ui.add_enabled(!snapshot.calibrating, button).clicked() {
            actions.push(UserAction::Calibrate);
        }
        if snapshot.calibrating {
            ui.spinner();
        }
    });

    ui.add_space(12.0);
    ui.separator();

    let arrow = if snapshot.settings_open { "▾" } else { "▸" };
    if ui.button(format!("{arrow} Settings")).clicked() {
        actions.push(UserAction::ToggleSettings);
    }

    if snapshot.settings_open {
        settings(ui, snapshot, actions);
    }
}

fn settings(ui: &mut Ui, snapshot: &Snapshot, actions: &mut Vec<UserAction>) {
    let draft = snapshot.settings_draft;

    egui::Grid::new("settings_grid")
        .num_columns(3)
        .spacing([8.0, 6.0])
        .show(ui, |ui| {
            let mut threshold = draft.threshold;
            ui.label("Threshold");
            if ui
                .add(egui::Slider::new(&mut threshold, THRESHOLD_RANGE).show_value(false))
                .changed()
            {
                actions.push(UserAction::SetThreshold(threshold));
            }
            ui.monospace(snapshot.threshold_label.as_str());
            ui.end_row();

            let mut min_area = draft.min_area_percent;
            ui.label("Min area");
            if ui
                .add(egui::Slider::new(&mut min_area, MIN_AREA_RANGE).show_value(false))
                .changed()
            {
                actions.push(UserAction::SetMinAreaPercent(min_area));
            }
            ui.monospace(snapshot.min_area_label.as_str());
            ui.end_row();
        });

    ui.horizontal(|ui| {
        if ui.button("Save").clicked() {
            actions.push(UserAction::SaveSettings);
        }
        if snapshot.settings_dirty {
            ui.weak("unsaved");
        }
    });
}
