//! Video area.
//!
//! One texture per image surface. While the surface id stays the same, new
//! frames overwrite the texture pixels; a new id (after a placeholder) drops
//! the old texture and allocates a fresh one.

use super::colors;
use crate::session::{Snapshot, SurfaceId, VideoSurface};
use eframe::egui::{self, RichText, Ui};

#[derive(Default)]
pub(super) struct VideoPanel {
    texture: Option<(SurfaceId, egui::TextureHandle)>,
    uploaded_frames: u64,
}

impl VideoPanel {
    pub(super) fn render(&mut self, ui: &mut Ui, snapshot: &Snapshot) {
        match &snapshot.video {
            VideoSurface::Placeholder(placeholder) => {
                self.texture = None;
                let color = if placeholder.is_error() {
                    colors::ERROR
                } else {
                    colors::MUTED
                };
                ui.centered_and_justified(|ui| {
                    ui.label(RichText::new(placeholder.text()).size(18.0).color(color));
                });
            }
            VideoSurface::Image { id, frame } => {
                let to_image =
                    || egui::ColorImage::from_rgba_unmultiplied(frame.size(), frame.rgba());
                match &mut self.texture {
                    Some((current, texture)) if *current == *id => {
                        if self.uploaded_frames != snapshot.frames_rendered {
                            texture.set(to_image(), egui::TextureOptions::LINEAR);
                        }
                    }
                    _ => {
                        let texture = ui.ctx().load_texture(
                            "video_frame",
                            to_image(),
                            egui::TextureOptions::LINEAR,
                        );
                        self.texture = Some((*id, texture));
                    }
                }
                self.uploaded_frames = snapshot.frames_rendered;

                if let Some((_, texture)) = &self.texture {
                    ui.centered_and_justified(|ui| {
                        ui.add(
                            egui::Image::new(egui::load::SizedTexture::from_handle(texture))
                                .shrink_to_fit(),
                        );
                    });
                }
            }
        }
    }
}
