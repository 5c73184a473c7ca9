//! Desktop window (eframe/egui).
//!
//! The window never touches session state directly. Every frame it renders
//! the latest [`Snapshot`] and turns widget interaction into
//! [`UserAction`](crate::session::UserAction)s for the controller. A small
//! task on the tokio runtime requests a repaint whenever a new snapshot is
//! published.
//!
//! Layout:
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ status bar: connection · door dot + label    │
//! ├─────────────────────────────┬────────────────┤
//! │                             │ calibrate      │
//! │          video              │ settings ▸     │
//! │                             │                │
//! ├─────────────────────────────┴────────────────┤
//! │ log                                          │
//! └──────────────────────────────────────────────┘
//! ```

mod controls;
mod log_panel;
mod status_bar;
mod video_panel;

use crate::config::WindowConfig;
use crate::controller::ControllerHandle;
use crate::session::{Snapshot, UserAction};
use eframe::egui;

/// Colours shared by the panels.
pub(crate) mod colors {
    use eframe::egui::Color32;

    pub const OPEN: Color32 = Color32::from_rgb(239, 68, 68);
    pub const CLOSED: Color32 = Color32::from_rgb(34, 197, 94);
    pub const NEUTRAL: Color32 = Color32::from_rgb(156, 163, 175);
    pub const CONNECTED: Color32 = CLOSED;
    pub const DISCONNECTED: Color32 = OPEN;
    pub const ERROR: Color32 = OPEN;
    pub const MUTED: Color32 = Color32::from_gray(150);
}

/// eframe application.
pub struct ConsoleApp {
    handle: ControllerHandle,
    video: video_panel::VideoPanel,
    log: log_panel::LogPanel,
}

impl ConsoleApp {
    /// Create the app and start the repaint notifier on `runtime`.
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        handle: ControllerHandle,
        runtime: &tokio::runtime::Handle,
    ) -> Self {
        let ctx = cc.egui_ctx.clone();
        let mut snapshots = handle.subscribe();
        runtime.spawn(async move {
            while snapshots.changed().await.is_ok() {
                ctx.request_repaint();
            }
        });

        Self {
            handle,
            video: video_panel::VideoPanel::default(),
            log: log_panel::LogPanel::default(),
        }
    }

    fn dispatch(&self, actions: Vec<UserAction>) {
        for action in actions {
            if let Err(e) = self.handle.send(action) {
                tracing::warn!(?action, error = %e, "Controller unavailable");
            }
        }
    }
}

impl eframe::App for ConsoleApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let snapshot: Snapshot = self.handle.snapshot();
        let mut actions = Vec::new();

        egui::TopBottomPanel::top("status_bar").show(ctx, |ui| {
            status_bar::render(ui, &snapshot);
        });

        egui::TopBottomPanel::bottom("log_panel")
            .resizable(true)
            .default_height(180.0)
            .show(ctx, |ui| {
                self.log.render(ui, &snapshot);
            });

        egui::SidePanel::right("controls")
            .resizable(false)
            .default_width(260.0)
            .show(ctx, |ui| {
                controls::render(ui, &snapshot, &mut actions);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.video.render(ui, &snapshot);
        });

        self.dispatch(actions);
    }
}

/// Open the window and block until it is closed.
pub fn run(
    handle: ControllerHandle,
    runtime: tokio::runtime::Handle,
    window: WindowConfig,
) -> eframe::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([window.width, window.height])
            .with_min_inner_size([640.0, 480.0])
            .with_title("Door Console"),
        ..Default::default()
    };

    eframe::run_native(
        "Door Console",
        options,
        Box::new(move |cc| Ok(Box::new(ConsoleApp::new(cc, handle, &runtime)))),
    )
}
