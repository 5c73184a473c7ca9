//! # Door Console Library
//!
//! Operator console for a door/camera monitoring device. The device service
//! streams camera frames and door-state events over Socket.IO; the console
//! renders them and relays calibration and detector-settings commands back.
//!
//! ## Crate Structure
//!
//! - **`session`**: All console state and its transitions. [`session::Session::handle`]
//!   is a pure function of (state, event, time) returning the effects to perform.
//!   Components: the connection mirror, the bounded journal, the door model,
//!   the video renderer, the settings panel, the calibration cooldown and
//!   device error routing.
//! - **`controller`**: The single task that owns the session, arms the
//!   calibration cooldown and publishes snapshots to the views.
//! - **`transport`**: Socket.IO websocket client with auto-reconnect.
//! - **`protocol`**: Engine.IO/Socket.IO codec and the typed event schema.
//! - **`connection`**: Server address normalization and reconnect policy.
//! - **`config`**: Layered configuration (defaults, TOML, environment).
//! - **`logging`**: `tracing-subscriber` setup.
//! - **`headless`**: Terminal front end.
//! - **`gui`**: eframe/egui window (feature `standalone`).
//! - **`error`**: The crate-wide [`error::ConsoleError`].

pub mod config;
pub mod connection;
pub mod controller;
pub mod error;
pub mod headless;
pub mod logging;
pub mod protocol;
pub mod session;
pub mod transport;

#[cfg(feature = "standalone")]
pub mod gui;
