//! Typed message schema for the device service.
//!
//! Inbound events are decoded through a static table keyed by the Socket.IO
//! event name. Names that are not in the table are not an error; the caller
//! gets `Ok(None)` and skips the packet.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `type` value of an `error_message` that also degrades the video surface.
pub const CAMERA_ERROR: &str = "camera_error";

/// `video_feed` payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct VideoFeed {
    /// Base64 JPEG. Absent means "nothing to render".
    #[serde(default)]
    pub image: Option<String>,
}

/// `door_status` payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DoorStatusReport {
    /// Raw status value as sent by the detector (`open`, `closed`, `unknown`, ...).
    #[serde(default)]
    pub status: Option<String>,
}

/// `error_message` payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DeviceError {
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
    /// Error class, e.g. `camera_error`, `calibration_error`, `settings_error`.
    #[serde(rename = "type", default)]
    pub kind: String,
}

impl DeviceError {
    /// Whether this error should also replace the video surface.
    #[must_use]
    pub fn is_camera_error(&self) -> bool {
        self.kind == CAMERA_ERROR
    }
}

/// Detector parameters, both as reported by the device and as sent by `update_settings`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorSettings {
    /// Binarization threshold applied to the frame difference.
    pub threshold: i32,
    /// Minimum changed area, in percent of the frame, for the door to count as open.
    pub min_area_percent: i32,
}

/// `calibration_complete` / `settings_updated` payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Outcome {
    /// Whether the device accepted the request.
    #[serde(default)]
    pub success: bool,
}

/// Everything the device service can push to the console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// A new camera frame.
    VideoFeed(VideoFeed),
    /// Door state as classified by the detector.
    DoorStatus(DoorStatusReport),
    /// Device-side failure report.
    ErrorMessage(DeviceError),
    /// Current detector settings, sent by the device right after connect.
    Settings(DetectorSettings),
    /// The device finished collecting calibration frames.
    CalibrationComplete(Outcome),
    /// The device applied (or refused) an `update_settings`.
    SettingsUpdated(Outcome),
}

impl InboundEvent {
    /// Socket.IO event name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::VideoFeed(_) => "video_feed",
            Self::DoorStatus(_) => "door_status",
            Self::ErrorMessage(_) => "error_message",
            Self::Settings(_) => "settings",
            Self::CalibrationComplete(_) => "calibration_complete",
            Self::SettingsUpdated(_) => "settings_updated",
        }
    }
}

/// Commands the console sends to the device service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboundCommand {
    /// Capture a new reference frame (parameterless).
    Calibrate,
    /// Replace the detector parameters atomically.
    UpdateSettings(DetectorSettings),
}

impl OutboundCommand {
    /// Socket.IO event name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Calibrate => "calibrate",
            Self::UpdateSettings(_) => "update_settings",
        }
    }

    /// JSON argument, if the command carries one.
    pub fn payload(&self) -> Result<Option<Value>, serde_json::Error> {
        match self {
            Self::Calibrate => Ok(None),
            Self::UpdateSettings(settings) => serde_json::to_value(settings).map(Some),
        }
    }
}

type Decoder = fn(Value) -> Result<InboundEvent, serde_json::Error>;

fn decode_video_feed(payload: Value) -> Result<InboundEvent, serde_json::Error> {
    serde_json::from_value(payload).map(InboundEvent::VideoFeed)
}

fn decode_door_status(payload: Value) -> Result<InboundEvent, serde_json::Error> {
    serde_json::from_value(payload).map(InboundEvent::DoorStatus)
}

fn decode_error_message(payload: Value) -> Result<InboundEvent, serde_json::Error> {
    serde_json::from_value(payload).map(InboundEvent::ErrorMessage)
}

fn decode_settings(payload: Value) -> Result<InboundEvent, serde_json::Error> {
    serde_json::from_value(payload).map(InboundEvent::Settings)
}

fn decode_calibration_complete(payload: Value) -> Result<InboundEvent, serde_json::Error> {
    serde_json::from_value(payload).map(InboundEvent::CalibrationComplete)
}

fn decode_settings_updated(payload: Value) -> Result<InboundEvent, serde_json::Error> {
    serde_json::from_value(payload).map(InboundEvent::SettingsUpdated)
}

static DECODERS: [(&str, Decoder); 6] = [
    ("video_feed", decode_video_feed),
    ("door_status", decode_door_status),
    ("error_message", decode_error_message),
    ("settings", decode_settings),
    ("calibration_complete", decode_calibration_complete),
    ("settings_updated", decode_settings_updated),
];

/// Decode an event by name.
///
/// Returns `Ok(None)` for event names this console does not handle. A missing
/// argument is treated as an empty object so that all-optional payloads still
/// decode.
pub fn decode_event(name: &str, payload: Option<Value>) -> Result<Option<InboundEvent>, serde_json::Error> {
    let Some((_, decoder)) = DECODERS.iter().find(|(event, _)| *event == name) else {
        return Ok(None);
    };

    let payload = match payload {
        None | Some(Value::Null) => Value::Object(Map::new()),
        Some(value) => value,
    };

    decoder(payload).map(Some)
}
