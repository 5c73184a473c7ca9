//! Routing of device-reported errors.

use super::journal::Journal;
use super::video::VideoRenderer;
use crate::protocol::DeviceError;

/// Journal every device error; camera-class errors also replace the video surface.
pub fn dispatch_error(error: &DeviceError, journal: &mut Journal, video: &mut VideoRenderer) {
    journal.error(error.message.as_str());
    if error.is_camera_error() {
        video.on_camera_error();
    }
}
