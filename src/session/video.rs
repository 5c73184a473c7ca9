//! Video surface and frame decoding.
//!
//! The renderer owns exactly one surface. It is either a text placeholder or an
//! image surface, never both. Frames replace the pixels of a live image surface
//! in place (same [`SurfaceId`]); after a placeholder the next frame creates a
//! fresh image surface with a new id. Views key their texture on that id.

use base64::Engine as _;
use image::ImageFormat;
use std::sync::Arc;
use thiserror::Error;

/// Why a payload could not be turned into pixels.
#[derive(Debug, Error)]
pub enum FrameDecodeError {
    /// Payload is not valid base64.
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    /// Bytes are not a decodable JPEG.
    #[error("invalid image data: {0}")]
    Image(#[from] image::ImageError),
}

/// A decoded camera frame in RGBA8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    width: u32,
    height: u32,
    rgba: Arc<[u8]>,
}

impl DecodedFrame {
    /// Decode a base64-encoded JPEG as sent in `video_feed`.
    pub fn from_base64_jpeg(payload: &str) -> Result<Self, FrameDecodeError> {
        let bytes = base64::engine::general_purpose::STANDARD.decode(payload.trim())?;
        let image = image::load_from_memory_with_format(&bytes, ImageFormat::Jpeg)?.to_rgba8();
        let (width, height) = image.dimensions();
        Ok(Self {
            width,
            height,
            rgba: image.into_raw().into(),
        })
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `[width, height]` for texture uploads.
    #[must_use]
    pub fn size(&self) -> [usize; 2] {
        [self.width as usize, self.height as usize]
    }

    /// Unmultiplied RGBA8 pixels, row-major.
    #[must_use]
    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }
}

/// Identity of an image surface. Stable while frames are replaced in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(u64);

/// Text shown instead of video.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    /// No frame has arrived yet.
    Waiting,
    /// Link to the device service lost.
    Reconnecting,
    /// Device reported a camera-class error.
    CameraError,
}

impl Placeholder {
    /// Text for the placeholder.
    #[must_use]
    pub fn text(self) -> &'static str {
        match self {
            Self::Waiting => "Waiting for video...",
            Self::Reconnecting => "Connection lost. Trying to reconnect...",
            Self::CameraError => "Camera access error. Check the camera connection.",
        }
    }

    /// Whether the placeholder reports a fault.
    #[must_use]
    pub fn is_error(self) -> bool {
        matches!(self, Self::CameraError)
    }
}

/// What the video area currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoSurface {
    /// Text placeholder.
    Placeholder(Placeholder),
    /// Live image surface.
    Image {
        /// Surface identity.
        id: SurfaceId,
        /// Most recent frame.
        frame: DecodedFrame,
    },
}

impl VideoSurface {
    /// The displayed frame, if any.
    #[must_use]
    pub fn frame(&self) -> Option<&DecodedFrame> {
        match self {
            Self::Image { frame, .. } => Some(frame),
            Self::Placeholder(_) => None,
        }
    }
}

/// Owns the single video surface.
#[derive(Debug, Clone)]
pub struct VideoRenderer {
    surface: VideoSurface,
    next_surface: u64,
    frames_rendered: u64,
}

impl Default for VideoRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoRenderer {
    /// Renderer showing the waiting placeholder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            surface: VideoSurface::Placeholder(Placeholder::Waiting),
            next_surface: 0,
            frames_rendered: 0,
        }
    }

    /// Current surface.
    #[must_use]
    pub fn surface(&self) -> &VideoSurface {
        &self.surface
    }

    /// Frames successfully rendered since creation.
    #[must_use]
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Render a frame payload, replacing whatever frame was shown.
    ///
    /// A payload that fails to decode leaves the surface untouched and is not
    /// journaled. Returns whether the frame was displayed.
    pub fn on_frame(&mut self, payload: &str) -> bool {
        let decoded = match DecodedFrame::from_base64_jpeg(payload) {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::debug!(error = %e, "Dropping undecodable video frame");
                return false;
            }
        };

        if let VideoSurface::Image { frame, .. } = &mut self.surface {
            *frame = decoded;
        } else {
            let id = SurfaceId(self.next_surface);
            self.next_surface += 1;
            self.surface = VideoSurface::Image { id, frame: decoded };
        }
        self.frames_rendered += 1;
        true
    }

    /// Replace the surface with the camera error text.
    pub fn on_camera_error(&mut self) {
        self.surface = VideoSurface::Placeholder(Placeholder::CameraError);
    }

    /// Drop the displayed frame and show the reconnecting text.
    pub fn on_disconnect(&mut self) {
        self.surface = VideoSurface::Placeholder(Placeholder::Reconnecting);
    }
}
