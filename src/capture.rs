//! Screen capture — frame acquisition from the primary display.

use chrono::{DateTime, Utc};
use image::RgbaImage;
use screenshots::Screen;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no displays found")]
    NoDisplay,
    #[error("screen capture failed: {0}")]
    Backend(String),
}

/// A single screen capture held in memory as RGBA pixels.
#[derive(Debug, Clone)]
pub struct Frame {
    pixels: RgbaImage,
    captured_at: DateTime<Utc>,
}

impl Frame {
    pub fn new(pixels: RgbaImage) -> Self {
        Self {
            pixels,
            captured_at: Utc::now(),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Encode as PNG for transport.
    pub fn to_png(&self) -> Result<Vec<u8>, image::ImageError> {
        let mut buf = std::io::Cursor::new(Vec::new());
        self.pixels.write_to(&mut buf, image::ImageFormat::Png)?;
        Ok(buf.into_inner())
    }
}

/// Produces one frame per call. Errors propagate to the caller for
/// cycle-level handling; no retries happen at this layer.
pub trait FrameSource {
    fn capture(&mut self) -> Result<Frame, CaptureError>;
}

/// Captures the primary display, falling back to the first one found.
pub struct ScreenFrameSource;

impl FrameSource for ScreenFrameSource {
    fn capture(&mut self) -> Result<Frame, CaptureError> {
        let screens = Screen::all().map_err(|e| CaptureError::Backend(e.to_string()))?;

        let screen = screens
            .iter()
            .find(|s| s.display_info.is_primary)
            .or_else(|| screens.first())
            .ok_or(CaptureError::NoDisplay)?;

        let shot = screen
            .capture()
            .map_err(|e| CaptureError::Backend(e.to_string()))?;

        // The capture backend pins its own `image` version, so rebuild the
        // buffer against ours instead of passing the type through.
        let (width, height) = (shot.width(), shot.height());
        let pixels = RgbaImage::from_raw(width, height, shot.into_raw())
            .ok_or_else(|| CaptureError::Backend("truncated pixel buffer".to_string()))?;

        Ok(Frame::new(pixels))
    }
}
