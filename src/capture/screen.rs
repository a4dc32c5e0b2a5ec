//! Display enumeration and frame grabbing via the `screenshots` crate.
//!
//! Captures happen up front, before any overlay window appears, so the
//! overlays show a frozen frame and never capture themselves.

use image::{DynamicImage, ImageBuffer};
use screenshots::Screen;

use super::CaptureError;

// ---------------------------------------------------------------------------
// DisplayShot
// ---------------------------------------------------------------------------

/// One display's frozen frame plus the geometry needed to place an overlay
/// window over it.
pub struct DisplayShot {
    /// Display origin in the global logical coordinate space.
    pub origin: (i32, i32),
    /// Logical size of the display (what window geometry uses).
    pub logical_size: (u32, u32),
    /// HiDPI scale factor; `image` is `logical_size * scale_factor` pixels.
    pub scale_factor: f32,
    /// Captured pixels at the display's physical resolution.
    pub image: DynamicImage,
}

// ---------------------------------------------------------------------------
// ScreenCapturer
// ---------------------------------------------------------------------------

/// Enumerates displays and grabs a frame from each.
pub struct ScreenCapturer {
    screens: Vec<Screen>,
}

impl ScreenCapturer {
    /// Enumerate all connected displays.
    pub fn new() -> Result<Self, CaptureError> {
        let screens = Screen::all().map_err(|e| CaptureError::Enumerate(e.to_string()))?;
        if screens.is_empty() {
            return Err(CaptureError::NoDisplays);
        }
        log::debug!("capture: {} display(s) detected", screens.len());
        Ok(Self { screens })
    }

    pub fn display_count(&self) -> usize {
        self.screens.len()
    }

    /// Capture every display.  Results are in enumeration order; overlays are
    /// created in the same order so pane indices line up with displays.
    pub fn capture_all(&self) -> Result<Vec<DisplayShot>, CaptureError> {
        self.screens
            .iter()
            .map(|screen| {
                let info = screen.display_info;
                let raw = screen
                    .capture()
                    .map_err(|e| CaptureError::Capture(e.to_string()))?;

                let (w, h) = (raw.width(), raw.height());
                let buffer = ImageBuffer::from_raw(w, h, raw.into_raw())
                    .ok_or(CaptureError::Buffer)?;

                log::debug!(
                    "capture: display at ({}, {}) grabbed {}x{} px (scale {})",
                    info.x,
                    info.y,
                    w,
                    h,
                    info.scale_factor
                );

                Ok(DisplayShot {
                    origin: (info.x, info.y),
                    logical_size: (info.width, info.height),
                    scale_factor: info.scale_factor,
                    image: DynamicImage::ImageRgba8(buffer),
                })
            })
            .collect()
    }
}
