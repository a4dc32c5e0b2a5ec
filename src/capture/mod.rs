//! Screen capture: display enumeration, fullscreen selection overlays and
//! the shared crop/encode helpers.
//!
//! ```text
//! hotkey ──▶ OverlaySession::start()
//!               │  freeze every display (ScreenCapturer)
//!               ▼
//!            OverlayPane × N   (one immediate viewport per display)
//!               │  drag → validate → map to source px → crop → PNG
//!               ▼
//!            CaptureOutcome::{Captured(png), Cancelled}
//! ```
//!
//! The geometry helpers in [`region`] are pure and shared with the mobile
//! image editor.

pub mod overlay;
pub mod region;
pub mod screen;

use std::io::Cursor;

use image::DynamicImage;
use thiserror::Error;

pub use overlay::OverlaySession;
pub use screen::{DisplayShot, ScreenCapturer};

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Errors from the capture subsystem.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to enumerate displays: {0}")]
    Enumerate(String),

    #[error("no displays detected")]
    NoDisplays,

    #[error("failed to capture display: {0}")]
    Capture(String),

    #[error("captured pixel buffer has unexpected dimensions")]
    Buffer,

    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("failed to encode PNG: {0}")]
    Encode(String),
}

// ---------------------------------------------------------------------------
// CaptureOutcome
// ---------------------------------------------------------------------------

/// Terminal result of a capture interaction, regardless of source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// The user confirmed a region; payload is the cropped PNG.
    Captured(Vec<u8>),
    /// The user dismissed the capture (escape, right-click or misclick).
    Cancelled,
}

// ---------------------------------------------------------------------------
// PNG encoding
// ---------------------------------------------------------------------------

/// Encode an image as PNG bytes, the interchange format between capture
/// sources and the recognition worker.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, CaptureError> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, image::ImageFormat::Png)
        .map_err(|e| CaptureError::Encode(e.to_string()))?;
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, RgbaImage};

    #[test]
    fn encode_png_round_trips() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_fn(8, 4, |x, y| {
            image::Rgba([x as u8 * 30, y as u8 * 60, 0, 255])
        }));

        let bytes = encode_png(&img).expect("encode");
        assert_eq!(&bytes[1..4], b"PNG");

        let decoded = image::load_from_memory(&bytes).expect("decode");
        assert_eq!(decoded.width(), 8);
        assert_eq!(decoded.height(), 4);
    }
}
