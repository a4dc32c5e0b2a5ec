//! Crop/rotate edit state for phone uploads.
//!
//! [`EditBuffer`] keeps the decoded original untouched and derives the
//! displayed image from it: rotation is re-applied to the original on each
//! step so repeated 90° turns never accumulate resampling loss.  Rotating
//! clears any pending selection because the old rectangle is meaningless in
//! the new orientation.
//!
//! Confirming without a usable selection submits the whole (rotated) image,
//! matching how people actually photograph a single equation.

use egui::Rect;
use image::{DynamicImage, GenericImageView};

use crate::capture::{encode_png, region, CaptureError};

// ---------------------------------------------------------------------------
// Rotation
// ---------------------------------------------------------------------------

/// Quarter-turn rotation applied to the original upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn next(self) -> Self {
        match self {
            Self::Deg0 => Self::Deg90,
            Self::Deg90 => Self::Deg180,
            Self::Deg180 => Self::Deg270,
            Self::Deg270 => Self::Deg0,
        }
    }

    fn apply(self, image: &DynamicImage) -> DynamicImage {
        match self {
            Self::Deg0 => image.clone(),
            Self::Deg90 => image.rotate90(),
            Self::Deg180 => image.rotate180(),
            Self::Deg270 => image.rotate270(),
        }
    }
}

// ---------------------------------------------------------------------------
// EditBuffer
// ---------------------------------------------------------------------------

/// Editing state for one uploaded photo.
#[derive(Debug)]
pub struct EditBuffer {
    original: DynamicImage,
    rotation: Rotation,
    /// Current selection in *view* coordinates, if the user has drawn one.
    selection: Option<Rect>,
    /// Drags below this size count as no selection at all.
    min_selection_px: f32,
}

impl EditBuffer {
    /// Decode an uploaded image.  Phones send JPEG or PNG; anything the
    /// `image` crate cannot parse is rejected.
    pub fn from_bytes(bytes: &[u8], min_selection_px: f32) -> Result<Self, CaptureError> {
        let original =
            image::load_from_memory(bytes).map_err(|e| CaptureError::Decode(e.to_string()))?;
        log::info!(
            "editor: decoded upload {}x{}",
            original.width(),
            original.height()
        );
        Ok(Self {
            original,
            rotation: Rotation::default(),
            selection: None,
            min_selection_px,
        })
    }

    /// The image as currently displayed (original with rotation applied).
    pub fn rotated(&self) -> DynamicImage {
        self.rotation.apply(&self.original)
    }

    /// Dimensions of the displayed image.
    pub fn dimensions(&self) -> (u32, u32) {
        match self.rotation {
            Rotation::Deg0 | Rotation::Deg180 => (self.original.width(), self.original.height()),
            Rotation::Deg90 | Rotation::Deg270 => (self.original.height(), self.original.width()),
        }
    }

    /// Rotate 90° clockwise.  Invalidates the selection.
    pub fn rotate_cw(&mut self) {
        self.rotation = self.rotation.next();
        self.selection = None;
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn set_selection(&mut self, rect: Rect) {
        self.selection = Some(rect);
    }

    pub fn reset_selection(&mut self) {
        self.selection = None;
    }

    pub fn selection(&self) -> Option<Rect> {
        self.selection
    }

    /// Produce the final PNG for recognition.
    ///
    /// `mapping` translates the view-space selection into pixels of the
    /// rotated image.  With no selection, or one too small to be meaningful,
    /// the whole rotated image is submitted.
    pub fn finalize(&self, mapping: &region::ViewMapping) -> Result<Vec<u8>, CaptureError> {
        let rotated = self.rotated();

        let crop = self
            .selection
            .filter(|sel| region::is_valid_selection(sel, self.min_selection_px))
            .and_then(|sel| {
                region::map_to_source(sel, mapping, rotated.width(), rotated.height())
            });

        match crop {
            Some((x, y, w, h)) => {
                log::info!("editor: submitting {w}x{h} crop at ({x}, {y})");
                encode_png(&rotated.crop_imm(x, y, w, h))
            }
            None => {
                log::info!(
                    "editor: submitting whole image {}x{}",
                    rotated.width(),
                    rotated.height()
                );
                encode_png(&rotated)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::region::ViewMapping;
    use egui::pos2;
    use image::{Rgba, RgbaImage};

    fn upload(w: u32, h: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_fn(w, h, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
        }));
        crate::capture::encode_png(&img).unwrap()
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = EditBuffer::from_bytes(b"not an image", 5.0).unwrap_err();
        assert!(matches!(err, CaptureError::Decode(_)));
    }

    #[test]
    fn rotation_swaps_dimensions() {
        let mut buf = EditBuffer::from_bytes(&upload(120, 80), 5.0).unwrap();
        assert_eq!(buf.dimensions(), (120, 80));

        buf.rotate_cw();
        assert_eq!(buf.dimensions(), (80, 120));
        assert_eq!(buf.rotation(), Rotation::Deg90);
    }

    #[test]
    fn four_rotations_restore_the_original() {
        let mut buf = EditBuffer::from_bytes(&upload(120, 80), 5.0).unwrap();
        let before = buf.rotated().to_rgba8();

        for _ in 0..4 {
            buf.rotate_cw();
        }

        assert_eq!(buf.rotation(), Rotation::Deg0);
        assert_eq!(buf.rotated().to_rgba8(), before);
    }

    #[test]
    fn rotating_clears_the_selection() {
        let mut buf = EditBuffer::from_bytes(&upload(120, 80), 5.0).unwrap();
        buf.set_selection(Rect::from_min_max(pos2(10.0, 10.0), pos2(50.0, 40.0)));
        assert!(buf.selection().is_some());

        buf.rotate_cw();
        assert!(buf.selection().is_none());
    }

    /// No selection submits the whole rotated image.
    #[test]
    fn finalize_without_selection_submits_rotated_whole() {
        let mut buf = EditBuffer::from_bytes(&upload(120, 80), 5.0).unwrap();
        buf.rotate_cw();

        let png = buf.finalize(&ViewMapping::IDENTITY).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (80, 120));
    }

    /// A tiny selection is treated like no selection.
    #[test]
    fn finalize_with_tiny_selection_submits_whole() {
        let mut buf = EditBuffer::from_bytes(&upload(120, 80), 10.0).unwrap();
        buf.set_selection(Rect::from_min_max(pos2(10.0, 10.0), pos2(14.0, 14.0)));

        let png = buf.finalize(&ViewMapping::IDENTITY).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (120, 80));
    }

    /// Rotate then crop: the selection is drawn on the scaled-down rotated
    /// view, and the crop comes back at the rotated image's full resolution.
    #[test]
    fn finalize_maps_selection_on_the_rotated_image() {
        let mut buf = EditBuffer::from_bytes(&upload(800, 600), 5.0).unwrap();
        buf.rotate_cw(); // now 600x800

        // Rotated image displayed at half size, no letterbox.
        let (scaled, mapping) = crate::capture::region::fit_into(
            600,
            800,
            egui::Vec2::new(300.0, 400.0),
        );
        assert_eq!(scaled, egui::Vec2::new(300.0, 400.0));

        buf.set_selection(Rect::from_min_max(pos2(50.0, 50.0), pos2(150.0, 100.0)));
        let png = buf.finalize(&mapping).unwrap();

        let decoded = image::load_from_memory(&png).unwrap();
        // 100x50 view selection at scale 2 → 200x100 source pixels.
        assert_eq!((decoded.width(), decoded.height()), (200, 100));
    }

    /// A letterboxed selection crops the mapped source region.
    #[test]
    fn finalize_crops_through_the_view_mapping() {
        let mut buf = EditBuffer::from_bytes(&upload(200, 100), 5.0).unwrap();

        // Displayed at half size with a (20, 10) letterbox offset.
        let mapping = ViewMapping {
            offset: egui::Vec2::new(20.0, 10.0),
            scale_x: 2.0,
            scale_y: 2.0,
        };
        buf.set_selection(Rect::from_min_max(pos2(30.0, 20.0), pos2(70.0, 40.0)));

        let png = buf.finalize(&mapping).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        // (30-20)*2=20 .. (70-20)*2=100 → 80 wide; (20-10)*2=20 .. 60 → 40 tall
        assert_eq!((decoded.width(), decoded.height()), (80, 40));
    }
}
