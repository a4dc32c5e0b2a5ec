//! Pure selection geometry shared by the screen overlay and mobile editor.
//!
//! The UI presents images at logical sizes that rarely match the source
//! resolution: overlays show a HiDPI capture scaled to the display's logical
//! size, and the editor letterboxes an arbitrary photo into its window.
//! Everything here maps a rectangle drawn in *view* coordinates back to
//! *source* pixel coordinates:
//!
//! ```text
//! real = (displayed − axis_offset) × (source_dim / scaled_dim)
//! ```
//!
//! followed by a clamp to the source bounds so an overshooting drag can
//! never crop outside the image.

use egui::{pos2, Rect, Vec2};

// ---------------------------------------------------------------------------
// ViewMapping
// ---------------------------------------------------------------------------

/// Transform from view coordinates to source pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewMapping {
    /// Letterbox offset of the displayed image inside the view.
    pub offset: Vec2,
    /// Source pixels per displayed pixel, horizontally.
    pub scale_x: f32,
    /// Source pixels per displayed pixel, vertically.
    pub scale_y: f32,
}

impl ViewMapping {
    /// No offset, 1:1 scale — view coordinates are source coordinates.
    pub const IDENTITY: Self = Self {
        offset: Vec2::ZERO,
        scale_x: 1.0,
        scale_y: 1.0,
    };

    /// Mapping for an image stretched over the whole view (no letterbox),
    /// as used by the fullscreen overlay where the capture covers the
    /// entire viewport.
    pub fn stretched(src_w: u32, src_h: u32, view: Vec2) -> Self {
        Self {
            offset: Vec2::ZERO,
            scale_x: src_w as f32 / view.x,
            scale_y: src_h as f32 / view.y,
        }
    }
}

// ---------------------------------------------------------------------------
// Selection validity
// ---------------------------------------------------------------------------

/// A drag is a real selection only when both sides reach the minimum size;
/// anything smaller is treated as a misclick.
pub fn is_valid_selection(rect: &Rect, min_px: f32) -> bool {
    rect.width() >= min_px && rect.height() >= min_px
}

// ---------------------------------------------------------------------------
// Letterboxed fit
// ---------------------------------------------------------------------------

/// Aspect-preserving fit of a `src_w`×`src_h` image into `avail`, centered.
///
/// Returns the scaled display size together with the [`ViewMapping`] that
/// takes view coordinates back to source pixels.
pub fn fit_into(src_w: u32, src_h: u32, avail: Vec2) -> (Vec2, ViewMapping) {
    let scale = (avail.x / src_w as f32)
        .min(avail.y / src_h as f32)
        .max(f32::EPSILON);
    let scaled = Vec2::new(src_w as f32 * scale, src_h as f32 * scale);
    let offset = Vec2::new((avail.x - scaled.x) / 2.0, (avail.y - scaled.y) / 2.0);

    let mapping = ViewMapping {
        offset,
        scale_x: src_w as f32 / scaled.x,
        scale_y: src_h as f32 / scaled.y,
    };
    (scaled, mapping)
}

// ---------------------------------------------------------------------------
// View → source mapping
// ---------------------------------------------------------------------------

/// Map a view-space rectangle to source pixels `(x, y, w, h)`.
///
/// Both corners are mapped independently and intersected with the image
/// bounds, so selections that start or end outside the displayed image are
/// clipped rather than rejected.  Returns `None` when the clipped region has
/// zero area.
pub fn map_to_source(
    rect: Rect,
    mapping: &ViewMapping,
    src_w: u32,
    src_h: u32,
) -> Option<(u32, u32, u32, u32)> {
    let rect = Rect::from_two_pos(rect.min, rect.max); // normalize

    let x0 = ((rect.min.x - mapping.offset.x) * mapping.scale_x)
        .max(0.0)
        .min(src_w as f32);
    let y0 = ((rect.min.y - mapping.offset.y) * mapping.scale_y)
        .max(0.0)
        .min(src_h as f32);
    let x1 = ((rect.max.x - mapping.offset.x) * mapping.scale_x)
        .max(0.0)
        .min(src_w as f32);
    let y1 = ((rect.max.y - mapping.offset.y) * mapping.scale_y)
        .max(0.0)
        .min(src_h as f32);

    let (x, y) = (x0 as u32, y0 as u32);
    let (w, h) = ((x1 as u32).saturating_sub(x), (y1 as u32).saturating_sub(y));

    if w == 0 || h == 0 {
        return None;
    }
    Some((x, y, w, h))
}

/// Convenience: the view rectangle covering the whole displayed image.
pub fn displayed_rect(mapping: &ViewMapping, scaled: Vec2) -> Rect {
    Rect::from_min_size(pos2(mapping.offset.x, mapping.offset.y), scaled)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use egui::pos2;

    // ---- is_valid_selection ---

    #[test]
    fn selection_below_threshold_is_invalid() {
        let r = Rect::from_min_max(pos2(0.0, 0.0), pos2(4.0, 100.0));
        assert!(!is_valid_selection(&r, 5.0));

        let r = Rect::from_min_max(pos2(0.0, 0.0), pos2(100.0, 4.0));
        assert!(!is_valid_selection(&r, 5.0));
    }

    #[test]
    fn selection_at_threshold_is_valid() {
        let r = Rect::from_min_max(pos2(0.0, 0.0), pos2(5.0, 5.0));
        assert!(is_valid_selection(&r, 5.0));
    }

    // ---- map_to_source ---

    /// The identity mapping must return the input rectangle (clipped to the
    /// image bounds) unchanged.
    #[test]
    fn identity_mapping_is_idempotent() {
        let rect = Rect::from_min_max(pos2(10.0, 20.0), pos2(110.0, 70.0));
        let mapped = map_to_source(rect, &ViewMapping::IDENTITY, 640, 480).unwrap();
        assert_eq!(mapped, (10, 20, 100, 50));
    }

    #[test]
    fn identity_mapping_clips_to_bounds() {
        let rect = Rect::from_min_max(pos2(-50.0, 400.0), pos2(700.0, 600.0));
        let mapped = map_to_source(rect, &ViewMapping::IDENTITY, 640, 480).unwrap();
        assert_eq!(mapped, (0, 400, 640, 80));
    }

    #[test]
    fn zero_area_after_clipping_returns_none() {
        // Entirely left of the image.
        let rect = Rect::from_min_max(pos2(-100.0, 0.0), pos2(-10.0, 50.0));
        assert!(map_to_source(rect, &ViewMapping::IDENTITY, 640, 480).is_none());
    }

    #[test]
    fn inverted_corners_are_normalized() {
        let rect = Rect::from_two_pos(pos2(110.0, 70.0), pos2(10.0, 20.0));
        let mapped = map_to_source(rect, &ViewMapping::IDENTITY, 640, 480).unwrap();
        assert_eq!(mapped, (10, 20, 100, 50));
    }

    /// A 4000×3000 source displayed at exactly 800×600 (5× downscale, no
    /// letterbox): a (100,100)-(300,200) view selection is a
    /// (500,500) 1000×500 source region.
    #[test]
    fn five_x_downscale_maps_to_source_resolution() {
        let mapping = ViewMapping::stretched(4000, 3000, Vec2::new(800.0, 600.0));
        let rect = Rect::from_min_max(pos2(100.0, 100.0), pos2(300.0, 200.0));
        let mapped = map_to_source(rect, &mapping, 4000, 3000).unwrap();
        assert_eq!(mapped, (500, 500, 1000, 500));
    }

    // ---- fit_into ---

    #[test]
    fn fit_exact_aspect_has_no_letterbox() {
        let (scaled, mapping) = fit_into(4000, 3000, Vec2::new(800.0, 600.0));
        assert_eq!(scaled, Vec2::new(800.0, 600.0));
        assert_eq!(mapping.offset, Vec2::ZERO);
        assert!((mapping.scale_x - 5.0).abs() < 1e-4);
        assert!((mapping.scale_y - 5.0).abs() < 1e-4);
    }

    /// A portrait 3000×4000 image (a rotated phone photo) in an 800×600 view
    /// is displayed at 450×600 with a 175 px horizontal letterbox.
    #[test]
    fn fit_portrait_image_letterboxes_horizontally() {
        let (scaled, mapping) = fit_into(3000, 4000, Vec2::new(800.0, 600.0));
        assert!((scaled.x - 450.0).abs() < 0.01);
        assert!((scaled.y - 600.0).abs() < 0.01);
        assert!((mapping.offset.x - 175.0).abs() < 0.01);
        assert!(mapping.offset.y.abs() < 0.01);
    }

    /// Selection on the letterboxed portrait image: offsets are subtracted
    /// before scaling, and the overshoot into the letterbox is clipped.
    #[test]
    fn letterboxed_selection_maps_and_clips() {
        let (_, mapping) = fit_into(3000, 4000, Vec2::new(800.0, 600.0));

        // Starts inside the left letterbox band, ends on the image.
        let rect = Rect::from_min_max(pos2(100.0, 100.0), pos2(300.0, 250.0));
        let (x, y, w, h) = map_to_source(rect, &mapping, 3000, 4000).unwrap();

        assert_eq!(x, 0); // clipped at the image's left edge
        assert_eq!(y, 666);
        assert_eq!(w, 833);
        assert_eq!(h, 1000);
    }
}
