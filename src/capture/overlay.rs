//! Fullscreen selection overlays, one immediate viewport per display.
//!
//! The session freezes every display first, then shows a borderless
//! always-on-top viewport over each, painting the frozen frame so the user
//! drags on a still image.  The first pane to produce an outcome resolves
//! the whole session; the caller drops the session and every viewport
//! disappears the same frame.
//!
//! Cancellation: escape or right-click on any pane, or releasing a drag
//! smaller than the minimum selection size.

use egui::{Color32, ColorImage, CursorIcon, Pos2, Rect, Sense, Stroke, StrokeKind, Vec2};
use image::GenericImageView;

use super::{encode_png, region, CaptureError, CaptureOutcome, DisplayShot, ScreenCapturer};

const MASK: Color32 = Color32::from_black_alpha(100);
const SELECTION_BORDER: Color32 = Color32::from_rgb(0, 120, 215);

// ---------------------------------------------------------------------------
// OverlayPane
// ---------------------------------------------------------------------------

/// One display's overlay: frozen frame, texture and in-progress drag.
struct OverlayPane {
    index: usize,
    shot: DisplayShot,
    /// Pending upload; converted to a texture on the pane's first frame.
    pending_image: Option<ColorImage>,
    texture: Option<egui::TextureHandle>,
    drag_start: Option<Pos2>,
    drag_current: Option<Pos2>,
}

impl OverlayPane {
    fn new(index: usize, shot: DisplayShot) -> Self {
        let rgba = shot.image.to_rgba8();
        let size = [rgba.width() as usize, rgba.height() as usize];
        let pending_image = Some(ColorImage::from_rgba_unmultiplied(size, rgba.as_raw()));

        Self {
            index,
            shot,
            pending_image,
            texture: None,
            drag_start: None,
            drag_current: None,
        }
    }

    /// Render one frame of this pane.  Returns `Some` once the user resolved
    /// the capture on this display.
    fn ui(&mut self, ctx: &egui::Context, min_selection_px: f32) -> Option<CaptureOutcome> {
        let mut outcome = None;

        egui::CentralPanel::default()
            .frame(egui::Frame::new())
            .show(ctx, |ui| {
                if self.texture.is_none() {
                    if let Some(img) = self.pending_image.take() {
                        self.texture = Some(ctx.load_texture(
                            format!("overlay-{}", self.index),
                            img,
                            egui::TextureOptions::LINEAR,
                        ));
                    }
                }

                let screen = ui.max_rect();
                if let Some(texture) = &self.texture {
                    ui.painter().image(
                        texture.id(),
                        screen,
                        Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
                        Color32::WHITE,
                    );
                }

                ctx.output_mut(|o| o.cursor_icon = CursorIcon::Crosshair);

                let response =
                    ui.interact(screen, ui.id().with("select"), Sense::click_and_drag());

                if response.drag_started() {
                    self.drag_start = response.interact_pointer_pos();
                    self.drag_current = self.drag_start;
                } else if response.dragged() {
                    if let Some(pos) = response.interact_pointer_pos() {
                        self.drag_current = Some(pos);
                    }
                } else if response.drag_stopped() {
                    outcome = self.finish_drag(screen.size(), min_selection_px);
                }

                if response.secondary_clicked()
                    || ctx.input(|i| i.key_pressed(egui::Key::Escape))
                {
                    log::debug!("overlay: pane {} dismissed", self.index);
                    outcome = Some(CaptureOutcome::Cancelled);
                }

                self.paint_mask(ui.painter(), screen);
            });

        outcome
    }

    /// Validate the released drag and crop it from the frozen frame.
    fn finish_drag(&mut self, view: Vec2, min_selection_px: f32) -> Option<CaptureOutcome> {
        let (start, end) = (self.drag_start.take()?, self.drag_current.take()?);
        let selection = Rect::from_two_pos(start, end);

        if !region::is_valid_selection(&selection, min_selection_px) {
            log::debug!(
                "overlay: selection {:.0}x{:.0} below {min_selection_px} px, treating as misclick",
                selection.width(),
                selection.height()
            );
            return Some(CaptureOutcome::Cancelled);
        }

        match self.crop(selection, view) {
            Ok(png) => Some(CaptureOutcome::Captured(png)),
            Err(e) => {
                log::error!("overlay: crop failed: {e}");
                Some(CaptureOutcome::Cancelled)
            }
        }
    }

    /// Map a view-space selection to the capture's physical pixels and
    /// encode the cropped region.
    fn crop(&self, selection: Rect, view: Vec2) -> Result<Vec<u8>, CaptureError> {
        let (src_w, src_h) = self.shot.image.dimensions();
        let mapping = region::ViewMapping::stretched(src_w, src_h, view);

        let (x, y, w, h) = region::map_to_source(selection, &mapping, src_w, src_h)
            .ok_or(CaptureError::Buffer)?;

        log::info!("overlay: cropping {w}x{h} at ({x}, {y}) on pane {}", self.index);
        encode_png(&self.shot.image.crop_imm(x, y, w, h))
    }

    /// Darken everything outside the current selection and outline it.
    fn paint_mask(&self, painter: &egui::Painter, screen: Rect) {
        let selection = match (self.drag_start, self.drag_current) {
            (Some(a), Some(b)) => Rect::from_two_pos(a, b),
            _ => {
                painter.rect_filled(screen, 0.0, MASK);
                return;
            }
        };

        let bands = [
            Rect::from_min_max(screen.min, Pos2::new(screen.max.x, selection.min.y)),
            Rect::from_min_max(Pos2::new(screen.min.x, selection.max.y), screen.max),
            Rect::from_min_max(
                Pos2::new(screen.min.x, selection.min.y),
                Pos2::new(selection.min.x, selection.max.y),
            ),
            Rect::from_min_max(
                Pos2::new(selection.max.x, selection.min.y),
                Pos2::new(screen.max.x, selection.max.y),
            ),
        ];
        for band in bands {
            if band.is_positive() {
                painter.rect_filled(band, 0.0, MASK);
            }
        }
        painter.rect_stroke(
            selection,
            0.0,
            Stroke::new(2.0, SELECTION_BORDER),
            StrokeKind::Outside,
        );
    }
}

// ---------------------------------------------------------------------------
// OverlaySession
// ---------------------------------------------------------------------------

/// A live multi-display capture: owns every pane and resolves on the first
/// outcome from any of them.
pub struct OverlaySession {
    panes: Vec<OverlayPane>,
    min_selection_px: f32,
}

impl OverlaySession {
    /// Freeze every display and build the panes.  The viewports themselves
    /// appear on the first [`show`](Self::show) call.
    pub fn start(min_selection_px: f32) -> Result<Self, CaptureError> {
        let shots = ScreenCapturer::new()?.capture_all()?;
        Ok(Self::from_shots(shots, min_selection_px))
    }

    pub(crate) fn from_shots(shots: Vec<DisplayShot>, min_selection_px: f32) -> Self {
        let panes = shots
            .into_iter()
            .enumerate()
            .map(|(i, shot)| OverlayPane::new(i, shot))
            .collect();
        Self {
            panes,
            min_selection_px,
        }
    }

    pub fn pane_count(&self) -> usize {
        self.panes.len()
    }

    /// Show one immediate viewport per display.  Returns `Some` the frame the
    /// user resolves the capture on any pane; the caller then drops the
    /// session, which removes every viewport together.
    pub fn show(&mut self, ctx: &egui::Context) -> Option<CaptureOutcome> {
        let min_selection_px = self.min_selection_px;
        let mut resolved = None;

        for pane in &mut self.panes {
            let viewport_id = egui::ViewportId::from_hash_of(("snip-overlay", pane.index));
            let (x, y) = pane.shot.origin;
            let (w, h) = pane.shot.logical_size;

            let builder = egui::ViewportBuilder::default()
                .with_title("texsnip capture")
                .with_position(Pos2::new(x as f32, y as f32))
                .with_inner_size(Vec2::new(w as f32, h as f32))
                .with_decorations(false)
                .with_resizable(false)
                .with_always_on_top()
                .with_taskbar(false);

            let outcome = ctx.show_viewport_immediate(viewport_id, builder, |ctx, _class| {
                pane.ui(ctx, min_selection_px)
            });

            // First pane to resolve wins; later panes' frames are ignored.
            if resolved.is_none() {
                resolved = outcome;
            }
        }

        resolved
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use egui::pos2;
    use image::{DynamicImage, Rgba, RgbaImage};

    fn synthetic_shot(w: u32, h: u32) -> DisplayShot {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_fn(w, h, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 0, 255])
        }));
        DisplayShot {
            origin: (0, 0),
            logical_size: (w, h),
            scale_factor: 1.0,
            image,
        }
    }

    #[test]
    fn session_builds_one_pane_per_display() {
        let session = OverlaySession::from_shots(
            vec![synthetic_shot(200, 100), synthetic_shot(320, 240)],
            5.0,
        );
        assert_eq!(session.pane_count(), 2);
    }

    /// A drag at 1:1 scale crops exactly the selected pixels.
    #[test]
    fn crop_at_native_scale() {
        let pane = OverlayPane::new(0, synthetic_shot(200, 100));
        let selection = Rect::from_min_max(pos2(10.0, 20.0), pos2(60.0, 45.0));

        let png = pane.crop(selection, Vec2::new(200.0, 100.0)).expect("crop");
        let decoded = image::load_from_memory(&png).expect("decode");
        assert_eq!((decoded.width(), decoded.height()), (50, 25));
    }

    /// On a HiDPI display the capture holds 2x the logical pixels; a logical
    /// selection must crop the doubled physical region.
    #[test]
    fn crop_scales_to_physical_pixels() {
        let pane = OverlayPane::new(0, synthetic_shot(400, 200));
        let selection = Rect::from_min_max(pos2(10.0, 20.0), pos2(60.0, 45.0));

        // Viewport is 200x100 logical, capture is 400x200 physical.
        let png = pane.crop(selection, Vec2::new(200.0, 100.0)).expect("crop");
        let decoded = image::load_from_memory(&png).expect("decode");
        assert_eq!((decoded.width(), decoded.height()), (100, 50));
    }

    /// Releasing a sub-threshold drag cancels instead of capturing.
    #[test]
    fn tiny_drag_is_a_misclick() {
        let mut pane = OverlayPane::new(0, synthetic_shot(200, 100));
        pane.drag_start = Some(pos2(50.0, 50.0));
        pane.drag_current = Some(pos2(53.0, 52.0));

        let outcome = pane.finish_drag(Vec2::new(200.0, 100.0), 5.0);
        assert_eq!(outcome, Some(CaptureOutcome::Cancelled));
    }

    /// A valid drag produces a decodable PNG of the selected region.
    #[test]
    fn valid_drag_captures_png() {
        let mut pane = OverlayPane::new(0, synthetic_shot(200, 100));
        pane.drag_start = Some(pos2(0.0, 0.0));
        pane.drag_current = Some(pos2(200.0, 100.0));

        match pane.finish_drag(Vec2::new(200.0, 100.0), 5.0) {
            Some(CaptureOutcome::Captured(png)) => {
                let decoded = image::load_from_memory(&png).expect("decode");
                assert_eq!((decoded.width(), decoded.height()), (200, 100));
            }
            other => panic!("expected a capture, got {other:?}"),
        }
    }

    /// Two displays, drag on the second: that pane alone produces the
    /// capture, sized to the selection.
    #[test]
    fn drag_on_second_display_captures_from_that_pane() {
        let mut session = OverlaySession::from_shots(
            vec![synthetic_shot(1920, 1080), synthetic_shot(1280, 720)],
            5.0,
        );

        let pane = &mut session.panes[1];
        pane.drag_start = Some(pos2(100.0, 100.0));
        pane.drag_current = Some(pos2(300.0, 250.0));

        match pane.finish_drag(Vec2::new(1280.0, 720.0), 5.0) {
            Some(CaptureOutcome::Captured(png)) => {
                let decoded = image::load_from_memory(&png).expect("decode");
                assert_eq!((decoded.width(), decoded.height()), (200, 150));
            }
            other => panic!("expected a capture, got {other:?}"),
        }
    }

    /// Releasing a drag with no recorded start is a no-op, not a crash.
    #[test]
    fn drag_stop_without_start_is_ignored() {
        let mut pane = OverlayPane::new(0, synthetic_shot(200, 100));
        assert_eq!(pane.finish_drag(Vec2::new(200.0, 100.0), 5.0), None);
    }
}
