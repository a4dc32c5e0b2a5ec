//! QR rendering for the upload URL.
//!
//! The code is rasterised straight into an `egui::ColorImage` so the prompt
//! window can upload it as a texture without an intermediate file.

use egui::{Color32, ColorImage};
use qrcode::QrCode;

use super::BridgeError;

/// Pixels per QR module.
const MODULE_PX: usize = 6;
/// Quiet-zone width in modules on every side.
const QUIET_ZONE: usize = 2;

/// Render `url` as a black-on-white QR image.
pub fn qr_color_image(url: &str) -> Result<ColorImage, BridgeError> {
    let code = QrCode::new(url.as_bytes()).map_err(|e| BridgeError::Qr(e.to_string()))?;

    let modules = code.width();
    let colors = code.to_colors();
    let side = (modules + 2 * QUIET_ZONE) * MODULE_PX;

    let mut image = ColorImage::new([side, side], Color32::WHITE);
    for (i, color) in colors.iter().enumerate() {
        if *color != qrcode::Color::Dark {
            continue;
        }
        let mx = (i % modules + QUIET_ZONE) * MODULE_PX;
        let my = (i / modules + QUIET_ZONE) * MODULE_PX;
        for dy in 0..MODULE_PX {
            let row = (my + dy) * side;
            for dx in 0..MODULE_PX {
                image.pixels[row + mx + dx] = Color32::BLACK;
            }
        }
    }
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_square_image_with_quiet_zone() {
        let img = qr_color_image("http://192.168.1.5:8989/").unwrap();

        assert_eq!(img.size[0], img.size[1]);
        // The quiet zone must stay white.
        assert_eq!(img.pixels[0], Color32::WHITE);
        let side = img.size[0];
        assert_eq!(img.pixels[side * side - 1], Color32::WHITE);
        // Every QR code starts with a finder pattern: the top-left module
        // inside the quiet zone is dark.
        let inset = QUIET_ZONE * MODULE_PX;
        assert_eq!(img.pixels[inset * side + inset], Color32::BLACK);
    }

    #[test]
    fn longer_urls_produce_larger_codes() {
        let short = qr_color_image("http://10.0.0.1:1/").unwrap();
        let long = qr_color_image(
            "http://192.168.100.200:8989/?session=0123456789abcdef0123456789abcdef",
        )
        .unwrap();
        assert!(long.size[0] > short.size[0]);
    }
}
