//! QR code rendering to PNG.

use codeshelf_core::QrRenderer;
use image::{GrayImage, ImageFormat, Luma};
use qrcode::{Color, QrCode};
use std::io::Cursor;
use tracing::debug;

/// Quiet-zone width in modules required around a QR symbol.
const QUIET_ZONE: u32 = 4;

/// Renders text as a black-on-white PNG QR code.
#[derive(Debug, Clone, Copy)]
pub struct PngRenderer {
    module_size: u32,
}

impl Default for PngRenderer {
    fn default() -> Self {
        Self { module_size: 8 }
    }
}

impl PngRenderer {
    /// Creates a renderer with 8-pixel modules.
    pub fn new() -> Self {
        Self::default()
    }

    fn rasterize(&self, code: &QrCode) -> Option<GrayImage> {
        let width = u32::try_from(code.width()).ok()?;
        let side = (width + 2 * QUIET_ZONE) * self.module_size;
        let mut img = GrayImage::from_pixel(side, side, Luma([255]));

        for (index, color) in code.to_colors().into_iter().enumerate() {
            if color != Color::Dark {
                continue;
            }
            let index = u32::try_from(index).ok()?;
            let x0 = (index % width + QUIET_ZONE) * self.module_size;
            let y0 = (index / width + QUIET_ZONE) * self.module_size;
            for y in y0..y0 + self.module_size {
                for x in x0..x0 + self.module_size {
                    img.put_pixel(x, y, Luma([0]));
                }
            }
        }
        Some(img)
    }
}

impl QrRenderer for PngRenderer {
    fn render(&self, text: &str) -> Option<Vec<u8>> {
        let code = match QrCode::new(text.as_bytes()) {
            Ok(code) => code,
            Err(e) => {
                debug!(error = %e, len = text.len(), "Text cannot be encoded as a QR code");
                return None;
            }
        };
        let img = self.rasterize(&code)?;

        let mut bytes = Cursor::new(Vec::new());
        if let Err(e) = img.write_to(&mut bytes, ImageFormat::Png) {
            debug!(error = %e, "Failed to encode QR image");
            return None;
        }
        Some(bytes.into_inner())
    }
}
