//! QR encoding behind a trait so the generation service can treat the encoder
//! as an opaque capability.

use image::RgbaImage;
use qrcode::QrCode;

use crate::error::QuickQrError;
use crate::style::StyleOptions;

/// Quiet zone around the code, in modules.
pub const QUIET_ZONE_MODULES: u32 = 2;

/// Produces a raster QR code for `text` in the given style.
///
/// Implementations must return an image of exactly `style.size × style.size`
/// pixels, quiet zone included, and must be deterministic.
pub trait QrEncoder: Send + Sync {
    fn encode(&self, text: &str, style: &StyleOptions) -> Result<RgbaImage, QuickQrError>;
}

/// Default encoder backed by the `qrcode` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct QrcodeEncoder;

impl QrEncoder for QrcodeEncoder {
    fn encode(&self, text: &str, style: &StyleOptions) -> Result<RgbaImage, QuickQrError> {
        let code = QrCode::new(text.as_bytes())
            .map_err(|e| QuickQrError::Generation(format!("QR encode error: {e}")))?;
        let modules = code.to_colors();
        let module_count = code.width() as u32;
        let total = module_count + 2 * QUIET_ZONE_MODULES;
        let size = style.size.get();

        if size < total {
            return Err(QuickQrError::Generation(format!(
                "{size}px is too small for {total} modules"
            )));
        }

        let dark = style.qr_color.to_rgba();
        let light = style.bg_color.to_rgba();

        // Nearest-neighbour sampling: every output pixel maps to exactly one module.
        let img = RgbaImage::from_fn(size, size, |x, y| {
            let mx = (x * total / size) as i64 - QUIET_ZONE_MODULES as i64;
            let my = (y * total / size) as i64 - QUIET_ZONE_MODULES as i64;
            let inside = (0..module_count as i64).contains(&mx) && (0..module_count as i64).contains(&my);
            if inside && modules[(my as u32 * module_count + mx as u32) as usize] == qrcode::Color::Dark {
                dark
            } else {
                light
            }
        });

        Ok(img)
    }
}
