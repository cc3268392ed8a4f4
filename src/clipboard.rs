//! Copy a rendered QR code to the system clipboard.

use arboard::{Clipboard, ImageData};
use image::RgbaImage;
use std::borrow::Cow;

use crate::error::QuickQrError;

/// Place `img` on the clipboard as an RGBA bitmap.
pub fn copy_image(img: &RgbaImage) -> Result<(), QuickQrError> {
    let mut clipboard = Clipboard::new().map_err(|e| QuickQrError::Clipboard(e.to_string()))?;

    clipboard
        .set_image(ImageData {
            width: img.width() as usize,
            height: img.height() as usize,
            bytes: Cow::Borrowed(img.as_raw()),
        })
        .map_err(|e| QuickQrError::Clipboard(e.to_string()))
}
