//! PNG data URIs, the image interchange format used on the wire and in history.

use base64::{Engine, engine::general_purpose::STANDARD};
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;

use crate::error::QuickQrError;

const PNG_PREFIX: &str = "data:image/png;base64,";

/// Encode an RGBA buffer as PNG bytes.
pub fn to_png(img: &RgbaImage) -> Result<Vec<u8>, QuickQrError> {
    let mut png_bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut png_bytes), ImageFormat::Png)?;
    Ok(png_bytes)
}

/// Encode an RGBA buffer as a `data:image/png;base64,…` URI.
pub fn encode_png(img: &RgbaImage) -> Result<String, QuickQrError> {
    let png_bytes = to_png(img)?;
    Ok(format!("{PNG_PREFIX}{}", STANDARD.encode(png_bytes)))
}

/// Extract the raw bytes carried by a base64 data URI of any image type.
pub fn decode_bytes(uri: &str) -> Result<Vec<u8>, QuickQrError> {
    let (header, payload) = uri
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(','))
        .ok_or_else(|| QuickQrError::Image("not a data URI".to_string()))?;

    if !header.ends_with(";base64") {
        return Err(QuickQrError::Image(
            "only base64 data URIs are supported".to_string(),
        ));
    }

    STANDARD
        .decode(payload.trim())
        .map_err(|e| QuickQrError::Image(format!("invalid base64 payload: {e}")))
}

/// Decode a data URI into an image.
pub fn decode_image(uri: &str) -> Result<DynamicImage, QuickQrError> {
    let bytes = decode_bytes(uri)?;
    Ok(image::load_from_memory(&bytes)?)
}
