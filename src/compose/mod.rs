//! # Composition Engine
//!
//! Flattens a base QR image, an optional center logo and a captioned frame
//! into a single RGBA image.
//!
//! ## Frame geometry
//!
//! ```text
//! ┌──────────────── size + 2·padding ────────────────┐
//! │             caption (center y = 0.7·padding)     │
//! │   ┌──────────────── size ────────────────┐       │
//! │   │                                      │       │
//! │   │          ┌── logoSize + 8 ──┐        │       │
//! │   │          │      logo        │        │       │
//! │   │          └──────────────────┘        │       │
//! │   │                                      │       │
//! │   └──────────────────────────────────────┘       │
//! │        caption (center y = height - 0.7·padding) │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! `padding = round(size · 0.10)`, `logoSize = round(size · 0.20)`.

pub mod caption;

pub use caption::CaptionFont;

use image::{DynamicImage, RgbaImage, imageops};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::QuickQrError;
use crate::style::{Color, StyleOptions};

/// Margin of background color kept around the logo, per side.
pub const LOGO_MARGIN: u32 = 4;

/// Smallest caption height in pixels.
pub const MIN_CAPTION_HEIGHT: f32 = 16.0;

/// Decorative frame style.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FrameStyle {
    /// No frame; the output is the base image.
    #[default]
    None,
    ScanMe,
    ScanToVisit,
    ScanHere,
}

impl FrameStyle {
    /// Caption drawn above and below the code.
    pub fn caption(self) -> &'static str {
        match self {
            FrameStyle::None => "",
            FrameStyle::ScanMe => "Scan Me",
            FrameStyle::ScanToVisit => "Scan to Visit",
            FrameStyle::ScanHere => "Scan Here",
        }
    }

    /// Wire name, as accepted by [`FrameStyle::from_str`].
    pub fn name(self) -> &'static str {
        match self {
            FrameStyle::None => "none",
            FrameStyle::ScanMe => "scanMe",
            FrameStyle::ScanToVisit => "scanToVisit",
            FrameStyle::ScanHere => "scanHere",
        }
    }

    pub fn all() -> &'static [FrameStyle] {
        &[
            FrameStyle::None,
            FrameStyle::ScanMe,
            FrameStyle::ScanToVisit,
            FrameStyle::ScanHere,
        ]
    }
}

impl FromStr for FrameStyle {
    type Err = QuickQrError;

    /// Accepts camelCase (`scanMe`), kebab-case (`scan-me`) and snake_case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .flat_map(char::to_lowercase)
            .collect();
        FrameStyle::all()
            .iter()
            .copied()
            .find(|f| f.name().to_lowercase() == normalized)
            .ok_or_else(|| {
                QuickQrError::Validation(format!(
                    "Unknown frame style '{}'. Valid options: none, scanMe, scanToVisit, scanHere",
                    s
                ))
            })
    }
}

/// Frame settings of a composition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSpec {
    pub style: FrameStyle,
}

/// Padding around the code when a frame is drawn.
pub fn frame_padding(size: u32) -> u32 {
    (size as f64 * 0.10).round() as u32
}

/// Edge length of the center logo.
pub fn logo_size(size: u32) -> u32 {
    (size as f64 * 0.20).round() as u32
}

/// Caption pixel height for a given frame padding.
pub fn caption_height(padding: u32) -> f32 {
    (padding as f32 * 0.35).max(MIN_CAPTION_HEIGHT)
}

/// Everything the engine needs to render one image.
pub struct ComposeInput<'a> {
    pub base: &'a RgbaImage,
    pub style: &'a StyleOptions,
    pub frame: FrameStyle,
    pub logo: Option<&'a DynamicImage>,
}

/// Render a final image.
///
/// Without a frame or logo, the base image is returned unchanged.
pub fn render(input: &ComposeInput<'_>, font: &CaptionFont) -> RgbaImage {
    let size = input.style.size.get();

    if input.frame == FrameStyle::None && input.logo.is_none() {
        return input.base.clone();
    }

    let padding = if input.frame == FrameStyle::None {
        0
    } else {
        frame_padding(size)
    };
    let canvas_size = size + 2 * padding;

    let mut canvas = RgbaImage::from_pixel(canvas_size, canvas_size, input.style.bg_color.to_rgba());

    let base = if input.base.dimensions() == (size, size) {
        input.base.clone()
    } else {
        imageops::resize(input.base, size, size, imageops::FilterType::Nearest)
    };
    imageops::replace(&mut canvas, &base, padding as i64, padding as i64);

    if let Some(logo) = input.logo {
        draw_logo(&mut canvas, logo, size, padding, input.style.bg_color);
    }

    if input.frame != FrameStyle::None {
        let text = input.frame.caption();
        let pixel_height = caption_height(padding);
        let caption = font.render(text, pixel_height, true);
        let center_top = 0.7 * padding as f32;
        let center_bottom = canvas_size as f32 - center_top;
        draw_caption(&mut canvas, &caption, center_top, input.style.qr_color);
        draw_caption(&mut canvas, &caption, center_bottom, input.style.qr_color);
    }

    canvas
}

/// Draw `logo` over the center of the code region on a background pad.
fn draw_logo(canvas: &mut RgbaImage, logo: &DynamicImage, size: u32, padding: u32, bg: Color) {
    let logo_px = logo_size(size);
    if logo_px == 0 {
        return;
    }

    let origin = (size - logo_px) / 2 + padding;
    let pad_origin = origin.saturating_sub(LOGO_MARGIN);
    let pad_size = logo_px + 2 * LOGO_MARGIN;
    let pad = RgbaImage::from_pixel(pad_size, pad_size, bg.to_rgba());
    imageops::replace(canvas, &pad, pad_origin as i64, pad_origin as i64);

    let scaled = logo
        .resize_exact(logo_px, logo_px, imageops::FilterType::Triangle)
        .to_rgba8();
    imageops::overlay(canvas, &scaled, origin as i64, origin as i64);
}

/// Blend a caption centered horizontally with its vertical center at `center_y`.
fn draw_caption(canvas: &mut RgbaImage, caption: &caption::CaptionRender, center_y: f32, color: Color) {
    if caption.width == 0 || caption.height == 0 {
        return;
    }

    let x0 = (canvas.width() as i64 - caption.width as i64) / 2;
    let y0 = (center_y - caption.height as f32 / 2.0).round() as i64;

    for cy in 0..caption.height {
        for cx in 0..caption.width {
            let coverage = caption.data[cy * caption.width + cx];
            if coverage <= 0.0 {
                continue;
            }
            let x = x0 + cx as i64;
            let y = y0 + cy as i64;
            if x < 0 || y < 0 || x >= canvas.width() as i64 || y >= canvas.height() as i64 {
                continue;
            }
            let px = canvas.get_pixel_mut(x as u32, y as u32);
            let fg = [color.r, color.g, color.b];
            for c in 0..3 {
                px[c] = (fg[c] as f32 * coverage + px[c] as f32 * (1.0 - coverage)).round() as u8;
            }
            px[3] = 255;
        }
    }
}
