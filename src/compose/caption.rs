//! Caption text rasterization.
//!
//! Renders text to an anti-aliased f32 coverage buffer. The built-in face is
//! the Spleen 12x24 bitmap font scaled nearest-neighbour to the requested
//! height; a TrueType face can be loaded at startup and is then rasterized
//! with ab_glyph instead.

use ab_glyph::{Font, FontArc, ScaleFont};
use spleen_font::{FONT_12X24, PSF2Font};
use std::path::Path;

use crate::error::QuickQrError;

const SPLEEN_W: usize = 12;
const SPLEEN_H: usize = 24;

/// Font used to draw frame captions.
#[derive(Clone, Default)]
pub enum CaptionFont {
    /// Built-in Spleen bitmap font.
    #[default]
    Spleen,
    /// User-supplied TrueType/OpenType font.
    Ttf(FontArc),
}

impl std::fmt::Debug for CaptionFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptionFont::Spleen => f.write_str("CaptionFont::Spleen"),
            CaptionFont::Ttf(_) => f.write_str("CaptionFont::Ttf"),
        }
    }
}

/// Rendered caption as a coverage buffer.
pub struct CaptionRender {
    pub width: usize,
    pub height: usize,
    /// Coverage values: 0.0 = transparent, 1.0 = fully inked.
    pub data: Vec<f32>,
}

impl CaptionRender {
    fn empty() -> Self {
        Self {
            width: 0,
            height: 0,
            data: Vec::new(),
        }
    }

    /// Horizontal stroke offset used to embolden glyphs at this height.
    fn embolden(&mut self, pixel_height: f32) {
        let offset = ((pixel_height / 16.0).round() as usize).max(1);
        let mut out = vec![0.0f32; self.data.len()];
        for y in 0..self.height {
            for x in 0..self.width {
                let mut v = 0.0f32;
                for dx in 0..=offset.min(x) {
                    v = v.max(self.data[y * self.width + x - dx]);
                }
                out[y * self.width + x] = v;
            }
        }
        self.data = out;
    }
}

impl CaptionFont {
    /// Load a TrueType/OpenType font file.
    pub fn load(path: &Path) -> Result<Self, QuickQrError> {
        let bytes = std::fs::read(path)?;
        let font = FontArc::try_from_vec(bytes).map_err(|e| {
            QuickQrError::Validation(format!("Invalid font {}: {}", path.display(), e))
        })?;
        Ok(CaptionFont::Ttf(font))
    }

    /// Render `text` at `pixel_height`.
    pub fn render(&self, text: &str, pixel_height: f32, bold: bool) -> CaptionRender {
        if text.is_empty() || pixel_height < 1.0 {
            return CaptionRender::empty();
        }

        let mut render = match self {
            CaptionFont::Spleen => render_spleen(text, pixel_height),
            CaptionFont::Ttf(font) => render_ttf(font, text, pixel_height),
        };

        if bold {
            // Reserve room for the stroke offset on the right edge.
            let offset = ((pixel_height / 16.0).round() as usize).max(1);
            let width = render.width + offset;
            let mut widened = vec![0.0f32; width * render.height];
            for y in 0..render.height {
                widened[y * width..y * width + render.width]
                    .copy_from_slice(&render.data[y * render.width..(y + 1) * render.width]);
            }
            render.width = width;
            render.data = widened;
            render.embolden(pixel_height);
        }

        render
    }
}

fn render_spleen(text: &str, pixel_height: f32) -> CaptionRender {
    let height = pixel_height.round() as usize;
    let glyph_w = ((SPLEEN_W as f32 * pixel_height / SPLEEN_H as f32).round() as usize).max(1);
    let chars: Vec<char> = text.chars().collect();
    let width = glyph_w * chars.len();
    let mut data = vec![0.0f32; width * height];

    let mut spleen = PSF2Font::new(FONT_12X24).ok();

    for (i, ch) in chars.iter().enumerate() {
        let mut src = [0u8; SPLEEN_W * SPLEEN_H];
        let utf8_bytes = ch.to_string();
        let found = match spleen.as_mut() {
            Some(font) => match font.glyph_for_utf8(utf8_bytes.as_bytes()) {
                Some(glyph) => {
                    for (row_y, row) in glyph.enumerate() {
                        for (col_x, on) in row.enumerate() {
                            if row_y < SPLEEN_H && col_x < SPLEEN_W && on {
                                src[row_y * SPLEEN_W + col_x] = 1;
                            }
                        }
                    }
                    true
                }
                None => false,
            },
            None => false,
        };

        if !found && !ch.is_whitespace() {
            draw_box(&mut src);
        }

        let x0 = i * glyph_w;
        for dy in 0..height {
            for dx in 0..glyph_w {
                let sx = dx * SPLEEN_W / glyph_w;
                let sy = dy * SPLEEN_H / height;
                if src[sy * SPLEEN_W + sx] == 1 {
                    data[dy * width + x0 + dx] = 1.0;
                }
            }
        }
    }

    CaptionRender {
        width,
        height,
        data,
    }
}

fn draw_box(glyph: &mut [u8; SPLEEN_W * SPLEEN_H]) {
    for x in 2..SPLEEN_W - 2 {
        glyph[4 * SPLEEN_W + x] = 1;
        glyph[(SPLEEN_H - 5) * SPLEEN_W + x] = 1;
    }
    for y in 4..SPLEEN_H - 4 {
        glyph[y * SPLEEN_W + 2] = 1;
        glyph[y * SPLEEN_W + SPLEEN_W - 3] = 1;
    }
}

fn render_ttf(font: &FontArc, text: &str, pixel_height: f32) -> CaptionRender {
    let scaled = font.as_scaled(pixel_height);

    let mut glyphs = Vec::new();
    let mut caret_x = 0.0f32;
    for ch in text.chars() {
        let glyph_id = font.glyph_id(ch);
        glyphs.push((glyph_id, caret_x));
        caret_x += scaled.h_advance(glyph_id);
    }

    let width = (caret_x.ceil() as usize).max(1);
    let ascent = scaled.ascent();
    let descent = scaled.descent();
    let height = ((ascent - descent).ceil() as usize).max(1);

    let mut data = vec![0.0f32; width * height];

    for &(glyph_id, glyph_x) in &glyphs {
        let glyph =
            glyph_id.with_scale_and_position(pixel_height, ab_glyph::point(glyph_x, ascent));

        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            outlined.draw(|px, py, coverage| {
                let x = px as i32 + bounds.min.x as i32;
                let y = py as i32 + bounds.min.y as i32;
                if x >= 0 && x < width as i32 && y >= 0 && y < height as i32 {
                    let idx = y as usize * width + x as usize;
                    data[idx] = (data[idx] + coverage).min(1.0);
                }
            });
        }
    }

    CaptionRender {
        width,
        height,
        data,
    }
}
