//! # Style Options
//!
//! Colors and pixel sizes that drive QR generation.
//!
//! | Field | Default | Constraint |
//! |-------|---------|------------|
//! | `qrColor` | `#000000` | `^#[0-9A-Fa-f]{6}$` |
//! | `bgColor` | `#FFFFFF` | `^#[0-9A-Fa-f]{6}$` |
//! | `size` | 300 | one of [`PixelSize::SUPPORTED`] when edited in a composition |

use image::Rgba;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::QuickQrError;

/// An opaque RGB color parsed from a `#RRGGBB` hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };
    pub const WHITE: Color = Color {
        r: 0xFF,
        g: 0xFF,
        b: 0xFF,
    };

    /// Parse a `#RRGGBB` string. Surrounding whitespace is ignored.
    pub fn parse(s: &str) -> Result<Self, QuickQrError> {
        let s = s.trim();
        let hex = s
            .strip_prefix('#')
            .filter(|h| h.len() == 6 && h.bytes().all(|b| b.is_ascii_hexdigit()))
            .ok_or_else(|| {
                QuickQrError::Validation(format!(
                    "Invalid color '{}': expected #RRGGBB",
                    s
                ))
            })?;

        // All six bytes are ASCII hex digits, so these parses cannot fail.
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).unwrap_or(0);
        Ok(Color {
            r: channel(0),
            g: channel(2),
            b: channel(4),
        })
    }

    /// Opaque RGBA pixel for this color.
    pub fn to_rgba(self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, 255])
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = QuickQrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Color::parse(s)
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Color::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Square pixel dimension of a generated QR code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PixelSize(u32);

impl PixelSize {
    /// Sizes offered by the composition wizard.
    pub const SUPPORTED: [u32; 6] = [128, 200, 256, 300, 400, 512];

    /// Smallest size the generation endpoint accepts.
    pub const MIN: u32 = 32;

    /// Largest size the generation endpoint accepts.
    pub const MAX: u32 = 2048;

    pub const DEFAULT: PixelSize = PixelSize(300);

    /// Accept any positive size within [`PixelSize::MIN`]..=[`PixelSize::MAX`].
    pub fn new(px: u32) -> Result<Self, QuickQrError> {
        if (Self::MIN..=Self::MAX).contains(&px) {
            Ok(PixelSize(px))
        } else {
            Err(QuickQrError::Validation(format!(
                "Invalid size {}: must be between {} and {} pixels",
                px,
                Self::MIN,
                Self::MAX
            )))
        }
    }

    /// Accept only one of the [`PixelSize::SUPPORTED`] sizes.
    pub fn supported(px: u32) -> Result<Self, QuickQrError> {
        if Self::SUPPORTED.contains(&px) {
            Ok(PixelSize(px))
        } else {
            Err(QuickQrError::Validation(format!(
                "Unsupported size {}: choose one of {:?}",
                px,
                Self::SUPPORTED
            )))
        }
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for PixelSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl<'de> Deserialize<'de> for PixelSize {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let px = u32::deserialize(deserializer)?;
        PixelSize::new(px).map_err(serde::de::Error::custom)
    }
}

/// Colors and size of a QR code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleOptions {
    pub qr_color: Color,
    pub bg_color: Color,
    pub size: PixelSize,
}

impl Default for StyleOptions {
    fn default() -> Self {
        Self {
            qr_color: Color::BLACK,
            bg_color: Color::WHITE,
            size: PixelSize::DEFAULT,
        }
    }
}

/// A partial, unvalidated edit to [`StyleOptions`] as typed by the user.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleEdit {
    pub qr_color: Option<String>,
    pub bg_color: Option<String>,
    pub size: Option<u32>,
}

impl StyleOptions {
    /// Apply an edit atomically.
    ///
    /// Either every field of the edit validates and is applied, or `self` is
    /// left exactly as it was.
    pub fn apply(&mut self, edit: &StyleEdit) -> Result<(), QuickQrError> {
        let qr_color = edit
            .qr_color
            .as_deref()
            .map(Color::parse)
            .transpose()?
            .unwrap_or(self.qr_color);
        let bg_color = edit
            .bg_color
            .as_deref()
            .map(Color::parse)
            .transpose()?
            .unwrap_or(self.bg_color);
        let size = edit
            .size
            .map(PixelSize::supported)
            .transpose()?
            .unwrap_or(self.size);

        *self = StyleOptions {
            qr_color,
            bg_color,
            size,
        };
        Ok(())
    }
}
