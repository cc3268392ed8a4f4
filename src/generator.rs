//! # Generation Service
//!
//! Validates a generation request and fronts the [`QrEncoder`].
//!
//! ```
//! use quickqr::generator::Generator;
//! use quickqr::style::StyleOptions;
//!
//! let generator = Generator::default();
//! let base = generator.generate("https://example.com", &StyleOptions::default())?;
//! assert_eq!(base.image.dimensions(), (300, 300));
//! # Ok::<(), quickqr::QuickQrError>(())
//! ```

use image::RgbaImage;
use std::sync::Arc;

use crate::encoder::{QrEncoder, QrcodeEncoder};
use crate::error::QuickQrError;
use crate::style::StyleOptions;

/// The (text, style) pair a base image was generated from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    pub text: String,
    pub style: StyleOptions,
}

/// An unmodified QR code as returned by the encoder.
#[derive(Debug, Clone)]
pub struct BaseImage {
    pub image: RgbaImage,
    pub fingerprint: Fingerprint,
}

/// Validates input and calls the encoder.
#[derive(Clone)]
pub struct Generator {
    encoder: Arc<dyn QrEncoder>,
}

impl Default for Generator {
    fn default() -> Self {
        Self::new(Arc::new(QrcodeEncoder))
    }
}

impl Generator {
    pub fn new(encoder: Arc<dyn QrEncoder>) -> Self {
        Self { encoder }
    }

    /// Generate a base image.
    ///
    /// Text is trimmed; empty text is a validation error and never reaches
    /// the encoder.
    pub fn generate(&self, text: &str, style: &StyleOptions) -> Result<BaseImage, QuickQrError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(QuickQrError::Validation("No data provided".to_string()));
        }

        let image = self.encoder.encode(text, style)?;
        tracing::debug!(
            chars = text.len(),
            size = style.size.get(),
            "generated base image"
        );

        Ok(BaseImage {
            image,
            fingerprint: Fingerprint {
                text: text.to_string(),
                style: *style,
            },
        })
    }
}
