//! # Composition Sessions
//!
//! A [`Composition`] is the in-progress set of choices (text, style, frame,
//! logo) plus the cached base image, working toward a final image. Sessions
//! are explicit values owned by the caller so several can coexist.
//!
//! ## Lifecycle
//!
//! ```text
//! set_text / update_style ──► base invalidated
//!            │
//!            ▼
//!   generate_base ──► base cached (fingerprint = text + style)
//!            │
//!            ▼
//!   compose ──► ComposedImage (stale base → StaleBaseImage)
//! ```

use image::{DynamicImage, RgbaImage};
use serde::Serialize;

use crate::compose::{self, CaptionFont, ComposeInput, FrameSpec, FrameStyle};
use crate::error::QuickQrError;
use crate::generator::{BaseImage, Fingerprint, Generator};
use crate::style::{StyleEdit, StyleOptions};

/// Raw logo payload as uploaded. Decoded only when composing.
#[derive(Debug, Clone)]
pub struct LogoAsset {
    pub bytes: Vec<u8>,
    pub filename: Option<String>,
}

/// Output of a successful compose.
#[derive(Debug, Clone)]
pub struct ComposedImage {
    pub image: RgbaImage,
    pub source_text: String,
    pub caption: &'static str,
    pub logo_applied: bool,
    /// Set when the logo could not be decoded and was left out.
    pub warning: Option<String>,
}

/// Serializable view of a composition, without image payloads.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositionSummary {
    pub source_text: String,
    pub style: StyleOptions,
    pub frame: FrameSpec,
    pub has_logo: bool,
    pub logo_filename: Option<String>,
    pub base_ready: bool,
    pub composed: bool,
}

/// The working unit of the generate → customize → finalize flow.
#[derive(Debug, Clone, Default)]
pub struct Composition {
    source_text: String,
    style: StyleOptions,
    frame: FrameSpec,
    logo: Option<LogoAsset>,
    base: Option<BaseImage>,
    last_composed: Option<ComposedImage>,
}

impl Composition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    pub fn style(&self) -> &StyleOptions {
        &self.style
    }

    pub fn frame(&self) -> FrameStyle {
        self.frame.style
    }

    pub fn logo(&self) -> Option<&LogoAsset> {
        self.logo.as_ref()
    }

    pub fn base(&self) -> Option<&BaseImage> {
        self.base.as_ref()
    }

    pub fn last_composed(&self) -> Option<&ComposedImage> {
        self.last_composed.as_ref()
    }

    /// Inputs a base image must have been generated from to be current.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint {
            text: self.source_text.trim().to_string(),
            style: self.style,
        }
    }

    /// True when the cached base image matches the current inputs.
    pub fn base_is_current(&self) -> bool {
        self.base
            .as_ref()
            .is_some_and(|b| b.fingerprint == self.fingerprint())
    }

    /// Replace the source text. Invalidates the base image if it changed.
    pub fn set_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text != self.source_text {
            self.source_text = text;
            self.invalidate();
        }
    }

    /// Apply a style edit. On validation failure the previous style is kept.
    pub fn update_style(&mut self, edit: &StyleEdit) -> Result<(), QuickQrError> {
        let before = self.style;
        self.style.apply(edit)?;
        if self.style != before {
            self.invalidate();
        }
        Ok(())
    }

    pub fn set_logo(&mut self, logo: LogoAsset) {
        self.logo = Some(logo);
        self.last_composed = None;
    }

    pub fn remove_logo(&mut self) {
        self.logo = None;
        self.last_composed = None;
    }

    pub fn select_frame(&mut self, style: FrameStyle) {
        self.frame = FrameSpec { style };
        self.last_composed = None;
    }

    /// Discard every choice and start a new code.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Generate and cache the base image for the current text and style.
    ///
    /// On failure the composition is left untouched.
    pub fn generate_base(&mut self, generator: &Generator) -> Result<&BaseImage, QuickQrError> {
        let base = generator.generate(&self.source_text, &self.style)?;
        Ok(self.install_base(base))
    }

    /// Store a base image generated elsewhere (e.g. on a worker thread).
    ///
    /// The base is kept even if the inputs changed meanwhile; `compose`
    /// rejects it as stale in that case.
    pub fn install_base(&mut self, base: BaseImage) -> &BaseImage {
        self.last_composed = None;
        self.base.insert(base)
    }

    /// Render the final image from the current choices.
    pub fn compose(&mut self, font: &CaptionFont) -> Result<&ComposedImage, QuickQrError> {
        if !self.base_is_current() {
            return Err(QuickQrError::StaleBaseImage);
        }
        let base = self.base.as_ref().ok_or(QuickQrError::StaleBaseImage)?;

        let (logo, warning) = match self.logo.as_ref().map(decode_logo) {
            Some(Ok(img)) => (Some(img), None),
            Some(Err(e)) => {
                tracing::warn!(error = %e, "composing without logo");
                (None, Some(e.to_string()))
            }
            None => (None, None),
        };

        let image = compose::render(
            &ComposeInput {
                base: &base.image,
                style: &self.style,
                frame: self.frame.style,
                logo: logo.as_ref(),
            },
            font,
        );

        let composed = ComposedImage {
            image,
            source_text: base.fingerprint.text.clone(),
            caption: self.frame.style.caption(),
            logo_applied: logo.is_some(),
            warning,
        };
        Ok(&*self.last_composed.insert(composed))
    }

    pub fn summary(&self) -> CompositionSummary {
        CompositionSummary {
            source_text: self.source_text.clone(),
            style: self.style,
            frame: self.frame,
            has_logo: self.logo.is_some(),
            logo_filename: self.logo.as_ref().and_then(|l| l.filename.clone()),
            base_ready: self.base_is_current(),
            composed: self.last_composed.is_some(),
        }
    }

    fn invalidate(&mut self) {
        self.base = None;
        self.last_composed = None;
    }
}

fn decode_logo(logo: &LogoAsset) -> Result<DynamicImage, QuickQrError> {
    image::load_from_memory(&logo.bytes).map_err(|e| QuickQrError::InvalidLogo(e.to_string()))
}
