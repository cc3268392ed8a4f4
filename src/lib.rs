//! # QuickQR - Styled QR Code Generator
//!
//! QuickQR turns text into a styled QR code image. It provides:
//!
//! - **Generation**: QR encoding in custom colors at a fixed pixel size
//! - **Composition**: center logo overlay and captioned frames
//! - **History**: a bounded, persisted list of past results
//! - **Server**: a JSON HTTP API over composition sessions
//!
//! ## Quick Start
//!
//! ```
//! use quickqr::{
//!     compose::{CaptionFont, FrameStyle},
//!     generator::Generator,
//!     session::Composition,
//!     style::StyleEdit,
//! };
//!
//! let mut composition = Composition::new();
//! composition.set_text("https://example.com");
//! composition.update_style(&StyleEdit {
//!     qr_color: Some("#1A237E".into()),
//!     size: Some(256),
//!     ..Default::default()
//! })?;
//! composition.select_frame(FrameStyle::ScanMe);
//!
//! composition.generate_base(&Generator::default())?;
//! let composed = composition.compose(&CaptionFont::Spleen)?;
//! assert_eq!(composed.image.dimensions(), (308, 308));
//! # Ok::<(), quickqr::QuickQrError>(())
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`style`] | Colors, sizes and style edits |
//! | [`encoder`] | QR encoder trait and `qrcode` backend |
//! | [`generator`] | Validated generation service |
//! | [`compose`] | Logo overlay, frames and captions |
//! | [`session`] | Composition sessions |
//! | [`history`] | Persisted history store |
//! | [`datauri`] | PNG data URIs |
//! | [`server`] | HTTP API |
//! | [`error`] | Error types |

pub mod clipboard;
pub mod compose;
pub mod datauri;
pub mod encoder;
pub mod error;
pub mod generator;
pub mod history;
pub mod server;
pub mod session;
pub mod style;

// Re-exports for convenience
pub use error::QuickQrError;
pub use history::{HistoryEntry, HistoryStore};
pub use session::Composition;
pub use style::StyleOptions;
