//! # Error Types
//!
//! This module defines error types used throughout the quickqr library.
//!
//! Every variant is recoverable: callers return to an interactive, retryable
//! state instead of aborting.

use thiserror::Error;

/// Main error type for quickqr operations
#[derive(Debug, Error)]
pub enum QuickQrError {
    /// Rejected user input (empty text, malformed color, unsupported size)
    #[error("{0}")]
    Validation(String),

    /// The QR encoder could not produce an image
    #[error("QR Code generation failed: {0}")]
    Generation(String),

    /// The cached base image no longer matches the composition inputs
    #[error("Base image is missing or out of date; generate the QR code first")]
    StaleBaseImage,

    /// Save or export was requested before anything was composed
    #[error("Nothing has been composed yet; finalize the QR code first")]
    NotComposed,

    /// The logo payload is not a decodable image
    #[error("Invalid logo image: {0}")]
    InvalidLogo(String),

    /// History store read/write failure
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// A generation is already in flight for this composition
    #[error("A QR code generation is already in progress")]
    Busy,

    /// Unknown session or history index
    #[error("Not found: {0}")]
    NotFound(String),

    /// Image encoding/decoding error
    #[error("Image error: {0}")]
    Image(String),

    /// System clipboard unavailable or rejected the image
    #[error("Clipboard error: {0}")]
    Clipboard(String),

    /// Server transport errors (bind, accept)
    #[error("Transport error: {0}")]
    Transport(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<image::ImageError> for QuickQrError {
    fn from(e: image::ImageError) -> Self {
        QuickQrError::Image(e.to_string())
    }
}

impl From<serde_json::Error> for QuickQrError {
    fn from(e: serde_json::Error) -> Self {
        QuickQrError::Persistence(e.to_string())
    }
}
