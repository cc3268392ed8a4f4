//! Stateless generation endpoint.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::datauri;
use crate::error::QuickQrError;
use crate::style::{Color, PixelSize, StyleOptions};

use super::super::state::AppState;
use super::{ApiError, ApiResult};

fn default_qr_color() -> String {
    "#000000".to_string()
}

fn default_bg_color() -> String {
    "#ffffff".to_string()
}

/// `qrSize` as sent by form-driven clients: a number or a numeric string.
///
/// Numbers are taken signed so an out-of-range value is a validation error
/// rather than a body that fails to parse.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SizeField {
    Number(i64),
    Text(String),
}

impl Default for SizeField {
    fn default() -> Self {
        SizeField::Number(PixelSize::DEFAULT.get().into())
    }
}

impl SizeField {
    fn resolve(&self) -> Result<PixelSize, QuickQrError> {
        let px = match self {
            SizeField::Number(n) => u32::try_from(*n)
                .map_err(|_| QuickQrError::Validation(format!("Invalid size '{}'", n)))?,
            SizeField::Text(s) => s.trim().parse().map_err(|_| {
                QuickQrError::Validation(format!("Invalid size '{}'", s))
            })?,
        };
        PixelSize::new(px)
    }
}

/// Request body for POST /generate.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default = "default_qr_color")]
    pub qr_color: String,
    #[serde(default = "default_bg_color")]
    pub bg_color: String,
    #[serde(default)]
    pub qr_size: SizeField,
}

impl Default for GenerateRequest {
    fn default() -> Self {
        Self {
            data: None,
            qr_color: default_qr_color(),
            bg_color: default_bg_color(),
            qr_size: SizeField::default(),
        }
    }
}

impl GenerateRequest {
    /// Parse a request body.
    ///
    /// A body that is empty or not declared as JSON carries no fields, so it
    /// falls through to the "No data provided" check.
    pub fn from_body(headers: &HeaderMap, body: &[u8]) -> Result<Self, ApiError> {
        let is_json = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.trim_start().starts_with("application/json"));
        if !is_json || body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body).map_err(|e| {
            ApiError::new(StatusCode::BAD_REQUEST, format!("Invalid request body: {}", e))
        })
    }
}

/// Response body for POST /generate.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub qr_image: String,
}

/// POST /generate - Encode text as a styled QR code data URI.
pub async fn generate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<GenerateResponse>> {
    let req = GenerateRequest::from_body(&headers, &body)?;
    let text = req.data.unwrap_or_default();
    if text.trim().is_empty() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "No data provided"));
    }

    let style = StyleOptions {
        qr_color: Color::parse(&req.qr_color)?,
        bg_color: Color::parse(&req.bg_color)?,
        size: req.qr_size.resolve()?,
    };

    let generator = state.generator.clone();
    let qr_image = tokio::task::spawn_blocking(move || {
        let base = generator.generate(&text, &style)?;
        datauri::encode_png(&base.image)
    })
    .await
    .map_err(|e| ApiError::internal(format!("Task error: {}", e)))?
    .map_err(|e| {
        tracing::warn!(error = %e, "generation failed");
        match e {
            QuickQrError::Validation(_) => ApiError::from(e),
            _ => ApiError::internal("QR Code generation failed"),
        }
    })?;

    Ok(Json(GenerateResponse { qr_image }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn json_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }

    #[test]
    fn test_body_without_json_content_type_has_no_data() {
        let req = GenerateRequest::from_body(&HeaderMap::new(), br#"{"data":"hi"}"#).unwrap();
        assert!(req.data.is_none());
        assert_eq!(req.qr_color, "#000000");
    }

    #[test]
    fn test_empty_body_has_no_data() {
        let req = GenerateRequest::from_body(&json_headers(), b"  ").unwrap();
        assert!(req.data.is_none());
    }

    #[test]
    fn test_malformed_body_is_bad_request() {
        let err = GenerateRequest::from_body(&json_headers(), b"{\"data\":").unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_size_field_resolution() {
        assert_eq!(SizeField::Number(256).resolve().unwrap().get(), 256);
        assert_eq!(SizeField::Text(" 400 ".into()).resolve().unwrap().get(), 400);
        assert!(matches!(
            SizeField::Number(-5).resolve(),
            Err(QuickQrError::Validation(_))
        ));
        assert!(matches!(
            SizeField::Text("big".into()).resolve(),
            Err(QuickQrError::Validation(_))
        ));
    }
}
