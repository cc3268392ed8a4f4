//! HTTP handlers for the server.

pub mod composition;
pub mod generate;
pub mod history;

use axum::{
    Json,
    extract::{
        FromRequest, FromRequestParts,
        rejection::{JsonRejection, PathRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::sync::Arc;

use crate::error::QuickQrError;
use crate::history::HistoryStore;

use super::state::AppState;

/// `Json` body extractor whose rejections render as [`ErrorBody`].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `Path` extractor whose rejections render as [`ErrorBody`].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// JSON error body: `{ "error": "..." }`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Error returned by handlers, rendered as a JSON error body.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<QuickQrError> for ApiError {
    fn from(e: QuickQrError) -> Self {
        let status = match &e {
            QuickQrError::Validation(_) | QuickQrError::InvalidLogo(_) => StatusCode::BAD_REQUEST,
            QuickQrError::StaleBaseImage | QuickQrError::NotComposed | QuickQrError::Busy => {
                StatusCode::CONFLICT
            }
            QuickQrError::NotFound(_) => StatusCode::NOT_FOUND,
            QuickQrError::Generation(_)
            | QuickQrError::Persistence(_)
            | QuickQrError::Image(_)
            | QuickQrError::Clipboard(_)
            | QuickQrError::Transport(_)
            | QuickQrError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %e, "request failed");
        }
        Self::new(status, e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// A PNG served as a file download.
pub fn png_attachment(png_bytes: Vec<u8>, filename: &str) -> Response {
    let mime = mime_guess::from_path(filename)
        .first_or_octet_stream()
        .to_string();
    (
        [
            (header::CONTENT_TYPE, mime),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        png_bytes,
    )
        .into_response()
}

/// Download file name, `quickqr-<epoch-ms>.png`.
pub fn download_filename() -> String {
    format!("quickqr-{}.png", chrono::Utc::now().timestamp_millis())
}

/// Run a history mutation off the async workers.
///
/// Every mutation rewrites the backing store, so the write guard is moved
/// into `spawn_blocking` along with the closure.
pub async fn update_history<R, F>(state: &Arc<AppState>, f: F) -> ApiResult<R>
where
    R: Send + 'static,
    F: FnOnce(&mut HistoryStore) -> R + Send + 'static,
{
    let mut history = state.history.clone().write_owned().await;
    tokio::task::spawn_blocking(move || f(&mut history))
        .await
        .map_err(|e| ApiError::internal(format!("Task error: {}", e)))
}
