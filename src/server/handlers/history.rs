//! History API handlers.

use axum::{Json, extract::State, response::Response};
use serde::Serialize;
use std::sync::Arc;

use crate::datauri;
use crate::history::HistoryEntry;

use super::super::state::AppState;
use super::{ApiPath, ApiResult, download_filename, png_attachment, update_history};

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub cleared: usize,
}

/// GET /api/history - All entries, newest first.
pub async fn list(State(state): State<Arc<AppState>>) -> Json<Vec<HistoryEntry>> {
    let history = state.history.read().await;
    Json(history.entries().to_vec())
}

/// DELETE /api/history - Remove every entry.
///
/// Confirmation is the client's job.
pub async fn clear(State(state): State<Arc<AppState>>) -> ApiResult<Json<ClearResponse>> {
    let cleared = update_history(&state, |history| {
        let cleared = history.len();
        history.clear();
        cleared
    })
    .await?;
    tracing::info!(cleared, "history cleared");
    Ok(Json(ClearResponse { cleared }))
}

/// GET /api/history/:index - Restore one entry without reordering.
pub async fn restore(
    State(state): State<Arc<AppState>>,
    ApiPath(index): ApiPath<usize>,
) -> ApiResult<Json<HistoryEntry>> {
    let history = state.history.read().await;
    Ok(Json(history.restore(index)?.clone()))
}

/// DELETE /api/history/:index - Delete one entry.
pub async fn remove(
    State(state): State<Arc<AppState>>,
    ApiPath(index): ApiPath<usize>,
) -> ApiResult<Json<HistoryEntry>> {
    let removed = update_history(&state, move |history| history.remove(index)).await?;
    Ok(Json(removed?))
}

/// GET /api/history/:index/download - Entry image as a PNG file.
pub async fn download(
    State(state): State<Arc<AppState>>,
    ApiPath(index): ApiPath<usize>,
) -> ApiResult<Response> {
    let bytes = {
        let history = state.history.read().await;
        datauri::decode_bytes(&history.restore(index)?.qr_image)?
    };
    Ok(png_attachment(bytes, &download_filename()))
}
