//! Composition session handlers: the generate → customize → finalize flow.

use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::compose::FrameStyle;
use crate::datauri;
use crate::error::QuickQrError;
use crate::history::HistoryEntry;
use crate::session::{CompositionSummary, LogoAsset};
use crate::style::{StyleEdit, StyleOptions};

use super::super::state::{AppState, CompositionSession, InFlight};
use super::{
    ApiError, ApiJson, ApiPath, ApiResult, download_filename, png_attachment, update_history,
};

/// Session id plus its current state.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub id: String,
    #[serde(flatten)]
    pub summary: CompositionSummary,
}

#[derive(Debug, Deserialize)]
pub struct TextRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct FrameRequest {
    pub style: String,
}

/// Body of a rejected style edit: the error plus the style that was kept.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleRejected {
    pub error: String,
    pub style: StyleOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseResponse {
    pub qr_image: String,
    pub data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposeResponse {
    pub qr_image: String,
    pub data: String,
    pub caption: &'static str,
    pub logo_applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResponse {
    pub entry: HistoryEntry,
    pub history_len: usize,
}

fn respond(id: &str, session: &CompositionSession) -> Json<SessionResponse> {
    Json(SessionResponse {
        id: id.to_string(),
        summary: session.composition.summary(),
    })
}

/// POST /api/compositions - Start a new composition.
pub async fn create(State(state): State<Arc<AppState>>) -> (StatusCode, Json<SessionResponse>) {
    let id = Uuid::new_v4();
    let session = CompositionSession::new();
    let body = respond(&id.to_string(), &session);

    state
        .sessions
        .write()
        .await
        .insert(id, Arc::new(Mutex::new(session)));
    tracing::debug!(%id, "composition created");

    (StatusCode::CREATED, body)
}

/// GET /api/compositions/:id - Current state.
pub async fn show(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<SessionResponse>> {
    let session = state.session(&id).await?;
    let mut session = session.lock().await;
    session.touch();
    Ok(respond(&id, &session))
}

/// DELETE /api/compositions/:id - Discard the composition.
pub async fn destroy(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<StatusCode> {
    let session_id = Uuid::parse_str(&id)
        .map_err(|_| QuickQrError::Validation("Invalid session ID".to_string()))?;
    state
        .sessions
        .write()
        .await
        .remove(&session_id)
        .ok_or_else(|| QuickQrError::NotFound("Session not found or expired".to_string()))?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/compositions/:id/text - Set the source text.
pub async fn set_text(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<String>,
    ApiJson(req): ApiJson<TextRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let session = state.session(&id).await?;
    let mut session = session.lock().await;
    session.touch();
    session.composition.set_text(req.text);
    Ok(respond(&id, &session))
}

/// PUT /api/compositions/:id/style - Edit colors and size.
///
/// A rejected edit keeps the previous style, which is echoed back.
pub async fn update_style(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<String>,
    ApiJson(edit): ApiJson<StyleEdit>,
) -> ApiResult<Response> {
    let session = state.session(&id).await?;
    let mut session = session.lock().await;
    session.touch();

    match session.composition.update_style(&edit) {
        Ok(()) => Ok(respond(&id, &session).into_response()),
        Err(e @ QuickQrError::Validation(_)) => Ok((
            StatusCode::BAD_REQUEST,
            Json(StyleRejected {
                error: e.to_string(),
                style: *session.composition.style(),
            }),
        )
            .into_response()),
        Err(e) => Err(e.into()),
    }
}

/// POST /api/compositions/:id/generate - Generate the base image.
///
/// Only one generation per composition may be in flight; a concurrent
/// request gets 409. The session stays readable while encoding runs.
pub async fn generate_base(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<BaseResponse>> {
    let shared = state.session(&id).await?;

    let (in_flight, text, style) = {
        let mut session = shared.lock().await;
        session.touch();
        let in_flight = InFlight::acquire(&session.generating)?;
        (
            in_flight,
            session.composition.source_text().to_string(),
            *session.composition.style(),
        )
    };

    let generator = state.generator.clone();
    let result = tokio::task::spawn_blocking(move || {
        let base = generator.generate(&text, &style)?;
        let uri = datauri::encode_png(&base.image)?;
        Ok::<_, QuickQrError>((base, uri))
    })
    .await
    .map_err(|e| ApiError::internal(format!("Task error: {}", e)))?;

    let mut session = shared.lock().await;
    drop(in_flight);

    let (base, qr_image) = result.inspect_err(|e| {
        tracing::warn!(%id, error = %e, "base generation failed");
    })?;
    let data = base.fingerprint.text.clone();
    session.composition.install_base(base);
    session.touch();

    Ok(Json(BaseResponse { qr_image, data }))
}

/// POST /api/compositions/:id/logo - Upload a logo (multipart field `logo`).
pub async fn upload_logo(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<String>,
    mut multipart: Multipart,
) -> ApiResult<Json<SessionResponse>> {
    let shared = state.session(&id).await?;

    let mut logo: Option<LogoAsset> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, format!("Multipart error: {}", e)))?
    {
        if field.name() == Some("logo") {
            let filename = field.file_name().map(str::to_string);
            let bytes = field.bytes().await.map_err(|e| {
                ApiError::new(StatusCode::BAD_REQUEST, format!("Failed to read logo: {}", e))
            })?;
            logo = Some(LogoAsset {
                bytes: bytes.to_vec(),
                filename,
            });
            break;
        }
    }

    let logo = logo
        .filter(|l| !l.bytes.is_empty())
        .ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, "No logo field found"))?;

    let mut session = shared.lock().await;
    session.touch();
    session.composition.set_logo(logo);
    Ok(respond(&id, &session))
}

/// DELETE /api/compositions/:id/logo - Remove the logo.
pub async fn remove_logo(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<SessionResponse>> {
    let session = state.session(&id).await?;
    let mut session = session.lock().await;
    session.touch();
    session.composition.remove_logo();
    Ok(respond(&id, &session))
}

/// PUT /api/compositions/:id/frame - Select a frame style.
pub async fn select_frame(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<String>,
    ApiJson(req): ApiJson<FrameRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let style: FrameStyle = req.style.parse()?;
    let session = state.session(&id).await?;
    let mut session = session.lock().await;
    session.touch();
    session.composition.select_frame(style);
    Ok(respond(&id, &session))
}

/// POST /api/compositions/:id/compose - Render the final image.
pub async fn compose(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<ComposeResponse>> {
    let shared = state.session(&id).await?;
    let mut session = shared.lock_owned().await;
    session.touch();
    let font = state.font.clone();

    tokio::task::spawn_blocking(move || {
        let composed = session.composition.compose(&font)?;
        Ok::<_, QuickQrError>(ComposeResponse {
            qr_image: datauri::encode_png(&composed.image)?,
            data: composed.source_text.clone(),
            caption: composed.caption,
            logo_applied: composed.logo_applied,
            warning: composed.warning.clone(),
        })
    })
    .await
    .map_err(|e| ApiError::internal(format!("Task error: {}", e)))?
    .map(Json)
    .map_err(ApiError::from)
}

/// POST /api/compositions/:id/save - Append the composed image to history.
pub async fn save(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<(StatusCode, Json<SaveResponse>)> {
    let shared = state.session(&id).await?;
    let entry = {
        let mut session = shared.lock().await;
        session.touch();
        let composed = session
            .composition
            .last_composed()
            .ok_or(QuickQrError::NotComposed)?;
        HistoryEntry::new(
            composed.source_text.clone(),
            datauri::encode_png(&composed.image)?,
        )
    };

    let saved = entry.clone();
    let history_len = update_history(&state, move |history| {
        history.append(saved);
        history.len()
    })
    .await?;
    tracing::info!(%id, entries = history_len, "saved to history");

    Ok((StatusCode::CREATED, Json(SaveResponse { entry, history_len })))
}

/// GET /api/compositions/:id/download - Composed image as a PNG file.
pub async fn download(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Response> {
    let shared = state.session(&id).await?;
    let png_bytes = {
        let mut session = shared.lock().await;
        session.touch();
        let composed = session
            .composition
            .last_composed()
            .ok_or(QuickQrError::NotComposed)?;
        datauri::to_png(&composed.image)?
    };
    Ok(png_attachment(png_bytes, &download_filename()))
}
