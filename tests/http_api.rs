//! # HTTP API Tests
//!
//! Drive the router in-process with `tower::ServiceExt::oneshot`, backed by an
//! in-memory history store.

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use image::{Rgba, RgbaImage};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

use quickqr::compose::CaptionFont;
use quickqr::datauri;
use quickqr::generator::Generator;
use quickqr::history::{HistoryEntry, HistoryStore, MemoryStore};
use quickqr::server::{self, AppState, InFlight, ServerConfig};

fn app() -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState::with_parts(
        ServerConfig::default(),
        Generator::default(),
        CaptionFont::Spleen,
        HistoryStore::load(Box::new(MemoryStore::new())),
    ));
    (server::router(state.clone()), state)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::String(String::from_utf8_lossy(&bytes).into()))
    };
    (status, value)
}

fn image_dimensions(uri: &str) -> (u32, u32) {
    let img = datauri::decode_image(uri).unwrap();
    (img.width(), img.height())
}

async fn new_session(app: &Router) -> String {
    let (status, body) = send(app, Method::POST, "/api/compositions", None).await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

// ============================================================================
// POST /generate
// ============================================================================

#[tokio::test]
async fn generate_returns_data_uri_of_requested_size() {
    let (app, _) = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/generate",
        Some(json!({"data": "https://example.com", "qrColor": "#000000", "bgColor": "#FFFFFF", "qrSize": 256})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let uri = body["qrImage"].as_str().unwrap();
    assert!(uri.starts_with("data:image/png;base64,"));
    assert_eq!(image_dimensions(uri), (256, 256));
}

#[tokio::test]
async fn generate_applies_defaults() {
    let (app, _) = app();
    let (status, body) = send(&app, Method::POST, "/generate", Some(json!({"data": "hello"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(image_dimensions(body["qrImage"].as_str().unwrap()), (300, 300));
}

#[tokio::test]
async fn generate_accepts_string_size() {
    let (app, _) = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/generate",
        Some(json!({"data": "hello", "qrSize": "200"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(image_dimensions(body["qrImage"].as_str().unwrap()), (200, 200));
}

#[tokio::test]
async fn generate_rejects_missing_or_blank_data() {
    let (app, _) = app();
    for body in [json!({}), json!({"data": ""}), json!({"data": "   "})] {
        let (status, body) = send(&app, Method::POST, "/generate", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "No data provided"}));
    }
}

#[tokio::test]
async fn generate_rejects_bad_color() {
    let (app, _) = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/generate",
        Some(json!({"data": "hello", "qrColor": "blue"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Invalid color"));
}

async fn send_raw(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value: Value = serde_json::from_slice(&bytes).expect("error body is JSON");
    (status, value)
}

#[tokio::test]
async fn generate_without_json_body_reports_no_data() {
    let (app, _) = app();

    let no_content_type = Request::post("/generate")
        .body(Body::from(r#"{"data":"hi"}"#))
        .unwrap();
    let (status, body) = send_raw(&app, no_content_type).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "No data provided"}));

    let empty = Request::post("/generate")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send_raw(&app, empty).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "No data provided"}));
}

#[tokio::test]
async fn generate_malformed_input_is_json_error() {
    let (app, _) = app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/generate",
        Some(json!({"data": "hi", "qrSize": -5})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Invalid size"));

    let truncated = Request::post("/generate")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"data":"#))
        .unwrap();
    let (status, body) = send_raw(&app, truncated).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn generate_encoder_failure_is_500() {
    let (app, _) = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/generate",
        Some(json!({"data": "x".repeat(8000)})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "QR Code generation failed"}));
}

// ============================================================================
// Composition flow
// ============================================================================

#[tokio::test]
async fn composition_full_flow_scan_me() {
    let (app, state) = app();
    let id = new_session(&app).await;
    let base = format!("/api/compositions/{id}");

    let (status, _) = send(&app, Method::PUT, &format!("{base}/text"), Some(json!({"text": "https://example.com"}))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::PUT, &format!("{base}/style"), Some(json!({"size": 256}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["style"]["size"], 256);

    let (status, body) = send(&app, Method::POST, &format!("{base}/generate"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(image_dimensions(body["qrImage"].as_str().unwrap()), (256, 256));

    let (status, _) = send(&app, Method::PUT, &format!("{base}/frame"), Some(json!({"style": "scanMe"}))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::POST, &format!("{base}/compose"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["caption"], "Scan Me");
    assert_eq!(body["data"], "https://example.com");
    assert_eq!(body["logoApplied"], false);
    assert_eq!(image_dimensions(body["qrImage"].as_str().unwrap()), (308, 308));

    let (status, body) = send(&app, Method::POST, &format!("{base}/save"), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["historyLen"], 1);
    assert_eq!(state.history.read().await.entries()[0].data, "https://example.com");
}

#[tokio::test]
async fn compose_before_generate_is_conflict() {
    let (app, _) = app();
    let id = new_session(&app).await;
    let base = format!("/api/compositions/{id}");

    send(&app, Method::PUT, &format!("{base}/text"), Some(json!({"text": "hello"}))).await;
    let (status, _) = send(&app, Method::POST, &format!("{base}/compose"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    send(&app, Method::POST, &format!("{base}/generate"), None).await;
    send(&app, Method::PUT, &format!("{base}/style"), Some(json!({"qrColor": "#FF0000"}))).await;
    let (status, body) = send(&app, Method::POST, &format!("{base}/compose"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("generate"));
}

#[tokio::test]
async fn rejected_style_edit_echoes_retained_style() {
    let (app, _) = app();
    let id = new_session(&app).await;
    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/compositions/{id}/style"),
        Some(json!({"qrColor": "#12345", "size": 256})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["style"], json!({"qrColor": "#000000", "bgColor": "#FFFFFF", "size": 300}));
}

#[tokio::test]
async fn generate_with_empty_text_is_bad_request() {
    let (app, _) = app();
    let id = new_session(&app).await;
    let (status, body) = send(&app, Method::POST, &format!("/api/compositions/{id}/generate"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No data provided");

    // The session is usable again afterwards.
    send(&app, Method::PUT, &format!("/api/compositions/{id}/text"), Some(json!({"text": "retry"}))).await;
    let (status, _) = send(&app, Method::POST, &format!("/api/compositions/{id}/generate"), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn logo_upload_and_invalid_logo_degrades() {
    let (app, _) = app();
    let id = new_session(&app).await;
    let base = format!("/api/compositions/{id}");
    send(&app, Method::PUT, &format!("{base}/text"), Some(json!({"text": "logo test"}))).await;
    send(&app, Method::POST, &format!("{base}/generate"), None).await;

    let upload = |bytes: Vec<u8>| {
        let boundary = "quickqr-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"logo\"; filename=\"logo.png\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(&bytes);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
        Request::builder()
            .method(Method::POST)
            .uri(format!("{base}/logo"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    };

    let logo = datauri::to_png(&RgbaImage::from_pixel(8, 8, Rgba([200, 0, 0, 255]))).unwrap();
    let response = app.clone().oneshot(upload(logo)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (_, body) = send(&app, Method::POST, &format!("{base}/compose"), None).await;
    assert_eq!(body["logoApplied"], true);

    let response = app.clone().oneshot(upload(b"not an image".to_vec())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let (status, body) = send(&app, Method::POST, &format!("{base}/compose"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["logoApplied"], false);
    assert!(body["warning"].as_str().unwrap().contains("Invalid logo"));

    let (status, body) = send(&app, Method::DELETE, &format!("{base}/logo"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hasLogo"], false);
}

#[tokio::test]
async fn concurrent_base_generation_is_conflict() {
    let (app, state) = app();
    let id = new_session(&app).await;
    let base = format!("/api/compositions/{id}");
    send(&app, Method::PUT, &format!("{base}/text"), Some(json!({"text": "busy"}))).await;

    let shared = state.session(&id).await.unwrap();
    let flag = shared.lock().await.generating.clone();
    let in_flight = InFlight::acquire(&flag).unwrap();

    let (status, body) = send(&app, Method::POST, &format!("{base}/generate"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, json!({"error": "A QR code generation is already in progress"}));

    drop(in_flight);
    let (status, _) = send(&app, Method::POST, &format!("{base}/generate"), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn malformed_wizard_requests_are_json_errors() {
    let (app, _) = app();
    let id = new_session(&app).await;

    let no_content_type = Request::put(format!("/api/compositions/{id}/text"))
        .body(Body::from(r#"{"text":"hi"}"#))
        .unwrap();
    let (status, body) = send_raw(&app, no_content_type).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(body["error"].is_string());

    let wrong_shape = Request::put(format!("/api/compositions/{id}/style"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"size":"large"}"#))
        .unwrap();
    let (status, body) = send_raw(&app, wrong_shape).await;
    assert!(status.is_client_error());
    assert!(body["error"].is_string());

    let (status, body) = send_raw(&app, Request::get("/api/history/first").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn unknown_frame_and_session_errors() {
    let (app, _) = app();
    let id = new_session(&app).await;
    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/compositions/{id}/frame"),
        Some(json!({"style": "scanThere"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::GET, "/api/compositions/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::DELETE, &format!("/api/compositions/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, Method::GET, &format!("/api/compositions/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn download_requires_composed_image() {
    let (app, _) = app();
    let id = new_session(&app).await;
    let base = format!("/api/compositions/{id}");

    let (status, _) = send(&app, Method::GET, &format!("{base}/download"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    send(&app, Method::PUT, &format!("{base}/text"), Some(json!({"text": "download me"}))).await;
    send(&app, Method::POST, &format!("{base}/generate"), None).await;
    send(&app, Method::POST, &format!("{base}/compose"), None).await;

    let response = app
        .clone()
        .oneshot(Request::get(format!("{base}/download")).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.starts_with("attachment; filename=\"quickqr-"));
}

// ============================================================================
// History
// ============================================================================

async fn seed_history(state: &AppState, n: usize) {
    let img = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
    let uri = datauri::encode_png(&img).unwrap();
    let mut history = state.history.write().await;
    for i in 0..n {
        history.append(HistoryEntry::new(format!("entry-{i}"), uri.clone()));
    }
}

#[tokio::test]
async fn history_restore_does_not_reorder() {
    let (app, state) = app();
    seed_history(&state, 5).await;

    let (status, body) = send(&app, Method::GET, "/api/history/2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], "entry-2");

    let (_, body) = send(&app, Method::GET, "/api/history", None).await;
    let data: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["data"].as_str().unwrap())
        .collect();
    assert_eq!(data, vec!["entry-4", "entry-3", "entry-2", "entry-1", "entry-0"]);

    let (status, _) = send(&app, Method::GET, "/api/history/5", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn history_remove_clear_and_download() {
    let (app, state) = app();
    seed_history(&state, 3).await;

    let response = app
        .clone()
        .oneshot(Request::get("/api/history/0/download").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");

    let (status, body) = send(&app, Method::DELETE, "/api/history/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], "entry-1");

    let (status, body) = send(&app, Method::DELETE, "/api/history", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"cleared": 2}));
    assert!(state.history.read().await.is_empty());
}

#[tokio::test]
async fn health_check() {
    let (app, _) = app();
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".into()));
}
