//! HTTP surface.
//!
//! - `GET  /`            — liveness message
//! - `POST /upload-pdf/` — multipart PDF in, per-page OCR blocks out
//!
//! Every failure inside the upload handler is caught here and mapped to a
//! JSON `{"message": ...}` body: 400 for a rejected upload, 500 for anything
//! that went wrong while processing.

use crate::config::{CorsPolicy, ServerConfig};
use crate::error::PdfOcrError;
use crate::pipeline::assemble::OcrResponse;
use crate::pipeline::ocr::OcrEngine;
use crate::pipeline::render::Rasteriser;
use crate::pipeline::upload;
use crate::process;
use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Shared application state.
///
/// The rasteriser and OCR engine are built once at startup and shared by
/// every request.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    rasteriser: Arc<dyn Rasteriser>,
    engine: Arc<dyn OcrEngine>,
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        rasteriser: Arc<dyn Rasteriser>,
        engine: Arc<dyn OcrEngine>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                rasteriser,
                engine,
            }),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    pub fn rasteriser(&self) -> &Arc<dyn Rasteriser> {
        &self.inner.rasteriser
    }

    pub fn engine(&self) -> &Arc<dyn OcrEngine> {
        &self.inner.engine
    }
}

/// JSON body of every non-result response.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Build the application router with CORS, tracing and the body limit applied.
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config().cors);
    let body_limit = state.config().max_upload_bytes;

    Router::new()
        .route("/", get(root))
        .route("/upload-pdf/", post(upload_pdf))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Build the CORS layer for a policy.
///
/// Credentials are allowed in both modes, so origins, methods and headers are
/// mirrored from the request instead of answered with `*`.
pub fn cors_layer(policy: &CorsPolicy) -> CorsLayer {
    let origin = match policy {
        CorsPolicy::Permissive => AllowOrigin::mirror_request(),
        CorsPolicy::AllowList(origins) => AllowOrigin::list(
            origins
                .iter()
                .filter_map(|o| HeaderValue::from_str(o).ok())
                .collect::<Vec<_>>(),
        ),
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// GET /
async fn root() -> Json<MessageResponse> {
    Json(MessageResponse::new("Server is working!"))
}

/// POST /upload-pdf/
///
/// A body axum cannot open as multipart is answered like any other rejected
/// upload, with the JSON 400 body.
async fn upload_pdf(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let result = match multipart {
        Ok(mut multipart) => handle_upload(&state, &mut multipart).await,
        Err(rejection) => Err(PdfOcrError::MalformedUpload(rejection.body_text())),
    };

    match result {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => error_response(&e, state.config().expose_error_detail),
    }
}

async fn handle_upload(
    state: &AppState,
    multipart: &mut Multipart,
) -> Result<OcrResponse, PdfOcrError> {
    let config = state.config();
    let upload = upload::read_upload(multipart, config.max_upload_bytes).await?;
    info!("Processing '{}' ({} bytes)", upload.filename, upload.bytes.len());

    process::process_pdf(
        upload.bytes,
        state.rasteriser(),
        state.engine(),
        config.dpi,
        &config.temp_dir,
    )
    .await
}

/// Map an error to its JSON response, logging it on the way out.
pub fn error_response(e: &PdfOcrError, expose_detail: bool) -> Response {
    if e.is_validation() {
        warn!("Rejected upload: {}", e);
    } else {
        error!("An error occurred: {}", e);
    }

    (
        e.status_code(),
        Json(MessageResponse::new(e.client_message(expose_detail))),
    )
        .into_response()
}
