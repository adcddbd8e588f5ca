//! HTTP API server.
//!
//! Exposes the question-answering and PDF upload endpoints as a JSON
//! HTTP API suitable for a browser widget or any other client.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/ask` | Answer a question from the indexed chunks |
//! | `POST` | `/upload_pdf` | Ingest an uploaded PDF (multipart field `pdf_file`) |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! Error responses are `{ "error": "<message>" }` with a small fixed set
//! of messages distinguishing "service unavailable", "bad request", and
//! "internal error" — never a stack trace.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support
//! browser-based clients.
//!
//! # Availability
//!
//! The application context is built once at startup. If initialization
//! fails (missing credentials, unreachable index), the server still
//! starts and every `/ask` and `/upload_pdf` call fails fast with the
//! service-unavailable message.

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::context::AppContext;
use crate::error::PipelineError;
use crate::extract;
use crate::pipeline::{content_hash, draft_from_pdf, UploadError, UploadOutcome};

const MSG_UNAVAILABLE: &str = "The service is not available. Please try again later.";
const MSG_NO_QUESTION: &str = "No question provided in the request body.";
const MSG_GENERATION_FAILED: &str =
    "Sorry, a response could not be generated due to an internal error.";
const MSG_NO_FILE: &str = "No PDF file provided.";
const MSG_EMPTY_FILENAME: &str = "Empty PDF filename.";
const MSG_NOT_PDF: &str = "The file must be a PDF.";
const MSG_NO_TEXT: &str = "The PDF file contains no extractable text.";
const MSG_DUPLICATE: &str = "This document has already been processed.";
const MSG_INGESTED: &str = "PDF processed and news record saved successfully.";
const MSG_SAVED_NOT_EMBEDDED: &str =
    "PDF saved to the record store, but embedding into the vector index failed.";
const MSG_NOT_SAVED: &str = "Failed to save the PDF to the record store.";

/// Shared application state: the initialized context, or the reason
/// initialization failed.
#[derive(Clone)]
pub enum ServiceState {
    Ready(Arc<AppContext>),
    Unavailable { reason: String },
}

impl ServiceState {
    fn context(&self) -> Result<Arc<AppContext>, AppError> {
        match self {
            ServiceState::Ready(ctx) => Ok(ctx.clone()),
            ServiceState::Unavailable { reason } => {
                tracing::error!(reason = %reason, "request received but service never initialized");
                Err(AppError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: MSG_UNAVAILABLE.to_string(),
                })
            }
        }
    }
}

/// Starts the HTTP server, binding to `[server].bind`.
///
/// Runs until the process is terminated. Context initialization failure
/// is not fatal: the server serves the unavailable state instead.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let state = match AppContext::initialize(config).await {
        Ok(ctx) => ServiceState::Ready(Arc::new(ctx)),
        Err(e) => {
            tracing::error!(error = %e, "fatal error during service initialization");
            ServiceState::Unavailable {
                reason: e.to_string(),
            }
        }
    };

    let app = build_router(state);

    tracing::info!(bind = %config.server.bind, "server listening");

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the router over a prepared state. Split out from
/// [`run_server`] so tests can drive the routes against fake
/// collaborators.
pub fn build_router(state: ServiceState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ask", post(handle_ask))
        .route("/upload_pdf", post(handle_upload_pdf))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(32 * 1024 * 1024))
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

/// JSON error response body: `{ "error": "<message>" }`.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

struct AppError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: &str) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        message: message.to_string(),
    }
}

fn internal(message: &str) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: message.to_string(),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /ask ============

#[derive(Deserialize)]
struct AskRequest {
    #[serde(default)]
    question: Option<String>,
}

#[derive(Serialize)]
struct AskResponse {
    answer: String,
}

async fn handle_ask(
    State(state): State<ServiceState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError> {
    let ctx = state.context()?;

    let question = request.question.unwrap_or_default();
    if question.trim().is_empty() {
        return Err(bad_request(MSG_NO_QUESTION));
    }

    tracing::info!(question = %question, "question received");

    match ctx.answerer.answer(&question).await {
        Ok(answer) => Ok(Json(AskResponse { answer })),
        Err(PipelineError::InvalidInput(_)) => Err(bad_request(MSG_NO_QUESTION)),
        Err(e) => {
            tracing::error!(error = %e, "failed to answer question");
            Err(internal(MSG_GENERATION_FAILED))
        }
    }
}

// ============ POST /upload_pdf ============

#[derive(Serialize)]
struct UploadResponse {
    message: String,
    news_id: String,
}

async fn handle_upload_pdf(
    State(state): State<ServiceState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let ctx = state.context()?;

    let mut file: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| bad_request(MSG_NO_FILE))?
    {
        if field.name() == Some("pdf_file") {
            let filename = field.file_name().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|_| bad_request(MSG_NO_FILE))?
                .to_vec();
            file = Some((filename, bytes));
            break;
        }
    }

    let Some((filename, bytes)) = file else {
        tracing::warn!("upload request without a pdf_file field");
        return Err(bad_request(MSG_NO_FILE));
    };

    if filename.is_empty() {
        return Err(bad_request(MSG_EMPTY_FILENAME));
    }
    if !filename.to_lowercase().ends_with(".pdf") {
        tracing::warn!(filename = %filename, "rejected non-PDF upload");
        return Err(bad_request(MSG_NOT_PDF));
    }

    // Dedup before extraction: byte-identical re-uploads short-circuit.
    let hash = content_hash(&bytes);
    if let Some(news_id) = ctx.pipeline.check_duplicate(&hash).await {
        return Ok(Json(UploadResponse {
            message: MSG_DUPLICATE.to_string(),
            news_id,
        }));
    }

    let text = extract::extract_pdf_text(&bytes).map_err(|e| {
        tracing::error!(filename = %filename, error = %e, "PDF extraction failed");
        bad_request(MSG_NO_TEXT)
    })?;
    if text.trim().is_empty() {
        tracing::warn!(filename = %filename, "PDF contains no extractable text");
        return Err(bad_request(MSG_NO_TEXT));
    }

    let draft = draft_from_pdf(&filename, text, hash);

    match ctx.pipeline.ingest_document(draft).await {
        Ok(UploadOutcome::Duplicate { news_id }) => Ok(Json(UploadResponse {
            message: MSG_DUPLICATE.to_string(),
            news_id,
        })),
        Ok(UploadOutcome::Ingested { news_id, .. }) => {
            tracing::info!(filename = %filename, news_id = %news_id, "PDF ingested");
            Ok(Json(UploadResponse {
                message: MSG_INGESTED.to_string(),
                news_id,
            }))
        }
        Err(UploadError::SavedNotEmbedded { news_id, source }) => {
            tracing::error!(news_id = %news_id, error = %source, "PDF saved but not embedded");
            Err(internal(MSG_SAVED_NOT_EMBEDDED))
        }
        Err(UploadError::NotSaved(source)) => {
            tracing::error!(error = %source, "failed to save PDF record");
            Err(internal(MSG_NOT_SAVED))
        }
    }
}
