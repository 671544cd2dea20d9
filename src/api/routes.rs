//! REST endpoints: health, service metadata, demo scenarios, and `/process`.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, State, rejection::BytesRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use super::scenarios::demo_catalog;
use crate::pipeline::DocumentPipeline;
use crate::pipeline::orchestrator::DEFAULT_SUBJECT;

/// Largest `/process` body accepted.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<DocumentPipeline>,
}

/// Build the Axum router. CORS is wide open for the browser front end.
pub fn api_routes(pipeline: Arc<DocumentPipeline>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/demo-scenarios", get(demo_scenarios))
        .route("/process", post(process))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(AppState { pipeline })
}

/// Bind on all interfaces and serve until the process exits.
pub async fn serve(port: u16, pipeline: Arc<DocumentPipeline>) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "HTTP server started");
    axum::serve(listener, api_routes(pipeline)).await
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({
            "success": false,
            "error": message.into(),
        })),
    )
        .into_response()
}

// ── Metadata ────────────────────────────────────────────────────────────

async fn index() -> impl IntoResponse {
    Json(json!({
        "service": "Personalized Document Response System",
        "description": "3-LLM Agent Pipeline for Secure Document Requests",
        "status": "running",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "/process": "POST - Process email and generate response with agent steps",
            "/demo-scenarios": "GET - Get pre-configured demo scenarios",
            "/health": "GET - Health check"
        },
        "agents": [
            "🔍 Doc Finder - Analyzes requests and finds documents",
            "🔒 Security Check - Verifies user permissions",
            "✍️ Response Generator - Crafts personalized email responses"
        ]
    }))
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

async fn demo_scenarios() -> impl IntoResponse {
    Json(demo_catalog())
}

// ── Processing ──────────────────────────────────────────────────────────

/// Validated `/process` payload.
#[derive(Debug, PartialEq, Eq)]
struct ProcessPayload {
    sender: String,
    subject: String,
    body: String,
}

/// Validate the raw request body. The error is the 400 message.
fn parse_payload(raw: &[u8]) -> Result<ProcessPayload, &'static str> {
    let value: Value = serde_json::from_slice(raw).map_err(|_| "No JSON data provided")?;
    let object = value.as_object().ok_or("No JSON data provided")?;

    let text = |field: &str| {
        object
            .get(field)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let sender = text("sender").ok_or("sender field is required")?;
    let body = text("body").ok_or("body field is required")?;
    let subject = object
        .get("subject")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| DEFAULT_SUBJECT.to_string());

    Ok(ProcessPayload {
        sender,
        subject,
        body,
    })
}

async fn process(
    State(state): State<AppState>,
    raw: Result<Bytes, BytesRejection>,
) -> Response {
    let raw = match raw {
        Ok(raw) => raw,
        Err(rejection) => {
            warn!(status = %rejection.status(), "Could not read /process body");
            return error_response(rejection.status(), rejection.body_text());
        }
    };

    let payload = match parse_payload(&raw) {
        Ok(payload) => payload,
        Err(message) => {
            warn!(reason = message, "Rejected /process request");
            return error_response(StatusCode::BAD_REQUEST, message);
        }
    };

    match state
        .pipeline
        .run(&payload.sender, &payload.subject, &payload.body)
        .await
    {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => {
            error!(error = %e, sender = %payload.sender, "Pipeline failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
