use axum::{
    body::Bytes,
    extract::{
        multipart::MultipartRejection, rejection::JsonRejection, DefaultBodyLimit, Multipart,
        State,
    },
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::instrument;

use crate::document;
use crate::error::ProxyError;
use crate::forward::{Flow, Forwarder};
use crate::ChatRequest;

const FILE_FIELD: &str = "file";

pub fn app(forwarder: Forwarder) -> Router {
    let body_limit = forwarder.config().max_upload_bytes;

    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/analysis", post(analysis))
        .route("/api/upload", post(upload))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(forwarder)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

#[instrument(skip_all)]
async fn chat(
    State(forwarder): State<Forwarder>,
    request: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<Value>, ProxyError> {
    relay_message(&forwarder, Flow::Triage, request).await
}

#[instrument(skip_all)]
async fn analysis(
    State(forwarder): State<Forwarder>,
    request: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<Value>, ProxyError> {
    relay_message(&forwarder, Flow::Analysis, request).await
}

async fn relay_message(
    forwarder: &Forwarder,
    flow: Flow,
    request: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<Value>, ProxyError> {
    let Json(request) = request.map_err(|e| ProxyError::validation(e.body_text()))?;
    let message = request
        .message
        .filter(|message| !message.is_empty())
        .ok_or_else(|| ProxyError::validation("Message is required"))?;

    tracing::info!("Relaying {} chars to the {} flow", message.len(), flow.name());
    let response = forwarder.forward(flow, &message).await?;
    Ok(Json(response))
}

#[instrument(skip_all)]
async fn upload(
    State(forwarder): State<Forwarder>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, ProxyError> {
    let mut multipart = multipart.map_err(|_| ProxyError::validation("No file part"))?;
    let (file_name, data) = read_file_field(&mut multipart)
        .await?
        .ok_or_else(|| ProxyError::validation("No file part"))?;
    if file_name.is_empty() {
        return Err(ProxyError::validation("No selected file"));
    }

    tracing::info!("Extracting text from {} ({} bytes)", file_name, data.len());
    let text = document::extract_text_blocking(data).await?;
    if text.trim().is_empty() {
        return Err(ProxyError::validation("Could not extract text from the PDF"));
    }

    let prompt = document::render_prompt(&forwarder.config().upload_prompt, &text);
    let response = forwarder
        .forward(Flow::Analysis, &prompt)
        .await
        .map_err(ProxyError::into_internal)?;
    Ok(Json(response))
}

/// Returns the filename and contents of the first `file` field, skipping any
/// other form fields.
async fn read_file_field(
    multipart: &mut Multipart,
) -> Result<Option<(String, Bytes)>, ProxyError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ProxyError::validation(e.body_text()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ProxyError::validation(e.body_text()))?;
        return Ok(Some((file_name, data)));
    }
    Ok(None)
}
