// Shared helpers for the proxy integration tests
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    extract::{Path, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use clap::Parser;
use flowise_client::Prediction;
use http_body_util::BodyExt;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower::ServiceExt;

use proxy::config::{Args, Config};
use proxy::forward::Forwarder;
use proxy::routes;

pub const TRIAGE_FLOW: &str = "triage-flow";
pub const ANALYSIS_FLOW: &str = "analysis-flow";
/// Flow id the mock answers with HTTP 500.
pub const FAILING_FLOW: &str = "failing-flow";
/// Flow id the mock answers with a 200 that is not JSON.
pub const GARBLED_FLOW: &str = "garbled-flow";
/// Flow id the mock answers only after [`SLOW_FLOW_DELAY`].
pub const SLOW_FLOW: &str = "slow-flow";
pub const SLOW_FLOW_DELAY: Duration = Duration::from_secs(3);

pub const BOUNDARY: &str = "hygieai-test-boundary";

/// In-process stand-in for Flowise's prediction API. Every call is recorded
/// as `(flow_id, question)` and answered with `{"text": "<flow_id>: <question>"}`.
#[derive(Clone, Default)]
pub struct MockFlowise {
    calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockFlowise {
    pub async fn start() -> (Self, String) {
        let mock = MockFlowise::default();
        let app = Router::new()
            .route("/api/v1/prediction/:flow_id", post(prediction_handler))
            .with_state(mock.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (mock, format!("http://{}", addr))
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

async fn prediction_handler(
    State(mock): State<MockFlowise>,
    Path(flow_id): Path<String>,
    Json(prediction): Json<Prediction>,
) -> Response {
    mock.calls
        .lock()
        .unwrap()
        .push((flow_id.clone(), prediction.question.clone()));

    match flow_id.as_str() {
        FAILING_FLOW => (StatusCode::INTERNAL_SERVER_ERROR, "flow crashed").into_response(),
        GARBLED_FLOW => (StatusCode::OK, "<html>oops</html>").into_response(),
        SLOW_FLOW => {
            tokio::time::sleep(SLOW_FLOW_DELAY).await;
            Json(json!({"text": "too late"})).into_response()
        }
        _ => Json(json!({
            "text": format!("{}: {}", flow_id, prediction.question),
            "chatId": "chat-1",
        }))
        .into_response(),
    }
}

/// A base URL nothing is listening on.
pub fn unreachable_base_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

pub fn app(base_url: &str, triage_id: &str, analysis_id: &str) -> Router {
    app_with_timeout(base_url, triage_id, analysis_id, 5)
}

pub fn app_with_timeout(
    base_url: &str,
    triage_id: &str,
    analysis_id: &str,
    timeout_secs: u64,
) -> Router {
    let timeout = timeout_secs.to_string();
    let args = Args::try_parse_from([
        "proxy",
        "--flowise-api-url",
        base_url,
        "--triage-id",
        triage_id,
        "--analysis-id",
        analysis_id,
        "--timeout",
        &timeout,
        "--upload-prompt",
        "Raporu analiz et:\n{text}",
    ])
    .unwrap();
    let config = Config::from_args(args).unwrap();
    routes::app(Forwarder::new(config).unwrap())
}

pub fn default_app(base_url: &str) -> Router {
    app(base_url, TRIAGE_FLOW, ANALYSIS_FLOW)
}

pub fn json_request(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn multipart_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

/// One-part multipart body.
pub fn multipart_body(field_name: &str, file_name: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field_name, file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/pdf\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes: Bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

/// Builds a PDF with one page per entry; an empty entry gives a page with no
/// text operators at all.
pub fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let operations = if text.is_empty() {
            vec![]
        } else {
            vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![100.into(), 600.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ]
        };
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}
