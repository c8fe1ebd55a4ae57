pub mod config;
pub mod document;
pub mod error;
pub mod forward;
pub mod routes;

/// Body accepted by `/api/chat` and `/api/analysis`.
#[derive(serde::Deserialize, Debug, Clone, Default)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(serde::Serialize, Debug, Clone)]
pub struct ErrorResponse {
    pub error: String,
}
