use std::time::Duration;

use anyhow::Result;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde_json::Value;

/// Body of a prediction call: a single natural-language question.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct Prediction {
    pub question: String,
}

impl Prediction {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    /// The request never produced a response: refused connection, DNS, timeout.
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("{status} for url: {url}")]
    Status {
        status: StatusCode,
        url: String,
        body: String,
    },

    #[error("invalid JSON in prediction response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClientError {
    /// True when the upstream could not be reached or refused the request,
    /// as opposed to answering with something we failed to understand.
    pub fn is_upstream(&self) -> bool {
        matches!(self, ClientError::Transport(_) | ClientError::Status { .. })
    }

    pub fn is_connect(&self) -> bool {
        match self {
            ClientError::Transport(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn prediction_url(&self, flow_id: &str) -> String {
        prediction_url(&self.base_url, flow_id)
    }

    pub async fn predict(&self, flow_id: &str, question: &str) -> Result<Value, ClientError> {
        self.predict_url(&self.prediction_url(flow_id), question)
            .await
    }

    /// Posts `{"question": ...}` to a fully built prediction endpoint and
    /// returns the response body as opaque JSON.
    pub async fn predict_url(&self, url: &str, question: &str) -> Result<Value, ClientError> {
        let response = self
            .http
            .post(url)
            .header(ACCEPT, "application/json")
            .json(&Prediction::new(question))
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!("Flowise returned {} with body {:?}", status, body);
            return Err(ClientError::Status {
                status,
                url: url.to_string(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// `{base}/api/v1/prediction/{flow_id}`, the endpoint of one Flowise flow.
pub fn prediction_url(base_url: &str, flow_id: &str) -> String {
    format!(
        "{}/api/v1/prediction/{}",
        base_url.trim_end_matches('/'),
        flow_id
    )
}

/// The human-readable answer Flowise conventionally puts under `text`.
pub fn answer_text(response: &Value) -> Option<&str> {
    response
        .get("text")
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
}
