use crate::config::Config;
use crate::error::ProxyError;
use flowise_client::Client;

use anyhow::Result;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// Which configured Flowise pipeline a request goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Triage,
    Analysis,
}

impl Flow {
    pub fn name(&self) -> &'static str {
        match self {
            Flow::Triage => "triage",
            Flow::Analysis => "analysis",
        }
    }
}

#[derive(Clone)]
pub struct Forwarder {
    config: Arc<Config>,
    client: Client,
}

impl Forwarder {
    pub fn new(config: Config) -> Result<Self> {
        let client = Client::new(&config.base_url, config.timeout)?;
        Ok(Self {
            config: Arc::new(config),
            client,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn endpoint(&self, flow: Flow) -> String {
        match flow {
            Flow::Triage => self.config.triage_url(),
            Flow::Analysis => self.config.analysis_url(),
        }
    }

    /// Sends `question` to the flow's endpoint and hands back whatever JSON
    /// Flowise answered with. No retries: the first failure is returned.
    #[instrument(skip_all, fields(flow = flow.name(), question_len = question.len()))]
    pub async fn forward(&self, flow: Flow, question: &str) -> Result<Value, ProxyError> {
        let url = self.endpoint(flow);
        let start = Instant::now();
        let result = self.client.predict_url(&url, question).await;
        let elapsed = start.elapsed();

        match &result {
            Ok(_) => tracing::info!("Flowise answered in {:?}", elapsed),
            Err(e) => tracing::warn!("Flowise call to {} failed after {:?}: {}", url, elapsed, e),
        }
        Ok(result?)
    }
}
