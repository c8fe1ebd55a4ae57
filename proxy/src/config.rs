use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;

pub const PROMPT_PLACEHOLDER: &str = "{text}";

pub const DEFAULT_UPLOAD_PROMPT: &str = "Aşağıda bir tıbbi raporun metni yer almaktadır. \
Lütfen raporu analiz et, önemli bulguları ve anormal değerleri açıkla ve hastanın \
anlayabileceği sade bir dille özetle.\n\nRapor metni:\n{text}";

#[derive(Parser, Debug, Clone)]
#[clap(about = "HTTP proxy between the HygieAI frontend and Flowise")]
pub struct Args {
    #[clap(short, long, env = "PROXY_ADDRESS", default_value = "0.0.0.0:5000")]
    pub address: String,
    #[clap(long, env = "FLOWISE_API_URL", default_value = "http://localhost:3000")]
    pub flowise_api_url: String,
    #[clap(
        long,
        env = "TRIAGE_ID",
        default_value = "682f7ed3-3b0f-436c-b907-7bc7d6e706f9"
    )]
    pub triage_id: String,
    #[clap(
        long,
        env = "ANALYSIS_ID",
        default_value = "00000000-0000-0000-0000-000000000000"
    )]
    pub analysis_id: String,
    /// Seconds to wait for Flowise before giving up on a request.
    #[clap(long, env = "FLOWISE_TIMEOUT", default_value_t = 30)]
    pub timeout: u64,
    #[clap(long, env = "MAX_UPLOAD_MB", default_value_t = 16)]
    pub max_upload_mb: usize,
    /// Prompt wrapped around extracted document text; must contain `{text}`.
    #[clap(long, env = "UPLOAD_PROMPT", default_value = DEFAULT_UPLOAD_PROMPT)]
    pub upload_prompt: String,
}

/// Process-wide settings, built once at startup and read-only afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    pub address: String,
    pub base_url: String,
    pub triage_id: String,
    pub analysis_id: String,
    pub timeout: Duration,
    pub max_upload_bytes: usize,
    pub upload_prompt: String,
}

impl Config {
    pub fn from_args(args: Args) -> Result<Self> {
        let base_url = args.flowise_api_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            bail!("FLOWISE_API_URL must not be empty");
        }
        if !args.upload_prompt.contains(PROMPT_PLACEHOLDER) {
            bail!("upload prompt must contain the {PROMPT_PLACEHOLDER} placeholder");
        }
        if args.timeout == 0 {
            bail!("timeout must be at least one second");
        }

        let max_upload_bytes = match args.max_upload_mb.checked_mul(1024 * 1024) {
            Some(bytes) => bytes,
            None => bail!("max upload size of {} MB is too large", args.max_upload_mb),
        };

        Ok(Self {
            address: args.address,
            base_url,
            triage_id: args.triage_id,
            analysis_id: args.analysis_id,
            timeout: Duration::from_secs(args.timeout),
            max_upload_bytes,
            upload_prompt: args.upload_prompt,
        })
    }

    pub fn triage_url(&self) -> String {
        flowise_client::prediction_url(&self.base_url, &self.triage_id)
    }

    pub fn analysis_url(&self) -> String {
        flowise_client::prediction_url(&self.base_url, &self.analysis_id)
    }
}
