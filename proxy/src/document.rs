use axum::body::Bytes;
use lopdf::Document;

use crate::config::PROMPT_PLACEHOLDER;
use crate::error::ProxyError;

/// Text of every page in page order, joined with `\n`.
pub fn extract_text(data: &[u8]) -> Result<String, ProxyError> {
    let document = Document::load_mem(data).map_err(ProxyError::internal)?;

    let mut pages = Vec::new();
    for page_number in document.get_pages().keys() {
        let text = document
            .extract_text(&[*page_number])
            .map_err(ProxyError::internal)?;
        pages.push(text.trim_end_matches('\n').to_string());
    }
    tracing::debug!("Extracted text from {} pages", pages.len());
    Ok(pages.join("\n"))
}

/// Runs [`extract_text`] off the async workers; PDF parsing is CPU bound.
pub async fn extract_text_blocking(data: Bytes) -> Result<String, ProxyError> {
    tokio::task::spawn_blocking(move || extract_text(&data))
        .await
        .map_err(ProxyError::internal)?
}

pub fn render_prompt(template: &str, text: &str) -> String {
    template.replace(PROMPT_PLACEHOLDER, text)
}
