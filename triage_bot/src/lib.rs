use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use flowise_client::{answer_text, Client};

/// Turns kept per chat; older ones are dropped first.
pub const MAX_TURNS: usize = 50;

pub const EMPTY_RESPONSE: &str = "⚠️ Error: Received empty response from Flowise.";

/// One exchange of a conversation, as shown back to the user.
#[derive(serde::Serialize, Debug, Clone, PartialEq)]
pub struct Turn {
    pub user: String,
    pub bot: String,
}

/// Per-chat transcripts, kept in memory only.
#[derive(Clone, Default)]
pub struct ChatHistory {
    chats: Arc<Mutex<HashMap<i64, Vec<Turn>>>>,
}

impl ChatHistory {
    pub fn transcript(&self, chat_id: i64) -> Vec<Turn> {
        self.chats
            .lock()
            .map(|chats| chats.get(&chat_id).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    pub fn record(&self, chat_id: i64, turn: Turn) {
        if let Ok(mut chats) = self.chats.lock() {
            let turns = chats.entry(chat_id).or_default();
            turns.push(turn);
            if turns.len() > MAX_TURNS {
                let excess = turns.len() - MAX_TURNS;
                turns.drain(..excess);
            }
        }
    }

    pub fn reset(&self, chat_id: i64) {
        if let Ok(mut chats) = self.chats.lock() {
            chats.remove(&chat_id);
        }
    }
}

pub fn connection_error(base_url: &str) -> String {
    format!(
        "⚠️ Connection Error: Could not connect to Flowise at '{}'.\nEnsure the backend container is running.",
        base_url
    )
}

/// Asks the triage flow and returns the text to show the user. Failures are
/// turned into user-facing messages rather than errors.
///
/// `history` is accepted for display purposes only; Flowise receives nothing
/// but the current `message`.
pub async fn ask(client: &Client, flow_id: &str, message: &str, history: &[Turn]) -> String {
    tracing::debug!("Asking flow {} with {} earlier turns", flow_id, history.len());

    match client.predict(flow_id, message).await {
        Ok(response) => answer_text(&response)
            .map(str::to_string)
            .unwrap_or_else(|| EMPTY_RESPONSE.to_string()),
        Err(e) if e.is_connect() => {
            tracing::warn!("Flowise unreachable: {}", e);
            connection_error(client.base_url())
        }
        Err(e) => {
            tracing::error!("Flowise call failed: {}", e);
            format!("System Error: {}", e)
        }
    }
}

pub fn render_history(turns: &[Turn]) -> String {
    if turns.is_empty() {
        return "No messages yet.".to_string();
    }
    turns
        .iter()
        .map(|turn| format!("You: {}\nHygieAI: {}", turn.user, turn.bot))
        .collect::<Vec<_>>()
        .join("\n\n")
}
