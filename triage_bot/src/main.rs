use anyhow::Result;
use clap::Parser;
use flowise_client::Client;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use teloxide::prelude::*;
use tracing::instrument;

use triage_bot::{ask, render_history, ChatHistory, Turn};

const GREETING: &str = "🏥 HygieAI: Clinical Triage Assistant\n\
Describe your symptoms and I will try to help. /history shows this conversation, /reset clears it.";

#[derive(Parser, Debug)]
#[clap(about = "Telegram front for the HygieAI triage flow")]
struct Args {
    #[clap(long, env = "FLOWISE_API_URL", default_value = "http://localhost:3000")]
    flowise_api_url: String,
    #[clap(long, env = "TRIAGE_ID", default_value = "YOUR_DEFAULT_LOCAL_ID_HERE")]
    triage_id: String,
    #[clap(short, long, env = "TELOXIDE_TOKEN")]
    tg_token: Option<String>,
    #[clap(long, default_value_t = 30)]
    timeout: u64,
}

struct BotState {
    client: Client,
    flow_id: String,
    history: ChatHistory,
}

impl Debug for BotState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotState")
            .field("flowise", &self.client.base_url())
            .field("flow_id", &self.flow_id)
            .finish()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    tracing::info!(
        "Starting triage bot against Flowise at [{:?}]",
        args.flowise_api_url
    );

    let bot = match args.tg_token {
        Some(token) => Bot::new(token),
        None => {
            tracing::warn!("Telegram token is not provided, creating from env");
            Bot::from_env()
        }
    };
    let bot_info = bot.get_me().await?;
    tracing::info!("Started bot: {:?}", bot_info.user);

    let state = Arc::new(BotState {
        client: Client::new(&args.flowise_api_url, Duration::from_secs(args.timeout))?,
        flow_id: args.triage_id,
        history: ChatHistory::default(),
    });

    teloxide::repl(bot, move |bot: Bot, msg: Message| {
        let state = state.clone();
        async move {
            if let Err(e) = bot_msg_handler(bot, msg, state).await {
                tracing::error!("Error sending message: {:?}", e);
            }
            Ok(())
        }
    })
    .await;
    Ok(())
}

#[instrument(skip_all, fields(chat_id = msg.chat.id.0, user_text, reply_id))]
async fn bot_msg_handler(bot: Bot, msg: Message, state: Arc<BotState>) -> Result<Message> {
    let span = tracing::Span::current();
    let chat_id = msg.chat.id;

    let Some(text) = msg.text() else {
        return Ok(bot
            .send_message(chat_id, "Please describe your symptoms in a text message.")
            .send()
            .await?);
    };
    span.record("user_text", text);

    let reply = match text.trim() {
        "/start" => GREETING.to_string(),
        "/history" => render_history(&state.history.transcript(chat_id.0)),
        "/reset" => {
            state.history.reset(chat_id.0);
            "Conversation cleared.".to_string()
        }
        _ => {
            let history = state.history.transcript(chat_id.0);
            let answer = ask(&state.client, &state.flow_id, text, &history).await;
            state.history.record(
                chat_id.0,
                Turn {
                    user: text.to_string(),
                    bot: answer.clone(),
                },
            );
            answer
        }
    };

    let reply_msg = bot.send_message(chat_id, reply).send().await?;
    span.record("reply_id", reply_msg.id.0);

    tracing::info!("SUCCESS");
    Ok(reply_msg)
}
