use std::sync::Arc;

use teloxide::{prelude::*, types::ChatAction};
use tracing::{info, warn};

use m2w_core::{
    formatting::{format_found_reply, format_not_found_reply},
    location::ResolutionInput,
    ResolutionResult, Resolver,
};

use crate::{handlers::reply_html, router::AppState};

/// Longest prefix of a message that goes into the log.
const LOG_PREVIEW_CHARS: usize = 120;

pub async fn handle_text(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    if text.trim().is_empty() {
        return Ok(());
    }

    let username = msg
        .from()
        .and_then(|u| u.username.clone())
        .unwrap_or_else(|| "unknown".to_string());
    let preview: String = text.chars().take(LOG_PREVIEW_CHARS).collect();
    info!("message from {username}: {preview}");

    // Best-effort; expansion and geocoding can take a couple of seconds.
    let _ = bot
        .send_chat_action(msg.chat.id, ChatAction::FindLocation)
        .await;

    let reply = reply_for(&state.resolver, text).await;
    reply_html(&bot, msg.chat.id, reply).await;
    Ok(())
}

pub(crate) async fn reply_for(resolver: &Resolver, text: &str) -> String {
    match resolver.resolve(text).await {
        ResolutionResult::Found { coordinate, source } => {
            format_found_reply(&coordinate, source)
        }
        ResolutionResult::NotFound { tried } => {
            let summary: Vec<String> = tried
                .iter()
                .map(|t| format!("{}={}", t.strategy, t.reason))
                .collect();
            warn!("could not resolve message; tried {}", summary.join(", "));
            format_not_found_reply(&ResolutionInput::new(text))
        }
    }
}
