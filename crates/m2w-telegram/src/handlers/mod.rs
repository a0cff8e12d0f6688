//! Telegram update handlers.
//!
//! Every message passes the redelivery guard first; commands and plain text
//! are then handled separately.

use std::sync::Arc;

use teloxide::{prelude::*, types::ParseMode};
use tracing::{debug, warn};

use m2w_core::{
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    Result,
};

use crate::router::AppState;

mod commands;
mod text;

pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let key = MessageRef {
        chat_id: ChatId(msg.chat.id.0),
        message_id: MessageId(msg.id.0),
    };
    if !state.dedup.lock().await.check(key) {
        debug!("dropping redelivered message {key:?}");
        return Ok(());
    }

    let Some(text) = msg.text() else {
        // Stickers, photos, locations: nothing to resolve.
        return Ok(());
    };

    if text.starts_with('/') {
        return commands::handle_command(bot, msg, state).await;
    }
    text::handle_text(bot, msg, state).await
}

/// Send an HTML reply; delivery failures are logged, never fatal to the loop.
pub(crate) async fn reply_html(bot: &Bot, chat_id: teloxide::types::ChatId, html: String) {
    if let Err(e) = send_html(bot, chat_id, html).await {
        warn!("failed to send reply to {}: {e}", chat_id.0);
    }
}

async fn send_html(bot: &Bot, chat_id: teloxide::types::ChatId, html: String) -> Result<()> {
    bot.send_message(chat_id, html)
        .parse_mode(ParseMode::Html)
        .await
        .map_err(|e| Error::External(format!("telegram error: {e}")))?;
    Ok(())
}
