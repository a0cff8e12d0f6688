use std::sync::Arc;

use teloxide::prelude::*;
use tracing::info;

use m2w_core::formatting::{help_text, welcome_text};

use crate::{handlers::reply_html, router::AppState};

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

fn command_reply(cmd: &str, place_lookup_available: bool) -> String {
    match cmd {
        "start" => welcome_text(place_lookup_available),
        _ => help_text(),
    }
}

pub async fn handle_command(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let (cmd, _arg) = parse_command(text);
    let username = msg
        .from()
        .and_then(|u| u.username.clone())
        .unwrap_or_else(|| "unknown".to_string());
    info!("/{cmd} from {username}");

    let body = command_reply(&cmd, state.place_lookup_available());
    reply_html(&bot, msg.chat.id, body).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_command_with_bot_suffix() {
        assert_eq!(
            parse_command("/Start@m2w_bot now"),
            ("start".to_string(), "now".to_string())
        );
        assert_eq!(parse_command("/help"), ("help".to_string(), String::new()));
    }

    #[test]
    fn unknown_commands_get_help() {
        assert_eq!(command_reply("menu", true), help_text());
        assert_eq!(command_reply("start", false), welcome_text(false));
    }
}
