//! Reply texts (Telegram HTML parse mode) and the Waze navigation link.

use crate::location::{format_dms, GeoCoordinate, ResolutionInput, StrategyKind};

const EXAMPLES: &str = "• https://maps.app.goo.gl/...\n\
• https://maps.google.com/...\n\
• 40.7128, -74.0060\n\
• 31°44'49.8\"N 35°01'46.6\"E";

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub fn waze_link(coordinate: &GeoCoordinate) -> String {
    format!(
        "https://waze.com/ul?ll={},{}&navigate=yes",
        coordinate.latitude(),
        coordinate.longitude()
    )
}

pub fn format_found_reply(coordinate: &GeoCoordinate, source: StrategyKind) -> String {
    let link = waze_link(coordinate);
    let mut out = format!(
        "✅ <b>Location found</b>\n\n\
         📍 <code>{}, {}</code>\n\
         🧭 {}\n\
         🔎 <i>via {}</i>\n\n\
         🚗 <a href=\"{}\">Open in Waze</a>\n{}",
        coordinate.latitude(),
        coordinate.longitude(),
        escape_html(&format_dms(coordinate)),
        source,
        escape_html(&link),
        escape_html(&link),
    );
    if source.is_low_confidence() {
        out.push_str(
            "\n\n⚠️ These coordinates were guessed from numbers in the link. \
             Please double-check the pin before driving.",
        );
    }
    out
}

/// Tailored to what the user sent so the hint is actionable.
pub fn format_not_found_reply(input: &ResolutionInput) -> String {
    let hint = if input.is_short_link() {
        "🔗 Short link detected, but it could not be opened.\n\n\
         Try opening it in a browser, tap <b>Share</b> → <b>Copy link</b> \
         and send the full link."
    } else if input.looks_like_url() {
        "❌ Could not find coordinates in this link.\n\n\
         It may be a place link without an exact position. \
         Try <b>Share</b> → <b>Copy link</b> from the place page."
    } else {
        "❌ Could not understand your message."
    };
    format!("{hint}\n\nYou can send:\n{}", escape_html(EXAMPLES))
}

pub fn welcome_text(place_lookup_available: bool) -> String {
    let status = if place_lookup_available {
        "✅ Place lookup available"
    } else {
        "❌ Place lookup unavailable (exact coordinates only)"
    };
    format!(
        "Hello! 👋\n\n\
         I convert Google Maps links and coordinates into Waze links.\n\n\
         📡 {status}\n\n\
         Send me:\n\
         • a Google Maps link (short links too)\n\
         • decimal coordinates (lat, lng)\n\
         • DMS coordinates\n\n\
         Examples:\n{}",
        escape_html(EXAMPLES)
    )
}

pub fn help_text() -> String {
    format!(
        "<b>How to use</b>\n\n\
         1. Send a Google Maps link or coordinates\n\
         2. Get a Waze link\n\n\
         <b>Supported formats</b>\n\
         • https://www.google.com/maps/...\n\
         • https://goo.gl/maps/...\n\
         {}\n\n\
         <b>Commands</b>\n\
         /start - Start using the bot\n\
         /help - Show this message",
        escape_html(EXAMPLES)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nyc() -> GeoCoordinate {
        GeoCoordinate::new(40.7128, -74.006).unwrap()
    }

    #[test]
    fn escapes_html() {
        let s = r#"<a href="x&y">"#;
        assert_eq!(escape_html(s), "&lt;a href=&quot;x&amp;y&quot;&gt;");
    }

    #[test]
    fn builds_waze_link() {
        assert_eq!(
            waze_link(&nyc()),
            "https://waze.com/ul?ll=40.7128,-74.006&navigate=yes"
        );
    }

    #[test]
    fn found_reply_names_strategy_and_escapes_link() {
        let reply = format_found_reply(&nyc(), StrategyKind::UrlZoom);
        assert!(reply.contains("<code>40.7128, -74.006</code>"));
        assert!(reply.contains("via URLZoom"));
        assert!(reply.contains("ll=40.7128,-74.006&amp;navigate=yes"));
        assert!(reply.contains("40°42'46.08&quot;N"));
        assert!(!reply.contains("double-check"));
    }

    #[test]
    fn low_confidence_reply_asks_for_confirmation() {
        let reply = format_found_reply(&nyc(), StrategyKind::UrlFallbackScan);
        assert!(reply.contains("double-check"));
    }

    #[test]
    fn not_found_reply_depends_on_input() {
        let short = format_not_found_reply(&ResolutionInput::new("https://maps.app.goo.gl/x"));
        assert!(short.contains("Short link"));

        let url = format_not_found_reply(&ResolutionInput::new("https://www.google.com/maps"));
        assert!(url.contains("in this link"));

        let text = format_not_found_reply(&ResolutionInput::new("hello"));
        assert!(text.contains("Could not understand"));
        assert!(text.contains("35°01'46.6&quot;E"));
    }

    #[test]
    fn welcome_reports_place_lookup_status() {
        assert!(welcome_text(true).contains("Place lookup available"));
        assert!(welcome_text(false).contains("unavailable"));
        assert!(help_text().contains("/help"));
    }
}
