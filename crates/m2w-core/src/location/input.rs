/// Redirect services that must be expanded over the network.
const SHORT_LINK_MARKERS: &[&str] = &["maps.app.goo.gl", "goo.gl/maps", "g.co/kgs", "g.page/"];

/// Scheme-less prefixes that users paste as map links.
const MAP_HOST_PREFIXES: &[&str] = &[
    "maps.google.",
    "www.google.com/maps",
    "google.com/maps",
    "maps.app.goo.gl/",
    "goo.gl/maps",
    "g.co/kgs/",
];

const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '>', '"', '\''];

/// The user's message plus its classification, computed once per call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolutionInput {
    raw: String,
    url: Option<String>,
    outside_url: String,
    short_link: bool,
}

impl ResolutionInput {
    pub fn new(text: &str) -> Self {
        let (url, outside_url) = match extract_url(text) {
            Some((url, token)) => (Some(url), without_token(text, token)),
            None => (None, text.to_string()),
        };
        let short_link = url.as_deref().map(is_short_link).unwrap_or(false);
        Self {
            raw: text.to_string(),
            url,
            outside_url,
            short_link,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The message with the URL token removed; the whole message if it has no URL.
    pub fn outside_url(&self) -> &str {
        &self.outside_url
    }

    /// The URL token found in the message, if any.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn looks_like_url(&self) -> bool {
        self.url.is_some()
    }

    pub fn is_short_link(&self) -> bool {
        self.short_link
    }
}

pub fn is_short_link(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    SHORT_LINK_MARKERS.iter().any(|m| lower.contains(m))
}

/// The URL found in `text` and the index of the whitespace token carrying it.
fn extract_url(text: &str) -> Option<(String, usize)> {
    for (i, token) in text.split_whitespace().enumerate() {
        // ASCII lowercasing keeps byte offsets stable.
        let lower = token.to_ascii_lowercase();
        if let Some(idx) = lower.find("https://").or_else(|| lower.find("http://")) {
            let url = token[idx..].trim_end_matches(TRAILING_PUNCTUATION);
            if url.len() > "https://".len() {
                return Some((url.to_string(), i));
            }
        }
    }

    text.split_whitespace().enumerate().find_map(|(i, token)| {
        let lower = token.to_ascii_lowercase();
        MAP_HOST_PREFIXES.iter().any(|p| lower.starts_with(p)).then(|| {
            (
                format!("https://{}", token.trim_end_matches(TRAILING_PUNCTUATION)),
                i,
            )
        })
    })
}

fn without_token(text: &str, skip: usize) -> String {
    text.split_whitespace()
        .enumerate()
        .filter(|(i, _)| *i != skip)
        .map(|(_, token)| token)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_coordinates_are_not_url_shaped() {
        let input = ResolutionInput::new("40.7128, -74.0060");
        assert!(!input.looks_like_url());
        assert!(!input.is_short_link());
        assert_eq!(input.raw(), "40.7128, -74.0060");
    }

    #[test]
    fn extracts_url_from_prose() {
        let input = ResolutionInput::new("Meet here: https://maps.app.goo.gl/7Kbykswh6r89ybX78.");
        assert_eq!(input.url(), Some("https://maps.app.goo.gl/7Kbykswh6r89ybX78"));
        assert!(input.is_short_link());
    }

    #[test]
    fn scheme_less_map_links_get_https() {
        let input = ResolutionInput::new("maps.google.com/?q=40.7128,-74.0060");
        assert_eq!(input.url(), Some("https://maps.google.com/?q=40.7128,-74.0060"));
        assert!(!input.is_short_link());

        let input = ResolutionInput::new("goo.gl/maps/abc123");
        assert!(input.is_short_link());
    }

    #[test]
    fn text_outside_url_drops_only_the_url_token() {
        let input = ResolutionInput::new("Meet at 40.7128, -74.0060 near maps.google.com");
        assert_eq!(input.url(), Some("https://maps.google.com"));
        assert_eq!(input.outside_url(), "Meet at 40.7128, -74.0060 near");

        let input = ResolutionInput::new("https://www.google.com/maps/@40.7128,-74.0060,15z");
        assert_eq!(input.outside_url(), "");

        let input = ResolutionInput::new("1.5, 2.5");
        assert_eq!(input.outside_url(), "1.5, 2.5");
    }

    #[test]
    fn bare_scheme_is_not_a_url() {
        assert!(!ResolutionInput::new("https://").looks_like_url());
        assert!(!ResolutionInput::new("").looks_like_url());
    }
}
