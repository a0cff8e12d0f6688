use std::{env, fs, path::Path, time::Duration};

use crate::{errors::Error, location::ResolverSettings, Result};

/// Hard ceiling for redirect expansion; it sits in the user-facing path.
pub const MAX_REDIRECT_TIMEOUT: Duration = Duration::from_millis(2_000);
/// Hard ceiling for a single geocoding request.
pub const MAX_GEOCODE_TIMEOUT: Duration = Duration::from_millis(3_000);

pub const DEFAULT_PLACES_API_BASE_URL: &str = "https://maps.googleapis.com/maps/api/place";

/// Some short-link targets answer differently to non-browser clients.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Typed configuration, loaded from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    // Telegram
    pub telegram_bot_token: Option<String>,

    // Geocoding
    pub google_maps_api_key: Option<String>,
    pub places_api_base_url: String,

    // Network budgets
    pub redirect_timeout: Duration,
    pub geocode_timeout: Duration,
    pub http_user_agent: String,

    // Redelivery guard
    pub dedup_capacity: usize,
    pub dedup_window: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            telegram_bot_token: None,
            google_maps_api_key: None,
            places_api_base_url: DEFAULT_PLACES_API_BASE_URL.to_string(),
            redirect_timeout: MAX_REDIRECT_TIMEOUT,
            geocode_timeout: Duration::from_millis(2_500),
            http_user_agent: DEFAULT_USER_AGENT.to_string(),
            dedup_capacity: 1_000,
            dedup_window: Duration::from_secs(300),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"))?;

        let defaults = Self::default();

        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN").and_then(non_empty);
        let google_maps_api_key = env_str("GOOGLE_MAPS_API_KEY").and_then(non_empty);
        let places_api_base_url = env_str("PLACES_API_BASE_URL")
            .and_then(non_empty)
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or(defaults.places_api_base_url);

        // Budgets are clamped: a misconfigured env must not stall the handler loop.
        let redirect_timeout = env_u64("REDIRECT_TIMEOUT_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.redirect_timeout)
            .min(MAX_REDIRECT_TIMEOUT);
        let geocode_timeout = env_u64("GEOCODE_TIMEOUT_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.geocode_timeout)
            .min(MAX_GEOCODE_TIMEOUT);
        if redirect_timeout.is_zero() || geocode_timeout.is_zero() {
            return Err(Error::Config(
                "REDIRECT_TIMEOUT_MS and GEOCODE_TIMEOUT_MS must be positive".to_string(),
            ));
        }

        let http_user_agent = env_str("HTTP_USER_AGENT")
            .and_then(non_empty)
            .unwrap_or(defaults.http_user_agent);

        let dedup_capacity = env_usize("DEDUP_CAPACITY")
            .unwrap_or(defaults.dedup_capacity)
            .max(1);
        let dedup_window = env_u64("DEDUP_WINDOW_SECS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.dedup_window);

        Ok(Self {
            telegram_bot_token,
            google_maps_api_key,
            places_api_base_url,
            redirect_timeout,
            geocode_timeout,
            http_user_agent,
            dedup_capacity,
            dedup_window,
        })
    }

    /// The bot cannot start without a token; the one-shot resolver can.
    pub fn require_bot_token(&self) -> Result<&str> {
        self.telegram_bot_token.as_deref().ok_or_else(|| {
            Error::Config("TELEGRAM_BOT_TOKEN environment variable is required".to_string())
        })
    }

    pub fn resolver_settings(&self) -> ResolverSettings {
        ResolverSettings {
            redirect_timeout: self.redirect_timeout,
            geocode_timeout: self.geocode_timeout,
        }
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

/// A missing file is fine; an unreadable one is an error.
fn load_dotenv_if_present(path: &Path) -> Result<()> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(Error::Io(e)),
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
    Ok(())
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim().trim_start_matches("export ").trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
