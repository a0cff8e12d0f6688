use std::{sync::Arc, time::Duration};

use tracing::{debug, warn};

use crate::ports::RedirectClient;

use super::NoMatch;

/// Result of expanding a short link. Failure is a degraded state, not an
/// error: the original URL is carried forward.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expansion {
    Expanded(String),
    Unchanged { url: String, reason: NoMatch },
}

impl Expansion {
    pub fn url(&self) -> &str {
        match self {
            Expansion::Expanded(url) => url,
            Expansion::Unchanged { url, .. } => url,
        }
    }

    pub fn is_expanded(&self) -> bool {
        matches!(self, Expansion::Expanded(_))
    }
}

/// Follows short-link redirects under a hard time budget.
#[derive(Clone)]
pub struct RedirectExpander {
    client: Arc<dyn RedirectClient>,
    timeout: Duration,
}

impl RedirectExpander {
    pub fn new(client: Arc<dyn RedirectClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub async fn expand(&self, url: &str) -> Expansion {
        let unchanged = |reason| Expansion::Unchanged {
            url: url.to_string(),
            reason,
        };

        // The client has its own timeout; this bound also covers slow DNS and
        // adapters that ignore theirs.
        match tokio::time::timeout(self.timeout, self.client.final_url(url)).await {
            Err(_) => {
                warn!("redirect expansion timed out after {:?}: {url}", self.timeout);
                unchanged(NoMatch::NetworkTimeout)
            }
            Ok(Err(e)) => {
                warn!("redirect expansion failed for {url}: {e}");
                unchanged(NoMatch::from_error(&e))
            }
            Ok(Ok(final_url)) if final_url.trim().is_empty() || final_url == url => {
                debug!("short link did not redirect: {url}");
                unchanged(NoMatch::PatternAbsent)
            }
            Ok(Ok(final_url)) => {
                debug!("expanded {url} -> {final_url}");
                Expansion::Expanded(final_url)
            }
        }
    }
}
