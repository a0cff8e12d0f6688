//! Last-resort lookup of a place id or place name through the geocoding port.

use std::{sync::Arc, sync::OnceLock, time::Duration};

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, warn};
use url::Url;

use crate::ports::GeocodingClient;

use super::{
    consent::{comma_pair_re, decode_rounds},
    decimal::scan_pairs,
    resolver::{ResolutionContext, Scope, Strategy},
    Found, GeoCoordinate, NoMatch, StepResult, StrategyKind,
};

/// What a URL says about a place when it carries no usable coordinate.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlaceReference {
    pub raw_id: Option<String>,
    pub place_name: Option<String>,
}

impl PlaceReference {
    pub fn is_empty(&self) -> bool {
        self.raw_id.is_none() && self.place_name.is_none()
    }
}

fn feature_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)!1s(0x[0-9a-f]+:0x[0-9a-f]+)").expect("valid regex")
    })
}

fn name_path_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/(?:place|search)/([^/?#@]+)").expect("valid regex"))
}

/// Pull a place identifier and/or name out of `url`.
///
/// Identifiers: hex feature id (`!1s0x..:0x..` or `ftid=`), then Google place
/// id (`place_id=` / `query_place_id=`). Names: `/place/<name>`, then
/// `/search/<name>`, then a `q=` value that is not itself a coordinate.
pub fn extract_place_reference(url: &str) -> PlaceReference {
    let params: Vec<(String, String)> = Url::parse(url)
        .map(|u| u.query_pairs().into_owned().collect())
        .unwrap_or_default();
    let param = |key: &str| {
        params
            .iter()
            .find(|(k, v)| k == key && !v.trim().is_empty())
            .map(|(_, v)| v.trim().to_string())
    };

    let raw_id = feature_id_re()
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .or_else(|| param("ftid"))
        .or_else(|| param("place_id"))
        .or_else(|| param("query_place_id"));

    let place_name = name_path_re()
        .captures_iter(url)
        .filter_map(|c| c.get(1))
        .find_map(|m| clean_name(m.as_str()))
        .or_else(|| {
            param("q")
                .or_else(|| param("query"))
                .filter(|q| scan_pairs(comma_pair_re(), q).is_err())
        });

    PlaceReference { raw_id, place_name }
}

/// Decode a path segment into a human-readable name; `+` becomes a space.
fn clean_name(segment: &str) -> Option<String> {
    let decoded = decode_rounds(segment).ok()?.pop()?;
    let name = decoded.replace('+', " ");
    let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
    // Coordinates in the path are not a name; the URL rules already had them.
    if name.is_empty() || scan_pairs(comma_pair_re(), &name).is_ok() {
        return None;
    }
    Some(name)
}

/// Geocoding lookup: place id first, then free-text name.
#[derive(Clone)]
pub struct PlaceLookup {
    client: Option<Arc<dyn GeocodingClient>>,
    timeout: Duration,
}

impl PlaceLookup {
    pub fn new(client: Option<Arc<dyn GeocodingClient>>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    async fn bounded<F>(&self, what: &str, call: F) -> Result<GeoCoordinate, NoMatch>
    where
        F: std::future::Future<Output = crate::Result<Option<GeoCoordinate>>> + Send,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Err(_) => {
                warn!("geocoding {what} timed out after {:?}", self.timeout);
                Err(NoMatch::NetworkTimeout)
            }
            Ok(Err(e)) => {
                warn!("geocoding {what} failed: {e}");
                Err(NoMatch::from_error(&e))
            }
            Ok(Ok(None)) => Err(NoMatch::PatternAbsent),
            Ok(Ok(Some(c))) => Ok(c),
        }
    }
}

#[async_trait]
impl Strategy for PlaceLookup {
    fn kind(&self) -> StrategyKind {
        StrategyKind::PlaceLookupApi
    }

    fn scope(&self) -> Scope {
        Scope::Url
    }

    async fn attempt(&self, ctx: &ResolutionContext) -> StepResult {
        let url = ctx.url().ok_or(NoMatch::PatternAbsent)?;
        let reference = extract_place_reference(url);
        if reference.is_empty() {
            return Err(NoMatch::PatternAbsent);
        }
        let Some(client) = self.client.as_ref() else {
            debug!("place reference found but no geocoding client configured");
            return Err(NoMatch::Unavailable);
        };

        let mut reason = NoMatch::PatternAbsent;
        if let Some(id) = reference.raw_id.as_deref() {
            match self.bounded("place id", client.lookup_place_id(id)).await {
                Ok(coordinate) => {
                    return Ok(Found {
                        coordinate,
                        source: StrategyKind::PlaceLookupApi,
                    })
                }
                Err(e) => reason = e,
            }
        }
        if let Some(name) = reference.place_name.as_deref() {
            match self.bounded("text search", client.search_text(name)).await {
                Ok(coordinate) => {
                    return Ok(Found {
                        coordinate,
                        source: StrategyKind::PlaceLookupApi,
                    })
                }
                Err(e) => reason = e,
            }
        }
        Err(reason)
    }
}
