use async_trait::async_trait;

use crate::{location::GeoCoordinate, Result};

/// Hexagonal port for following HTTP redirects.
///
/// Implementations must follow the whole redirect chain and return the final
/// URL. They should map timeouts to [`crate::Error::Timeout`] and transport
/// failures to [`crate::Error::Network`] so the pipeline can log the cause.
#[async_trait]
pub trait RedirectClient: Send + Sync {
    async fn final_url(&self, url: &str) -> Result<String>;
}

/// Hexagonal port for the paid geocoding service used as last resort.
///
/// `Ok(None)` means the service answered but knows nothing about the query.
#[async_trait]
pub trait GeocodingClient: Send + Sync {
    /// Direct lookup by a place identifier (Google place id or hex feature id).
    async fn lookup_place_id(&self, place_id: &str) -> Result<Option<GeoCoordinate>>;

    /// Free-text search; the first result's location wins.
    async fn search_text(&self, query: &str) -> Result<Option<GeoCoordinate>>;
}
