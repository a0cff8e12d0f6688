//! Google Places web service (`details` and `textsearch`).

use std::time::Duration;

use async_trait::async_trait;
use m2w_core::{errors::Error, location::GeoCoordinate, ports::GeocodingClient, Result};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::map_reqwest;

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct PlaceResult {
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    status: String,
    result: Option<PlaceResult>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TextSearchResponse {
    status: String,
    #[serde(default)]
    results: Vec<PlaceResult>,
    error_message: Option<String>,
}

#[derive(Clone, Debug)]
pub struct GooglePlacesClient {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
}

impl GooglePlacesClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("places client build failed: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            http,
        })
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let resp = self
            .http
            .get(format!("{}/{endpoint}", self.base_url))
            .query(query)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| map_reqwest(endpoint, e))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| map_reqwest(endpoint, e))?;
        if !status.is_success() {
            return Err(Error::External(format!(
                "places {endpoint} failed: {status} {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        serde_json::from_str(&body)
            .map_err(|e| Error::Decode(format!("places {endpoint} json error: {e}")))
    }
}

/// `OK` with a geometry yields a coordinate; "nothing found" statuses yield
/// `None`; quota and credential failures are errors.
fn interpret(
    endpoint: &str,
    status: &str,
    error_message: Option<String>,
    place: Option<PlaceResult>,
) -> Result<Option<GeoCoordinate>> {
    match status {
        "OK" => Ok(place
            .and_then(|p| p.geometry)
            .and_then(|g| GeoCoordinate::new(g.location.lat, g.location.lng))),
        "ZERO_RESULTS" | "NOT_FOUND" | "INVALID_REQUEST" => {
            debug!("places {endpoint}: {status}");
            Ok(None)
        }
        other => {
            let detail = error_message.unwrap_or_default();
            warn!("places {endpoint}: {other} {detail}");
            Err(Error::External(format!("places {endpoint}: {other} {detail}")))
        }
    }
}

#[async_trait]
impl GeocodingClient for GooglePlacesClient {
    async fn lookup_place_id(&self, place_id: &str) -> Result<Option<GeoCoordinate>> {
        // Hex feature ids (`0x..:0x..`) are not accepted by the Places API.
        if place_id.starts_with("0x") {
            debug!("skipping details lookup for feature id {place_id}");
            return Ok(None);
        }
        let resp: DetailsResponse = self
            .get_json(
                "details/json",
                &[("place_id", place_id), ("fields", "geometry")],
            )
            .await?;
        interpret("details", &resp.status, resp.error_message, resp.result)
    }

    async fn search_text(&self, query: &str) -> Result<Option<GeoCoordinate>> {
        let resp: TextSearchResponse = self
            .get_json("textsearch/json", &[("query", query)])
            .await?;
        let first = resp.results.into_iter().next();
        interpret("textsearch", &resp.status, resp.error_message, first)
    }
}
