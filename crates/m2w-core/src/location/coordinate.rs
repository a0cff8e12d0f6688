use std::fmt;

use serde::Serialize;

/// `true` only for finite values with `-90 ≤ lat ≤ 90` and `-180 ≤ lng ≤ 180`.
pub fn validate(lat: f64, lng: f64) -> bool {
    lat.is_finite()
        && lng.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lng)
}

/// A validated WGS84 point. Cannot be constructed out of range.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct GeoCoordinate {
    latitude: f64,
    longitude: f64,
}

impl GeoCoordinate {
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        validate(latitude, longitude).then_some(Self {
            latitude,
            longitude,
        })
    }

    /// Parse a pair of decimal strings as captured by the pattern matchers.
    pub fn parse(lat: &str, lng: &str) -> Option<Self> {
        let lat = lat.trim().parse::<f64>().ok()?;
        let lng = lng.trim().parse::<f64>().ok()?;
        Self::new(lat, lng)
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl fmt::Display for GeoCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}
