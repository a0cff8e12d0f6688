//! Free-text → coordinate resolution.
//!
//! The pipeline is an ordered list of [`Strategy`] objects driven by
//! [`Resolver`]; the first strategy that yields a range-valid coordinate wins.
//! Network collaborators (redirect expansion, geocoding) are injected through
//! the traits in [`crate::ports`].

use std::{fmt, time::Duration};

use serde::Serialize;

mod consent;
mod coordinate;
mod decimal;
mod dms;
mod expander;
mod input;
mod place;
mod resolver;
mod url_rules;

pub use consent::{is_consent_wrapper, unwrap_consent, ConsentUnwrap};
pub use coordinate::{validate, GeoCoordinate};
pub use decimal::{find_decimal_pair, DirectDecimal};
pub use dms::{dms_to_decimal, format_dms, parse_dms, Dms, DmsStrategy};
pub use expander::{Expansion, RedirectExpander};
pub use input::{is_short_link, ResolutionInput};
pub use place::{extract_place_reference, PlaceLookup, PlaceReference};
pub use resolver::{ResolutionContext, Resolver, Scope, Strategy};
pub use url_rules::{
    AtRule, DirectiveRule, FallbackScanRule, LlParamRule, PlacePathRule, QParamRule,
    SearchPathRule, SegmentScanRule,
};

/// Which extraction algorithm produced a coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum StrategyKind {
    DirectDecimal,
    #[serde(rename = "DMS")]
    Dms,
    #[serde(rename = "URLAt")]
    UrlAt,
    #[serde(rename = "URLZoom")]
    UrlZoom,
    #[serde(rename = "URL3d4d")]
    Url3d4d,
    #[serde(rename = "URL1d2d")]
    Url1d2d,
    #[serde(rename = "URLParamLL")]
    UrlParamLl,
    #[serde(rename = "URLParamQ")]
    UrlParamQ,
    #[serde(rename = "URLPlacePath")]
    UrlPlacePath,
    #[serde(rename = "URLSearchPath")]
    UrlSearchPath,
    #[serde(rename = "URLConsentContinue")]
    UrlConsentContinue,
    #[serde(rename = "URLFallbackScan")]
    UrlFallbackScan,
    #[serde(rename = "PlaceLookupAPI")]
    PlaceLookupApi,
}

impl StrategyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StrategyKind::DirectDecimal => "DirectDecimal",
            StrategyKind::Dms => "DMS",
            StrategyKind::UrlAt => "URLAt",
            StrategyKind::UrlZoom => "URLZoom",
            StrategyKind::Url3d4d => "URL3d4d",
            StrategyKind::Url1d2d => "URL1d2d",
            StrategyKind::UrlParamLl => "URLParamLL",
            StrategyKind::UrlParamQ => "URLParamQ",
            StrategyKind::UrlPlacePath => "URLPlacePath",
            StrategyKind::UrlSearchPath => "URLSearchPath",
            StrategyKind::UrlConsentContinue => "URLConsentContinue",
            StrategyKind::UrlFallbackScan => "URLFallbackScan",
            StrategyKind::PlaceLookupApi => "PlaceLookupAPI",
        }
    }

    /// Whole-URL and per-segment scans can pick up unrelated numeric ids that
    /// happen to look like a pair; callers should ask the user to confirm.
    pub fn is_low_confidence(self) -> bool {
        matches!(self, StrategyKind::UrlFallbackScan)
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a step produced no coordinate. Used for logging and tests only; every
/// reason is recoverable and the pipeline moves on to the next step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoMatch {
    PatternAbsent,
    RangeInvalid,
    DecodeError,
    NetworkTimeout,
    NetworkError,
    /// Collaborator not configured (e.g. no geocoding credential).
    Unavailable,
    /// Rule deliberately disabled for this input (consent wrapper guard).
    Skipped,
}

impl NoMatch {
    pub fn as_str(self) -> &'static str {
        match self {
            NoMatch::PatternAbsent => "pattern-absent",
            NoMatch::RangeInvalid => "range-invalid",
            NoMatch::DecodeError => "decode-error",
            NoMatch::NetworkTimeout => "network-timeout",
            NoMatch::NetworkError => "network-error",
            NoMatch::Unavailable => "unavailable",
            NoMatch::Skipped => "skipped",
        }
    }

    pub(crate) fn from_error(e: &crate::Error) -> Self {
        match e {
            crate::Error::Timeout(_) => NoMatch::NetworkTimeout,
            crate::Error::Decode(_) => NoMatch::DecodeError,
            crate::Error::Config(_) => NoMatch::Unavailable,
            _ => NoMatch::NetworkError,
        }
    }
}

impl fmt::Display for NoMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A strategy's successful answer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Found {
    pub coordinate: GeoCoordinate,
    pub source: StrategyKind,
}

/// Outcome of a single step.
pub type StepResult = std::result::Result<Found, NoMatch>;

/// One failed step, in the order it was attempted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TriedStrategy {
    pub strategy: StrategyKind,
    pub reason: NoMatch,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResolutionResult {
    Found {
        coordinate: GeoCoordinate,
        source: StrategyKind,
    },
    NotFound {
        tried: Vec<TriedStrategy>,
    },
}

impl ResolutionResult {
    pub fn coordinate(&self) -> Option<GeoCoordinate> {
        match self {
            ResolutionResult::Found { coordinate, .. } => Some(*coordinate),
            ResolutionResult::NotFound { .. } => None,
        }
    }

    pub fn source(&self) -> Option<StrategyKind> {
        match self {
            ResolutionResult::Found { source, .. } => Some(*source),
            ResolutionResult::NotFound { .. } => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, ResolutionResult::Found { .. })
    }
}

/// Network budgets shared by every resolution call.
#[derive(Clone, Copy, Debug)]
pub struct ResolverSettings {
    pub redirect_timeout: Duration,
    pub geocode_timeout: Duration,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            redirect_timeout: crate::config::MAX_REDIRECT_TIMEOUT,
            geocode_timeout: Duration::from_millis(2_500),
        }
    }
}
