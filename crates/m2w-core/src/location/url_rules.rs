//! Ordered coordinate-extraction rules for (expanded) map URLs.
//!
//! Each rule is its own [`Strategy`]; [`crate::location::Resolver`] runs them
//! in the order `@` → directives → `ll=` → `q=` → `/place/` → `/search/` →
//! whole-URL scan → per-segment scan.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use url::Url;

use super::{
    consent::{comma_pair_re, comma_plus_pair_re, decode_rounds},
    decimal::{scan_pairs, NUM},
    dms::parse_dms,
    resolver::{ResolutionContext, Scope, Strategy},
    Found, GeoCoordinate, NoMatch, StepResult, StrategyKind,
};

/// `/place/` data must look like real coordinates (with a fraction) so that
/// place names such as `Building+5,+3rd+floor` are not read as a pair.
const FRACTIONAL: &str = r"[-+]?\d{1,3}\.\d+";

fn at_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"@(?P<lat>{NUM}),(?P<lng>{NUM})(?P<zoom>,\d+(?:\.\d+)?z)?"
        ))
        .expect("valid regex")
    })
}

pub(crate) fn directive_3d4d_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"!3d(?P<lat>{NUM})!4d(?P<lng>{NUM})")).expect("valid regex")
    })
}

fn directive_1d2d_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"!1d(?P<lat>{NUM})!2d(?P<lng>{NUM})")).expect("valid regex")
    })
}

fn path_pair_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"(?P<lat>{FRACTIONAL})\s*,\s*(?:\+|%2[Bb])?\s*(?P<lng>{FRACTIONAL})"
        ))
        .expect("valid regex")
    })
}

fn place_path_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/place/([^/?#]+)").expect("valid regex"))
}

fn search_path_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/search/([^/?#]+)").expect("valid regex"))
}

fn found(coordinate: GeoCoordinate, source: StrategyKind) -> StepResult {
    Ok(Found { coordinate, source })
}

fn target(ctx: &ResolutionContext) -> Result<&str, NoMatch> {
    ctx.url().ok_or(NoMatch::PatternAbsent)
}

/// Fold several attempts into one reason: range-invalid beats pattern-absent.
fn merge(a: NoMatch, b: NoMatch) -> NoMatch {
    match (a, b) {
        (NoMatch::RangeInvalid, _) | (_, NoMatch::RangeInvalid) => NoMatch::RangeInvalid,
        (NoMatch::DecodeError, _) | (_, NoMatch::DecodeError) => NoMatch::DecodeError,
        _ => NoMatch::PatternAbsent,
    }
}

/// Try `regexes` in order over each decoded form of `data`.
fn first_pair(regexes: &[&Regex], candidates: &[String]) -> Result<GeoCoordinate, NoMatch> {
    let mut reason = NoMatch::PatternAbsent;
    for re in regexes {
        for candidate in candidates {
            match scan_pairs(re, candidate) {
                Ok(c) => return Ok(c),
                Err(e) => reason = merge(reason, e),
            }
        }
    }
    Err(reason)
}

fn query_value(url: &str, keys: &[&str]) -> Result<String, NoMatch> {
    let parsed = Url::parse(url).map_err(|_| NoMatch::DecodeError)?;
    keys.iter()
        .find_map(|key| {
            parsed
                .query_pairs()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.into_owned())
        })
        .ok_or(NoMatch::PatternAbsent)
}

/// `@lat,lng` or `@lat,lng,ZOOMz` in the path.
#[derive(Clone, Copy, Debug, Default)]
pub struct AtRule;

#[async_trait]
impl Strategy for AtRule {
    fn kind(&self) -> StrategyKind {
        StrategyKind::UrlAt
    }

    fn scope(&self) -> Scope {
        Scope::Url
    }

    async fn attempt(&self, ctx: &ResolutionContext) -> StepResult {
        let url = target(ctx)?;
        let mut reason = NoMatch::PatternAbsent;
        for caps in at_re().captures_iter(url) {
            let (Some(lat), Some(lng)) = (caps.name("lat"), caps.name("lng")) else {
                continue;
            };
            match GeoCoordinate::parse(lat.as_str(), lng.as_str()) {
                Some(c) => {
                    let kind = if caps.name("zoom").is_some() {
                        StrategyKind::UrlZoom
                    } else {
                        StrategyKind::UrlAt
                    };
                    return found(c, kind);
                }
                None => reason = NoMatch::RangeInvalid,
            }
        }
        Err(reason)
    }
}

/// Map-data directives: `!3d<lat>!4d<lng>`, then `!1d<lat>!2d<lng>`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DirectiveRule;

#[async_trait]
impl Strategy for DirectiveRule {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Url3d4d
    }

    fn scope(&self) -> Scope {
        Scope::Url
    }

    async fn attempt(&self, ctx: &ResolutionContext) -> StepResult {
        let url = target(ctx)?;
        let first = match scan_pairs(directive_3d4d_re(), url) {
            Ok(c) => return found(c, StrategyKind::Url3d4d),
            Err(e) => e,
        };
        match scan_pairs(directive_1d2d_re(), url) {
            Ok(c) => found(c, StrategyKind::Url1d2d),
            Err(e) => Err(merge(first, e)),
        }
    }
}

/// `ll=lat,lng` query parameter.
#[derive(Clone, Copy, Debug, Default)]
pub struct LlParamRule;

#[async_trait]
impl Strategy for LlParamRule {
    fn kind(&self) -> StrategyKind {
        StrategyKind::UrlParamLl
    }

    fn scope(&self) -> Scope {
        Scope::Url
    }

    async fn attempt(&self, ctx: &ResolutionContext) -> StepResult {
        let value = query_value(target(ctx)?, &["ll"])?;
        let Some((lat, lng)) = value.split_once(',') else {
            return Err(NoMatch::PatternAbsent);
        };
        if lng.contains(',') {
            return Err(NoMatch::PatternAbsent);
        }
        // Distinguish "numbers but out of range" from "not numbers".
        match (lat.trim().parse::<f64>(), lng.trim().parse::<f64>()) {
            (Ok(_), Ok(_)) => GeoCoordinate::parse(lat, lng)
                .ok_or(NoMatch::RangeInvalid)
                .and_then(|c| found(c, StrategyKind::UrlParamLl)),
            _ => Err(NoMatch::DecodeError),
        }
    }
}

/// Pair embedded in `q=` (or the Maps URLs API `query=`).
#[derive(Clone, Copy, Debug, Default)]
pub struct QParamRule;

#[async_trait]
impl Strategy for QParamRule {
    fn kind(&self) -> StrategyKind {
        StrategyKind::UrlParamQ
    }

    fn scope(&self) -> Scope {
        Scope::Url
    }

    async fn attempt(&self, ctx: &ResolutionContext) -> StepResult {
        // query_pairs already turned `+` into a space.
        let value = query_value(target(ctx)?, &["q", "query"])?;
        let coordinate = scan_pairs(comma_pair_re(), &value)?;
        found(coordinate, StrategyKind::UrlParamQ)
    }
}

/// Pair (decimal or DMS) inside `/place/<data>`.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlacePathRule;

#[async_trait]
impl Strategy for PlacePathRule {
    fn kind(&self) -> StrategyKind {
        StrategyKind::UrlPlacePath
    }

    fn scope(&self) -> Scope {
        Scope::Url
    }

    async fn attempt(&self, ctx: &ResolutionContext) -> StepResult {
        let url = target(ctx)?;
        let data = place_path_re()
            .captures(url)
            .and_then(|c| c.get(1))
            .ok_or(NoMatch::PatternAbsent)?
            .as_str();

        let candidates: Vec<String> = decode_rounds(data)?
            .into_iter()
            .map(|s| s.replace('+', " "))
            .collect();

        let reason = match first_pair(&[path_pair_re()], &candidates) {
            Ok(c) => return found(c, StrategyKind::UrlPlacePath),
            Err(e) => e,
        };
        for candidate in &candidates {
            if let Ok(c) = parse_dms(candidate) {
                return found(c, StrategyKind::UrlPlacePath);
            }
        }
        Err(reason)
    }
}

/// `/search/<data>`: decode first, then comma-plus, then plain comma.
#[derive(Clone, Copy, Debug, Default)]
pub struct SearchPathRule;

#[async_trait]
impl Strategy for SearchPathRule {
    fn kind(&self) -> StrategyKind {
        StrategyKind::UrlSearchPath
    }

    fn scope(&self) -> Scope {
        Scope::Url
    }

    async fn attempt(&self, ctx: &ResolutionContext) -> StepResult {
        if ctx.is_consent_wrapped() {
            return Err(NoMatch::Skipped);
        }
        let url = target(ctx)?;
        let data = search_path_re()
            .captures(url)
            .and_then(|c| c.get(1))
            .ok_or(NoMatch::PatternAbsent)?
            .as_str();

        let candidates = decode_rounds(data)?;
        let coordinate = first_pair(&[comma_plus_pair_re(), comma_pair_re()], &candidates)?;
        found(coordinate, StrategyKind::UrlSearchPath)
    }
}

/// Low confidence: first valid pair anywhere in the decoded URL.
#[derive(Clone, Copy, Debug, Default)]
pub struct FallbackScanRule;

#[async_trait]
impl Strategy for FallbackScanRule {
    fn kind(&self) -> StrategyKind {
        StrategyKind::UrlFallbackScan
    }

    fn scope(&self) -> Scope {
        Scope::Url
    }

    async fn attempt(&self, ctx: &ResolutionContext) -> StepResult {
        if ctx.is_consent_wrapped() {
            return Err(NoMatch::Skipped);
        }
        let candidates = decode_rounds(target(ctx)?)?;
        let coordinate = first_pair(&[comma_pair_re()], &candidates)?;
        found(coordinate, StrategyKind::UrlFallbackScan)
    }
}

/// Low confidence: each path segment on its own, `+` read as a space.
#[derive(Clone, Copy, Debug, Default)]
pub struct SegmentScanRule;

#[async_trait]
impl Strategy for SegmentScanRule {
    fn kind(&self) -> StrategyKind {
        StrategyKind::UrlFallbackScan
    }

    fn scope(&self) -> Scope {
        Scope::Url
    }

    async fn attempt(&self, ctx: &ResolutionContext) -> StepResult {
        if ctx.is_consent_wrapped() {
            return Err(NoMatch::Skipped);
        }
        let parsed = Url::parse(target(ctx)?).map_err(|_| NoMatch::DecodeError)?;
        let segments = parsed.path_segments().ok_or(NoMatch::PatternAbsent)?;

        let mut reason = NoMatch::PatternAbsent;
        for segment in segments.filter(|s| !s.is_empty()) {
            let candidates: Vec<String> = match decode_rounds(segment) {
                Ok(c) => c.into_iter().map(|s| s.replace('+', " ")).collect(),
                Err(e) => {
                    reason = merge(reason, e);
                    continue;
                }
            };
            match first_pair(&[comma_pair_re()], &candidates) {
                Ok(c) => return found(c, StrategyKind::UrlFallbackScan),
                Err(e) => reason = merge(reason, e),
            }
        }
        Err(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn run(rule: &dyn Strategy, url: &str) -> StepResult {
        rule.attempt(&ResolutionContext::for_url(url)).await
    }

    fn pair(r: StepResult) -> (f64, f64, StrategyKind) {
        let f = r.expect("expected a match");
        (f.coordinate.latitude(), f.coordinate.longitude(), f.source)
    }

    #[tokio::test]
    async fn at_rule_distinguishes_zoom() {
        let r = run(&AtRule, "https://www.google.com/maps/@40.7128,-74.0060,15z").await;
        assert_eq!(pair(r), (40.7128, -74.006, StrategyKind::UrlZoom));

        let r = run(
            &AtRule,
            "https://www.google.com/maps/@59.286887,24.648914,3a,75y,0h,90t/data=!3m6!1e1",
        )
        .await;
        assert_eq!(pair(r), (59.286887, 24.648914, StrategyKind::UrlAt));
    }

    #[tokio::test]
    async fn at_rule_skips_invalid_and_reports_range() {
        let r = run(&AtRule, "https://x/@999,999/@31.7683,35.2137").await;
        assert_eq!(pair(r), (31.7683, 35.2137, StrategyKind::UrlAt));
        assert_eq!(run(&AtRule, "https://x/@999,999").await, Err(NoMatch::RangeInvalid));
        assert_eq!(run(&AtRule, "https://x/maps").await, Err(NoMatch::PatternAbsent));
    }

    #[tokio::test]
    async fn directive_rule_prefers_3d4d() {
        let r = run(
            &DirectiveRule,
            "https://www.google.com/maps/place/X/data=!1d1.0!2d2.0!3d48.8583!4d2.2945",
        )
        .await;
        assert_eq!(pair(r), (48.8583, 2.2945, StrategyKind::Url3d4d));

        let r = run(&DirectiveRule, "https://www.google.com/maps/embed?pb=!1d31.5!2d35.1").await;
        assert_eq!(pair(r), (31.5, 35.1, StrategyKind::Url1d2d));
    }

    #[tokio::test]
    async fn ll_param() {
        let r = run(&LlParamRule, "https://maps.google.com/maps?ll=40.7128,-74.0060&z=15").await;
        assert_eq!(pair(r), (40.7128, -74.006, StrategyKind::UrlParamLl));
        assert_eq!(
            run(&LlParamRule, "https://maps.google.com/maps?ll=999,999").await,
            Err(NoMatch::RangeInvalid)
        );
        assert_eq!(
            run(&LlParamRule, "https://maps.google.com/maps?ll=abc,def").await,
            Err(NoMatch::DecodeError)
        );
        assert_eq!(
            run(&LlParamRule, "https://maps.google.com/maps?z=15").await,
            Err(NoMatch::PatternAbsent)
        );
    }

    #[tokio::test]
    async fn q_param_accepts_plus_and_query_alias() {
        let r = run(&QParamRule, "https://maps.google.com/?q=40.7128,-74.0060").await;
        assert_eq!(pair(r), (40.7128, -74.006, StrategyKind::UrlParamQ));

        let r = run(&QParamRule, "https://maps.google.com/?q=loc:31.7683,+35.2137").await;
        assert_eq!(pair(r), (31.7683, 35.2137, StrategyKind::UrlParamQ));

        let r = run(
            &QParamRule,
            "https://www.google.com/maps/search/?api=1&query=47.5951518%2C-122.3316393",
        )
        .await;
        assert_eq!(pair(r), (47.5951518, -122.3316393, StrategyKind::UrlParamQ));

        assert_eq!(
            run(&QParamRule, "https://maps.google.com/?q=Eiffel+Tower").await,
            Err(NoMatch::PatternAbsent)
        );
    }

    #[tokio::test]
    async fn place_path_reads_decimal_and_dms() {
        let r = run(&PlacePathRule, "https://www.google.com/maps/place/40.7128,-74.0060/data=x").await;
        assert_eq!(pair(r), (40.7128, -74.006, StrategyKind::UrlPlacePath));

        let r = run(
            &PlacePathRule,
            "https://www.google.com/maps/place/31%C2%B044'49.8%22N+35%C2%B001'46.6%22E",
        )
        .await;
        let (lat, lng, kind) = pair(r);
        assert!((lat - 31.7471).abs() < 1e-4 && (lng - 35.0296).abs() < 1e-4);
        assert_eq!(kind, StrategyKind::UrlPlacePath);
    }

    #[tokio::test]
    async fn place_path_ignores_numbers_in_names() {
        assert_eq!(
            run(&PlacePathRule, "https://www.google.com/maps/place/Building+5,+3rd+floor").await,
            Err(NoMatch::PatternAbsent)
        );
    }

    #[tokio::test]
    async fn search_path_decodes_plus_pairs() {
        let r = run(
            &SearchPathRule,
            "https://www.google.com/maps/search/59.286887,%2B24.648914?entry=tts",
        )
        .await;
        assert_eq!(pair(r), (59.286887, 24.648914, StrategyKind::UrlSearchPath));

        let r = run(&SearchPathRule, "https://www.google.com/maps/search/40.7128,-74.0060").await;
        assert_eq!(pair(r), (40.7128, -74.006, StrategyKind::UrlSearchPath));

        let r = run(&SearchPathRule, "https://www.google.com/maps/search/40,-74").await;
        assert_eq!(pair(r), (40.0, -74.0, StrategyKind::UrlSearchPath));

        assert_eq!(
            run(&SearchPathRule, "https://www.google.com/maps/search/Tallinn,+Estonia").await,
            Err(NoMatch::PatternAbsent)
        );
    }

    #[tokio::test]
    async fn loose_rules_are_skipped_for_consent_wrappers() {
        let url = "https://consent.google.com/m?continue=https://www.google.com/maps/search/1.5,2.5";
        assert_eq!(run(&SearchPathRule, url).await, Err(NoMatch::Skipped));
        assert_eq!(run(&FallbackScanRule, url).await, Err(NoMatch::Skipped));
        assert_eq!(run(&SegmentScanRule, url).await, Err(NoMatch::Skipped));
    }

    #[tokio::test]
    async fn fallback_scan_decodes_whole_url() {
        let r = run(
            &FallbackScanRule,
            "https://www.google.com/maps/dir/40.7128%2C-74.0060/40.7589,-73.9851",
        )
        .await;
        assert_eq!(pair(r), (40.7128, -74.006, StrategyKind::UrlFallbackScan));
    }

    #[tokio::test]
    async fn segment_scan_reads_plus_separated_pairs() {
        let r = run(&SegmentScanRule, "https://example.com/pin/12.5+,+45.25/view").await;
        assert_eq!(pair(r), (12.5, 45.25, StrategyKind::UrlFallbackScan));

        // Query strings are not path segments.
        assert_eq!(
            run(&SegmentScanRule, "https://example.com/pin?at=12.5,45.25").await,
            Err(NoMatch::PatternAbsent)
        );
    }
}
