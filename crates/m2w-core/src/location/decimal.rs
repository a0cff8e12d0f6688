use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;

use super::{
    resolver::{ResolutionContext, Scope, Strategy},
    Found, GeoCoordinate, NoMatch, StepResult, StrategyKind,
};

/// Signed decimal number as users and map URLs write it (`40`, `-74.006`, `40.`).
pub(crate) const NUM: &str = r"[-+]?\d+(?:\.\d*)?";

fn direct_pair_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"(?P<lat>{NUM})\s*,\s*(?P<lng>{NUM})")).expect("valid regex")
    })
}

/// First range-valid `lat,lng` pair among the matches of `re`.
///
/// `re` must define `lat` and `lng` groups. Matches overlap: when a pair is
/// out of range the scan restarts at its longitude, so `999, 45, 90` still
/// yields `(45, 90)`.
pub(crate) fn scan_pairs(re: &Regex, text: &str) -> Result<GeoCoordinate, NoMatch> {
    let mut pos = 0;
    let mut seen = false;

    while pos <= text.len() {
        let Some(caps) = re.captures_at(text, pos) else {
            break;
        };
        let (Some(lat), Some(lng)) = (caps.name("lat"), caps.name("lng")) else {
            break;
        };
        seen = true;

        if let Some(c) = GeoCoordinate::parse(lat.as_str(), lng.as_str()) {
            return Ok(c);
        }
        pos = lng.start();
    }

    Err(if seen {
        NoMatch::RangeInvalid
    } else {
        NoMatch::PatternAbsent
    })
}

/// Extract the first valid comma-separated decimal pair from arbitrary text.
pub fn find_decimal_pair(text: &str) -> Option<GeoCoordinate> {
    scan_pairs(direct_pair_re(), text).ok()
}

/// Raw coordinates pasted by the user (`40.7128, -74.0060`).
///
/// Scans the message outside its URL token, so pairs inside a URL are left
/// to the URL rules and attributed to them.
#[derive(Clone, Copy, Debug, Default)]
pub struct DirectDecimal;

#[async_trait]
impl Strategy for DirectDecimal {
    fn kind(&self) -> StrategyKind {
        StrategyKind::DirectDecimal
    }

    fn scope(&self) -> Scope {
        Scope::Any
    }

    async fn attempt(&self, ctx: &ResolutionContext) -> StepResult {
        let coordinate = scan_pairs(direct_pair_re(), ctx.input().outside_url())?;
        Ok(Found {
            coordinate,
            source: StrategyKind::DirectDecimal,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_pair_with_optional_whitespace() {
        let c = find_decimal_pair("meet me at 40.7128, -74.0060 please").unwrap();
        assert_eq!((c.latitude(), c.longitude()), (40.7128, -74.006));

        let c = find_decimal_pair("-33.8688,151.2093").unwrap();
        assert_eq!((c.latitude(), c.longitude()), (-33.8688, 151.2093));
    }

    #[test]
    fn out_of_range_pair_is_skipped_not_fatal() {
        assert!(find_decimal_pair("999,999").is_none());

        let c = find_decimal_pair("999, 45, 90").unwrap();
        assert_eq!((c.latitude(), c.longitude()), (45.0, 90.0));

        let c = find_decimal_pair("bad 123.4,500 then 31.7683, 35.2137").unwrap();
        assert_eq!((c.latitude(), c.longitude()), (31.7683, 35.2137));
    }

    #[test]
    fn distinguishes_absent_from_invalid() {
        assert_eq!(
            scan_pairs(direct_pair_re(), "hello world"),
            Err(NoMatch::PatternAbsent)
        );
        assert_eq!(
            scan_pairs(direct_pair_re(), "999,999"),
            Err(NoMatch::RangeInvalid)
        );
    }
}
