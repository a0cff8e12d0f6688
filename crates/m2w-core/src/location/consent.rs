//! Consent interstitials (`consent.google.com/m?continue=<encoded url>`).

use std::sync::OnceLock;

use async_trait::async_trait;
use percent_encoding::percent_decode_str;
use regex::Regex;
use url::Url;

use super::{
    decimal::{scan_pairs, NUM},
    resolver::{ResolutionContext, Scope, Strategy},
    url_rules::directive_3d4d_re,
    Found, GeoCoordinate, NoMatch, StepResult, StrategyKind,
};

const CONSENT_HOST_PREFIXES: &[&str] = &["consent.google.", "consent.youtube."];

/// The destination may be encoded more than once (`%252B` → `%2B` → `+`).
const MAX_DECODE_ROUNDS: usize = 3;

fn continue_param_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[?&]continue=([^&#]*)").expect("valid regex"))
}

/// `lat,+lng` with the plus either literal or still percent-encoded.
pub(crate) fn comma_plus_pair_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"(?P<lat>{NUM}),\s*(?:\+|%2[Bb])\s*(?P<lng>{NUM})"
        ))
        .expect("valid regex")
    })
}

pub(crate) fn comma_pair_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"(?P<lat>{NUM})\s*,\s*(?P<lng>{NUM})")).expect("valid regex")
    })
}

pub fn is_consent_wrapper(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => parsed
            .host_str()
            .map(|h| {
                let h = h.to_ascii_lowercase();
                CONSENT_HOST_PREFIXES.iter().any(|p| h.starts_with(p))
            })
            .unwrap_or(false),
        Err(_) => {
            let lower = url.to_ascii_lowercase();
            CONSENT_HOST_PREFIXES.iter().any(|p| lower.contains(p))
        }
    }
}

/// Successive percent-decodings of `value`, stopping once stable.
///
/// Only a failure of the first round is an error; a later round that yields
/// invalid UTF-8 ends the sequence with the rounds decoded so far.
pub(crate) fn decode_rounds(value: &str) -> Result<Vec<String>, NoMatch> {
    let mut out: Vec<String> = Vec::new();
    let mut current = value.to_string();
    for _ in 0..MAX_DECODE_ROUNDS {
        let decoded = match percent_decode_str(&current).decode_utf8() {
            Ok(decoded) => decoded.into_owned(),
            Err(_) if out.is_empty() => return Err(NoMatch::DecodeError),
            Err(_) => break,
        };
        if decoded == current {
            break;
        }
        out.push(decoded.clone());
        current = decoded;
    }
    if out.is_empty() {
        out.push(current);
    }
    Ok(out)
}

/// Pull the coordinate out of the `continue` destination of a consent page.
pub fn unwrap_consent(url: &str) -> Result<GeoCoordinate, NoMatch> {
    let raw = continue_param_re()
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|s| !s.is_empty())
        .ok_or(NoMatch::PatternAbsent)?;

    let candidates = decode_rounds(raw)?;

    let mut worst = NoMatch::PatternAbsent;
    for re in [comma_plus_pair_re(), comma_pair_re(), directive_3d4d_re()] {
        for candidate in &candidates {
            match scan_pairs(re, candidate) {
                Ok(c) => return Ok(c),
                Err(NoMatch::RangeInvalid) => worst = NoMatch::RangeInvalid,
                Err(_) => {}
            }
        }
    }
    Err(worst)
}

/// Consent-wrapper unwrapping; marks the context so the loose URL rules stay off.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsentUnwrap;

#[async_trait]
impl Strategy for ConsentUnwrap {
    fn kind(&self) -> StrategyKind {
        StrategyKind::UrlConsentContinue
    }

    fn scope(&self) -> Scope {
        Scope::Url
    }

    async fn attempt(&self, ctx: &ResolutionContext) -> StepResult {
        if !ctx.is_consent_wrapped() {
            return Err(NoMatch::PatternAbsent);
        }
        let url = ctx.url().ok_or(NoMatch::PatternAbsent)?;
        let coordinate = unwrap_consent(url)?;
        Ok(Found {
            coordinate,
            source: StrategyKind::UrlConsentContinue,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_consent_hosts() {
        assert!(is_consent_wrapper("https://consent.google.com/m?continue=x"));
        assert!(is_consent_wrapper("https://consent.google.ee/ml?continue=x"));
        assert!(!is_consent_wrapper("https://www.google.com/maps/search/consent.google.com"));
        assert!(!is_consent_wrapper("https://maps.google.com/?q=1,2"));
    }

    #[test]
    fn unwraps_double_encoded_plus() {
        let url = "https://consent.google.com/m?continue=https%3A%2F%2Fwww.google.com%2Fmaps%2Fsearch%2F59.286887%2C%252B24.648914%3Fentry%3Dtts&gl=EE&hl=et";
        let c = unwrap_consent(url).unwrap();
        assert_eq!((c.latitude(), c.longitude()), (59.286887, 24.648914));
    }

    #[test]
    fn unwraps_partially_encoded_destination() {
        let url = "https://consent.google.com/m?continue=https://www.google.com/maps/search/59.286887,%2B24.648914?entry%3Dtts%26g_ep%3DEgoyMDI1MDcyMy4wIPu8ASoASAFQAw%253D%253D&gl=EE&m=0&pc=m&hl=et&src=1";
        let c = unwrap_consent(url).unwrap();
        assert_eq!((c.latitude(), c.longitude()), (59.286887, 24.648914));
    }

    #[test]
    fn falls_back_to_plain_comma_and_directives() {
        let url = "https://consent.google.com/m?continue=https://www.google.com/maps/search/40.7128,-74.0060";
        let c = unwrap_consent(url).unwrap();
        assert_eq!((c.latitude(), c.longitude()), (40.7128, -74.006));

        let url = "https://consent.google.com/m?continue=https%3A%2F%2Fwww.google.com%2Fmaps%2Fplace%2FX%2Fdata%3D!3d48.8583!4d2.2945";
        let c = unwrap_consent(url).unwrap();
        assert_eq!((c.latitude(), c.longitude()), (48.8583, 2.2945));
    }

    #[test]
    fn bad_escape_in_a_later_round_keeps_earlier_rounds() {
        // `%2525FF` decodes to `%25FF`, then `%FF`, which is not UTF-8.
        let rounds = decode_rounds("59.286887%2C%252B24.648914%3Fx%3D%2525FF").unwrap();
        assert_eq!(rounds.len(), 2);
        assert_eq!(rounds[1], "59.286887,+24.648914?x=%FF");

        let url = "https://consent.google.com/m?continue=https%3A%2F%2Fwww.google.com%2Fmaps%2Fsearch%2F59.286887%2C%252B24.648914%3Fx%3D%2525FF";
        let c = unwrap_consent(url).unwrap();
        assert_eq!((c.latitude(), c.longitude()), (59.286887, 24.648914));
    }

    #[test]
    fn missing_or_bogus_continue_is_no_match() {
        assert_eq!(
            unwrap_consent("https://consent.google.com/m?gl=EE"),
            Err(NoMatch::PatternAbsent)
        );
        assert_eq!(
            unwrap_consent("https://consent.google.com/m?continue=https%3A%2F%2Fx%2F999%2C999"),
            Err(NoMatch::RangeInvalid)
        );
        assert_eq!(
            unwrap_consent("https://consent.google.com/m?continue=%FF%FE"),
            Err(NoMatch::DecodeError)
        );
    }
}
