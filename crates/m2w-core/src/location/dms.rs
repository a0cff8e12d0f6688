//! Degrees/minutes/seconds notation, e.g. `31°44'49.8"N 35°01'46.6"E`.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;

use super::{
    resolver::{ResolutionContext, Scope, Strategy},
    Found, GeoCoordinate, NoMatch, StepResult, StrategyKind,
};

fn dms_pair_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let group = |n: u8| {
            format!(
                r#"(?P<d{n}>\d{{1,3}})\s*[°º]\s*(?P<m{n}>\d{{1,2}})\s*['′’]\s*(?P<s{n}>\d+(?:\.\d+)?)\s*(?:''|"|″|”)\s*(?P<h{n}>[A-Za-z])"#
            )
        };
        // Degrees must not be the tail of a longer number.
        Regex::new(&format!(r"(?:^|[^\d.]){}[\s,]*{}", group(1), group(2)))
            .expect("valid regex")
    })
}

/// One parsed DMS component.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Dms {
    pub degrees: u32,
    pub minutes: u32,
    pub seconds: f64,
    pub hemisphere: char,
}

impl Dms {
    pub fn to_decimal(&self) -> Option<f64> {
        dms_to_decimal(self.degrees, self.minutes, self.seconds, self.hemisphere)
    }
}

/// `degrees + minutes/60 + seconds/3600`, negated for S and W.
///
/// Returns `None` for an unknown hemisphere or minutes/seconds outside `[0, 60)`.
pub fn dms_to_decimal(degrees: u32, minutes: u32, seconds: f64, hemisphere: char) -> Option<f64> {
    if minutes >= 60 || !seconds.is_finite() || !(0.0..60.0).contains(&seconds) {
        return None;
    }
    let value = degrees as f64 + minutes as f64 / 60.0 + seconds / 3600.0;
    match hemisphere.to_ascii_uppercase() {
        'N' | 'E' => Some(value),
        'S' | 'W' => Some(-value),
        _ => None,
    }
}

/// Parse the first DMS latitude/longitude pair in `text`.
///
/// The first group must carry N/S and the second E/W; anything else is
/// rejected rather than guessed.
pub fn parse_dms(text: &str) -> Result<GeoCoordinate, NoMatch> {
    let caps = dms_pair_re()
        .captures(text)
        .ok_or(NoMatch::PatternAbsent)?;

    let component = |n: u8| -> Option<Dms> {
        Some(Dms {
            degrees: caps.name(&format!("d{n}"))?.as_str().parse().ok()?,
            minutes: caps.name(&format!("m{n}"))?.as_str().parse().ok()?,
            seconds: caps.name(&format!("s{n}"))?.as_str().parse().ok()?,
            hemisphere: caps
                .name(&format!("h{n}"))?
                .as_str()
                .chars()
                .next()?
                .to_ascii_uppercase(),
        })
    };

    let (Some(lat), Some(lng)) = (component(1), component(2)) else {
        return Err(NoMatch::DecodeError);
    };
    if !matches!(lat.hemisphere, 'N' | 'S') || !matches!(lng.hemisphere, 'E' | 'W') {
        return Err(NoMatch::DecodeError);
    }

    let (Some(lat), Some(lng)) = (lat.to_decimal(), lng.to_decimal()) else {
        return Err(NoMatch::DecodeError);
    };
    GeoCoordinate::new(lat, lng).ok_or(NoMatch::RangeInvalid)
}

/// Render a coordinate as `D°MM'SS.ss"H D°MM'SS.ss"H`; inverse of [`parse_dms`].
pub fn format_dms(coordinate: &GeoCoordinate) -> String {
    let lat = coordinate.latitude();
    let lng = coordinate.longitude();
    format!(
        "{} {}",
        format_component(lat, if lat < 0.0 { 'S' } else { 'N' }),
        format_component(lng, if lng < 0.0 { 'W' } else { 'E' }),
    )
}

fn format_component(value: f64, hemisphere: char) -> String {
    let abs = value.abs();
    let mut degrees = abs.trunc() as u32;
    let rem = (abs - degrees as f64) * 60.0;
    let mut minutes = rem.trunc() as u32;
    let mut seconds = ((rem - minutes as f64) * 60.0 * 100.0).round() / 100.0;

    // Rounding can carry 59.995" up to a full minute.
    if seconds >= 60.0 {
        seconds -= 60.0;
        minutes += 1;
    }
    if minutes >= 60 {
        minutes -= 60;
        degrees += 1;
    }

    format!("{degrees}°{minutes:02}'{seconds:05.2}\"{hemisphere}")
}

/// DMS pair anywhere in the message.
#[derive(Clone, Copy, Debug, Default)]
pub struct DmsStrategy;

#[async_trait]
impl Strategy for DmsStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Dms
    }

    fn scope(&self) -> Scope {
        Scope::Any
    }

    async fn attempt(&self, ctx: &ResolutionContext) -> StepResult {
        let coordinate = parse_dms(ctx.input().raw())?;
        Ok(Found {
            coordinate,
            source: StrategyKind::Dms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() < eps
    }

    #[test]
    fn parses_reference_example() {
        let c = parse_dms("31°44'49.8\"N 35°01'46.6\"E").unwrap();
        assert!(approx(c.latitude(), 31.7471, 1e-4));
        assert!(approx(c.longitude(), 35.0296, 1e-4));
    }

    #[test]
    fn south_and_west_are_negative() {
        let c = parse_dms("40°42'46\"N 74°00'22\"W").unwrap();
        assert!(approx(c.latitude(), 40.712_78, 1e-4));
        assert!(approx(c.longitude(), -74.006_11, 1e-4));

        let c = parse_dms("33°52′07.7″S, 151°12′33.5″E").unwrap();
        assert!(c.latitude() < 0.0);
        assert!(c.longitude() > 0.0);
    }

    #[test]
    fn rejects_wrong_hemisphere_and_malformed_values() {
        assert_eq!(
            parse_dms("31°44'49.8\"X 35°01'46.6\"E"),
            Err(NoMatch::DecodeError)
        );
        // Longitude letter in latitude position.
        assert_eq!(
            parse_dms("31°44'49.8\"E 35°01'46.6\"N"),
            Err(NoMatch::DecodeError)
        );
        assert_eq!(
            parse_dms("31°75'49.8\"N 35°01'46.6\"E"),
            Err(NoMatch::DecodeError)
        );
        assert_eq!(
            parse_dms("95°00'00\"N 35°01'46.6\"E"),
            Err(NoMatch::RangeInvalid)
        );
        assert_eq!(parse_dms("no coordinates here"), Err(NoMatch::PatternAbsent));
        assert_eq!(
            parse_dms("1231°44'49.8\"N 35°01'46.6\"E"),
            Err(NoMatch::PatternAbsent)
        );
        assert_eq!(
            parse_dms("at 1.31°44'49.8\"N 35°01'46.6\"E"),
            Err(NoMatch::PatternAbsent)
        );
    }

    #[test]
    fn dms_to_decimal_handles_direction() {
        assert_eq!(dms_to_decimal(10, 30, 0.0, 'N'), Some(10.5));
        assert_eq!(dms_to_decimal(10, 30, 0.0, 'W'), Some(-10.5));
        assert_eq!(dms_to_decimal(10, 30, 0.0, 'Q'), None);
        assert_eq!(dms_to_decimal(10, 60, 0.0, 'N'), None);
    }

    #[test]
    fn round_trips_through_formatter() {
        let samples = [
            (31.7471, 35.0296),
            (-33.8688, 151.2093),
            (40.7128, -74.006),
            (0.0, 0.0),
            (-89.99999, -179.99999),
            (59.286887, 24.648914),
            (12.999999, -0.000001),
        ];
        for (lat, lng) in samples {
            let c = GeoCoordinate::new(lat, lng).unwrap();
            let text = format_dms(&c);
            let back = parse_dms(&text).unwrap_or_else(|e| panic!("{text}: {e}"));
            assert!(approx(back.latitude(), lat, 1e-4), "{text}");
            assert!(approx(back.longitude(), lng, 1e-4), "{text}");
        }
    }
}
