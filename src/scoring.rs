/// Per-event severity and recency weighting.
///
/// `score_feature` gives each event a base severity from its source (and,
/// for earthquakes, its magnitude). `time_decay` scales that by age with an
/// exponential half-life. Their product is the event's contribution to the
/// grid and to the summary windows.
///
/// Nothing here fails on bad data: an unparseable timestamp is treated as
/// missing and an unparseable magnitude as zero.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

use crate::config::DecayConfig;
use crate::model::{Feature, Source};

pub const NEWS_EVENT_SCORE: f64 = 1.0;
pub const DISASTER_ALERT_SCORE: f64 = 0.5;
/// Severity for sources outside the known set.
pub const FALLBACK_SCORE: f64 = 0.1;

pub const SEISMIC_BASE_SCORE: f64 = 0.2;
/// Magnitude at which earthquakes start scoring above the base.
pub const SEISMIC_MAGNITUDE_FLOOR: f64 = 3.0;
pub const SEISMIC_SCORE_PER_MAGNITUDE: f64 = 0.15;
pub const SEISMIC_MAX_BONUS: f64 = 0.6;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

/// Parses an event timestamp as delivered by the feeds.
///
/// Accepts RFC 3339, RFC 2822 (RSS `pubDate`), the compact GDELT form
/// `20240501T120000Z`, and naive `YYYY-MM-DD[T ]HH:MM:SS` which is taken as
/// UTC. Anything else is `None`.
pub fn parse_event_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y%m%dT%H%M%SZ", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Timestamp of a feature, if present and parseable.
pub fn feature_time(feature: &Feature) -> Option<DateTime<Utc>> {
    feature.time.as_deref().and_then(parse_event_time)
}

/// Reads a magnitude attribute that may be a JSON number or a numeric
/// string.
pub fn parse_magnitude(value: Option<&Value>) -> Option<f64> {
    let mag = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    mag.is_finite().then_some(mag)
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Earthquake severity: base score plus a clamped bonus per magnitude unit
/// above 3.0. Always within `[0.2, 0.8]`.
pub fn seismic_score(magnitude: f64) -> f64 {
    let bonus = ((magnitude - SEISMIC_MAGNITUDE_FLOOR) * SEISMIC_SCORE_PER_MAGNITUDE)
        .clamp(0.0, SEISMIC_MAX_BONUS);
    SEISMIC_BASE_SCORE + bonus
}

/// Base severity of a feature. Never negative.
pub fn score_feature(feature: &Feature) -> f64 {
    match &feature.source {
        Source::NewsEvent => NEWS_EVENT_SCORE,
        Source::DisasterAlert => DISASTER_ALERT_SCORE,
        Source::Seismic => {
            let magnitude = parse_magnitude(feature.properties.get("mag")).unwrap_or(0.0);
            seismic_score(magnitude)
        }
        Source::Other(_) => FALLBACK_SCORE,
    }
}

/// Recency weight `0.5 ^ (age_hours / half_life)`.
///
/// Events without a timestamp get `missing_time_weight`. Timestamps in the
/// future are not clamped and weigh more than 1.
pub fn time_decay(
    event_time: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    decay: &DecayConfig,
) -> f64 {
    match event_time {
        Some(t) => {
            let age_hours = (now - t).num_milliseconds() as f64 / MILLIS_PER_HOUR;
            0.5f64.powf(age_hours / decay.half_life_hours)
        }
        None => decay.missing_time_weight,
    }
}

/// What a single feature adds to a cell or window total.
pub fn contribution(feature: &Feature, now: DateTime<Utc>, decay: &DecayConfig) -> f64 {
    score_feature(feature) * time_decay(feature_time(feature), now, decay)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn quake(mag: Value) -> Feature {
        Feature::new(20.0, 42.0, Source::Seismic, "earthquake").with_property("mag", mag)
    }

    // --- Timestamp parsing ----------------------------------------------------

    #[test]
    fn test_parse_event_time_accepts_feed_formats() {
        let expected = now();
        assert_eq!(parse_event_time("2024-05-01T12:00:00+00:00"), Some(expected));
        assert_eq!(parse_event_time("2024-05-01T14:00:00+02:00"), Some(expected));
        assert_eq!(parse_event_time("Wed, 01 May 2024 12:00:00 GMT"), Some(expected));
        assert_eq!(parse_event_time("20240501T120000Z"), Some(expected));
        assert_eq!(parse_event_time("2024-05-01T12:00:00"), Some(expected));
        assert_eq!(parse_event_time("2024-05-01 12:00:00"), Some(expected));
    }

    #[test]
    fn test_parse_event_time_rejects_garbage() {
        assert_eq!(parse_event_time(""), None);
        assert_eq!(parse_event_time("yesterday"), None);
        assert_eq!(parse_event_time("2024-13-45T99:00:00Z"), None);
    }

    #[test]
    fn test_malformed_feature_time_is_treated_as_missing() {
        let f = Feature::new(20.0, 42.0, Source::NewsEvent, "news_event")
            .with_time(Some("not a date".to_string()));
        assert_eq!(feature_time(&f), None);
    }

    // --- Decay ------------------------------------------------------------------

    #[test]
    fn test_time_decay_half_life_points() {
        let decay = DecayConfig::default();
        let t = now();
        assert!((time_decay(Some(t), t, &decay) - 1.0).abs() < 1e-12);
        assert!((time_decay(Some(t - Duration::hours(72)), t, &decay) - 0.5).abs() < 1e-12);
        assert!((time_decay(Some(t - Duration::hours(144)), t, &decay) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_time_decay_missing_time_uses_fallback_weight() {
        let decay = DecayConfig::default();
        assert_eq!(time_decay(None, now(), &decay), 0.6);
    }

    #[test]
    fn test_time_decay_future_timestamp_is_not_clamped() {
        let decay = DecayConfig::default();
        let t = now();
        let weight = time_decay(Some(t + Duration::hours(72)), t, &decay);
        assert!((weight - 2.0).abs() < 1e-12, "future events weigh > 1, got {}", weight);
    }

    #[test]
    fn test_time_decay_respects_configured_half_life() {
        let decay = DecayConfig { half_life_hours: 24.0, missing_time_weight: 0.6 };
        let t = now();
        assert!((time_decay(Some(t - Duration::hours(24)), t, &decay) - 0.5).abs() < 1e-12);
    }

    // --- Severity ---------------------------------------------------------------

    #[test]
    fn test_fixed_source_scores() {
        let news = Feature::new(20.0, 42.0, Source::NewsEvent, "news_event");
        let alert = Feature::new(20.0, 42.0, Source::DisasterAlert, "disaster_alert");
        let other = Feature::new(20.0, 42.0, Source::Other("ACLED".into()), "battle");
        assert_eq!(score_feature(&news), 1.0);
        assert_eq!(score_feature(&alert), 0.5);
        assert_eq!(score_feature(&other), 0.1);
    }

    #[test]
    fn test_seismic_score_formula() {
        assert!((score_feature(&quake(json!(3.0))) - 0.2).abs() < 1e-12);
        assert!((score_feature(&quake(json!(5.0))) - 0.5).abs() < 1e-12);
        assert!((score_feature(&quake(json!(7.0))) - 0.8).abs() < 1e-12);
        assert!((score_feature(&quake(json!(9.5))) - 0.8).abs() < 1e-12);
        assert!((score_feature(&quake(json!("4.0"))) - 0.35).abs() < 1e-12);
    }

    #[test]
    fn test_seismic_unparseable_magnitude_floors_at_base() {
        assert_eq!(score_feature(&quake(json!("n/a"))), 0.2);
        assert_eq!(score_feature(&quake(Value::Null)), 0.2);
        let no_mag = Feature::new(20.0, 42.0, Source::Seismic, "earthquake");
        assert_eq!(score_feature(&no_mag), 0.2);
    }

    #[test]
    fn test_seismic_score_monotonic_and_bounded() {
        let mut previous = f64::MIN;
        let mut mag = -2.0;
        while mag <= 10.0 {
            let score = seismic_score(mag);
            assert!((0.2..=0.8).contains(&score), "score {} out of bounds at M{}", score, mag);
            assert!(score >= previous, "score decreased at M{}", mag);
            previous = score;
            mag += 0.1;
        }
    }

    #[test]
    fn test_contribution_is_score_times_decay() {
        let decay = DecayConfig::default();
        let t = now();
        let f = Feature::new(20.0, 42.0, Source::DisasterAlert, "disaster_alert")
            .with_time(Some((t - Duration::hours(72)).to_rfc3339()));
        assert!((contribution(&f, t, &decay) - 0.25).abs() < 1e-12);

        let untimed = Feature::new(20.0, 42.0, Source::NewsEvent, "news_event");
        assert!((contribution(&untimed, t, &decay) - 0.6).abs() < 1e-12);
    }
}
