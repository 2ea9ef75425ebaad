/// Week-over-week trend classification.
///
/// Two related but deliberately different helpers:
///
/// - `trend_from` labels a grid cell. No activity at all is `Na`; activity
///   with no prior baseline is `New` with no percentage.
/// - `pct_change` feeds the summary stats. Both windows empty is a plain
///   `0.0`, a zero baseline with current activity is `None`.
///
/// Both apply the same configurable noise band (±12% by default).

use crate::config::TrendConfig;
use crate::model::Trend;

/// Classification of one cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendReading {
    pub trend: Trend,
    pub change_pct: Option<f64>,
}

impl TrendReading {
    pub fn arrow(&self) -> &'static str {
        self.trend.arrow()
    }
}

fn percent(current: f64, previous: f64) -> f64 {
    (current - previous) * 100.0 / previous
}

/// Maps a percentage change onto the band. Boundaries belong to Up/Down.
pub fn classify_change(change: f64, band: &TrendConfig) -> Trend {
    if change >= band.up_pct {
        Trend::Up
    } else if change <= band.down_pct {
        Trend::Down
    } else {
        Trend::Flat
    }
}

/// Trend of a cell from its current and previous window scores.
pub fn trend_from(last7: f64, prev7: f64, band: &TrendConfig) -> TrendReading {
    if last7 <= 0.0 && prev7 <= 0.0 {
        return TrendReading { trend: Trend::Na, change_pct: Some(0.0) };
    }
    if prev7 <= 0.0 {
        return TrendReading { trend: Trend::New, change_pct: None };
    }
    let change = percent(last7, prev7);
    TrendReading {
        trend: classify_change(change, band),
        change_pct: Some(change),
    }
}

/// Percentage change between window totals, as reported in the summary.
pub fn pct_change(current: f64, previous: f64) -> Option<f64> {
    if previous == 0.0 {
        return if current == 0.0 { Some(0.0) } else { None };
    }
    Some(percent(current, previous))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn band() -> TrendConfig {
        TrendConfig::default()
    }

    fn assert_reading(reading: TrendReading, trend: Trend, change: Option<f64>, arrow: &str) {
        assert_eq!(reading.trend, trend);
        assert_eq!(reading.arrow(), arrow);
        match (reading.change_pct, change) {
            (Some(actual), Some(expected)) => assert!(
                (actual - expected).abs() < 1e-9,
                "expected change {}, got {}",
                expected,
                actual
            ),
            (actual, expected) => assert_eq!(actual, expected),
        }
    }

    #[test]
    fn test_trend_from_no_activity_is_na() {
        assert_reading(trend_from(0.0, 0.0, &band()), Trend::Na, Some(0.0), "·");
    }

    #[test]
    fn test_trend_from_zero_baseline_is_new_without_percentage() {
        assert_reading(trend_from(5.0, 0.0, &band()), Trend::New, None, "🆕");
    }

    #[test]
    fn test_trend_from_exact_up_boundary_is_up() {
        assert_reading(trend_from(112.0, 100.0, &band()), Trend::Up, Some(12.0), "🔺");
    }

    #[test]
    fn test_trend_from_drop_is_down() {
        assert_reading(trend_from(87.0, 100.0, &band()), Trend::Down, Some(-13.0), "🔻");
        assert_reading(trend_from(88.0, 100.0, &band()), Trend::Down, Some(-12.0), "🔻");
    }

    #[test]
    fn test_trend_from_small_change_is_flat() {
        assert_reading(trend_from(105.0, 100.0, &band()), Trend::Flat, Some(5.0), "▬");
    }

    #[test]
    fn test_trend_from_activity_gone_is_down() {
        assert_reading(trend_from(0.0, 3.0, &band()), Trend::Down, Some(-100.0), "🔻");
    }

    #[test]
    fn test_trend_band_is_configurable() {
        let wide = TrendConfig { up_pct: 50.0, down_pct: -50.0 };
        assert_eq!(trend_from(140.0, 100.0, &wide).trend, Trend::Flat);
        assert_eq!(trend_from(150.0, 100.0, &wide).trend, Trend::Up);
    }

    #[test]
    fn test_pct_change_special_cases() {
        assert_eq!(pct_change(0.0, 0.0), Some(0.0));
        assert_eq!(pct_change(4.0, 0.0), None);
        let change = pct_change(50.0, 100.0).unwrap();
        assert!((change + 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_both_zero_asymmetry_between_cells_and_summary() {
        // Same numeric 0.0, but the cell carries an explicit Na category
        // while the summary only ever sees the number.
        let cell = trend_from(0.0, 0.0, &band());
        assert_eq!(cell.trend, Trend::Na);
        assert_eq!(cell.change_pct, Some(0.0));
        assert_eq!(pct_change(0.0, 0.0), Some(0.0));

        // Zero baseline: the cell says New, the summary just has no number.
        assert_eq!(trend_from(1.0, 0.0, &band()).trend, Trend::New);
        assert_eq!(pct_change(1.0, 0.0), None);
    }
}
