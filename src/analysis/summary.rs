/// Weekly digest generation.
///
/// Works on the raw feature snapshot rather than the grid, so events that
/// were binned into dropped edge cells still count toward the overall
/// trend. The ranked list only supplies the "top hotspot" bullet.

use chrono::{DateTime, Utc};

use crate::analysis::grid::{window_of, Window};
use crate::analysis::trend::{classify_change, pct_change};
use crate::config::EngineConfig;
use crate::model::{
    round_to, Feature, HeadlineExample, Source, SourceCounts, Summary, SummaryStats, TopRow, Trend,
};
use crate::scoring::{contribution, feature_time};

/// Headlines listed in the digest.
pub const MAX_EXAMPLES: usize = 5;

pub const CAVEAT: &str =
    "Automated OSINT digest: verify the linked sources before relying on any single report.";

/// Totals over the two trailing windows.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WindowTotals {
    pub last: f64,
    pub prev: f64,
    /// Events per source in the current window.
    pub counts: SourceCounts,
}

/// Sums decayed contributions per window. Undated events and events older
/// than both windows are ignored.
pub fn window_totals(features: &[Feature], now: DateTime<Utc>, config: &EngineConfig) -> WindowTotals {
    let mut totals = WindowTotals::default();
    for feature in features {
        let Some(time) = feature_time(feature) else {
            continue;
        };
        match window_of(time, now, config.windows.window_days) {
            Some(Window::Current) => {
                totals.last += contribution(feature, now, &config.decay);
                totals.counts.increment(&feature.source);
            }
            Some(Window::Previous) => totals.prev += contribution(feature, now, &config.decay),
            None => {}
        }
    }
    totals
}

/// Most recent news headlines from the current window.
pub fn headline_examples(features: &[Feature], now: DateTime<Utc>, window_days: i64) -> Vec<HeadlineExample> {
    let mut recent: Vec<(DateTime<Utc>, &Feature)> = features
        .iter()
        .filter(|f| f.source == Source::NewsEvent)
        .filter_map(|f| feature_time(f).map(|t| (t, f)))
        .filter(|(t, _)| window_of(*t, now, window_days) == Some(Window::Current))
        .filter(|(_, f)| f.property_str("title").is_some_and(|t| !t.trim().is_empty()))
        .collect();
    recent.sort_by(|a, b| b.0.cmp(&a.0));

    recent
        .into_iter()
        .take(MAX_EXAMPLES)
        .map(|(_, f)| HeadlineExample {
            title: f.property_str("title").unwrap_or_default().trim().to_string(),
            url: f.property_str("url").map(str::to_string),
            domain: f.property_str("domain").map(str::to_string),
            time_utc: f.time.clone(),
        })
        .collect()
}

fn top_hotspot_bullet(top: &[TopRow]) -> String {
    let Some(row) = top.first() else {
        return "No hotspot cells this period: not enough located events to rank.".to_string();
    };
    let cell = &row.cell;
    let place = row
        .place
        .clone()
        .unwrap_or_else(|| format!("{:.2}, {:.2}", cell.lat, cell.lon));
    let change = match (cell.trend, cell.change_pct) {
        (Trend::Na, _) => "no dated activity in either window".to_string(),
        (Trend::New, _) | (_, None) => "new this week".to_string(),
        (_, Some(pct)) => format!("{:+.1}% week over week", pct),
    };
    format!(
        "Top hotspot: {} {} (score {:.2}, {}).",
        place,
        cell.trend_arrow(),
        cell.score,
        change
    )
}

fn overall_trend_bullet(totals: &WindowTotals, change: Option<f64>, config: &EngineConfig) -> String {
    let days = config.windows.window_days;
    match change {
        None => format!(
            "New activity this week, with nothing scored in the previous {} days.",
            days
        ),
        Some(_) if totals.last == 0.0 && totals.prev == 0.0 => {
            format!("No scored activity in the last {} days.", days * 2)
        }
        Some(pct) => {
            let direction = match classify_change(pct, &config.trend) {
                Trend::Up => "rising",
                Trend::Down => "falling",
                _ => "roughly stable",
            };
            format!(
                "Overall activity is {} ({:+.1}% vs the previous {} days).",
                direction, pct, days
            )
        }
    }
}

fn counts_bullet(counts: &SourceCounts, days: i64) -> String {
    let parts: Vec<String> = Source::KNOWN
        .iter()
        .map(|s| format!("{} {}", s.label(), counts.get(s)))
        .collect();
    format!("Events in the last {} days: {}.", days, parts.join(" • "))
}

/// Builds the digest for one run.
///
/// `top` is the ranked list after any place names were attached; it may
/// be empty.
pub fn build_summary(
    features: &[Feature],
    top: &[TopRow],
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> Summary {
    let days = config.windows.window_days;
    let totals = window_totals(features, now, config);
    let change = pct_change(totals.last, totals.prev);

    let bullets = vec![
        top_hotspot_bullet(top),
        overall_trend_bullet(&totals, change, config),
        counts_bullet(&totals.counts, days),
        CAVEAT.to_string(),
    ];

    Summary {
        generated_utc: now,
        headline: format!("Weekly digest: last {} days", days),
        bullets,
        stats: SummaryStats {
            score_last7: round_to(totals.last, 3),
            score_prev7: round_to(totals.prev, 3),
            change_pct: change.map(|c| round_to(c, 2)),
        },
        counts: totals.counts,
        examples: headline_examples(features, now, days),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
