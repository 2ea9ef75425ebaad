/// Spatial binning of scored events into fixed lon/lat cells.
///
/// `aggregate` is a single pass over the snapshot: every feature lands in
/// the cell `floor(lon / cell_deg), floor(lat / cell_deg)`, adding its
/// decayed contribution to the cell total and, when its timestamp falls in
/// one, to the current or previous trailing window. Cells whose center ends
/// up outside the bounding box are dropped afterwards, since floor binning
/// near the box edges can create cells that mostly cover outside area.
///
/// The ranked list is ordered by score descending with the grid key
/// ascending as tie-break, so repeated runs over the same input produce the
/// same output regardless of hash map iteration order.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tracing::debug;

use crate::analysis::trend::trend_from;
use crate::config::EngineConfig;
use crate::model::{BoundingBox, Feature, GridKey, HotspotCell, SourceCounts};
use crate::scoring::{contribution, feature_time};

// ---------------------------------------------------------------------------
// Keys and centers
// ---------------------------------------------------------------------------

/// Cell containing `(lon, lat)`. `cell_deg` must be positive.
pub fn grid_key(lon: f64, lat: f64, cell_deg: f64) -> GridKey {
    GridKey {
        ix: (lon / cell_deg).floor() as i64,
        iy: (lat / cell_deg).floor() as i64,
    }
}

/// Center `(lon, lat)` of a cell.
pub fn cell_center(key: GridKey, cell_deg: f64) -> (f64, f64) {
    (
        (key.ix as f64 + 0.5) * cell_deg,
        (key.iy as f64 + 0.5) * cell_deg,
    )
}

// ---------------------------------------------------------------------------
// Trailing windows
// ---------------------------------------------------------------------------

/// Which trailing window a timestamp falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    /// `now - window ≤ t`, including timestamps after `now`.
    Current,
    /// `now - 2·window ≤ t < now - window`.
    Previous,
}

/// Window of `time`, or `None` when it is older than both windows.
pub fn window_of(time: DateTime<Utc>, now: DateTime<Utc>, window_days: i64) -> Option<Window> {
    let window = Duration::days(window_days);
    let current_start = now - window;
    let previous_start = current_start - window;
    if time >= current_start {
        Some(Window::Current)
    } else if time >= previous_start {
        Some(Window::Previous)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Mutable per-cell totals while the reduce is running.
#[derive(Debug, Clone, Default)]
struct CellAccumulator {
    score: f64,
    count: u32,
    sources: SourceCounts,
    last7_score: f64,
    prev7_score: f64,
}

impl CellAccumulator {
    fn add(&mut self, feature: &Feature, weight: f64, window: Option<Window>) {
        self.score += weight;
        self.count += 1;
        self.sources.increment(&feature.source);
        match window {
            Some(Window::Current) => self.last7_score += weight,
            Some(Window::Previous) => self.prev7_score += weight,
            None => {}
        }
    }
}

/// Result of one aggregation run.
#[derive(Debug, Clone, Default)]
pub struct GridOutput {
    /// Every surviving cell, ordered by grid key.
    pub cells: Vec<HotspotCell>,
    /// Highest-scoring cells, at most `top_n`.
    pub top: Vec<HotspotCell>,
}

/// Bins `features` into hotspot cells relative to `now`.
///
/// The configuration is assumed valid (see `EngineConfig::validate`).
pub fn aggregate(features: &[Feature], now: DateTime<Utc>, config: &EngineConfig) -> GridOutput {
    let cell_deg = config.grid.cell_deg;
    let mut accumulators: HashMap<GridKey, CellAccumulator> = HashMap::new();

    for feature in features {
        let weight = contribution(feature, now, &config.decay);
        let window = feature_time(feature)
            .and_then(|t| window_of(t, now, config.windows.window_days));

        accumulators
            .entry(grid_key(feature.lon, feature.lat, cell_deg))
            .or_default()
            .add(feature, weight, window);
    }

    let total = accumulators.len();
    let mut cells: Vec<HotspotCell> = accumulators
        .into_iter()
        .filter_map(|(key, acc)| finalize(key, acc, config, &config.grid.bbox))
        .collect();
    cells.sort_by_key(|cell| cell.key);

    if cells.len() < total {
        debug!(
            dropped = total - cells.len(),
            "dropped cells with centers outside the bounding box"
        );
    }

    let top = rank_top(&cells, config.grid.top_n);
    GridOutput { cells, top }
}

fn finalize(
    key: GridKey,
    acc: CellAccumulator,
    config: &EngineConfig,
    bbox: &BoundingBox,
) -> Option<HotspotCell> {
    let cell_deg = config.grid.cell_deg;
    let (lon, lat) = cell_center(key, cell_deg);
    if !bbox.contains(lon, lat) {
        return None;
    }
    let reading = trend_from(acc.last7_score, acc.prev7_score, &config.trend);
    Some(HotspotCell {
        key,
        lon,
        lat,
        cell_deg,
        score: acc.score,
        count: acc.count,
        sources: acc.sources,
        last7_score: acc.last7_score,
        prev7_score: acc.prev7_score,
        trend: reading.trend,
        change_pct: reading.change_pct,
    })
}

/// Score descending, grid key ascending, truncated to `top_n`.
pub fn rank_top(cells: &[HotspotCell], top_n: usize) -> Vec<HotspotCell> {
    let mut ranked = cells.to_vec();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.key.cmp(&b.key)));
    ranked.truncate(top_n);
    ranked
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
