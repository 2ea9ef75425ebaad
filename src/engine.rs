/// Scoring, grid aggregation and trend engine.
///
/// `HotspotEngine` is the entry point for one regeneration: construct it
/// from an `EngineConfig` (validated up front, the only place the engine can
/// fail) and hand it the complete snapshot of features from all sources.
/// The run itself is a pure reduction: no I/O, no shared state, and the
/// same input and `now` always give the same output.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::analysis::grid::{aggregate, GridOutput};
use crate::analysis::summary::build_summary;
use crate::config::{ConfigError, EngineConfig};
use crate::model::{Feature, HotspotCell, Summary, TopRow};

/// Frozen output of one aggregation run.
#[derive(Debug, Clone)]
pub struct EngineOutput {
    pub generated_utc: DateTime<Utc>,
    pub cell_deg: f64,
    /// Every surviving cell, ordered by grid key.
    pub cells: Vec<HotspotCell>,
    /// Ranked list, ready for a geocoder to attach places.
    pub top: Vec<TopRow>,
}

#[derive(Debug, Clone)]
pub struct HotspotEngine {
    config: EngineConfig,
}

impl HotspotEngine {
    /// Validates `config` and builds an engine.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Keeps only features inside the bounding box. Normalizers already
    /// filter, so this only matters for input assembled elsewhere.
    pub fn admit<'a>(&self, features: impl IntoIterator<Item = &'a Feature>) -> Vec<Feature> {
        let bbox = self.config.grid.bbox;
        features
            .into_iter()
            .filter(|f| bbox.contains(f.lon, f.lat))
            .cloned()
            .collect()
    }

    /// Aggregates the snapshot into cells and the ranked list.
    pub fn run(&self, features: &[Feature], now: DateTime<Utc>) -> EngineOutput {
        let GridOutput { cells, top } = aggregate(features, now, &self.config);
        info!(
            features = features.len(),
            cells = cells.len(),
            top = top.len(),
            "aggregated hotspot grid"
        );
        EngineOutput {
            generated_utc: now,
            cell_deg: self.config.grid.cell_deg,
            cells,
            top: top.into_iter().map(TopRow::from).collect(),
        }
    }

    /// Digest for the snapshot. Call after places were attached to `top`.
    pub fn summarize(&self, features: &[Feature], top: &[TopRow], now: DateTime<Utc>) -> Summary {
        build_summary(features, top, now, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BoundingBox, Source};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_engine_rejects_invalid_config() {
        let mut config = EngineConfig::default();
        config.grid.cell_deg = 0.0;
        assert!(matches!(
            HotspotEngine::new(config).unwrap_err(),
            ConfigError::NonPositiveCellSize(_)
        ));

        let mut config = EngineConfig::default();
        config.grid.bbox = BoundingBox::new(10.0, 10.0, 0.0, 0.0);
        assert!(matches!(
            HotspotEngine::new(config).unwrap_err(),
            ConfigError::InvertedBoundingBox { .. }
        ));
    }

    #[test]
    fn test_engine_rejects_window_that_would_overflow() {
        let mut config = EngineConfig::default();
        config.windows.window_days = 100_000_000;
        assert!(matches!(
            HotspotEngine::new(config).unwrap_err(),
            ConfigError::WindowOutOfRange(100_000_000)
        ));
    }

    #[test]
    fn test_admit_filters_to_bbox() {
        let engine = HotspotEngine::new(EngineConfig::default()).unwrap();
        let features = vec![
            Feature::new(20.0, 44.0, Source::NewsEvent, "news_event"),
            Feature::new(2.35, 48.85, Source::NewsEvent, "news_event"),
        ];
        let admitted = engine.admit(&features);
        assert_eq!(admitted.len(), 1);
        assert_eq!(admitted[0].lon, 20.0);
    }

    #[test]
    fn test_run_is_deterministic() {
        let engine = HotspotEngine::new(EngineConfig::default()).unwrap();
        let features: Vec<Feature> = (0..20)
            .map(|i| {
                Feature::new(14.0 + (i % 7) as f64, 38.0 + (i % 5) as f64, Source::NewsEvent, "news_event")
                    .with_time(Some(now().to_rfc3339()))
            })
            .collect();

        let first = engine.run(&features, now());
        let second = engine.run(&features, now());
        assert_eq!(first.cells, second.cells);
        assert_eq!(first.top, second.top);
        assert_eq!(first.cell_deg, 0.5);
        assert!(first.top.iter().all(|row| row.place.is_none()));
    }
}
