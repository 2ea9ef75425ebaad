/// One regeneration of the static dataset.
///
/// A run goes through five stages:
/// 1. Fetch every feed in parallel (failed feeds degrade to empty batches)
/// 2. Aggregate the combined snapshot into hotspot cells and the ranked list
/// 3. Attach place names to the ranked cells (optional, cached)
/// 4. Build the weekly digest
/// 5. Write every artifact to the output directory
///
/// Stages 2 to 5 live in `process`, which takes already-fetched batches so
/// they can be driven offline.

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{ConfigError, HotspotConfig};
use crate::engine::HotspotEngine;
use crate::geocode::{attach_places, GeocodeCache, NominatimGeocoder, ReverseGeocoder};
use crate::ingest::gdacs::GdacsFeed;
use crate::ingest::gdelt::GdeltFeed;
use crate::ingest::usgs::UsgsFeed;
use crate::ingest::{build_http_client, fetch_all, FeedSource, FetchError, RetryPolicy, SourceBatch};
use crate::output::{write_artifacts, Meta, OutputError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("could not build HTTP client: {0}")]
    Http(#[from] FetchError),
    #[error(transparent)]
    Output(#[from] OutputError),
}

/// What a run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub generated_utc: DateTime<Utc>,
    pub features: usize,
    pub cells: usize,
    pub top: usize,
    pub geocode_lookups: usize,
    /// Labels of feeds that came back empty because they failed.
    pub failed_sources: Vec<String>,
    pub written: Vec<PathBuf>,
}

/// Place lookup for the ranked list: a geocoder plus the cache in front
/// of it.
pub struct PlaceLookup<'a> {
    pub geocoder: &'a dyn ReverseGeocoder,
    pub cache: &'a mut GeocodeCache,
    pub min_interval: Duration,
}

pub struct Pipeline {
    config: HotspotConfig,
    engine: HotspotEngine,
    client: reqwest::blocking::Client,
}

impl Pipeline {
    /// Validates the configuration and prepares the shared HTTP client.
    pub fn new(config: HotspotConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let engine = HotspotEngine::new(config.engine.clone())?;
        let client = build_http_client(&config.fetch)?;
        Ok(Self { config, engine, client })
    }

    pub fn config(&self) -> &HotspotConfig {
        &self.config
    }

    /// The three production feeds, in reporting order.
    pub fn feeds(&self, now: DateTime<Utc>) -> Vec<Box<dyn FeedSource>> {
        let fetch = &self.config.fetch;
        let bbox = self.config.engine.grid.bbox;
        vec![
            Box::new(UsgsFeed::new(self.client.clone(), fetch, bbox, now)),
            Box::new(GdacsFeed::new(self.client.clone(), fetch, bbox, now)),
            Box::new(GdeltFeed::new(self.client.clone(), fetch, bbox, now)),
        ]
    }

    /// Runs every stage after fetching on the given batches.
    pub fn process(
        &self,
        batches: &[SourceBatch],
        now: DateTime<Utc>,
        places: Option<PlaceLookup<'_>>,
    ) -> Result<RunReport, PipelineError> {
        let features = self.engine.admit(batches.iter().flat_map(|b| b.features.iter()));
        let mut output = self.engine.run(&features, now);

        let geocode_lookups = match places {
            Some(lookup) => attach_places(&mut output.top, lookup.geocoder, lookup.cache, lookup.min_interval),
            None => 0,
        };

        let summary = self.engine.summarize(&features, &output.top, now);
        let meta = Meta::new(batches, &output, self.config.engine.grid.bbox);
        let written = write_artifacts(&self.config.output.dir, batches, &output, &summary, &meta)?;

        Ok(RunReport {
            generated_utc: now,
            features: features.len(),
            cells: output.cells.len(),
            top: output.top.len(),
            geocode_lookups,
            failed_sources: meta.failed_sources.keys().cloned().collect(),
            written,
        })
    }

    /// Full regeneration against the live feeds.
    ///
    /// Geocoding runs only when both `geocode` and the configured switch
    /// are on. A cache that cannot be saved is logged and does not fail the
    /// run.
    pub fn run_once(&self, now: DateTime<Utc>, geocode: bool) -> Result<RunReport, PipelineError> {
        info!(now = %now.to_rfc3339(), "starting regeneration");
        let batches = fetch_all(self.feeds(now), &RetryPolicy::from_config(&self.config.fetch));

        let settings = &self.config.geocode;
        if !(geocode && settings.enabled) {
            return self.process(&batches, now, None);
        }

        let geocoder = NominatimGeocoder::new(self.client.clone(), &settings.base_url);
        let mut cache = GeocodeCache::load(&settings.cache_path);
        let report = self.process(
            &batches,
            now,
            Some(PlaceLookup {
                geocoder: &geocoder,
                cache: &mut cache,
                min_interval: Duration::from_millis(settings.min_interval_ms),
            }),
        )?;
        if let Err(e) = cache.save() {
            warn!(path = %settings.cache_path.display(), error = %e, "could not save geocode cache");
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocode::GeocodeError;
    use crate::ingest::fixtures::{fixture_gdelt_json, fixture_usgs_geojson};
    use crate::ingest::{gdelt, usgs};
    use crate::model::{BoundingBox, Source};
    use chrono::TimeZone;
    use serde_json::Value;
    use std::fs;

    struct NamedGeocoder;

    impl ReverseGeocoder for NamedGeocoder {
        fn reverse(&self, lat: f64, lon: f64) -> Result<String, GeocodeError> {
            Ok(format!("cell {:.2} {:.2}", lat, lon))
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn pipeline_into(dir: &std::path::Path) -> Pipeline {
        let mut config = HotspotConfig::default();
        config.output.dir = dir.to_path_buf();
        Pipeline::new(config).unwrap()
    }

    fn fixture_batches() -> Vec<SourceBatch> {
        let bbox = BoundingBox::default();
        vec![
            SourceBatch {
                source: Source::Seismic,
                features: usgs::parse_query_response(fixture_usgs_geojson(), &bbox).unwrap(),
                error: None,
            },
            SourceBatch {
                source: Source::DisasterAlert,
                features: Vec::new(),
                error: Some("unexpected HTTP status 503".to_string()),
            },
            SourceBatch {
                source: Source::NewsEvent,
                features: gdelt::parse_doc_response(fixture_gdelt_json(), &bbox).unwrap(),
                error: None,
            },
        ]
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = HotspotConfig::default();
        config.engine.windows.window_days = 0;
        assert!(matches!(Pipeline::new(config), Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_feeds_cover_every_known_source() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline_into(dir.path());
        let sources: Vec<Source> = pipeline.feeds(now()).iter().map(|f| f.source()).collect();
        assert_eq!(sources, Source::KNOWN.to_vec());
    }

    #[test]
    fn test_process_writes_every_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline_into(dir.path());

        let report = pipeline.process(&fixture_batches(), now(), None).unwrap();

        assert_eq!(report.features, 5);
        assert_eq!(report.geocode_lookups, 0);
        assert_eq!(report.failed_sources, vec!["gdacs".to_string()]);
        for name in [
            "usgs.geojson",
            "gdacs.geojson",
            "gdelt.geojson",
            "hotspots.geojson",
            "top_hotspots.json",
            "weekly.json",
            "meta.json",
        ] {
            assert!(dir.path().join(name).exists(), "{} should be written", name);
        }
        assert_eq!(report.written.len(), 7);

        let meta: Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("meta.json")).unwrap()).unwrap();
        assert_eq!(meta["counts"]["usgs"], 3);
        assert_eq!(meta["counts"]["gdacs"], 0);
        assert_eq!(meta["counts"]["gdelt"], 2);
        assert!(meta["failed_sources"]["gdacs"].as_str().unwrap().contains("503"));
    }

    #[test]
    fn test_process_attaches_places_when_asked() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline_into(dir.path());
        let mut cache = GeocodeCache::in_memory();

        let report = pipeline
            .process(
                &fixture_batches(),
                now(),
                Some(PlaceLookup {
                    geocoder: &NamedGeocoder,
                    cache: &mut cache,
                    min_interval: Duration::ZERO,
                }),
            )
            .unwrap();

        assert_eq!(report.geocode_lookups, report.top);
        let top: Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("top_hotspots.json")).unwrap())
                .unwrap();
        let rows = top.as_array().unwrap();
        assert_eq!(rows.len(), report.top);
        assert!(rows.iter().all(|r| r["place"].as_str().unwrap().starts_with("cell ")));
    }
}
