/// Service configuration loader - parses hotspot.toml
///
/// Keeps every tunable of the engine (bounding box, cell size, decay
/// half-life, trend band, window length, top-N) and of the collaborators
/// (fetch retry budget, feed lookbacks, geocoder, output directory) out of
/// the code. Every section has a `Default`, so a partial file is enough.
///
/// Unlike noisy feed data, a bad configuration is an invariant violation:
/// `load_config` and `HotspotConfig::validate` fail fast with a
/// `ConfigError` instead of degrading.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::model::BoundingBox;

/// Default config path, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "hotspot.toml";

/// Environment variable overriding `DEFAULT_CONFIG_PATH`.
pub const CONFIG_PATH_ENV: &str = "HOTSPOT_CONFIG";

/// Weight given to events without a usable timestamp.
pub const DEFAULT_DECAY_WEIGHT: f64 = 0.6;

/// Upper bound for the trend window and the feed lookbacks, in days.
pub const MAX_SPAN_DAYS: i64 = 3650;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("cell_deg must be positive, got {0}")]
    NonPositiveCellSize(f64),
    #[error("bounding box is inverted: lon {lon_min}..{lon_max}, lat {lat_min}..{lat_max}")]
    InvertedBoundingBox {
        lon_min: f64,
        lat_min: f64,
        lon_max: f64,
        lat_max: f64,
    },
    #[error("decay half-life must be positive, got {0} hours")]
    NonPositiveHalfLife(f64),
    #[error("missing-time decay weight must be in (0, 1), got {0}")]
    InvalidDefaultWeight(f64),
    #[error("trend band is empty: up threshold {up_pct} must exceed down threshold {down_pct}")]
    InvalidTrendBand { up_pct: f64, down_pct: f64 },
    #[error("window length of {0} days is outside 1..=3650")]
    WindowOutOfRange(i64),
    #[error("{feed} lookback of {days} days is outside 1..=3650")]
    LookbackOutOfRange { feed: &'static str, days: i64 },
}

// ---------------------------------------------------------------------------
// Engine configuration
// ---------------------------------------------------------------------------

/// Grid aggregation parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub bbox: BoundingBox,
    /// Cell edge length in degrees.
    pub cell_deg: f64,
    /// Length of the ranked list.
    pub top_n: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            bbox: BoundingBox::default(),
            cell_deg: 0.5,
            top_n: 15,
        }
    }
}

/// Recency weighting.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DecayConfig {
    pub half_life_hours: f64,
    /// Weight for events whose timestamp is missing or unparseable.
    pub missing_time_weight: f64,
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            half_life_hours: 72.0,
            missing_time_weight: DEFAULT_DECAY_WEIGHT,
        }
    }
}

/// Noise-suppression band for trend classification, in percent.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    pub up_pct: f64,
    pub down_pct: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            up_pct: 12.0,
            down_pct: -12.0,
        }
    }
}

/// Trailing comparison windows. The previous window has the same length
/// and ends where the current one starts.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub window_days: i64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self { window_days: 7 }
    }
}

// ---------------------------------------------------------------------------
// Collaborator configuration
// ---------------------------------------------------------------------------

/// Source fetch settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Total attempts per source, including the first.
    pub attempts: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub initial_backoff_ms: u64,
    pub usgs_days: i64,
    pub usgs_min_magnitude: f64,
    pub gdacs_days: i64,
    pub gdelt_days: i64,
    pub gdelt_max_records: u32,
    pub gdelt_keywords: Vec<String>,
    pub gdelt_countries: Vec<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "hotspot-service/0.1".to_string(),
            timeout_secs: 30,
            attempts: 3,
            initial_backoff_ms: 1_000,
            usgs_days: 7,
            usgs_min_magnitude: 2.5,
            gdacs_days: 14,
            gdelt_days: 2,
            gdelt_max_records: 250,
            gdelt_keywords: [
                "protest", "demonstration", "riot", "clash", "violence",
                "border", "checkpoint", "police", "attack", "explosion",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            gdelt_countries: [
                "Albania", "Bosnia", "Herzegovina", "Bulgaria", "Croatia",
                "Greece", "Kosovo", "Montenegro", "North Macedonia",
                "Romania", "Serbia", "Slovenia", "Turkey", "Moldova", "Hungary",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Reverse geocoding for the ranked list.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeocodeConfig {
    pub enabled: bool,
    pub base_url: String,
    pub cache_path: PathBuf,
    /// Pause between uncached lookups, to respect the service's rate limit.
    pub min_interval_ms: u64,
}

impl Default for GeocodeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            cache_path: PathBuf::from("data/geocode_cache.json"),
            min_interval_ms: 1_100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("docs/data"),
        }
    }
}

/// Everything the scoring/aggregation/trend engine needs. Kept separate
/// from the collaborator sections so the engine can be built from injected
/// values in tests.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub grid: GridConfig,
    pub decay: DecayConfig,
    pub trend: TrendConfig,
    pub windows: WindowConfig,
}

impl EngineConfig {
    /// Checks the invariants the engine relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let grid = &self.grid;
        if !(grid.cell_deg > 0.0) {
            return Err(ConfigError::NonPositiveCellSize(grid.cell_deg));
        }
        if grid.bbox.is_inverted() {
            let b = grid.bbox;
            return Err(ConfigError::InvertedBoundingBox {
                lon_min: b.lon_min,
                lat_min: b.lat_min,
                lon_max: b.lon_max,
                lat_max: b.lat_max,
            });
        }
        if !(self.decay.half_life_hours > 0.0) {
            return Err(ConfigError::NonPositiveHalfLife(self.decay.half_life_hours));
        }
        let weight = self.decay.missing_time_weight;
        if !(weight > 0.0 && weight < 1.0) {
            return Err(ConfigError::InvalidDefaultWeight(weight));
        }
        if !(self.trend.up_pct > self.trend.down_pct) {
            return Err(ConfigError::InvalidTrendBand {
                up_pct: self.trend.up_pct,
                down_pct: self.trend.down_pct,
            });
        }
        let days = self.windows.window_days;
        if !(1..=MAX_SPAN_DAYS).contains(&days) {
            return Err(ConfigError::WindowOutOfRange(days));
        }
        Ok(())
    }
}

/// Root configuration structure for TOML parsing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HotspotConfig {
    #[serde(flatten)]
    pub engine: EngineConfig,
    pub fetch: FetchConfig,
    pub geocode: GeocodeConfig,
    pub output: OutputConfig,
}

impl FetchConfig {
    /// Lookbacks are subtracted from the run time, so they must stay small.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let lookbacks = [
            ("usgs_days", self.usgs_days),
            ("gdacs_days", self.gdacs_days),
            ("gdelt_days", self.gdelt_days),
        ];
        for (feed, days) in lookbacks {
            if !(1..=MAX_SPAN_DAYS).contains(&days) {
                return Err(ConfigError::LookbackOutOfRange { feed, days });
            }
        }
        Ok(())
    }
}

impl HotspotConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;
        self.fetch.validate()
    }
}

/// Parses and validates configuration from a TOML string.
pub fn parse_config(contents: &str, path: &Path) -> Result<HotspotConfig, ConfigError> {
    let config: HotspotConfig = toml::from_str(contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}

/// Loads configuration from `path`.
///
/// A missing file is an error: running unattended on silent defaults would
/// hide a broken deployment.
pub fn load_config(path: &Path) -> Result<HotspotConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&contents, path)
}

/// Resolves the config path from `HOTSPOT_CONFIG`, falling back to
/// `hotspot.toml`.
pub fn config_path_from_env() -> PathBuf {
    std::env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}
