/// Reverse geocoding for the ranked hotspot list.
///
/// The engine never calls this; the pipeline attaches place names to the
/// top-N rows after aggregation. Lookups go through a persistent JSON cache
/// keyed by `"{lat:.2},{lon:.2}"`, so repeated runs over a stable map only
/// hit the network for new cells. Any lookup failure yields the literal
/// `"unknown"` and is not cached.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::model::TopRow;

/// Place name used when a lookup fails.
pub const UNKNOWN_PLACE: &str = "unknown";

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("geocoder request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("geocoder returned HTTP {0}")]
    Status(u16),
    #[error("geocoder returned no usable name")]
    NoName,
    #[error("geocode cache I/O on {path}: {source}")]
    CacheIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("geocode cache serialization: {0}")]
    CacheFormat(#[from] serde_json::Error),
}

/// Cache key for a coordinate pair.
pub fn cache_key(lat: f64, lon: f64) -> String {
    format!("{:.2},{:.2}", lat, lon)
}

/// Turns a coordinate into a display name.
pub trait ReverseGeocoder {
    fn reverse(&self, lat: f64, lon: f64) -> Result<String, GeocodeError>;
}

// ---------------------------------------------------------------------------
// Nominatim
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ReverseResponse {
    display_name: Option<String>,
    #[serde(default)]
    address: BTreeMap<String, Value>,
}

/// Short "locality, country" label from a Nominatim reverse response.
fn short_name(response: ReverseResponse) -> Option<String> {
    let locality = ["city", "town", "village", "municipality", "county", "state"]
        .iter()
        .find_map(|key| response.address.get(*key).and_then(Value::as_str));
    let country = response.address.get("country").and_then(Value::as_str);
    match (locality, country) {
        (Some(locality), Some(country)) => Some(format!("{}, {}", locality, country)),
        (Some(locality), None) => Some(locality.to_string()),
        (None, Some(country)) => Some(country.to_string()),
        (None, None) => response.display_name.filter(|name| !name.trim().is_empty()),
    }
}

/// OpenStreetMap Nominatim reverse geocoder.
pub struct NominatimGeocoder {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new(client: reqwest::blocking::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn reverse_url(&self, lat: f64, lon: f64) -> String {
        format!(
            "{}/reverse?format=jsonv2&lat={:.4}&lon={:.4}&zoom=10&accept-language=en",
            self.base_url, lat, lon
        )
    }
}

impl ReverseGeocoder for NominatimGeocoder {
    fn reverse(&self, lat: f64, lon: f64) -> Result<String, GeocodeError> {
        let response = self.client.get(self.reverse_url(lat, lon)).send()?;
        if !response.status().is_success() {
            return Err(GeocodeError::Status(response.status().as_u16()));
        }
        let body: ReverseResponse = response.json()?;
        short_name(body).ok_or(GeocodeError::NoName)
    }
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

/// Opaque key-value store persisted as a JSON object.
#[derive(Debug, Default)]
pub struct GeocodeCache {
    path: Option<PathBuf>,
    entries: BTreeMap<String, String>,
    dirty: bool,
}

impl GeocodeCache {
    /// In-memory cache that is never written.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Loads the cache at `path`. A missing or corrupt file starts an empty
    /// cache; the next `save` replaces it.
    pub fn load(path: &Path) -> Self {
        let entries = match fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "geocode cache unreadable, starting empty");
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };
        debug!(path = %path.display(), entries = entries.len(), "loaded geocode cache");
        Self {
            path: Some(path.to_path_buf()),
            entries,
            dirty: false,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: String, place: String) {
        self.entries.insert(key, place);
        self.dirty = true;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes the cache back if anything changed.
    pub fn save(&mut self) -> Result<(), GeocodeError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if !self.dirty {
            return Ok(());
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| GeocodeError::CacheIo {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(&self.entries)?;
        fs::write(path, json).map_err(|source| GeocodeError::CacheIo {
            path: path.clone(),
            source,
        })?;
        self.dirty = false;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Attaching places
// ---------------------------------------------------------------------------

/// Attaches a place name to every row, from the cache when possible.
///
/// `min_interval` is slept between uncached lookups. Returns the number of
/// network lookups made.
pub fn attach_places(
    rows: &mut [TopRow],
    geocoder: &dyn ReverseGeocoder,
    cache: &mut GeocodeCache,
    min_interval: Duration,
) -> usize {
    let mut lookups = 0;
    for row in rows.iter_mut() {
        let key = cache_key(row.cell.lat, row.cell.lon);
        if let Some(place) = cache.get(&key) {
            row.place = Some(place.to_string());
            continue;
        }

        if lookups > 0 && !min_interval.is_zero() {
            thread::sleep(min_interval);
        }
        lookups += 1;

        let place = match geocoder.reverse(row.cell.lat, row.cell.lon) {
            Ok(place) => {
                cache.insert(key, place.clone());
                place
            }
            Err(e) => {
                warn!(key = %key, error = %e, "reverse geocoding failed");
                UNKNOWN_PLACE.to_string()
            }
        };
        row.place = Some(place);
    }
    info!(rows = rows.len(), lookups, "attached places to ranked cells");
    lookups
}
