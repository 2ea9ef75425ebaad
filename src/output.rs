/// Static dataset writer.
///
/// One regeneration produces, in the output directory:
/// - `<source>.geojson`    — each feed's features, unmodified
/// - `hotspots.geojson`    — one point per surviving grid cell
/// - `top_hotspots.json`   — the ranked cells with attached places
/// - `weekly.json`         — the digest
/// - `meta.json`           — run timestamp, per-source counts, bbox
///
/// Cell scores are rounded to 3 decimals and `change_pct` to 1 here, at the
/// serialization boundary; the engine keeps full precision.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::engine::EngineOutput;
use crate::ingest::SourceBatch;
use crate::model::{round_to, BoundingBox, Feature, HotspotCell, SourceCounts, Summary, TopRow, Trend};

pub const HOTSPOTS_FILE: &str = "hotspots.geojson";
pub const TOP_FILE: &str = "top_hotspots.json";
pub const SUMMARY_FILE: &str = "weekly.json";
pub const META_FILE: &str = "meta.json";

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize {name}: {source}")]
    Json {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

// ---------------------------------------------------------------------------
// Property schema
// ---------------------------------------------------------------------------

/// Flattened cell properties as written to both the GeoJSON layer and the
/// ranked list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellRecord {
    pub lon: f64,
    pub lat: f64,
    pub cell_deg: f64,
    pub score: f64,
    pub count: u32,
    pub sources: SourceCounts,
    pub last7_score: f64,
    pub prev7_score: f64,
    pub trend: Trend,
    pub change_pct: Option<f64>,
    pub trend_arrow: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place: Option<String>,
}

impl CellRecord {
    pub fn new(cell: &HotspotCell, place: Option<&str>) -> Self {
        Self {
            lon: cell.lon,
            lat: cell.lat,
            cell_deg: cell.cell_deg,
            score: round_to(cell.score, 3),
            count: cell.count,
            sources: cell.sources,
            last7_score: round_to(cell.last7_score, 3),
            prev7_score: round_to(cell.prev7_score, 3),
            trend: cell.trend,
            change_pct: cell.change_pct.map(|c| round_to(c, 1)),
            trend_arrow: cell.trend_arrow(),
            place: place.map(str::to_string),
        }
    }
}

/// Run metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Meta {
    pub generated_utc: DateTime<Utc>,
    /// Features per layer, keyed by layer name.
    pub counts: BTreeMap<String, usize>,
    /// Feeds that failed this run, with the last error.
    pub failed_sources: BTreeMap<String, String>,
    pub bbox: BoundingBox,
    pub cell_deg: f64,
}

impl Meta {
    pub fn new(batches: &[SourceBatch], output: &EngineOutput, bbox: BoundingBox) -> Self {
        Self {
            generated_utc: output.generated_utc,
            counts: batches
                .iter()
                .map(|b| (b.source.layer_name(), b.features.len()))
                .collect(),
            failed_sources: batches
                .iter()
                .filter_map(|b| b.error.clone().map(|e| (b.source.layer_name(), e)))
                .collect(),
            bbox,
            cell_deg: output.cell_deg,
        }
    }
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

pub fn feature_collection(features: &[Feature]) -> Value {
    json!({
        "type": "FeatureCollection",
        "features": features.iter().map(Feature::to_geojson).collect::<Vec<_>>(),
    })
}

fn to_value<T: Serialize>(name: &str, value: &T) -> Result<Value, OutputError> {
    serde_json::to_value(value).map_err(|source| OutputError::Json {
        name: name.to_string(),
        source,
    })
}

/// Point collection of hotspot cells, located at the cell centers.
pub fn hotspot_collection(cells: &[HotspotCell]) -> Result<Value, OutputError> {
    let features = cells
        .iter()
        .map(|cell| {
            Ok(json!({
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [cell.lon, cell.lat] },
                "properties": to_value(HOTSPOTS_FILE, &CellRecord::new(cell, None))?,
            }))
        })
        .collect::<Result<Vec<_>, OutputError>>()?;
    Ok(json!({ "type": "FeatureCollection", "features": features }))
}

/// Ranked list as a JSON array.
pub fn top_list(rows: &[TopRow]) -> Result<Value, OutputError> {
    let records: Vec<CellRecord> = rows
        .iter()
        .map(|row| CellRecord::new(&row.cell, row.place.as_deref()))
        .collect();
    to_value(TOP_FILE, &records)
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Pretty-prints `value` to `path`, creating parent directories.
pub fn write_json(path: &Path, value: &Value) -> Result<(), OutputError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| OutputError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let text = serde_json::to_string_pretty(value).map_err(|source| OutputError::Json {
        name: path.display().to_string(),
        source,
    })?;
    fs::write(path, text).map_err(|source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes every artifact of a run into `dir`. Returns the written paths.
pub fn write_artifacts(
    dir: &Path,
    batches: &[SourceBatch],
    output: &EngineOutput,
    summary: &Summary,
    meta: &Meta,
) -> Result<Vec<PathBuf>, OutputError> {
    let mut written = Vec::new();

    for batch in batches {
        let path = dir.join(format!("{}.geojson", batch.source.layer_name()));
        write_json(&path, &feature_collection(&batch.features))?;
        written.push(path);
    }

    let documents = [
        (HOTSPOTS_FILE, hotspot_collection(&output.cells)?),
        (TOP_FILE, top_list(&output.top)?),
        (SUMMARY_FILE, to_value(SUMMARY_FILE, summary)?),
        (META_FILE, to_value(META_FILE, meta)?),
    ];
    for (name, value) in documents {
        let path = dir.join(name);
        write_json(&path, &value)?;
        written.push(path);
    }

    info!(dir = %dir.display(), files = written.len(), "wrote dataset");
    Ok(written)
}
