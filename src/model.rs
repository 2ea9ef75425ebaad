/// Shared data types for the hotspot service.
///
/// Everything that crosses a module boundary lives here: the normalized
/// `Feature`, the `Source` label set, the bounding box, grid keys, the frozen
/// `HotspotCell` produced by aggregation, top-N rows and the weekly `Summary`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Which feed a `Feature` came from.
///
/// The three known feeds carry fixed wire labels (`"USGS"`, `"GDACS"`,
/// `"GDELT"`). Anything else is kept as `Other` so scoring can fall back to
/// its default severity instead of rejecting the event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Source {
    /// Earthquakes from the USGS FDSN event service.
    Seismic,
    /// GDACS disaster alerts.
    DisasterAlert,
    /// GDELT news mentions.
    NewsEvent,
    Other(String),
}

impl Source {
    /// The known sources, in the order they are reported.
    pub const KNOWN: [Source; 3] = [Source::Seismic, Source::DisasterAlert, Source::NewsEvent];

    pub fn label(&self) -> &str {
        match self {
            Source::Seismic => "USGS",
            Source::DisasterAlert => "GDACS",
            Source::NewsEvent => "GDELT",
            Source::Other(label) => label,
        }
    }

    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_uppercase().as_str() {
            "USGS" => Source::Seismic,
            "GDACS" => Source::DisasterAlert,
            "GDELT" => Source::NewsEvent,
            _ => Source::Other(label.to_string()),
        }
    }

    /// File stem used for this source's output layer.
    pub fn layer_name(&self) -> String {
        self.label().to_ascii_lowercase()
    }
}

impl From<String> for Source {
    fn from(label: String) -> Self {
        Source::from_label(&label)
    }
}

impl From<Source> for String {
    fn from(source: Source) -> Self {
        source.label().to_string()
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-source event counts. All three known sources are always present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCounts {
    #[serde(rename = "USGS")]
    pub seismic: u32,
    #[serde(rename = "GDACS")]
    pub disaster_alert: u32,
    #[serde(rename = "GDELT")]
    pub news_event: u32,
}

impl SourceCounts {
    /// Bumps the counter for `source`. Returns false for sources outside
    /// the known set, which have no counter.
    pub fn increment(&mut self, source: &Source) -> bool {
        match source {
            Source::Seismic => self.seismic += 1,
            Source::DisasterAlert => self.disaster_alert += 1,
            Source::NewsEvent => self.news_event += 1,
            Source::Other(_) => return false,
        }
        true
    }

    pub fn get(&self, source: &Source) -> u32 {
        match source {
            Source::Seismic => self.seismic,
            Source::DisasterAlert => self.disaster_alert,
            Source::NewsEvent => self.news_event,
            Source::Other(_) => 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Features
// ---------------------------------------------------------------------------

/// A normalized point event.
///
/// `time` is kept exactly as the feed delivered it (after the normalizer's
/// own conversion to ISO 8601 where possible); interpretation happens in
/// `scoring::parse_event_time`, so a malformed value degrades to "no
/// timestamp" instead of failing the run. `properties` holds the
/// feed-specific attributes (magnitude, title, url, ...) and is passed
/// through to the output layers untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub lon: f64,
    pub lat: f64,
    pub source: Source,
    pub kind: String,
    pub time: Option<String>,
    pub properties: Map<String, Value>,
}

impl Feature {
    pub fn new(lon: f64, lat: f64, source: Source, kind: impl Into<String>) -> Self {
        Self {
            lon,
            lat,
            source,
            kind: kind.into(),
            time: None,
            properties: Map::new(),
        }
    }

    pub fn with_time(mut self, time: Option<String>) -> Self {
        self.time = time;
        self
    }

    /// Sets an opaque attribute. `Null` values are stored as-is so the
    /// output layer matches what the feed reported.
    pub fn with_property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }

    /// GeoJSON point feature with `source`, `type` and `time` merged into
    /// the pass-through property bag.
    pub fn to_geojson(&self) -> Value {
        let mut props = self.properties.clone();
        props.insert("source".to_string(), json!(self.source.label()));
        props.insert("type".to_string(), json!(self.kind));
        props.insert("time".to_string(), json!(self.time));
        json!({
            "type": "Feature",
            "geometry": { "type": "Point", "coordinates": [self.lon, self.lat] },
            "properties": props,
        })
    }
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// Rectangular lon/lat region; membership is closed on every edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub lon_min: f64,
    pub lat_min: f64,
    pub lon_max: f64,
    pub lat_max: f64,
}

impl BoundingBox {
    pub fn new(lon_min: f64, lat_min: f64, lon_max: f64, lat_max: f64) -> Self {
        Self { lon_min, lat_min, lon_max, lat_max }
    }

    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        (self.lon_min..=self.lon_max).contains(&lon) && (self.lat_min..=self.lat_max).contains(&lat)
    }

    pub fn is_inverted(&self) -> bool {
        self.lon_min > self.lon_max || self.lat_min > self.lat_max
    }
}

impl Default for BoundingBox {
    /// Rough Balkan box.
    fn default() -> Self {
        Self::new(13.0, 37.0, 30.0, 47.5)
    }
}

/// Integer grid cell index. Ordering (ix, then iy) is the deterministic
/// tie-break used when ranking cells with equal scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridKey {
    pub ix: i64,
    pub iy: i64,
}

// ---------------------------------------------------------------------------
// Hotspot cells
// ---------------------------------------------------------------------------

/// Week-over-week trajectory of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    /// No activity in either window.
    Na,
    /// Activity this window, none in the previous one.
    New,
    Up,
    Down,
    Flat,
}

impl Trend {
    pub fn arrow(self) -> &'static str {
        match self {
            Trend::Na => "·",
            Trend::New => "🆕",
            Trend::Up => "🔺",
            Trend::Down => "🔻",
            Trend::Flat => "▬",
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Trend::Na => "na",
            Trend::New => "new",
            Trend::Up => "up",
            Trend::Down => "down",
            Trend::Flat => "flat",
        }
    }
}

/// A finalized grid cell. Produced once per aggregation run and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct HotspotCell {
    pub key: GridKey,
    /// Cell center longitude.
    pub lon: f64,
    /// Cell center latitude.
    pub lat: f64,
    pub cell_deg: f64,
    pub score: f64,
    pub count: u32,
    pub sources: SourceCounts,
    pub last7_score: f64,
    pub prev7_score: f64,
    pub trend: Trend,
    pub change_pct: Option<f64>,
}

impl HotspotCell {
    pub fn trend_arrow(&self) -> &'static str {
        self.trend.arrow()
    }
}

/// A ranked cell with the place name a geocoder attached, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct TopRow {
    pub cell: HotspotCell,
    pub place: Option<String>,
}

impl From<HotspotCell> for TopRow {
    fn from(cell: HotspotCell) -> Self {
        Self { cell, place: None }
    }
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Window totals behind the summary headline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub score_last7: f64,
    pub score_prev7: f64,
    pub change_pct: Option<f64>,
}

/// A news headline surfaced in the digest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadlineExample {
    pub title: String,
    pub url: Option<String>,
    pub domain: Option<String>,
    pub time_utc: Option<String>,
}

/// Short human-readable report for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub generated_utc: DateTime<Utc>,
    pub headline: String,
    pub bullets: Vec<String>,
    pub stats: SummaryStats,
    pub counts: SourceCounts,
    pub examples: Vec<HeadlineExample>,
}

/// Rounds half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
