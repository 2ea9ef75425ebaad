/// USGS FDSN event service client.
///
/// Handles URL construction and GeoJSON parsing for the earthquake query
/// endpoint:
///   https://earthquake.usgs.gov/fdsnws/event/1/query
///
/// Each quake becomes a `Seismic` feature of kind `earthquake` carrying
/// `mag`, `place`, `url` and `title` through unchanged. The epoch
/// millisecond `time` is converted to RFC 3339.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::config::FetchConfig;
use crate::ingest::{get_text, FeedSource, FetchError};
use crate::model::{BoundingBox, Feature, Source};

// ---------------------------------------------------------------------------
// Serde structures for the GeoJSON feed
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    features: Vec<QuakeFeature>,
}

#[derive(Deserialize)]
struct QuakeFeature {
    geometry: Option<Geometry>,
    #[serde(default)]
    properties: QuakeProperties,
}

#[derive(Deserialize)]
struct Geometry {
    #[serde(default)]
    coordinates: Vec<Value>,
}

#[derive(Deserialize, Default)]
struct QuakeProperties {
    mag: Option<Value>,
    place: Option<String>,
    time: Option<Value>,
    url: Option<String>,
    title: Option<String>,
}

// ---------------------------------------------------------------------------
// URL construction
// ---------------------------------------------------------------------------

const QUERY_BASE_URL: &str = "https://earthquake.usgs.gov/fdsnws/event/1/query";

/// Builds a query URL for quakes between `start` and `end` at or above
/// `min_magnitude`, always requesting GeoJSON.
pub fn build_query_url(start: DateTime<Utc>, end: DateTime<Utc>, min_magnitude: f64) -> String {
    format!(
        "{}?format=geojson&starttime={}&endtime={}&minmagnitude={}",
        QUERY_BASE_URL,
        start.format("%Y-%m-%dT%H:%M:%S"),
        end.format("%Y-%m-%dT%H:%M:%S"),
        min_magnitude
    )
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

fn coordinate(values: &[Value], index: usize) -> Option<f64> {
    values.get(index)?.as_f64()
}

fn epoch_millis_to_rfc3339(value: &Value) -> Option<String> {
    let millis = value.as_f64()?;
    DateTime::from_timestamp_millis(millis as i64).map(|dt| dt.to_rfc3339())
}

/// Parses a FDSN GeoJSON body into features inside `bbox`.
///
/// Quakes with fewer than two coordinates or outside the box are skipped.
///
/// # Errors
/// `FetchError::Parse` when the body is not a GeoJSON feature collection.
pub fn parse_query_response(json: &str, bbox: &BoundingBox) -> Result<Vec<Feature>, FetchError> {
    let response: QueryResponse = serde_json::from_str(json)
        .map_err(|e| FetchError::Parse(format!("USGS GeoJSON: {}", e)))?;

    let mut features = Vec::new();
    for quake in response.features {
        let coords = quake.geometry.map(|g| g.coordinates).unwrap_or_default();
        let (Some(lon), Some(lat)) = (coordinate(&coords, 0), coordinate(&coords, 1)) else {
            debug!("skipping quake without usable coordinates");
            continue;
        };
        if !bbox.contains(lon, lat) {
            continue;
        }

        let props = quake.properties;
        let time = props.time.as_ref().and_then(epoch_millis_to_rfc3339);
        features.push(
            Feature::new(lon, lat, Source::Seismic, "earthquake")
                .with_time(time)
                .with_property("mag", props.mag.unwrap_or(Value::Null))
                .with_property("place", props.place)
                .with_property("url", props.url)
                .with_property("title", props.title),
        );
    }
    Ok(features)
}

// ---------------------------------------------------------------------------
// Feed
// ---------------------------------------------------------------------------

/// Earthquakes over the configured lookback.
pub struct UsgsFeed {
    client: reqwest::blocking::Client,
    bbox: BoundingBox,
    url: String,
}

impl UsgsFeed {
    pub fn new(
        client: reqwest::blocking::Client,
        config: &FetchConfig,
        bbox: BoundingBox,
        now: DateTime<Utc>,
    ) -> Self {
        let start = now - Duration::days(config.usgs_days);
        Self {
            client,
            bbox,
            url: build_query_url(start, now, config.usgs_min_magnitude),
        }
    }
}

impl FeedSource for UsgsFeed {
    fn source(&self) -> Source {
        Source::Seismic
    }

    fn fetch(&self) -> Result<Vec<Feature>, FetchError> {
        let body = get_text(&self.client, &self.url)?;
        parse_query_response(&body, &self.bbox)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
