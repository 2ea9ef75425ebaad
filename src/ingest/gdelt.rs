/// GDELT DOC 2.0 article search client.
///
/// Queries `ArtList` mode for security-related keywords in the configured
/// countries. Only articles that carry a `location.geo` point are kept;
/// coordinates may arrive as numbers or strings. The batch is then
/// de-duplicated by URL (first occurrence wins, URL-less articles are
/// dropped), since syndicated copies of the same story would otherwise
/// inflate a single cell.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;

use crate::config::FetchConfig;
use crate::ingest::{get_text, FeedSource, FetchError};
use crate::model::{BoundingBox, Feature, Source};
use crate::scoring::parse_event_time;

const DOC_BASE_URL: &str = "https://api.gdeltproject.org/api/v2/doc/doc";

#[derive(Deserialize)]
struct DocResponse {
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Deserialize)]
struct Article {
    url: Option<String>,
    title: Option<String>,
    seendate: Option<String>,
    domain: Option<String>,
    language: Option<String>,
    #[serde(rename = "sourcecountry", alias = "sourceCountry")]
    source_country: Option<String>,
    location: Option<Location>,
}

#[derive(Deserialize)]
struct Location {
    geo: Option<Geo>,
}

#[derive(Deserialize)]
struct Geo {
    latitude: Option<Value>,
    longitude: Option<Value>,
}

// ---------------------------------------------------------------------------
// URL construction
// ---------------------------------------------------------------------------

/// `(k1 OR k2 ...) AND (c1 OR c2 ...)`
pub fn build_query(keywords: &[String], countries: &[String]) -> String {
    format!("({}) AND ({})", keywords.join(" OR "), countries.join(" OR "))
}

pub fn build_doc_url(
    query: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    max_records: u32,
) -> String {
    format!(
        "{}?query={}&mode=ArtList&format=json&maxrecords={}&startdatetime={}&enddatetime={}&sort=HybridRel",
        DOC_BASE_URL,
        urlencoding::encode(query),
        max_records,
        start.format("%Y%m%d%H%M%S"),
        end.format("%Y%m%d%H%M%S"),
    )
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Parses an ArtList body into located articles inside `bbox`.
///
/// An empty body is treated as "no articles"; GDELT answers that way when
/// the window has no matches.
///
/// # Errors
/// `FetchError::Parse` when the body is not the expected JSON.
pub fn parse_doc_response(json: &str, bbox: &BoundingBox) -> Result<Vec<Feature>, FetchError> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }
    let response: DocResponse = serde_json::from_str(json)
        .map_err(|e| FetchError::Parse(format!("GDELT ArtList: {}", e)))?;

    let mut features = Vec::new();
    for article in response.articles {
        let geo = article.location.and_then(|l| l.geo);
        let Some((lat, lon)) = geo.and_then(|g| {
            Some((number(g.latitude.as_ref()?)?, number(g.longitude.as_ref()?)?))
        }) else {
            debug!(url = ?article.url, "skipping article without coordinates");
            continue;
        };
        if !bbox.contains(lon, lat) {
            continue;
        }

        let time = article
            .seendate
            .as_deref()
            .and_then(parse_event_time)
            .map(|t| t.to_rfc3339());

        features.push(
            Feature::new(lon, lat, Source::NewsEvent, "news_event")
                .with_time(time)
                .with_property("title", article.title)
                .with_property("url", article.url)
                .with_property("domain", article.domain)
                .with_property("language", article.language)
                .with_property("snippet", article.source_country),
        );
    }
    Ok(dedup_by_url(features))
}

/// Keeps the first feature per URL and drops features without one.
pub fn dedup_by_url(features: Vec<Feature>) -> Vec<Feature> {
    let mut seen = HashSet::new();
    features
        .into_iter()
        .filter(|f| match f.property_str("url") {
            Some(url) if !url.is_empty() => seen.insert(url.to_string()),
            _ => false,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Feed
// ---------------------------------------------------------------------------

/// News mentions over the configured lookback.
pub struct GdeltFeed {
    client: reqwest::blocking::Client,
    bbox: BoundingBox,
    url: String,
}

impl GdeltFeed {
    pub fn new(
        client: reqwest::blocking::Client,
        config: &FetchConfig,
        bbox: BoundingBox,
        now: DateTime<Utc>,
    ) -> Self {
        let query = build_query(&config.gdelt_keywords, &config.gdelt_countries);
        let start = now - Duration::days(config.gdelt_days);
        Self {
            client,
            bbox,
            url: build_doc_url(&query, start, now, config.gdelt_max_records),
        }
    }
}

impl FeedSource for GdeltFeed {
    fn source(&self) -> Source {
        Source::NewsEvent
    }

    fn fetch(&self) -> Result<Vec<Feature>, FetchError> {
        let body = get_text(&self.client, &self.url)?;
        parse_doc_response(&body, &self.bbox)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
