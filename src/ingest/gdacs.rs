/// GDACS disaster alert RSS client.
///
/// The feed is read with a streaming `quick_xml` reader. Only the text of
/// `title`, `link`, `pubDate` and `georss:point` inside each `<item>` is
/// kept; entity and character references are resolved by the reader.
/// Items need a `pubDate` and a point; anything older than the lookback
/// cutoff, unparseable or outside the bounding box is dropped.

use chrono::{DateTime, Duration, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::debug;

use crate::config::FetchConfig;
use crate::ingest::{get_text, FeedSource, FetchError};
use crate::model::{BoundingBox, Feature, Source};
use crate::scoring::parse_event_time;

pub const RSS_URL: &str = "https://www.gdacs.org/xml/rss.xml";

// ---------------------------------------------------------------------------
// XML reading
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum Field {
    Title,
    Link,
    PubDate,
    Point,
}

impl Field {
    fn from_tag(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Field::Title),
            b"link" => Some(Field::Link),
            b"pubDate" => Some(Field::PubDate),
            b"georss:point" | b"point" => Some(Field::Point),
            _ => None,
        }
    }
}

/// Raw text of one `<item>`.
#[derive(Debug, Default)]
struct RawItem {
    title: String,
    link: String,
    pub_date: String,
    point: String,
}

impl RawItem {
    fn push(&mut self, field: Field, text: &str) {
        let slot = match field {
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::PubDate => &mut self.pub_date,
            Field::Point => &mut self.point,
        };
        slot.push_str(text);
    }
}

fn non_empty(text: &str) -> Option<&str> {
    Some(text.trim()).filter(|t| !t.is_empty())
}

fn read_items(xml: &str) -> Result<Vec<RawItem>, FetchError> {
    let mut reader = Reader::from_str(xml);
    let mut items = Vec::new();
    let mut current: Option<RawItem> = None;
    let mut field: Option<Field> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                if e.name().as_ref() == b"item" {
                    current = Some(RawItem::default());
                    field = None;
                } else if current.is_some() {
                    field = Field::from_tag(e.name().as_ref());
                }
            }
            Ok(Event::End(ref e)) => {
                if e.name().as_ref() == b"item" {
                    items.extend(current.take());
                }
                field = None;
            }
            Ok(Event::Text(ref e)) => {
                if let (Some(item), Some(f)) = (current.as_mut(), field) {
                    match e.unescape() {
                        Ok(text) => item.push(f, &text),
                        Err(err) => {
                            debug!(error = %err, "keeping GDACS text with unresolved entities");
                            item.push(f, &String::from_utf8_lossy(e));
                        }
                    }
                }
            }
            Ok(Event::CData(e)) => {
                if let (Some(item), Some(f)) = (current.as_mut(), field) {
                    item.push(f, &String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(FetchError::Parse(format!("GDACS RSS: {}", e))),
            _ => {}
        }
    }
    Ok(items)
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// `"lat lon"` as used by GeoRSS simple points.
fn parse_point(point: &str) -> Option<(f64, f64)> {
    let mut parts = point.split_whitespace();
    let lat = parts.next()?.parse().ok()?;
    let lon = parts.next()?.parse().ok()?;
    Some((lat, lon))
}

/// Parses the RSS body into alert features published at or after
/// `cutoff` and located inside `bbox`.
///
/// # Errors
/// `FetchError::Parse` when the body is not well-formed XML.
pub fn parse_rss(
    xml: &str,
    bbox: &BoundingBox,
    cutoff: DateTime<Utc>,
) -> Result<Vec<Feature>, FetchError> {
    let mut features = Vec::new();

    for item in read_items(xml)? {
        let Some(published) = non_empty(&item.pub_date).and_then(parse_event_time) else {
            debug!("skipping GDACS item without a usable pubDate");
            continue;
        };
        if published < cutoff {
            continue;
        }
        let Some((lat, lon)) = parse_point(&item.point) else {
            debug!("skipping GDACS item without a usable point");
            continue;
        };
        if !bbox.contains(lon, lat) {
            continue;
        }

        features.push(
            Feature::new(lon, lat, Source::DisasterAlert, "disaster_alert")
                .with_time(Some(published.to_rfc3339()))
                .with_property("title", non_empty(&item.title))
                .with_property("url", non_empty(&item.link)),
        );
    }
    Ok(features)
}

/// Alerts over the configured lookback.
pub struct GdacsFeed {
    client: reqwest::blocking::Client,
    bbox: BoundingBox,
    cutoff: DateTime<Utc>,
}

impl GdacsFeed {
    pub fn new(
        client: reqwest::blocking::Client,
        config: &FetchConfig,
        bbox: BoundingBox,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            client,
            bbox,
            cutoff: now - Duration::days(config.gdacs_days),
        }
    }
}

impl FeedSource for GdacsFeed {
    fn source(&self) -> Source {
        Source::DisasterAlert
    }

    fn fetch(&self) -> Result<Vec<Feature>, FetchError> {
        let body = get_text(&self.client, RSS_URL)?;
        parse_rss(&body, &self.bbox, self.cutoff)
    }
}
