/// Test fixtures: representative payloads from the three feeds.
///
/// Trimmed to the fields the parsers read, plus a few they must ignore.
/// Each payload mixes valid records with the edge cases the normalizers
/// have to drop (outside the box, missing coordinates, unparseable
/// values) so one fixture exercises both paths.
///
/// USGS FDSN GeoJSON shape:
///   features[]
///     .geometry.coordinates — [lon, lat, depth_km]
///     .properties.mag       — number (occasionally null)
///     .properties.time      — epoch milliseconds
///
/// GDACS RSS shape:
///   <item> with <title>, <link>, <pubDate> (RFC 2822), <georss:point>
///   ("lat lon")
///
/// GDELT DOC 2.0 ArtList shape:
///   articles[] with title, url, domain, language, sourcecountry,
///   seendate ("YYYYMMDDTHHMMSSZ") and location.geo.{latitude,longitude}

/// Three quakes inside the Balkan box (one with a null magnitude), one in
/// Japan and one with a truncated geometry.
/// All timestamps are on 2024-05-01 UTC.
pub(crate) fn fixture_usgs_geojson() -> &'static str {
    r#"{
      "type": "FeatureCollection",
      "metadata": { "generated": 1714564800000, "count": 5, "title": "USGS Earthquakes" },
      "features": [
        {
          "type": "Feature",
          "properties": {
            "mag": 4.6, "place": "12 km SW of Durres, Albania", "time": 1714557600000,
            "url": "https://earthquake.usgs.gov/earthquakes/eventpage/us7000m1a1",
            "title": "M 4.6 - 12 km SW of Durres, Albania", "tsunami": 0
          },
          "geometry": { "type": "Point", "coordinates": [19.37, 41.26, 10.0] },
          "id": "us7000m1a1"
        },
        {
          "type": "Feature",
          "properties": {
            "mag": 2.8, "place": "Crete, Greece", "time": 1714561200000,
            "url": "https://earthquake.usgs.gov/earthquakes/eventpage/us7000m1a2",
            "title": "M 2.8 - Crete, Greece"
          },
          "geometry": { "type": "Point", "coordinates": [25.1, 37.4, 35.2] },
          "id": "us7000m1a2"
        },
        {
          "type": "Feature",
          "properties": {
            "mag": null, "place": "Western Turkey", "time": 1714564800000,
            "url": "https://earthquake.usgs.gov/earthquakes/eventpage/us7000m1a3",
            "title": "M ? - Western Turkey"
          },
          "geometry": { "type": "Point", "coordinates": [27.9, 39.1, 8.0] },
          "id": "us7000m1a3"
        },
        {
          "type": "Feature",
          "properties": {
            "mag": 5.9, "place": "Honshu, Japan", "time": 1714564800000,
            "url": "https://earthquake.usgs.gov/earthquakes/eventpage/us7000m1a4",
            "title": "M 5.9 - Honshu, Japan"
          },
          "geometry": { "type": "Point", "coordinates": [141.2, 38.3, 40.0] },
          "id": "us7000m1a4"
        },
        {
          "type": "Feature",
          "properties": { "mag": 3.1, "place": "Bad geometry", "time": 1714564800000 },
          "geometry": { "type": "Point", "coordinates": [20.0] },
          "id": "us7000m1a5"
        }
      ]
    }"#
}

/// Four items: a recent flood in Romania, an old alert past the lookback,
/// one without a point and one outside the box. Lookback reference is
/// 2024-05-01T12:00:00Z.
pub(crate) fn fixture_gdacs_rss() -> &'static str {
    r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:georss="http://www.georss.org/georss" xmlns:gdacs="http://www.gdacs.org">
  <channel>
    <title>GDACS RSS information</title>
    <item>
      <title><![CDATA[Green flood alert in Romania]]></title>
      <link>https://www.gdacs.org/report.aspx?eventtype=FL&amp;eventid=1102</link>
      <pubDate>Tue, 30 Apr 2024 08:15:00 GMT</pubDate>
      <georss:point>45.65 25.6</georss:point>
      <gdacs:alertlevel>Green</gdacs:alertlevel>
    </item>
    <item>
      <title>Orange forest fire alert in Greece</title>
      <link>https://www.gdacs.org/report.aspx?eventtype=WF&amp;eventid=1001</link>
      <pubDate>Mon, 01 Apr 2024 10:00:00 GMT</pubDate>
      <georss:point>38.1 23.7</georss:point>
    </item>
    <item>
      <title>Drought in the region</title>
      <link>https://www.gdacs.org/report.aspx?eventtype=DR&amp;eventid=1003</link>
      <pubDate>Tue, 30 Apr 2024 09:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Tropical cyclone in the Pacific</title>
      <link>https://www.gdacs.org/report.aspx?eventtype=TC&amp;eventid=1004</link>
      <pubDate>Tue, 30 Apr 2024 09:00:00 GMT</pubDate>
      <georss:point>15.2 140.1</georss:point>
    </item>
  </channel>
</rss>"#
}

/// Five articles: two distinct Balkan stories, a syndicated duplicate of
/// the first, one without a location and one located in Paris. One story
/// has an unparseable seendate.
pub(crate) fn fixture_gdelt_json() -> &'static str {
    r#"{
      "articles": [
        {
          "url": "https://news.example.rs/protest-belgrade",
          "title": "Thousands protest in Belgrade",
          "seendate": "20240501T091500Z",
          "domain": "news.example.rs",
          "language": "English",
          "sourcecountry": "Serbia",
          "location": { "geo": { "latitude": 44.82, "longitude": 20.46 } }
        },
        {
          "url": "https://news.example.rs/protest-belgrade",
          "title": "Thousands protest in Belgrade (syndicated)",
          "seendate": "20240501T101500Z",
          "domain": "wire.example.com",
          "language": "English",
          "location": { "geo": { "latitude": 44.82, "longitude": 20.46 } }
        },
        {
          "url": "https://news.example.mk/border-checkpoint",
          "title": "Police reinforce border checkpoint",
          "seendate": "sometime yesterday",
          "domain": "news.example.mk",
          "language": "Macedonian",
          "sourcecountry": "North Macedonia",
          "location": { "geo": { "latitude": "41.99", "longitude": "21.43" } }
        },
        {
          "url": "https://news.example.com/no-location",
          "title": "Explosion reported",
          "seendate": "20240501T080000Z",
          "domain": "news.example.com"
        },
        {
          "url": "https://news.example.fr/paris",
          "title": "Riot police deployed in Paris",
          "seendate": "20240501T070000Z",
          "domain": "news.example.fr",
          "location": { "geo": { "latitude": 48.85, "longitude": 2.35 } }
        }
      ]
    }"#
}
