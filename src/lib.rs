/// hotspot_service: weekly regional event hotspot map for the Balkans.
///
/// # Module structure
///
/// ```text
/// hotspot_service
/// ├── model       — shared data types (Feature, Source, HotspotCell, Summary, …)
/// ├── config      — typed configuration loader (hotspot.toml)
/// ├── scoring     — per-feature severity, timestamp parsing, time decay
/// ├── engine      — HotspotEngine: validated config + one aggregation run
/// ├── analysis
/// │   ├── grid    — grid keys, trailing windows, cell aggregation, top-N ranking
/// │   ├── trend   — week-over-week change and trend classification
/// │   └── summary — headline, bullets and examples for the weekly digest
/// ├── ingest
/// │   ├── usgs    — USGS FDSN earthquake query: URL construction + GeoJSON parsing
/// │   ├── gdacs   — GDACS disaster alert RSS parsing
/// │   ├── gdelt   — GDELT DOC 2.0 article search + URL de-duplication
/// │   └── fixtures (test only) — representative feed payloads
/// ├── geocode     — reverse geocoding of ranked cells with a JSON file cache
/// ├── output      — GeoJSON/JSON artifact writer
/// └── pipeline    — one regeneration: fetch → aggregate → geocode → digest → write
/// ```

/// Public modules
pub mod analysis;
pub mod config;
pub mod engine;
pub mod geocode;
pub mod ingest;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod scoring;
