/// Source feed clients.
///
/// Each feed normalizes its own wire format into `Feature`s and drops
/// anything outside the bounding box:
/// - `usgs`  — USGS FDSN earthquake query (GeoJSON)
/// - `gdacs` — GDACS disaster alert RSS
/// - `gdelt` — GDELT DOC 2.0 article search (JSON), de-duplicated by URL
///
/// `fetch_all` runs the feeds in parallel on a thread pool. A feed that
/// keeps failing after its retry budget contributes an empty batch; the
/// run carries on with whatever the other feeds returned.

pub mod gdacs;
pub mod gdelt;
pub mod usgs;

#[cfg(test)]
pub(crate) mod fixtures;

use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use thiserror::Error;
use threadpool::ThreadPool;
use tracing::{info, warn};

use crate::config::FetchConfig;
use crate::model::{Feature, Source};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("failed to parse response: {0}")]
    Parse(String),
}

/// A feed that can produce one batch of normalized features.
pub trait FeedSource: Send + Sync {
    fn source(&self) -> Source;
    fn fetch(&self) -> Result<Vec<Feature>, FetchError>;
}

/// Features returned by one feed, or the error that emptied it.
#[derive(Debug, Clone)]
pub struct SourceBatch {
    pub source: Source,
    pub features: Vec<Feature>,
    pub error: Option<String>,
}

impl SourceBatch {
    fn failed(source: Source, error: String) -> Self {
        Self { source, features: Vec::new(), error: Some(error) }
    }
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

/// Shared blocking client with the configured user agent and timeout.
pub fn build_http_client(config: &FetchConfig) -> Result<reqwest::blocking::Client, FetchError> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// GETs `url` and returns the body, treating non-2xx as an error.
pub fn get_text(client: &reqwest::blocking::Client, url: &str) -> Result<String, FetchError> {
    let response = client.get(url).send()?;
    if !response.status().is_success() {
        return Err(FetchError::Status(response.status().as_u16()));
    }
    Ok(response.text()?)
}

// ---------------------------------------------------------------------------
// Retry
// ---------------------------------------------------------------------------

/// Capped exponential backoff: `attempts` tries in total, sleeping
/// `initial_backoff` before the first retry and doubling after that.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &FetchConfig) -> Self {
        Self {
            attempts: config.attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(retry.saturating_sub(1)))
    }
}

/// Runs `op` until it succeeds or the attempt budget is spent.
pub fn with_retry<T, F>(label: &str, policy: &RetryPolicy, mut op: F) -> Result<T, FetchError>
where
    F: FnMut() -> Result<T, FetchError>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= attempts => return Err(e),
            Err(e) => {
                let delay = policy.backoff(attempt);
                warn!(
                    feed = label,
                    attempt,
                    attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "fetch failed, retrying"
                );
                thread::sleep(delay);
                attempt += 1;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Parallel fetch
// ---------------------------------------------------------------------------

/// Fetches every feed in parallel and waits for all of them.
///
/// Batches come back in the order the feeds were given. Failures (including
/// a panicking feed) become empty batches with the error recorded.
pub fn fetch_all(feeds: Vec<Box<dyn FeedSource>>, policy: &RetryPolicy) -> Vec<SourceBatch> {
    let sources: Vec<Source> = feeds.iter().map(|f| f.source()).collect();
    let pool = ThreadPool::new(feeds.len().max(1));
    let (tx, rx) = mpsc::channel();

    for (index, feed) in feeds.into_iter().enumerate() {
        let tx = tx.clone();
        let policy = policy.clone();
        pool.execute(move || {
            let source = feed.source();
            let result = with_retry(source.label(), &policy, || feed.fetch());
            let _ = tx.send((index, result));
        });
    }
    drop(tx);

    let mut results: Vec<Option<Result<Vec<Feature>, FetchError>>> =
        sources.iter().map(|_| None).collect();
    for (index, result) in rx {
        results[index] = Some(result);
    }

    sources
        .into_iter()
        .zip(results)
        .map(|(source, result)| match result {
            Some(Ok(features)) => {
                info!(feed = source.label(), features = features.len(), "fetched feed");
                SourceBatch { source, features, error: None }
            }
            Some(Err(e)) => {
                warn!(feed = source.label(), error = %e, "feed failed, continuing without it");
                SourceBatch::failed(source, e.to_string())
            }
            None => {
                warn!(feed = source.label(), "feed worker died, continuing without it");
                SourceBatch::failed(source, "worker panicked".to_string())
            }
        })
        .collect()
}
