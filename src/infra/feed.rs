//! Client for the server-auction live data feed.
//!
//! - Decodes the `server` array into typed listings, tolerating numeric strings.
//! - Keeps a process-wide in-memory cache (5 minutes by default) shared by every
//!   client, backed by an on-disk snapshot, with stale fallbacks on fetch errors.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::OnceLock,
    time::{Duration, SystemTime},
};

use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::Listing;
use crate::infra::cache::{default_snapshot_path, load_snapshot, save_snapshot, FeedSnapshot};
use crate::util::version::user_agent;

pub const DEFAULT_FEED_URL: &str = "https://www.hetzner.com/a_hz_serverboerse/live_data.json";
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("http request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("malformed feed document: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("failed to read feed file: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CacheStatus {
    Fresh,
    Cached,
    Stale,
}

#[derive(Clone, Debug)]
pub struct CachedPayload<T> {
    pub data: T,
    pub fetched_at: SystemTime,
    pub status: CacheStatus,
}

impl<T> CachedPayload<T> {
    fn new(data: T, fetched_at: SystemTime, status: CacheStatus) -> Self {
        Self {
            data,
            fetched_at,
            status,
        }
    }
}

/// Raw feed document: `{"server": [...]}`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedDocument {
    #[serde(default)]
    pub server: Vec<ServerDto>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServerDto {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(deserialize_with = "lenient_price")]
    pub price: f64,
    #[serde(deserialize_with = "lenient_ram")]
    pub ram: u32,
    #[serde(default)]
    pub is_ecc: bool,
    #[serde(default)]
    pub cpu: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub cpu_benchmark: f64,
    #[serde(default)]
    pub description: Vec<String>,
}

impl FeedDocument {
    pub fn from_json_str(raw: &str) -> Result<Self, FeedError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, FeedError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Listings in feed order. Items without an upstream id use their position.
    pub fn listings(&self) -> Vec<Listing> {
        self.server
            .iter()
            .enumerate()
            .map(|(index, dto)| Listing {
                id: dto.id.unwrap_or(index as u64),
                price: dto.price,
                ram_gb: dto.ram,
                is_ecc: dto.is_ecc,
                cpu_id: dto.cpu.clone(),
                cpu_benchmark: dto.cpu_benchmark,
                description_lines: dto.description.clone(),
            })
            .collect()
    }
}

struct Cached<T> {
    value: T,
    fetched_at: SystemTime,
}

impl<T: Clone> Cached<T> {
    fn new(value: T, fetched_at: SystemTime) -> Self {
        Self { value, fetched_at }
    }

    fn if_fresh(&self, ttl: Duration) -> Option<CachedPayload<T>> {
        if self
            .fetched_at
            .elapsed()
            .map(|elapsed| elapsed <= ttl)
            .unwrap_or(false)
        {
            Some(CachedPayload::new(
                self.value.clone(),
                self.fetched_at,
                CacheStatus::Cached,
            ))
        } else {
            None
        }
    }

    fn stale(&self) -> CachedPayload<T> {
        CachedPayload::new(self.value.clone(), self.fetched_at, CacheStatus::Stale)
    }
}

/// Documents keyed by feed URL, shared by every client in the process.
fn shared_cache() -> &'static Mutex<HashMap<String, Cached<FeedDocument>>> {
    static CACHE: OnceLock<Mutex<HashMap<String, Cached<FeedDocument>>>> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

#[derive(Clone)]
pub struct FeedClient {
    http: Client,
    url: Url,
    ttl: Duration,
    snapshot_path: Option<PathBuf>,
}

impl FeedClient {
    pub fn new() -> Result<Self, FeedError> {
        Self::with_url(DEFAULT_FEED_URL)
    }

    pub fn with_url(url: &str) -> Result<Self, FeedError> {
        let url = Url::parse(url)?;
        let http = Client::builder().user_agent(user_agent()).build()?;
        Ok(Self {
            http,
            url,
            ttl: DEFAULT_TTL,
            snapshot_path: default_snapshot_path(),
        })
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_snapshot_path(mut self, path: PathBuf) -> Self {
        self.snapshot_path = Some(path);
        self
    }

    pub fn without_snapshot(mut self) -> Self {
        self.snapshot_path = None;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Fetch the feed, serving from cache while it is younger than the TTL.
    pub async fn fetch(&self) -> Result<CachedPayload<FeedDocument>, FeedError> {
        if let Some(payload) = self.cached_document().await {
            debug!(url = %self.url, "feed served from memory cache");
            return Ok(payload);
        }

        if let Some(snapshot) = self.load_snapshot().filter(|s| !s.is_expired(self.ttl)) {
            info!(url = %self.url, age = %snapshot.age_string(), "feed served from disk snapshot");
            let fetched_at = snapshot.fetched_at();
            self.remember(snapshot.document.clone(), fetched_at).await;
            return Ok(CachedPayload::new(
                snapshot.document,
                fetched_at,
                CacheStatus::Cached,
            ));
        }

        self.fetch_or_fallback().await
    }

    /// Bypass the caches and download a new copy, falling back to stale data on failure.
    pub async fn refresh(&self) -> Result<CachedPayload<FeedDocument>, FeedError> {
        self.fetch_or_fallback().await
    }

    async fn fetch_or_fallback(&self) -> Result<CachedPayload<FeedDocument>, FeedError> {
        match self.download().await {
            Ok(document) => {
                info!(url = %self.url, servers = document.server.len(), "downloaded feed");
                self.persist(&document);
                let fetched_at = SystemTime::now();
                self.remember(document.clone(), fetched_at).await;
                Ok(CachedPayload::new(document, fetched_at, CacheStatus::Fresh))
            }
            Err(error) => {
                if let Some(stale) = self.stale_document().await {
                    warn!(url = %self.url, %error, "feed download failed; serving stale copy");
                    Ok(stale)
                } else {
                    Err(error)
                }
            }
        }
    }

    async fn download(&self) -> Result<FeedDocument, FeedError> {
        let response = self
            .http
            .get(self.url.clone())
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<FeedDocument>().await?)
    }

    async fn cached_document(&self) -> Option<CachedPayload<FeedDocument>> {
        let cache = shared_cache().lock().await;
        cache
            .get(self.url.as_str())
            .and_then(|entry| entry.if_fresh(self.ttl))
    }

    async fn stale_document(&self) -> Option<CachedPayload<FeedDocument>> {
        {
            let cache = shared_cache().lock().await;
            if let Some(entry) = cache.get(self.url.as_str()) {
                return Some(entry.stale());
            }
        }
        self.load_snapshot().map(|snapshot| {
            let fetched_at = snapshot.fetched_at();
            CachedPayload::new(snapshot.document, fetched_at, CacheStatus::Stale)
        })
    }

    async fn remember(&self, document: FeedDocument, fetched_at: SystemTime) {
        let mut cache = shared_cache().lock().await;
        cache.insert(self.url.to_string(), Cached::new(document, fetched_at));
    }

    fn load_snapshot(&self) -> Option<FeedSnapshot> {
        let path = self.snapshot_path.as_deref()?;
        load_snapshot(path).filter(|snapshot| snapshot.url == self.url.as_str())
    }

    fn persist(&self, document: &FeedDocument) {
        let Some(path) = self.snapshot_path.as_deref() else {
            return;
        };
        let snapshot = FeedSnapshot::new(self.url.to_string(), document.clone());
        if let Err(error) = save_snapshot(path, &snapshot) {
            warn!(path = %path.display(), %error, "failed to save feed snapshot");
        }
    }
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct NumberOrString;

    impl<'de> serde::de::Visitor<'de> for NumberOrString {
        type Value = f64;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a number, a numeric string or null")
        }

        fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            if value.is_finite() {
                Ok(value)
            } else {
                Err(E::invalid_value(serde::de::Unexpected::Float(value), &self))
            }
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value as f64)
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value as f64)
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            value
                .trim()
                .replace(',', ".")
                .parse::<f64>()
                .ok()
                .filter(|parsed| parsed.is_finite())
                .ok_or_else(|| E::invalid_value(serde::de::Unexpected::Str(value), &self))
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(0.0)
        }
    }

    deserializer.deserialize_any(NumberOrString)
}

/// Negative prices are clamped to 0, which leaves the listing unvaluable (NaN value).
fn lenient_price<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(lenient_f64(deserializer)?.max(0.0))
}

fn lenient_ram<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = lenient_f64(deserializer)?;
    if raw.is_finite() && raw >= 0.0 && raw <= u32::MAX as f64 {
        Ok(raw.trunc() as u32)
    } else {
        Err(serde::de::Error::custom(format!("ram out of range: {raw}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_numbers_and_numeric_strings() {
        let document = FeedDocument::from_json_str(
            r#"{"server": [
                {"id": 11, "price": "39.0000", "ram": "64", "is_ecc": true, "cpu": "Intel Xeon E3-1275V6",
                 "cpu_benchmark": 8904, "description": ["2x SSD SATA 480 GB"], "datacenter": "FSN1-DC5"},
                {"price": 25.5, "ram": 16, "is_ecc": false, "cpu": "Intel Core i7-2600", "cpu_benchmark": null}
            ]}"#,
        )
        .unwrap();

        let listings = document.listings();
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].id, 11);
        assert_eq!(listings[0].price, 39.0);
        assert_eq!(listings[0].ram_gb, 64);
        assert_eq!(listings[0].cpu_benchmark, 8904.0);
        assert_eq!(listings[1].id, 1);
        assert_eq!(listings[1].cpu_benchmark, 0.0);
        assert!(listings[1].description_lines.is_empty());
    }

    #[test]
    fn rejects_unparseable_ram() {
        let result = FeedDocument::from_json_str(
            r#"{"server": [{"price": 10, "ram": "lots", "cpu": "x"}]}"#,
        );
        assert!(matches!(result, Err(FeedError::Decode(_))));
    }

    #[test]
    fn rejects_non_finite_prices() {
        for price in [r#""NaN""#, r#""inf""#, r#""-infinity""#] {
            let raw = format!(r#"{{"server": [{{"price": {price}, "ram": 16, "cpu": "x"}}]}}"#);
            assert!(
                matches!(FeedDocument::from_json_str(&raw), Err(FeedError::Decode(_))),
                "{price}"
            );
        }
    }

    #[test]
    fn clamps_negative_prices_to_zero() {
        let document = FeedDocument::from_json_str(
            r#"{"server": [
                {"price": "-5", "ram": 16, "cpu": "x"},
                {"price": -12.5, "ram": 16, "cpu": "x"}
            ]}"#,
        )
        .unwrap();
        let prices: Vec<f64> = document.listings().iter().map(|l| l.price).collect();
        assert_eq!(prices, vec![0.0, 0.0]);
    }

    #[test]
    fn missing_server_array_is_empty() {
        let document = FeedDocument::from_json_str("{}").unwrap();
        assert!(document.listings().is_empty());
    }

    #[test]
    fn invalid_url_is_reported() {
        assert!(matches!(
            FeedClient::with_url("not a url"),
            Err(FeedError::InvalidUrl(_))
        ));
    }
}
