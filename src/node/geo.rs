//! Geolocation enrichment via a batch lookup API
//!
//! The service accepts a POST of up to 100 address strings per call and
//! allows roughly 15 calls per minute, so chunks are separated by a fixed
//! cooldown. A failed chunk leaves its addresses unenriched; it never aborts
//! the run.

use crate::error::{Error, Result};
use crate::node::models::{GeoInfo, ProbeOrigin, UNKNOWN};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::warn;

/// Default batch lookup endpoint
const DEFAULT_BATCH_URL: &str = "http://ip-api.com/batch";

/// Default probe-origin endpoint
const DEFAULT_ORIGIN_URL: &str = "http://ip-api.com/json/";

/// Service contract: at most 100 addresses per batch call
const DEFAULT_BATCH_SIZE: usize = 100;

/// Configuration for the geo enricher
#[derive(Debug, Clone)]
pub struct GeoConfig {
    /// Batch lookup endpoint
    pub batch_url: String,
    /// Probe-origin lookup endpoint
    pub origin_url: String,
    /// Maximum addresses per batch call
    pub batch_size: usize,
    /// Timeout for one batch call
    pub batch_timeout: Duration,
    /// Timeout for the origin lookup
    pub origin_timeout: Duration,
    /// Pause between consecutive batch calls
    pub cooldown: Duration,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            batch_url: DEFAULT_BATCH_URL.to_string(),
            origin_url: DEFAULT_ORIGIN_URL.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            batch_timeout: Duration::from_secs(10),
            origin_timeout: Duration::from_secs(5),
            cooldown: Duration::from_secs(2),
        }
    }
}

impl GeoConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_batch_url(mut self, url: String) -> Self {
        self.batch_url = url;
        self
    }

    pub fn with_origin_url(mut self, url: String) -> Self {
        self.origin_url = url;
        self
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }
}

/// Wire shape of the origin lookup response
#[derive(Debug, Deserialize)]
struct OriginResponse {
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    isp: Option<String>,
}

impl From<OriginResponse> for ProbeOrigin {
    fn from(r: OriginResponse) -> Self {
        let field = |v: Option<String>| v.unwrap_or_else(|| UNKNOWN.to_string());
        Self {
            ip: field(r.query),
            country: field(r.country),
            city: field(r.city),
            isp: field(r.isp),
        }
    }
}

/// Client for the geolocation service
pub struct GeoClient {
    config: GeoConfig,
    client: Client,
}

impl GeoClient {
    /// Create a new geo client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(GeoConfig::default())
    }

    /// Create a new geo client with custom configuration
    pub fn with_config(config: GeoConfig) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| Error::GeoBatch(e.to_string()))?;
        Ok(Self { config, client })
    }

    /// Look up geo data for a deduplicated address list
    ///
    /// Returns a map keyed by the `query` field of each response entry.
    /// Failed chunks and entries with a non-success status are absent from
    /// the map, never present with empty fields.
    pub async fn lookup_batch(&self, addrs: &[String]) -> HashMap<String, GeoInfo> {
        let mut results = HashMap::new();

        for (i, chunk) in addrs.chunks(self.config.batch_size).enumerate() {
            if i > 0 {
                tokio::time::sleep(self.config.cooldown).await;
            }
            match self.query_chunk(chunk).await {
                Ok(entries) => {
                    for entry in entries {
                        if entry.is_success() && !entry.query.is_empty() {
                            results.insert(entry.query.clone(), entry);
                        }
                    }
                }
                Err(e) => warn!("geo chunk of {} addresses skipped: {}", chunk.len(), e),
            }
        }

        results
    }

    async fn query_chunk(&self, chunk: &[String]) -> Result<Vec<GeoInfo>> {
        let response = self
            .client
            .post(&self.config.batch_url)
            .timeout(self.config.batch_timeout)
            .json(&chunk)
            .send()
            .await
            .map_err(|e| Error::GeoBatch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::GeoBatch(format!("HTTP {}", response.status())));
        }

        response
            .json::<Vec<GeoInfo>>()
            .await
            .map_err(|e| Error::GeoBatch(e.to_string()))
    }

    /// Look up the executing host's own address and location
    ///
    /// Used only as report metadata; any failure degrades to "Unknown"
    /// placeholders.
    pub async fn probe_origin(&self) -> ProbeOrigin {
        let request = self
            .client
            .get(&self.config.origin_url)
            .timeout(self.config.origin_timeout)
            .send();

        match request.await {
            Ok(response) if response.status().is_success() => {
                match response.json::<OriginResponse>().await {
                    Ok(origin) => origin.into(),
                    Err(e) => {
                        warn!("origin lookup returned bad JSON: {}", e);
                        ProbeOrigin::default()
                    }
                }
            }
            Ok(response) => {
                warn!("origin lookup returned HTTP {}", response.status());
                ProbeOrigin::default()
            }
            Err(e) => {
                warn!("origin lookup failed: {}", e);
                ProbeOrigin::default()
            }
        }
    }
}
