//! Pipeline coordinator
//!
//! One run: resolve URLs, fetch and decode each payload, parse links, probe
//! under the bounded pool, enrich the reachable set with geo data, then sort
//! and write the report. Per-item failures shrink the result set; only a
//! report write failure is fatal.

use crate::error::Result;
use crate::node::geo::{GeoClient, GeoConfig};
use crate::node::models::Report;
use crate::node::prober::{Prober, ProberConfig};
use crate::node::{parser, report};
use crate::subscription::decoder;
use crate::subscription::fetcher::{FetchConfig, SubscriptionFetcher};
use std::path::PathBuf;
use tracing::warn;

/// Configuration for one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Subscription URLs to fetch, already resolved by the caller
    pub urls: Vec<String>,
    /// Report destination
    pub output: PathBuf,
    pub fetch: FetchConfig,
    pub prober: ProberConfig,
    pub geo: GeoConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            output: PathBuf::from("nodes.json"),
            fetch: FetchConfig::default(),
            prober: ProberConfig::default(),
            geo: GeoConfig::default(),
        }
    }
}

/// Run the full pipeline
///
/// Returns `None` without writing anything when no URL is configured; that is
/// a clean termination, not an error. Otherwise returns the report that was
/// written to `config.output`.
pub async fn run(config: PipelineConfig) -> Result<Option<Report>> {
    if config.urls.is_empty() {
        println!("No subscription URL configured, nothing to do.");
        return Ok(None);
    }

    let geo_client = GeoClient::with_config(config.geo)?;
    let probe_origin = geo_client.probe_origin().await;
    println!("Probe origin: {} ({})", probe_origin.ip, probe_origin.country);

    let fetcher = SubscriptionFetcher::with_config(config.fetch)?;
    let mut links = Vec::new();
    for url in &config.urls {
        match fetch_links(&fetcher, url).await {
            Ok(mut found) => links.append(&mut found),
            Err(e) => warn!("skipping subscription {}: {}", url, e),
        }
    }

    let nodes = parser::parse_links(&links);
    println!("Found {} nodes. Testing connectivity...", nodes.len());

    let prober = Prober::with_config(config.prober);
    let mut probed = prober.probe_all(nodes).await;
    println!("{} nodes reachable.", probed.len());

    report::resolve_query_addrs(&mut probed).await;
    let addrs = report::unique_query_addrs(&probed);
    let geo_map = geo_client.lookup_batch(&addrs).await;

    let mut enriched = report::merge(probed, &geo_map);
    report::sort_nodes(&mut enriched);

    let final_report = report::build_report(probe_origin, enriched);
    report::write_report(&final_report, &config.output)?;
    println!("Done. Data saved to {}", config.output.display());

    Ok(Some(final_report))
}

async fn fetch_links(fetcher: &SubscriptionFetcher, url: &str) -> Result<Vec<String>> {
    let payload = fetcher.fetch_payload(url).await?;
    decoder::decode_payload(&payload)
}
