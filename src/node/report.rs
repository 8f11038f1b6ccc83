//! Aggregation and report serialization
//!
//! Merges probe results with geo data, orders nodes by (country, latency),
//! and writes the pretty-printed JSON report. Geo matching is
//! resolved-IP-first with a host-string fallback: the query address computed
//! before the batch is tried first, then the literal host.

use crate::error::Result;
use crate::node::models::{EnrichedNode, GeoInfo, ProbeOrigin, ProbedNode, Report};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::path::Path;
use tracing::debug;

/// Fill each node's `query_addr` with the address to use as its geo key
///
/// Literal IP hosts are used as-is. Domain hosts are resolved once through a
/// per-host cache, preferring IPv4; an unresolvable domain leaves
/// `query_addr` unset and the node out of the geo batch.
pub async fn resolve_query_addrs(nodes: &mut [ProbedNode]) {
    let mut cache: HashMap<String, Option<String>> = HashMap::new();

    for node in nodes.iter_mut() {
        let host = node.descriptor.host.clone();
        if host.parse::<IpAddr>().is_ok() {
            node.query_addr = Some(host);
            continue;
        }

        if let Some(cached) = cache.get(&host) {
            node.query_addr = cached.clone();
            continue;
        }

        let resolved = resolve_host(&host, node.descriptor.port).await;
        if resolved.is_none() {
            debug!("could not resolve {}, skipping geo lookup", host);
        }
        cache.insert(host, resolved.clone());
        node.query_addr = resolved;
    }
}

async fn resolve_host(host: &str, port: u16) -> Option<String> {
    let addrs: Vec<IpAddr> = tokio::net::lookup_host((host, port))
        .await
        .ok()?
        .map(|sock| sock.ip())
        .collect();

    addrs
        .iter()
        .find(|ip| ip.is_ipv4())
        .or_else(|| addrs.first())
        .map(IpAddr::to_string)
}

/// The deduplicated query addresses of all probed nodes, in encounter order
pub fn unique_query_addrs(nodes: &[ProbedNode]) -> Vec<String> {
    let mut seen = HashSet::new();
    nodes
        .iter()
        .filter_map(|node| node.query_addr.clone())
        .filter(|addr| seen.insert(addr.clone()))
        .collect()
}

/// Merge geo results onto probed nodes by address match
pub fn merge(nodes: Vec<ProbedNode>, geo: &HashMap<String, GeoInfo>) -> Vec<EnrichedNode> {
    nodes
        .into_iter()
        .map(|node| {
            let entry = node
                .query_addr
                .as_ref()
                .and_then(|addr| geo.get(addr))
                .or_else(|| geo.get(&node.descriptor.host));
            EnrichedNode::from_parts(node, entry)
        })
        .collect()
}

/// Order nodes by country (lexical), then latency (ascending)
///
/// The sort is stable, so equal keys preserve encounter order and the result
/// is deterministic for identical inputs regardless of probe completion
/// order.
pub fn sort_nodes(nodes: &mut [EnrichedNode]) {
    nodes.sort_by(|a, b| {
        a.country
            .cmp(&b.country)
            .then(a.latency_ms.cmp(&b.latency_ms))
    });
}

/// Build the write-once report for this run
pub fn build_report(probe_origin: ProbeOrigin, nodes: Vec<EnrichedNode>) -> Report {
    Report {
        generated_at: Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        probe_origin,
        nodes,
    }
}

/// Serialize the report as pretty JSON and write it out
///
/// Non-ASCII characters are preserved literally. Serialization or write
/// failure is fatal for the run and propagates to the caller.
pub fn write_report(report: &Report, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)?;
    Ok(())
}
