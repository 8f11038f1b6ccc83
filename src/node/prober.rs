//! TCP latency prober
//!
//! A probe is a bare TCP connect used as a reachability/latency proxy, not a
//! protocol handshake. All descriptors are probed under a hard concurrency
//! cap; probes are independent and a failure drops that node only.

use crate::error::{Error, Result};
use crate::node::models::{NodeDescriptor, ProbedNode};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::sync::Semaphore;

/// Default connect timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 3;

/// Default number of concurrent probes
const DEFAULT_CONCURRENCY: usize = 20;

/// Configuration for the latency prober
#[derive(Debug, Clone)]
pub struct ProberConfig {
    /// Connect timeout for each probe
    pub timeout: Duration,
    /// Number of concurrent probes (hard cap)
    pub concurrency: usize,
}

impl Default for ProberConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl ProberConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}

/// Latency prober for node descriptors
#[derive(Clone)]
pub struct Prober {
    config: ProberConfig,
}

impl Prober {
    /// Create a new prober with default configuration
    pub fn new() -> Self {
        Self::with_config(ProberConfig::default())
    }

    /// Create a new prober with custom configuration
    pub fn with_config(config: ProberConfig) -> Self {
        Self { config }
    }

    /// Probe a single node, returning the connect latency in milliseconds
    ///
    /// The connection is dropped immediately after the handshake. DNS failure
    /// and connection refusal are `ProbeRefused`; the timeout covers both
    /// resolution and connect.
    pub async fn probe(&self, node: &NodeDescriptor) -> Result<u64> {
        let addr = if node.host.contains(':') {
            format!("[{}]:{}", node.host, node.port)
        } else {
            format!("{}:{}", node.host, node.port)
        };

        let start = Instant::now();
        match tokio::time::timeout(self.config.timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(_stream)) => Ok(start.elapsed().as_millis() as u64),
            Ok(Err(e)) => Err(Error::ProbeRefused(e.to_string())),
            Err(_) => Err(Error::ProbeTimeout),
        }
    }

    /// Probe all descriptors under the configured concurrency cap,
    /// keeping only the reachable ones
    ///
    /// Results are collected through the coordinator's stream, so no ordering
    /// or completion state leaks out of the pool; callers sort afterwards.
    pub async fn probe_all(&self, nodes: Vec<NodeDescriptor>) -> Vec<ProbedNode> {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));

        let results = stream::iter(nodes)
            .map(|node| {
                let sem = Arc::clone(&semaphore);
                let prober = self.clone();
                async move {
                    // Acquire only fails if the semaphore is closed, which
                    // cannot happen while we hold the Arc.
                    let _permit = sem
                        .acquire()
                        .await
                        .expect("Semaphore closed unexpectedly");
                    match prober.probe(&node).await {
                        Ok(latency_ms) => {
                            println!("[OK] {}ms - {}", latency_ms, node.name);
                            Some(ProbedNode::new(node, latency_ms))
                        }
                        Err(_) => {
                            println!("[FAIL] {}", node.name);
                            None
                        }
                    }
                }
            })
            .buffer_unordered(self.config.concurrency)
            .collect::<Vec<_>>()
            .await;

        results.into_iter().flatten().collect()
    }
}

impl Default for Prober {
    fn default() -> Self {
        Self::new()
    }
}
