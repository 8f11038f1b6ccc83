//! Node pipeline: link parsing, TCP probing, geo enrichment, reporting
//!
//! Data flows strictly downstream: parsed descriptors are probed under a
//! bounded pool, reachable nodes are enriched with batch geo lookups, and the
//! aggregator merges, sorts, and serializes the final report.

pub mod geo;
pub mod models;
pub mod parser;
pub mod prober;
pub mod report;

pub use geo::{GeoClient, GeoConfig};
pub use models::{
    EnrichedNode, GeoInfo, NodeDescriptor, ProbeOrigin, ProbedNode, Protocol, Report,
};
pub use parser::{parse_link, parse_links};
pub use prober::{Prober, ProberConfig};
