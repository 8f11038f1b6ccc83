//! subprobe - Subscription Node Prober
//!
//! Decodes proxy subscription payloads into node descriptors, measures TCP
//! connect latency under bounded concurrency, enriches reachable nodes with
//! geolocation data, and writes a sorted JSON report.

pub mod error;
pub mod node;
pub mod pipeline;
pub mod subscription;

pub use error::{Error, Result};
pub use node::*;
pub use pipeline::PipelineConfig;
