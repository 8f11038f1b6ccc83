//! Node data models

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Placeholder for geo fields that could not be determined
pub const UNKNOWN: &str = "Unknown";

/// Protocol tag carried by a subscription link
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Protocol {
    Vmess,
    Shadowsocks,
    Trojan,
    Vless,
    /// Any other `scheme://` link
    Other(String),
    /// Line without a scheme prefix
    #[default]
    Unknown,
}

impl Protocol {
    /// Classify a scheme string (the part before `://`)
    pub fn from_scheme(scheme: &str) -> Self {
        match scheme.to_lowercase().as_str() {
            "vmess" => Protocol::Vmess,
            "ss" => Protocol::Shadowsocks,
            "trojan" => Protocol::Trojan,
            "vless" => Protocol::Vless,
            other => Protocol::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Vmess => write!(f, "vmess"),
            Protocol::Shadowsocks => write!(f, "ss"),
            Protocol::Trojan => write!(f, "trojan"),
            Protocol::Vless => write!(f, "vless"),
            Protocol::Other(scheme) => write!(f, "{}", scheme),
            Protocol::Unknown => write!(f, "unknown"),
        }
    }
}

impl Serialize for Protocol {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One candidate node extracted from a subscription link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDescriptor {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub protocol: Protocol,
    pub raw_link: String,
}

impl NodeDescriptor {
    pub fn new(name: String, host: String, port: u16, protocol: Protocol, raw_link: String) -> Self {
        Self {
            name,
            host,
            port,
            protocol,
            raw_link,
        }
    }
}

impl fmt::Display for NodeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{} ({})", self.protocol, self.host, self.port, self.name)
    }
}

/// A node that passed the TCP probe
///
/// Unreachable nodes never become `ProbedNode`s; they are dropped by the
/// prober. `query_addr` is filled later by the aggregator's resolution pass
/// and holds the address used as the geolocation key.
#[derive(Debug, Clone)]
pub struct ProbedNode {
    pub descriptor: NodeDescriptor,
    pub latency_ms: u64,
    pub query_addr: Option<String>,
}

impl ProbedNode {
    pub fn new(descriptor: NodeDescriptor, latency_ms: u64) -> Self {
        Self {
            descriptor,
            latency_ms,
            query_addr: None,
        }
    }
}

/// One entry of the geolocation batch response, keyed by `query`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeoInfo {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub isp: Option<String>,
    #[serde(default, rename = "countryCode")]
    pub country_code: Option<String>,
}

impl GeoInfo {
    /// Whether the lookup succeeded for this address
    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some("success")
    }
}

/// A probed node merged with its geolocation data
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedNode {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub protocol: Protocol,
    pub latency_ms: u64,
    pub country: String,
    pub city: String,
    pub isp: String,
    pub country_code: String,
    pub raw_link: String,
}

impl EnrichedNode {
    /// Merge a probed node with its geo entry; a missing or partial entry
    /// degrades the affected fields to "Unknown"
    pub fn from_parts(node: ProbedNode, geo: Option<&GeoInfo>) -> Self {
        let field = |value: Option<&String>| {
            value.cloned().unwrap_or_else(|| UNKNOWN.to_string())
        };
        Self {
            name: node.descriptor.name,
            host: node.descriptor.host,
            port: node.descriptor.port,
            protocol: node.descriptor.protocol,
            latency_ms: node.latency_ms,
            country: field(geo.and_then(|g| g.country.as_ref())),
            city: field(geo.and_then(|g| g.city.as_ref())),
            isp: field(geo.and_then(|g| g.isp.as_ref())),
            country_code: field(geo.and_then(|g| g.country_code.as_ref())),
            raw_link: node.descriptor.raw_link,
        }
    }
}

/// Public address and location of the host running the probes,
/// used only as report metadata
#[derive(Debug, Clone, Serialize)]
pub struct ProbeOrigin {
    pub ip: String,
    pub country: String,
    pub city: String,
    pub isp: String,
}

impl Default for ProbeOrigin {
    fn default() -> Self {
        Self {
            ip: UNKNOWN.to_string(),
            country: UNKNOWN.to_string(),
            city: UNKNOWN.to_string(),
            isp: UNKNOWN.to_string(),
        }
    }
}

/// Final run output: write-once, serialized as pretty JSON
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub generated_at: String,
    pub probe_origin: ProbeOrigin,
    pub nodes: Vec<EnrichedNode>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_from_scheme() {
        assert_eq!(Protocol::from_scheme("vmess"), Protocol::Vmess);
        assert_eq!(Protocol::from_scheme("SS"), Protocol::Shadowsocks);
        assert_eq!(Protocol::from_scheme("trojan"), Protocol::Trojan);
        assert_eq!(Protocol::from_scheme("vless"), Protocol::Vless);
        assert_eq!(
            Protocol::from_scheme("hysteria2"),
            Protocol::Other("hysteria2".to_string())
        );
    }

    #[test]
    fn test_protocol_display() {
        assert_eq!(Protocol::Shadowsocks.to_string(), "ss");
        assert_eq!(Protocol::Unknown.to_string(), "unknown");
        assert_eq!(Protocol::Other("tuic".to_string()).to_string(), "tuic");
    }

    #[test]
    fn test_protocol_serializes_as_tag() {
        let json = serde_json::to_string(&Protocol::Vmess).unwrap();
        assert_eq!(json, "\"vmess\"");
    }

    #[test]
    fn test_geo_info_status() {
        let geo: GeoInfo =
            serde_json::from_str(r#"{"query":"1.2.3.4","status":"success"}"#).unwrap();
        assert!(geo.is_success());

        let geo: GeoInfo =
            serde_json::from_str(r#"{"query":"10.0.0.1","status":"fail"}"#).unwrap();
        assert!(!geo.is_success());
    }

    #[test]
    fn test_enriched_node_defaults_to_unknown() {
        let descriptor = NodeDescriptor::new(
            "node".to_string(),
            "1.2.3.4".to_string(),
            443,
            Protocol::Trojan,
            "trojan://x@1.2.3.4:443#node".to_string(),
        );
        let enriched = EnrichedNode::from_parts(ProbedNode::new(descriptor, 42), None);
        assert_eq!(enriched.country, UNKNOWN);
        assert_eq!(enriched.city, UNKNOWN);
        assert_eq!(enriched.isp, UNKNOWN);
        assert_eq!(enriched.country_code, UNKNOWN);
        assert_eq!(enriched.latency_ms, 42);
    }

    #[test]
    fn test_enriched_node_partial_geo() {
        let descriptor = NodeDescriptor::new(
            "node".to_string(),
            "1.2.3.4".to_string(),
            443,
            Protocol::Shadowsocks,
            "ss://x@1.2.3.4:443#node".to_string(),
        );
        let geo = GeoInfo {
            query: "1.2.3.4".to_string(),
            status: Some("success".to_string()),
            country: Some("Japan".to_string()),
            city: None,
            isp: Some("ExampleNet".to_string()),
            country_code: Some("JP".to_string()),
        };
        let enriched = EnrichedNode::from_parts(ProbedNode::new(descriptor, 9), Some(&geo));
        assert_eq!(enriched.country, "Japan");
        assert_eq!(enriched.city, UNKNOWN);
        assert_eq!(enriched.isp, "ExampleNet");
    }

    #[test]
    fn test_report_wire_names_are_camel_case() {
        let report = Report {
            generated_at: "2024-01-01 00:00:00 UTC".to_string(),
            probe_origin: ProbeOrigin::default(),
            nodes: Vec::new(),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("generatedAt").is_some());
        assert!(json.get("probeOrigin").is_some());
        assert!(json.get("nodes").is_some());
    }
}
