//! Link parser turning subscription lines into node descriptors
//!
//! Supported shapes:
//! - `vmess://<base64 JSON>` with `add`/`port`/`ps` fields
//! - `scheme://user@host:port#name` (ss, trojan, vless, anything else)
//! - bare `host:port` lines, classified as protocol `unknown`
//!
//! A malformed line is a `ParseError` for that line only; batch parsing skips
//! it and continues.

use crate::error::{Error, Result};
use crate::node::models::{NodeDescriptor, Protocol};
use crate::subscription::decoder::decode_base64_text;
use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

/// Default port for user@host links without an explicit one
const DEFAULT_PORT: u16 = 443;

/// Bare `host:port` lines without a scheme prefix
static HOST_PORT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z0-9_.\-]+|\[[0-9A-Fa-f:.]+\]):(\d{1,5})$")
        .expect("Invalid host:port regex")
});

/// Inline JSON payload of a vmess link
#[derive(Debug, Deserialize)]
struct VmessPayload {
    add: String,
    port: VmessPort,
    #[serde(default)]
    ps: Option<String>,
}

/// vmess payloads carry the port as either a JSON number or a string
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum VmessPort {
    Num(u64),
    Text(String),
}

impl VmessPort {
    fn to_port(&self) -> Result<u16> {
        match self {
            VmessPort::Num(n) => coerce_port(&n.to_string()),
            VmessPort::Text(s) => coerce_port(s),
        }
    }
}

/// Parse one subscription line into a node descriptor
pub fn parse_link(line: &str) -> Result<NodeDescriptor> {
    let line = line.trim();
    if line.is_empty() {
        return Err(Error::Parse("empty line".to_string()));
    }

    match line.split_once("://") {
        Some(("vmess", payload)) => parse_vmess(payload, line),
        Some((scheme, rest)) => parse_addressed(scheme, rest, line),
        None => parse_bare(line),
    }
}

/// Parse a batch of lines, skipping malformed ones
pub fn parse_links<I, S>(lines: I) -> Vec<NodeDescriptor>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .filter_map(|line| match parse_link(line.as_ref()) {
            Ok(node) => Some(node),
            Err(e) => {
                debug!("skipping link: {}", e);
                None
            }
        })
        .collect()
}

/// vmess: the payload after the scheme is lenient base64 JSON
fn parse_vmess(payload: &str, raw_link: &str) -> Result<NodeDescriptor> {
    let json = decode_base64_text(payload)
        .map_err(|e| Error::Parse(format!("vmess payload: {}", e)))?;
    let info: VmessPayload = serde_json::from_str(&json)
        .map_err(|e| Error::Parse(format!("vmess JSON: {}", e)))?;

    if info.add.is_empty() {
        return Err(Error::Parse("vmess payload has empty host".to_string()));
    }

    Ok(NodeDescriptor::new(
        info.ps
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "Vmess Node".to_string()),
        info.add.clone(),
        info.port.to_port()?,
        Protocol::Vmess,
        raw_link.to_string(),
    ))
}

/// `scheme://[user@]host[:port][?query][#name]` links
fn parse_addressed(scheme: &str, rest: &str, raw_link: &str) -> Result<NodeDescriptor> {
    let protocol = Protocol::from_scheme(scheme);

    let (address, fragment) = match rest.split_once('#') {
        Some((address, fragment)) => (address, Some(fragment)),
        None => (rest, None),
    };

    let name = fragment
        .map(decode_name)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| format!("{} Node", scheme.to_uppercase()));

    // Credentials are irrelevant for probing; split on the last '@' so
    // passwords containing '@' cannot shift the host
    let host_port = match address.rsplit_once('@') {
        Some((_, host_port)) => host_port,
        None => address,
    };
    let host_port = host_port.split_once('?').map_or(host_port, |(hp, _)| hp);

    let (host, port) = split_host_port(host_port, Some(DEFAULT_PORT))?;

    Ok(NodeDescriptor::new(name, host, port, protocol, raw_link.to_string()))
}

/// Scheme-less lines: strict `host:port`, no default port
fn parse_bare(line: &str) -> Result<NodeDescriptor> {
    let caps = HOST_PORT_REGEX
        .captures(line)
        .ok_or_else(|| Error::Parse(format!("unrecognized line: {}", line)))?;

    let host = caps[1].trim_matches(&['[', ']'][..]).to_string();
    let port = coerce_port(&caps[2])?;

    Ok(NodeDescriptor::new(
        "Unknown Node".to_string(),
        host,
        port,
        Protocol::Unknown,
        line.to_string(),
    ))
}

/// Split `host:port`, `[v6]:port`, or a plain host (with `default` port)
fn split_host_port(s: &str, default: Option<u16>) -> Result<(String, u16)> {
    if s.is_empty() {
        return Err(Error::Parse("empty host".to_string()));
    }

    if let Some(rest) = s.strip_prefix('[') {
        let (host, after) = rest
            .split_once(']')
            .ok_or_else(|| Error::Parse(format!("unterminated IPv6 bracket: {}", s)))?;
        return match after.strip_prefix(':') {
            Some(port) => Ok((host.to_string(), coerce_port(port)?)),
            None if after.is_empty() => {
                let port = default
                    .ok_or_else(|| Error::Parse(format!("missing port: {}", s)))?;
                Ok((host.to_string(), port))
            }
            None => Err(Error::Parse(format!("trailing garbage after ']': {}", s))),
        };
    }

    match s.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() => Ok((host.to_string(), coerce_port(port)?)),
        Some(_) => Err(Error::Parse(format!("empty host: {}", s))),
        None => {
            let port = default.ok_or_else(|| Error::Parse(format!("missing port: {}", s)))?;
            Ok((s.to_string(), port))
        }
    }
}

/// Percent-decode a `#fragment` display name, lossy on bad UTF-8
fn decode_name(fragment: &str) -> String {
    percent_decode_str(fragment)
        .decode_utf8_lossy()
        .trim()
        .to_string()
}

/// Coerce a port string to 1..=65535; never clamps
fn coerce_port(s: &str) -> Result<u16> {
    let port: u16 = s
        .parse()
        .map_err(|_| Error::Parse(format!("invalid port: {}", s)))?;
    if port == 0 {
        return Err(Error::Parse("port 0 is not addressable".to_string()));
    }
    Ok(port)
}
