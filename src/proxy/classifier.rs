//! Request classifier
//!
//! Inspects the first TCP segment received from a client and decides between
//! an HTTPS CONNECT tunnel and a plain HTTP relay. Anything it cannot route
//! is an error and the caller closes the connection without a response.

use crate::error::{Error, Result};
use crate::utils::{find_crlf, split_host_port};
use bytes::Bytes;
use std::fmt;
use url::Url;

/// Maximum number of bytes of the initial client segment considered for
/// routing. A request line that does not fit is rejected.
pub const INITIAL_SEGMENT_CAP: usize = 1500;

/// Remote endpoint a session is routed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetAddr {
    pub host: String,
    pub port: u16,
}

impl TargetAddr {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for TargetAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Routing decision derived from the first client segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// `CONNECT` request: open a raw tunnel to the target.
    Tunnel { target: TargetAddr },
    /// Any other method: forward the captured segment verbatim and relay.
    Relay { target: TargetAddr, head: Bytes },
}

/// Classify the first segment read from a freshly accepted connection.
pub fn classify(segment: &[u8]) -> Result<RouteDecision> {
    let line_end = find_crlf(segment)
        .ok_or(Error::MalformedRequest("no CRLF-terminated request line"))?;
    let line = std::str::from_utf8(&segment[..line_end])
        .map_err(|_| Error::MalformedRequest("request line is not valid UTF-8"))?;

    let mut tokens = line.split_whitespace();
    let method = tokens
        .next()
        .ok_or(Error::MalformedRequest("empty request line"))?;
    let target_token = tokens
        .next()
        .ok_or(Error::MalformedRequest("request line has no target"))?;

    if method == "CONNECT" {
        // Explicit port wins; a bare host dials 443, and 443 is also the
        // key used for fragment-port matching.
        let target = match split_host_port(target_token) {
            Some((host, port)) => TargetAddr::new(host, port),
            None => TargetAddr::new(
                target_token.trim_start_matches('[').trim_end_matches(']'),
                443,
            ),
        };
        return Ok(RouteDecision::Tunnel { target });
    }

    // Plain HTTP: prefer the Host header, fall back to an absolute URI target.
    let host_port = find_host_header(segment)
        .or_else(|| host_from_absolute_uri(target_token))
        .ok_or_else(|| Error::UnresolvedTarget(line.to_string()))?;

    let target = match split_host_port(&host_port) {
        Some((host, port)) => TargetAddr::new(host, port),
        None => TargetAddr::new(host_port, 80),
    };

    Ok(RouteDecision::Relay {
        target,
        head: Bytes::copy_from_slice(segment),
    })
}

/// Value of the first header line whose name case-insensitively equals
/// `Host`, trimmed of surrounding whitespace. Only the name is matched
/// case-insensitively, and the scan works on raw bytes: header lines are
/// not required to be valid UTF-8.
fn find_host_header(segment: &[u8]) -> Option<String> {
    let mut rest = segment;
    let mut request_line = true;

    loop {
        let (line, next) = match find_crlf(rest) {
            Some(end) => (&rest[..end], Some(&rest[end + 2..])),
            None => (rest, None),
        };

        if !request_line && line.len() > 5 && line[..5].eq_ignore_ascii_case(b"host:") {
            // First name match wins; an empty value falls through to the
            // absolute-URI target.
            let value = String::from_utf8_lossy(&line[5..]).trim().to_string();
            return (!value.is_empty()).then_some(value);
        }

        request_line = false;
        match next {
            Some(n) => rest = n,
            None => return None,
        }
    }
}

/// `host[:port]` from an absolute `http://` request target, if present.
fn host_from_absolute_uri(target: &str) -> Option<String> {
    if !target.starts_with("http://") {
        return None;
    }
    let url = Url::parse(target).ok()?;
    let host = url.host_str()?;
    match url.port() {
        Some(port) => Some(format!("{}:{}", host, port)),
        None => Some(host.to_string()),
    }
}
