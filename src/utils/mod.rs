//! Utility functions shared across the proxy

pub mod addr;

pub use addr::{find_crlf, split_host_port};

use crate::error::{Error, Result};

/// Parse a comma-separated list of ports, trimming whitespace and skipping
/// empty items.
pub fn parse_port_list(s: &str) -> Result<Vec<u16>> {
    let mut ports = Vec::new();

    for part in s.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let port = part
            .parse::<u16>()
            .map_err(|_| Error::Config(format!("invalid port in list: {:?}", part)))?;
        ports.push(port);
    }

    Ok(ports)
}
