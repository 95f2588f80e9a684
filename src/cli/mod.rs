//! Command-line interface for the proxy server

use crate::config::settings::ProxyConfig;
use crate::utils::parse_port_list;
use anyhow::{Context, Result};
use clap::Parser;
use std::net::IpAddr;
use std::path::PathBuf;

/// Command-line arguments. Flags take precedence over the config file and
/// environment overrides; unset flags leave the loaded values alone.
#[derive(Parser, Debug)]
#[command(name = "rust-frag-proxy")]
#[command(about = "A local HTTP/HTTPS forward proxy with TLS record fragmentation")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// IP address to listen on (default 127.0.0.1)
    #[arg(long)]
    pub ip: Option<String>,

    /// Port to listen on (default 8881)
    #[arg(long)]
    pub port: Option<u16>,

    /// IP address for outgoing connections
    #[arg(long = "outgoing-addr")]
    pub outgoing_addr: Option<IpAddr>,

    /// Ports to fragment traffic on, comma separated (default 443)
    #[arg(long = "fragment-ports")]
    pub fragment_ports: Option<String>,

    /// Optional YAML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Cli {
    /// Resolve the final proxy configuration from file, environment and flags.
    pub fn into_config(self) -> Result<ProxyConfig> {
        let mut config = ProxyConfig::load_config(self.config.as_deref())?;

        if self.ip.is_some() || self.port.is_some() {
            let ip = self
                .ip
                .unwrap_or_else(|| config.listen_addr.ip().to_string());
            let port = self.port.unwrap_or_else(|| config.listen_addr.port());
            config.listen_addr = format!("{}:{}", ip, port)
                .parse()
                .with_context(|| format!("Invalid listen address: {}:{}", ip, port))?;
        }

        if let Some(outgoing) = self.outgoing_addr {
            config.outbound.bind_addr = Some(outgoing);
        }

        if let Some(ports) = self.fragment_ports {
            config.fragment.ports =
                parse_port_list(&ports).context("Invalid --fragment-ports list")?;
        }

        if let Some(level) = self.log_level {
            config.log_level = level;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_config_defaults() {
        let cli = Cli::try_parse_from(["rust-frag-proxy"]).unwrap();
        let config = cli.into_config().unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:8881".parse().unwrap());
        assert_eq!(config.fragment.ports, vec![443]);
        assert_eq!(config.outbound.bind_addr, None);
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "rust-frag-proxy",
            "--port",
            "9100",
            "--fragment-ports",
            "443, 8443",
            "--outgoing-addr",
            "10.0.0.1",
        ])
        .unwrap();

        let config = cli.into_config().unwrap();
        assert_eq!(config.listen_addr.port(), 9100);
        assert_eq!(config.listen_addr.ip().to_string(), "127.0.0.1");
        assert_eq!(config.fragment.ports, vec![443, 8443]);
        assert_eq!(config.outbound.bind_addr, Some("10.0.0.1".parse().unwrap()));
    }

    #[test]
    fn bad_fragment_ports_flag_is_rejected() {
        let cli =
            Cli::try_parse_from(["rust-frag-proxy", "--fragment-ports", "https"]).unwrap();
        assert!(cli.into_config().is_err());
    }
}
