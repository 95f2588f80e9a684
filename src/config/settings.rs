//! Proxy server configuration settings

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::Path;

/// Main configuration for the proxy server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Server listening address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Log level configuration
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Outbound connection configuration
    #[serde(default)]
    pub outbound: OutboundConfig,

    /// TLS record fragmentation configuration
    #[serde(default)]
    pub fragment: FragmentConfig,
}

/// Outbound connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundConfig {
    /// Local IP address to bind outgoing connections to.
    /// When unset the system default route is used.
    #[serde(default)]
    pub bind_addr: Option<IpAddr>,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

/// TLS record fragmentation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FragmentConfig {
    /// Destination ports whose tunneled TLS handshakes are fragmented
    #[serde(default = "default_fragment_ports")]
    pub ports: Vec<u16>,
}

fn default_listen_addr() -> SocketAddr {
    "127.0.0.1:8881".parse().unwrap()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_fragment_ports() -> Vec<u16> {
    vec![443]
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            log_level: default_log_level(),
            outbound: OutboundConfig::default(),
            fragment: FragmentConfig::default(),
        }
    }
}

impl Default for OutboundConfig {
    fn default() -> Self {
        Self {
            bind_addr: None,
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl Default for FragmentConfig {
    fn default() -> Self {
        Self {
            ports: default_fragment_ports(),
        }
    }
}

impl ProxyConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: ProxyConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        Ok(config)
    }

    /// Load configuration from an optional YAML file with environment
    /// variable overrides.
    pub fn load_config(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_yaml_file(p)?,
            None => Self::default(),
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides for development/testing
    fn apply_env_overrides(&mut self) {
        if let Ok(addr_str) = std::env::var("PROXY_LISTEN_ADDR") {
            if let Ok(addr) = addr_str.parse() {
                self.listen_addr = addr;
            }
        }

        if let Ok(log_level) = std::env::var("RUST_LOG") {
            self.log_level = log_level;
        }

        if let Ok(out) = std::env::var("PROXY_OUTGOING_ADDR") {
            if let Ok(ip) = out.parse() {
                self.outbound.bind_addr = Some(ip);
            }
        }

        if let Ok(timeout) = std::env::var("PROXY_CONNECT_TIMEOUT") {
            if let Ok(timeout) = timeout.parse() {
                self.outbound.connect_timeout_secs = timeout;
            }
        }

        if let Ok(ports) = std::env::var("PROXY_FRAGMENT_PORTS") {
            if let Ok(ports) = crate::utils::parse_port_list(&ports) {
                self.fragment.ports = ports;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config() {
        let config = ProxyConfig::default();
        assert_eq!(config.listen_addr, "127.0.0.1:8881".parse().unwrap());
        assert_eq!(config.log_level, "info");
        assert_eq!(config.outbound.bind_addr, None);
        assert_eq!(config.outbound.connect_timeout_secs, 10);
        assert_eq!(config.fragment.ports, vec![443]);
    }

    #[test]
    fn loads_yaml_config_with_defaults_for_missing_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "listen_addr: \"0.0.0.0:9000\"\nfragment:\n  ports: [443, 8443]\n"
        )
        .unwrap();

        let config = ProxyConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:9000".parse().unwrap());
        assert_eq!(config.fragment.ports, vec![443, 8443]);
        assert_eq!(config.outbound.connect_timeout_secs, 10);
    }

    #[test]
    fn missing_config_file_is_an_error() {
        assert!(ProxyConfig::from_yaml_file("/nonexistent/config.yml").is_err());
    }
}
