//! Rust Frag Proxy - a local HTTP/HTTPS forward proxy with TLS record
//! fragmentation for DPI evasion.
//!
//! Plain HTTP requests and CONNECT tunnels are relayed 1:1 onto fresh
//! outbound connections, optionally bound to a configured source address.
//! On configured destination ports the first TLS record of a tunnel is
//! split into several smaller re-wrapped records before forwarding, so
//! inspection systems that only look at the first record never see the
//! full ClientHello.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod proxy;
pub mod utils;

// Re-export commonly used items
pub use config::settings::ProxyConfig;
pub use error::{Error, Result};
pub use logging::init_logger_with_config;
pub use proxy::classifier::{classify, RouteDecision, TargetAddr};
pub use proxy::server::{shutdown_signal, FragmentPorts, ProxyServer};
