//! Configuration management

pub mod settings;

pub use settings::{FragmentConfig, OutboundConfig, ProxyConfig};
