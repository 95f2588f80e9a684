//! Proxy core: request classification, outbound dialing, TLS record
//! fragmentation and bidirectional relaying.

pub mod classifier;
pub mod dialer;
pub mod fragment;
pub mod relay;
pub mod server;
pub mod supervisor;

pub use classifier::{classify, RouteDecision, TargetAddr};
pub use server::{shutdown_signal, FragmentPorts, ProxyServer};
