//! Error handling module for the proxy

use thiserror::Error;
use tokio::time::error::Elapsed;

/// Custom error type for the proxy
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Timeout error: {0}")]
    Timeout(#[from] Elapsed),

    #[error("Malformed request: {0}")]
    MalformedRequest(&'static str),

    #[error("No usable target in request: {0}")]
    UnresolvedTarget(String),

    #[error("Upstream connection error: {0}")]
    UpstreamConnection(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for the proxy
pub type Result<T> = std::result::Result<T, Error>;
