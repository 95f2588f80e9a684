//! Outbound dialer
//!
//! Opens the TCP connection to the remote target for a session, optionally
//! bound to a configured local source address, within a fixed timeout.

use crate::error::{Error, Result};
use crate::proxy::classifier::TargetAddr;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::net::{lookup_host, TcpSocket, TcpStream};
use tokio::time::timeout;
use tracing::debug;

/// Default outbound connect timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Opens outbound TCP connections, optionally from a fixed local address.
#[derive(Debug, Clone)]
pub struct Dialer {
    bind_addr: Option<IpAddr>,
    timeout: Duration,
}

impl Dialer {
    pub fn new(bind_addr: Option<IpAddr>, timeout: Duration) -> Self {
        Self { bind_addr, timeout }
    }

    /// Connect to the target within the configured timeout.
    pub async fn connect(&self, target: &TargetAddr) -> Result<TcpStream> {
        let stream = timeout(self.timeout, self.connect_inner(target))
            .await?
            .map_err(|e| Error::UpstreamConnection(format!("{}: {}", target, e)))?;

        Ok(stream)
    }

    async fn connect_inner(&self, target: &TargetAddr) -> std::io::Result<TcpStream> {
        let local_ip = match self.bind_addr {
            None => return TcpStream::connect((target.host.as_str(), target.port)).await,
            Some(ip) => ip,
        };

        let mut last_err = None;
        for addr in lookup_host((target.host.as_str(), target.port)).await? {
            // The local bind fixes the address family we can dial from.
            if addr.is_ipv4() != local_ip.is_ipv4() {
                continue;
            }
            match connect_from(local_ip, addr).await {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    debug!("Connect attempt to {} from {} failed: {}", addr, local_ip, e);
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::AddrNotAvailable,
                "no resolved address matches the outgoing bind address family",
            )
        }))
    }
}

async fn connect_from(local_ip: IpAddr, remote: SocketAddr) -> std::io::Result<TcpStream> {
    let socket = match remote {
        SocketAddr::V4(_) => TcpSocket::new_v4()?,
        SocketAddr::V6(_) => TcpSocket::new_v6()?,
    };
    socket.bind(SocketAddr::new(local_ip, 0))?;
    socket.connect(remote).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn connects_to_local_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let dialer = Dialer::new(None, Duration::from_secs(5));
        let target = TargetAddr::new("127.0.0.1", addr.port());
        let stream = dialer.connect(&target).await.unwrap();
        assert_eq!(stream.peer_addr().unwrap(), addr);
    }

    #[tokio::test]
    async fn binds_outgoing_connections_to_local_address() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let dialer = Dialer::new(Some("127.0.0.1".parse().unwrap()), Duration::from_secs(5));
        let target = TargetAddr::new("127.0.0.1", addr.port());
        let stream = dialer.connect(&target).await.unwrap();
        assert_eq!(stream.local_addr().unwrap().ip().to_string(), "127.0.0.1");
    }

    #[tokio::test]
    async fn refused_connection_is_an_error() {
        // Bind and drop to get a port nothing is listening on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let dialer = Dialer::new(None, Duration::from_secs(5));
        let target = TargetAddr::new("127.0.0.1", addr.port());
        assert!(dialer.connect(&target).await.is_err());
    }
}
