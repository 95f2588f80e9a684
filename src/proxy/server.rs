//! Proxy server implementation
//!
//! Accept loop, per-session orchestration (classify, dial, fragment, relay)
//! and graceful drain on shutdown.

use crate::config::settings::ProxyConfig;
use crate::error::Result;
use crate::proxy::classifier::{classify, RouteDecision, TargetAddr, INITIAL_SEGMENT_CAP};
use crate::proxy::dialer::Dialer;
use crate::proxy::fragment::fragment_first_record;
use crate::proxy::relay::relay_streams;
use crate::proxy::supervisor::ConnectionSupervisor;
use crate::{log_error, log_info, log_warning};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use socket2::{Domain, Socket, Type};
use std::collections::HashSet;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

/// Literal response sent to the client when a CONNECT tunnel is accepted.
pub const TUNNEL_ESTABLISHED: &[u8] = b"HTTP/1.1 200 OK\r\n\r\n";

/// Read-only set of destination ports whose tunnels get the fragmentation
/// transform. Built once at startup, shared across all sessions.
#[derive(Debug, Clone, Default)]
pub struct FragmentPorts(HashSet<u16>);

impl FragmentPorts {
    pub fn new(ports: impl IntoIterator<Item = u16>) -> Self {
        Self(ports.into_iter().collect())
    }

    pub fn contains(&self, port: u16) -> bool {
        self.0.contains(&port)
    }
}

/// Shared, read-only context handed to every session task.
struct SessionContext {
    dialer: Dialer,
    fragment_ports: FragmentPorts,
}

/// The proxy server: a bound listener plus the shared session context.
pub struct ProxyServer {
    listener: TcpListener,
    context: Arc<SessionContext>,
}

impl ProxyServer {
    /// Bind the listening socket described by the configuration.
    pub fn bind(config: &ProxyConfig) -> Result<Self> {
        let listener = create_listener(config.listen_addr)?;
        let context = Arc::new(SessionContext {
            dialer: Dialer::new(
                config.outbound.bind_addr,
                Duration::from_secs(config.outbound.connect_timeout_secs),
            ),
            fragment_ports: FragmentPorts::new(config.fragment.ports.iter().copied()),
        });

        Ok(Self { listener, context })
    }

    /// Local address the server is listening on.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Run the accept loop until `shutdown` resolves, then stop accepting
    /// and wait for in-flight sessions to finish naturally.
    pub async fn serve(self, shutdown: impl Future<Output = ()>) -> Result<()> {
        let supervisor = Arc::new(ConnectionSupervisor::new());
        tokio::pin!(shutdown);

        log_info!("Proxy is running on {}", self.local_addr()?);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    log_info!("Shutdown signal received. Waiting for connections to finish...");
                    break;
                }
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            debug!("New connection from {}", peer);
                            let guard = supervisor.register();
                            let context = Arc::clone(&self.context);
                            tokio::spawn(async move {
                                let _guard = guard;
                                handle_session(stream, peer, context).await;
                            });
                        }
                        Err(e) => {
                            log_warning!("Failed to accept connection: {}", e);
                        }
                    }
                }
            }
        }

        // Stop accepting before draining; in-flight sessions run to
        // completion with no forced cancellation.
        drop(self.listener);
        supervisor.await_drain().await;
        log_info!("All connections closed. Exiting.");

        Ok(())
    }
}

fn create_listener(addr: SocketAddr) -> Result<TcpListener> {
    let domain = if addr.is_ipv6() {
        Domain::IPV6
    } else {
        Domain::IPV4
    };
    let socket = Socket::new(domain, Type::STREAM, None)?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(1024)?;

    Ok(TcpListener::from_std(socket.into())?)
}

/// Handle one client connection for its whole lifetime. Both sockets are
/// owned by this task and closed on every exit path.
async fn handle_session(mut client: TcpStream, peer: SocketAddr, ctx: Arc<SessionContext>) {
    let mut segment = [0u8; INITIAL_SEGMENT_CAP];
    let n = match client.read(&mut segment).await {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };

    let decision = match classify(&segment[..n]) {
        Ok(decision) => decision,
        Err(e) => {
            debug!("Rejected request from {}: {}", peer, e);
            return;
        }
    };

    match decision {
        RouteDecision::Tunnel { target } => {
            // The tunnel is acknowledged before the outbound dial is
            // attempted. A dial failure after this point shows up to the
            // client as an immediately closed "successful" tunnel.
            if client.write_all(TUNNEL_ESTABLISHED).await.is_err() {
                return;
            }

            let mut remote = match ctx.dialer.connect(&target).await {
                Ok(remote) => remote,
                Err(e) => {
                    log_error!("Failed to connect to {}: {}", target, e);
                    return;
                }
            };

            if ctx.fragment_ports.contains(target.port) {
                let mut rng = SmallRng::from_entropy();
                if let Err(e) = fragment_first_record(&mut client, &mut remote, &mut rng).await {
                    debug!("Fragmentation aborted for {}: {}", target, e);
                    return;
                }
            }

            finish_relay(&mut client, &mut remote, &target).await;
        }
        RouteDecision::Relay { target, head } => {
            let mut remote = match ctx.dialer.connect(&target).await {
                Ok(remote) => remote,
                Err(e) => {
                    log_error!("Failed to connect to {}: {}", target, e);
                    return;
                }
            };

            // Forward the captured first segment byte-for-byte, no header
            // rewriting.
            if let Err(e) = remote.write_all(&head).await {
                log_error!("Failed to send request to {}: {}", target, e);
                return;
            }

            finish_relay(&mut client, &mut remote, &target).await;
        }
    }
}

async fn finish_relay(client: &mut TcpStream, remote: &mut TcpStream, target: &TargetAddr) {
    match relay_streams(client, remote).await {
        Ok((to_remote, to_client)) => {
            debug!(
                "Session to {} done: {} bytes out, {} bytes in",
                target, to_remote, to_client
            );
        }
        Err(e) => {
            // EOF and resets are the normal way sessions end.
            debug!("Session to {} ended: {}", target, e);
        }
    }
}

/// Resolve when the process receives a termination request.
#[cfg(unix)]
pub async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let ctrl_c = tokio::signal::ctrl_c();

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = ctrl_c => info!("Received termination signal: SIGINT"),
                _ = term.recv() => info!("Received termination signal: SIGTERM"),
            }
        }
        Err(e) => {
            warn!("Failed to install SIGTERM handler: {}", e);
            let _ = ctrl_c.await;
        }
    }
}

/// Resolve when the process receives a termination request.
#[cfg(not(unix))]
pub async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Received termination signal");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_ports_membership() {
        let ports = FragmentPorts::new([443, 8443]);
        assert!(ports.contains(443));
        assert!(ports.contains(8443));
        assert!(!ports.contains(80));
        assert!(!FragmentPorts::default().contains(443));
    }

    #[tokio::test]
    async fn binds_to_ephemeral_port() {
        let mut config = ProxyConfig::default();
        config.listen_addr = "127.0.0.1:0".parse().unwrap();

        let server = ProxyServer::bind(&config).unwrap();
        let addr = server.local_addr().unwrap();
        assert_ne!(addr.port(), 0);
    }
}
