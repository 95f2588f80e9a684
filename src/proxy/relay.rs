//! Bidirectional relay
//!
//! Steady-state byte pipe between the client and the remote peer. No framing
//! is imposed; the session ends when both directions have stopped.

use tokio::io::{copy_bidirectional, AsyncRead, AsyncWrite};

/// Copy bytes in both directions until either side reaches end-of-stream.
///
/// Returns the byte counts (client to remote, remote to client). EOF in
/// either direction is normal termination, not an error.
pub async fn relay_streams<A, B>(client: &mut A, remote: &mut B) -> std::io::Result<(u64, u64)>
where
    A: AsyncRead + AsyncWrite + Unpin,
    B: AsyncRead + AsyncWrite + Unpin,
{
    copy_bidirectional(client, remote).await
}
