//! TLS record fragmentation transform
//!
//! Splits the first TLS record of a freshly established tunnel into several
//! smaller re-wrapped records, so that inspection systems which only examine
//! the first record of a handshake never see the full ClientHello. Runs at
//! most once per session, before the steady-state relay starts.

use bytes::{BufMut, BytesMut};
use rand::Rng;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// TLS record header length: content type, 2-byte version, 2-byte length.
pub const RECORD_HEADER_LEN: usize = 5;

/// Maximum number of ClientHello payload bytes captured in a single read.
pub const MAX_CAPTURE_LEN: usize = 2048;

/// Content type byte for TLS handshake records.
pub const CONTENT_TYPE_HANDSHAKE: u8 = 0x16;

/// Version tag written into every constructed record header.
///
/// Fixed on purpose: the re-wrapped records must not echo the version of the
/// original record, so this exact byte sequence is part of the wire contract.
pub const RECORD_VERSION: [u8; 2] = [0x03, 0x04];

/// Split a payload at random boundaries and frame each chunk as a
/// TLS-record-shaped fragment.
///
/// Every fragment carries at least one payload byte and the chunk lengths
/// sum to the input length. Empty input yields no fragments. The random
/// source is a parameter so boundary choices are reproducible in tests.
pub fn fragment_payload<R: Rng>(payload: &[u8], rng: &mut R) -> Vec<Vec<u8>> {
    let mut fragments = Vec::new();
    let mut remaining = payload;

    while !remaining.is_empty() {
        let part_len = rng.gen_range(1..=remaining.len());
        let (part, rest) = remaining.split_at(part_len);

        let mut record = BytesMut::with_capacity(RECORD_HEADER_LEN + part.len());
        record.put_u8(CONTENT_TYPE_HANDSHAKE);
        record.put_slice(&RECORD_VERSION);
        record.put_u16(part.len() as u16);
        record.put_slice(part);

        fragments.push(record.to_vec());
        remaining = rest;
    }

    fragments
}

/// One-shot fragmentation of the first tunneled burst.
///
/// Reads and discards the original 5-byte record header, captures up to
/// [`MAX_CAPTURE_LEN`] payload bytes in a single read (a short read is fine,
/// end-of-stream yields zero fragments), then writes the re-wrapped records
/// to the remote peer. A truncated header read or any write failure is
/// returned to the caller, which must tear the session down rather than fall
/// back to an unfragmented relay.
pub async fn fragment_first_record<C, S, R>(
    client: &mut C,
    remote: &mut S,
    rng: &mut R,
) -> std::io::Result<()>
where
    C: AsyncRead + Unpin,
    S: AsyncWrite + Unpin,
    R: Rng,
{
    let mut header = [0u8; RECORD_HEADER_LEN];
    client.read_exact(&mut header).await?;

    let mut payload = vec![0u8; MAX_CAPTURE_LEN];
    let n = client.read(&mut payload).await?;
    payload.truncate(n);

    for record in fragment_payload(&payload, rng) {
        remote.write_all(&record).await?;
    }
    remote.flush().await?;

    Ok(())
}
