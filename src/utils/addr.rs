//! Host/port parsing helpers

/// Split a `host:port` string into host and numeric port.
///
/// Bracketed IPv6 literals (`[::1]:443`) are supported. Returns `None` when
/// no port component is present or when it does not parse as a port number.
pub fn split_host_port(s: &str) -> Option<(&str, u16)> {
    if let Some(rest) = s.strip_prefix('[') {
        let end = rest.find(']')?;
        let host = &rest[..end];
        let port = rest[end + 1..].strip_prefix(':')?.parse().ok()?;
        return Some((host, port));
    }

    let idx = s.rfind(':')?;
    let host = &s[..idx];
    // A second colon means an unbracketed IPv6 literal, not host:port
    if host.contains(':') {
        return None;
    }
    let port = s[idx + 1..].parse().ok()?;
    Some((host, port))
}

/// Locate the first CRLF in a buffer, returning the index of the `\r`.
pub fn find_crlf(data: &[u8]) -> Option<usize> {
    data.windows(2).position(|w| w == b"\r\n")
}
