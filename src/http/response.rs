//! Raw HTTP response packets.
//!
//! Plugins and the dispatcher queue pre-serialised bytes on the client
//! connection, so responses are built straight into `Bytes` rather than
//! through a response type.

use bytes::{BufMut, Bytes, BytesMut};
use http::StatusCode;

/// Serialise a complete HTTP/1.1 response.
///
/// `Content-Length` is added when a body is present and the caller did not
/// set one.
pub fn build_http_response(
    status: StatusCode,
    reason: &str,
    headers: &[(&str, &str)],
    body: Option<&[u8]>,
) -> Bytes {
    let body = body.unwrap_or_default();
    let mut out = BytesMut::with_capacity(128 + body.len());

    out.put_slice(format!("HTTP/1.1 {} {}\r\n", status.as_u16(), reason).as_bytes());
    for (name, value) in headers {
        put_header(&mut out, name, value);
    }
    let has_length = headers
        .iter()
        .any(|(name, _)| name.eq_ignore_ascii_case("content-length"));
    if !body.is_empty() && !has_length {
        put_header(&mut out, "Content-Length", &body.len().to_string());
    }
    out.put_slice(b"\r\n");
    out.put_slice(body);
    out.freeze()
}

fn put_header(out: &mut BytesMut, name: &str, value: &str) {
    out.put_slice(name.as_bytes());
    out.put_slice(b": ");
    out.put_slice(value.as_bytes());
    out.put_slice(b"\r\n");
}

/// The fixed 404 packet sent when nothing claims a request.
pub fn not_found_response(server_agent: &str) -> Bytes {
    build_http_response(
        StatusCode::NOT_FOUND,
        "NOT FOUND",
        &[
            ("Server", server_agent),
            ("Content-Length", "0"),
            ("Connection", "close"),
        ],
        None,
    )
}

/// `101 Switching Protocols` answer to a WebSocket upgrade.
pub fn build_websocket_handshake_response(accept: &str) -> Bytes {
    build_http_response(
        StatusCode::SWITCHING_PROTOCOLS,
        "Switching Protocols",
        &[
            ("Upgrade", "websocket"),
            ("Connection", "Upgrade"),
            ("Sec-WebSocket-Accept", accept),
        ],
        None,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_packet_is_fixed() {
        assert_eq!(
            &not_found_response("agent/1")[..],
            b"HTTP/1.1 404 NOT FOUND\r\nServer: agent/1\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
        );
    }

    #[test]
    fn body_gets_content_length() {
        let pkt = build_http_response(StatusCode::OK, "OK", &[("Content-Type", "text/plain")], Some(&b"hi"[..]));
        assert_eq!(
            &pkt[..],
            b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 2\r\n\r\nhi"
        );
    }

    #[test]
    fn handshake_packet() {
        let pkt = build_websocket_handshake_response("abc=");
        assert_eq!(
            &pkt[..],
            b"HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\nConnection: Upgrade\r\nSec-WebSocket-Accept: abc=\r\n\r\n"
        );
    }
}
