//! Parsed HTTP request.
//!
//! # Responsibilities
//! - Hold the method, target, version, headers and body of one request
//! - Answer the connection-level questions dispatch asks (keep-alive,
//!   websocket upgrade)
//! - Remember how many bytes the request occupied on the wire

use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use http::{Method, Version};

/// A complete HTTP request as produced by [`HttpParser`](crate::http::HttpParser).
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) version: Version,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Vec<u8>,
    pub(crate) total_size: usize,
}

impl HttpRequest {
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The raw request target, query string included.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Bytes the request occupied on the wire, head and body.
    pub fn total_size(&self) -> usize {
        self.total_size
    }

    /// Case-insensitive header lookup.
    pub fn header<K>(&self, name: K) -> Option<&HeaderValue>
    where
        K: header::AsHeaderName,
    {
        self.headers.get(name)
    }

    pub fn has_header<K>(&self, name: K) -> bool
    where
        K: header::AsHeaderName,
    {
        self.headers.contains_key(name)
    }

    /// Header value as text, if present and valid ASCII.
    pub fn header_str<K>(&self, name: K) -> Option<&str>
    where
        K: header::AsHeaderName,
    {
        self.header(name).and_then(|v| v.to_str().ok())
    }

    /// HTTP/1.1 request that does not ask for the connection to close.
    ///
    /// A `Connection` header other than `keep-alive` counts as not
    /// keep-alive.
    pub fn is_http_1_1_keep_alive(&self) -> bool {
        self.version == Version::HTTP_11
            && match self.header(header::CONNECTION) {
                None => true,
                Some(value) => value.as_bytes().eq_ignore_ascii_case(b"keep-alive"),
            }
    }

    /// `Connection: upgrade` together with `Upgrade: websocket`.
    pub fn is_websocket_upgrade(&self) -> bool {
        let connection_upgrade = self
            .header_str(header::CONNECTION)
            .map(|v| v.split(',').any(|token| token.trim().eq_ignore_ascii_case("upgrade")))
            .unwrap_or(false);
        let upgrade_websocket = self
            .header(header::UPGRADE)
            .map(|v| v.as_bytes().eq_ignore_ascii_case(b"websocket"))
            .unwrap_or(false);
        connection_upgrade && upgrade_websocket
    }

    /// Iterate headers as `(name, value)` pairs with values lossily decoded.
    pub fn header_pairs(&self) -> impl Iterator<Item = (&HeaderName, String)> {
        self.headers
            .iter()
            .map(|(k, v)| (k, String::from_utf8_lossy(v.as_bytes()).into_owned()))
    }
}
