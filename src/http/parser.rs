//! Incremental HTTP/1.x request parser.
//!
//! # Responsibilities
//! - Accumulate raw bytes until one request (head and body) is complete
//! - Support `Content-Length` and `Transfer-Encoding: chunked` bodies
//! - Hand back the bytes that belong to the *next* request
//!
//! # Design Decisions
//! - Header parsing is delegated to `httparse`; this module only frames
//! - One parser yields at most one request; pipelined traffic uses a fresh
//!   parser per request
//! - Oversized heads are a protocol fault, not a partial state

use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use http::{Method, Version};
use httparse::Status;

use crate::error::ProtocolError;
use crate::http::request::HttpRequest;

/// Maximum number of headers accepted in one request.
const MAX_HEADERS: usize = 64;

/// Maximum size of a request head before the client is considered abusive.
const MAX_HEAD_SIZE: usize = 64 * 1024;

/// Maximum decoded body size, whether declared by `Content-Length` or
/// accumulated from chunks.
const MAX_BODY_SIZE: usize = 16 * 1024 * 1024;

#[derive(Debug)]
struct RequestHead {
    method: Method,
    path: String,
    version: Version,
    headers: HeaderMap,
}

#[derive(Debug, Clone, Copy)]
enum Framing {
    Length(usize),
    Chunked,
}

#[derive(Debug)]
enum Stage {
    Head,
    Body {
        head: RequestHead,
        body_start: usize,
        framing: Framing,
    },
    Complete,
}

/// Incremental parser producing a single [`HttpRequest`].
#[derive(Debug)]
pub struct HttpParser {
    buffer: Vec<u8>,
    stage: Stage,
    request: Option<HttpRequest>,
}

impl Default for HttpParser {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpParser {
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            stage: Stage::Head,
            request: None,
        }
    }

    /// Feed raw bytes.
    ///
    /// Returns the tail of `raw` that was not needed to complete the current
    /// request. While the request is still incomplete the tail is empty;
    /// once complete, every further byte is returned untouched.
    pub fn parse<'a>(&mut self, raw: &'a [u8]) -> Result<&'a [u8], ProtocolError> {
        if self.is_complete() {
            return Ok(raw);
        }

        let previous = self.buffer.len();
        self.buffer.extend_from_slice(raw);

        match self.advance()? {
            Some(end) => {
                self.buffer.truncate(end);
                let consumed = end.saturating_sub(previous).min(raw.len());
                Ok(&raw[consumed..])
            }
            None => Ok(&[]),
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.stage, Stage::Complete)
    }

    /// The completed request, if any.
    pub fn request(&self) -> Option<&HttpRequest> {
        self.request.as_ref()
    }

    pub fn into_request(self) -> Option<HttpRequest> {
        self.request
    }

    /// Drive the state machine over the buffered bytes; `Some(end)` once a
    /// request spans `buffer[..end]`.
    fn advance(&mut self) -> Result<Option<usize>, ProtocolError> {
        if let Stage::Head = self.stage {
            match self.parse_head()? {
                Some((head, body_start)) => {
                    let framing = framing_of(&head.headers)?;
                    self.stage = Stage::Body {
                        head,
                        body_start,
                        framing,
                    };
                }
                None => return Ok(None),
            }
        }

        let (body, end) = match &self.stage {
            Stage::Body {
                body_start,
                framing,
                ..
            } => {
                let available = &self.buffer[*body_start..];
                let decoded = match framing {
                    Framing::Length(len) => {
                        (available.len() >= *len).then(|| (available[..*len].to_vec(), *len))
                    }
                    Framing::Chunked => match decode_chunked(available)? {
                        // Chunk framing plus trailers may not outgrow the body
                        // limit by more than a request head's worth.
                        None if available.len() > MAX_BODY_SIZE + MAX_HEAD_SIZE => {
                            return Err(ProtocolError::InvalidFraming("chunked body too large"));
                        }
                        decoded => decoded,
                    },
                };
                match decoded {
                    Some((body, used)) => (body, body_start + used),
                    None => return Ok(None),
                }
            }
            _ => return Ok(None),
        };

        if let Stage::Body { head, .. } = std::mem::replace(&mut self.stage, Stage::Complete) {
            self.request = Some(HttpRequest {
                method: head.method,
                path: head.path,
                version: head.version,
                headers: head.headers,
                body,
                total_size: end,
            });
        }
        Ok(Some(end))
    }

    fn parse_head(&self) -> Result<Option<(RequestHead, usize)>, ProtocolError> {
        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
        let mut req = httparse::Request::new(&mut headers);

        let head_len = match req.parse(&self.buffer)? {
            Status::Complete(len) => len,
            Status::Partial if self.buffer.len() > MAX_HEAD_SIZE => {
                return Err(ProtocolError::InvalidFraming("request head too large"));
            }
            Status::Partial => return Ok(None),
        };

        let method = req
            .method
            .and_then(|m| Method::from_bytes(m.as_bytes()).ok())
            .ok_or(ProtocolError::InvalidFraming("invalid method"))?;
        let path = req.path.unwrap_or_default().to_string();
        let version = match req.version {
            Some(0) => Version::HTTP_10,
            _ => Version::HTTP_11,
        };

        let mut map = HeaderMap::with_capacity(req.headers.len());
        for h in req.headers.iter() {
            let name = HeaderName::from_bytes(h.name.as_bytes())
                .map_err(|_| ProtocolError::InvalidFraming("invalid header name"))?;
            let value = HeaderValue::from_bytes(h.value)
                .map_err(|_| ProtocolError::InvalidFraming("invalid header value"))?;
            map.append(name, value);
        }

        Ok(Some((
            RequestHead {
                method,
                path,
                version,
                headers: map,
            },
            head_len,
        )))
    }
}

fn framing_of(headers: &HeaderMap) -> Result<Framing, ProtocolError> {
    let chunked = headers
        .get_all(header::TRANSFER_ENCODING)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|coding| coding.trim().eq_ignore_ascii_case("chunked"));
    if chunked {
        return Ok(Framing::Chunked);
    }

    let len = match headers.get(header::CONTENT_LENGTH) {
        None => return Ok(Framing::Length(0)),
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
            .ok_or(ProtocolError::InvalidFraming("invalid content-length"))?,
    };
    if len > MAX_BODY_SIZE {
        return Err(ProtocolError::InvalidFraming("body too large"));
    }
    Ok(Framing::Length(len))
}

/// Decode a complete chunked body; `None` while more bytes are needed.
fn decode_chunked(buf: &[u8]) -> Result<Option<(Vec<u8>, usize)>, ProtocolError> {
    let mut body = Vec::new();
    let mut pos = 0;
    loop {
        let (size_len, size) = match httparse::parse_chunk_size(&buf[pos..])
            .map_err(|_| ProtocolError::InvalidFraming("invalid chunk size"))?
        {
            Status::Complete(parsed) => parsed,
            Status::Partial => return Ok(None),
        };
        pos += size_len;

        if size == 0 {
            // Trailers are skipped; the body ends at the first empty line.
            return Ok(find_empty_line(&buf[pos..]).map(|end| (body, pos + end)));
        }

        let size = usize::try_from(size)
            .ok()
            .filter(|size| body.len().saturating_add(*size) <= MAX_BODY_SIZE)
            .ok_or(ProtocolError::InvalidFraming("chunk too large"))?;
        let end = pos
            .checked_add(size)
            .and_then(|n| n.checked_add(2))
            .ok_or(ProtocolError::InvalidFraming("chunk too large"))?;
        if buf.len() < end {
            return Ok(None);
        }
        body.extend_from_slice(&buf[pos..pos + size]);
        pos += size;
        if &buf[pos..pos + 2] != b"\r\n" {
            return Err(ProtocolError::InvalidFraming("missing chunk terminator"));
        }
        pos += 2;
    }
}

/// Length up to and including the line terminating the trailer section.
fn find_empty_line(buf: &[u8]) -> Option<usize> {
    if buf.starts_with(b"\r\n") {
        return Some(2);
    }
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|i| i + 4)
}
