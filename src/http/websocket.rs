//! WebSocket frame codec and handshake helpers (RFC 6455).
//!
//! # Responsibilities
//! - Derive `Sec-WebSocket-Accept` from a client key
//! - Decode client frames incrementally, unmasking payloads
//! - Encode server frames for plugins that answer over the socket
//!
//! # Data Flow
//! ```text
//! raw chunk → WebsocketFrame::parse → remainder
//!                  │
//!                  └─ is_complete? → opcode / payload → reset → next frame
//! ```
//!
//! # Design Decisions
//! - Partial frames are buffered inside the codec across chunks
//! - A frame is only exposed once its full payload has arrived
//! - Close frames are decoded like any other; acting on them is the caller's job

use base64::Engine;
use sha1::{Digest, Sha1};

use crate::error::ProtocolError;

/// The WebSocket magic GUID used in the handshake.
const WEBSOCKET_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Largest payload accepted from a client.
const MAX_PAYLOAD_LEN: u64 = 16 * 1024 * 1024;

/// Frame opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Continuation,
    Text,
    Binary,
    ConnectionClose,
    Ping,
    Pong,
}

impl Opcode {
    fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0x0 => Some(Opcode::Continuation),
            0x1 => Some(Opcode::Text),
            0x2 => Some(Opcode::Binary),
            0x8 => Some(Opcode::ConnectionClose),
            0x9 => Some(Opcode::Ping),
            0xA => Some(Opcode::Pong),
            _ => None,
        }
    }

    fn bits(self) -> u8 {
        match self {
            Opcode::Continuation => 0x0,
            Opcode::Text => 0x1,
            Opcode::Binary => 0x2,
            Opcode::ConnectionClose => 0x8,
            Opcode::Ping => 0x9,
            Opcode::Pong => 0xA,
        }
    }
}

/// Compute the Sec-WebSocket-Accept value from the key.
pub fn key_to_accept(key: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key);
    hasher.update(WEBSOCKET_GUID.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(hasher.finalize())
}

/// Incremental decoder for a single frame, reusable via [`reset`](Self::reset).
#[derive(Debug, Default)]
pub struct WebsocketFrame {
    buffer: Vec<u8>,
    fin: bool,
    opcode: Option<Opcode>,
    payload: Option<Vec<u8>>,
}

impl WebsocketFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an unmasked server frame.
    pub fn build(opcode: Opcode, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(payload.len() + 10);
        out.push(0x80 | opcode.bits());
        match payload.len() {
            len if len < 126 => out.push(len as u8),
            len if len <= usize::from(u16::MAX) => {
                out.push(126);
                out.extend_from_slice(&(len as u16).to_be_bytes());
            }
            len => {
                out.push(127);
                out.extend_from_slice(&(len as u64).to_be_bytes());
            }
        }
        out.extend_from_slice(payload);
        out
    }

    /// Build a masked client frame.
    pub fn build_masked(opcode: Opcode, payload: &[u8], mask: [u8; 4]) -> Vec<u8> {
        let mut out = Self::build(opcode, payload);
        let header_len = out.len() - payload.len();
        out[1] |= 0x80;
        let body: Vec<u8> = out.split_off(header_len);
        out.extend_from_slice(&mask);
        out.extend(body.iter().enumerate().map(|(i, b)| b ^ mask[i % 4]));
        out
    }

    /// Feed raw bytes, returning whatever follows the current frame.
    ///
    /// While the frame is incomplete the bytes are buffered and the returned
    /// remainder is empty.
    pub fn parse<'a>(&mut self, raw: &'a [u8]) -> Result<&'a [u8], ProtocolError> {
        if self.is_complete() {
            return Ok(raw);
        }

        let previous = self.buffer.len();
        self.buffer.extend_from_slice(raw);

        match self.decode()? {
            Some(end) => {
                self.buffer.clear();
                let consumed = end.saturating_sub(previous).min(raw.len());
                Ok(&raw[consumed..])
            }
            None => Ok(&[]),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.payload.is_some()
    }

    pub fn fin(&self) -> bool {
        self.fin
    }

    /// Opcode of the decoded frame; `None` until complete.
    pub fn opcode(&self) -> Option<Opcode> {
        self.payload.as_ref().and(self.opcode)
    }

    /// Unmasked payload; empty until complete.
    pub fn payload(&self) -> &[u8] {
        self.payload.as_deref().unwrap_or_default()
    }

    /// Forget the decoded frame so the next one can be parsed.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.fin = false;
        self.opcode = None;
        self.payload = None;
    }

    fn decode(&mut self) -> Result<Option<usize>, ProtocolError> {
        let buf = &self.buffer;
        if buf.len() < 2 {
            return Ok(None);
        }

        let fin = buf[0] & 0x80 != 0;
        let opcode = Opcode::from_bits(buf[0] & 0x0F)
            .ok_or(ProtocolError::MalformedFrame("unknown opcode"))?;
        let masked = buf[1] & 0x80 != 0;

        let mut pos = 2;
        let len = match buf[1] & 0x7F {
            126 => {
                let Some(bytes) = buf.get(2..4) else {
                    return Ok(None);
                };
                pos += 2;
                u64::from(u16::from_be_bytes([bytes[0], bytes[1]]))
            }
            127 => {
                let Some(bytes) = buf.get(2..10) else {
                    return Ok(None);
                };
                pos += 8;
                let mut raw = [0u8; 8];
                raw.copy_from_slice(bytes);
                u64::from_be_bytes(raw)
            }
            short => u64::from(short),
        };
        if len > MAX_PAYLOAD_LEN {
            return Err(ProtocolError::MalformedFrame("payload too large"));
        }
        let len = len as usize;

        let mask = if masked {
            let Some(bytes) = buf.get(pos..pos + 4) else {
                return Ok(None);
            };
            pos += 4;
            Some([bytes[0], bytes[1], bytes[2], bytes[3]])
        } else {
            None
        };

        let Some(data) = buf.get(pos..pos + len) else {
            return Ok(None);
        };
        let payload = match mask {
            Some(mask) => data.iter().enumerate().map(|(i, b)| b ^ mask[i % 4]).collect(),
            None => data.to_vec(),
        };

        self.fin = fin;
        self.opcode = Some(opcode);
        self.payload = Some(payload);
        Ok(Some(pos + len))
    }
}
