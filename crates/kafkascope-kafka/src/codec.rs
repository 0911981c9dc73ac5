//! Kafka protocol frame codec
//!
//! Handles the length-prefixed framing of Kafka protocol messages.
//!
//! Frame format:
//! ```text
//! +------------------+------------------+
//! | Length (4 bytes) | Payload          |
//! +------------------+------------------+
//! ```
//!
//! The length is an unsigned 32-bit big-endian integer and does not count
//! itself. [`StreamFramer`] wraps the codec for a passive observer: bytes are
//! pushed in whatever chunks the capture delivers and complete payloads come
//! out, or a "need N more bytes" signal when the tail is incomplete.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::cursor::DecodeCursor;
use crate::diagnostics::DiagnosticSink;
use crate::error::{KafkaError, KafkaResult};
use crate::types::ApiKey;

/// Maximum frame size (100MB)
pub const MAX_FRAME_SIZE: usize = 100 * 1024 * 1024;

/// Size of the length prefix.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Kafka protocol frame codec
///
/// Splits length-prefixed Kafka protocol frames off a byte buffer.
#[derive(Debug, Clone)]
pub struct KafkaCodec {
    /// Maximum allowed frame size
    max_frame_size: usize,
}

impl Default for KafkaCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl KafkaCodec {
    pub fn new() -> Self {
        Self {
            max_frame_size: MAX_FRAME_SIZE,
        }
    }

    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    /// Bytes still missing before `src` holds a complete frame.
    pub fn missing(&self, src: &[u8]) -> usize {
        if src.len() < LENGTH_PREFIX_SIZE {
            return LENGTH_PREFIX_SIZE - src.len();
        }
        let length = (&src[..LENGTH_PREFIX_SIZE]).get_u32() as usize;
        (LENGTH_PREFIX_SIZE + length).saturating_sub(src.len())
    }
}

impl Decoder for KafkaCodec {
    type Item = BytesMut;
    type Error = KafkaError;

    fn decode(&mut self, src: &mut BytesMut) -> KafkaResult<Option<Self::Item>> {
        // Need at least 4 bytes for the length prefix
        if src.len() < LENGTH_PREFIX_SIZE {
            return Ok(None);
        }

        // Read length without consuming
        let length = (&src[..LENGTH_PREFIX_SIZE]).get_u32() as usize;

        if length > self.max_frame_size {
            return Err(KafkaError::FrameTooLarge {
                size: length,
                max: self.max_frame_size,
            });
        }

        let total_length = LENGTH_PREFIX_SIZE + length;
        if src.len() < total_length {
            return Ok(None);
        }

        src.advance(LENGTH_PREFIX_SIZE);
        Ok(Some(src.split_to(length)))
    }
}

/// Result of asking a [`StreamFramer`] for the next message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameStatus {
    /// A complete payload, length prefix stripped.
    Frame(Bytes),
    /// The buffered tail needs this many more bytes.
    NeedMore(usize),
}

/// Incremental framer for one direction of one connection.
#[derive(Debug, Default)]
pub struct StreamFramer {
    codec: KafkaCodec,
    buffer: BytesMut,
}

impl StreamFramer {
    pub fn new(max_frame_size: usize) -> Self {
        Self {
            codec: KafkaCodec::with_max_frame_size(max_frame_size),
            buffer: BytesMut::new(),
        }
    }

    /// Append captured bytes.
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Next complete payload, or how many bytes are still missing.
    ///
    /// An oversized length prefix is an error; the buffer is left untouched
    /// so the caller decides whether to [`clear`](Self::clear) it.
    pub fn next_frame(&mut self) -> KafkaResult<FrameStatus> {
        match self.codec.decode(&mut self.buffer)? {
            Some(payload) => {
                trace!(len = payload.len(), buffered = self.buffer.len(), "frame");
                Ok(FrameStatus::Frame(payload.freeze()))
            }
            None => Ok(FrameStatus::NeedMore(self.codec.missing(&self.buffer))),
        }
    }

    /// Bytes still missing before the buffered tail forms a message.
    pub fn missing(&self) -> usize {
        self.codec.missing(&self.buffer)
    }

    /// Bytes held back waiting for the rest of a message.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

/// Request header structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHeader {
    pub api_key: i16,
    pub api_version: i16,
    pub correlation_id: i32,
    pub client_id: Option<String>,
}

impl RequestHeader {
    /// Fixed part: api key, api version, correlation id.
    pub const FIXED_SIZE: usize = 8;

    /// Parse request header from a message payload.
    ///
    /// ControlledShutdown v0 predates the client id and carries only the
    /// fixed part. A payload that ends right after the fixed part is read as
    /// having no client id.
    pub fn parse(cursor: &mut DecodeCursor, sink: &mut dyn DiagnosticSink) -> KafkaResult<Self> {
        let api_key = cursor.read_i16()?;
        let api_version = cursor.read_i16()?;
        let correlation_id = cursor.read_i32()?;

        let client_id = if Self::has_client_id(api_key, api_version) && !cursor.is_empty() {
            cursor.read_legacy_string(sink, "client_id")?
        } else {
            None
        };

        Ok(RequestHeader {
            api_key,
            api_version,
            correlation_id,
            client_id,
        })
    }

    fn has_client_id(api_key: i16, api_version: i16) -> bool {
        !(api_key == ApiKey::ControlledShutdown.as_i16() && api_version == 0)
    }

    /// Encode request header to bytes
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_i16(self.api_key);
        buf.put_i16(self.api_version);
        buf.put_i32(self.correlation_id);
        if Self::has_client_id(self.api_key, self.api_version) {
            encode_nullable_string(buf, self.client_id.as_deref());
        }
    }
}

/// Response header structure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHeader {
    pub correlation_id: i32,
}

impl ResponseHeader {
    pub fn new(correlation_id: i32) -> Self {
        Self { correlation_id }
    }

    pub fn parse(cursor: &mut DecodeCursor) -> KafkaResult<Self> {
        Ok(Self {
            correlation_id: cursor.read_i32()?,
        })
    }

    /// Encode response header to bytes
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_i32(self.correlation_id);
    }
}

/// Encode a string (int16 length + bytes)
pub fn encode_string(buf: &mut BytesMut, s: &str) {
    buf.put_i16(s.len() as i16);
    buf.put_slice(s.as_bytes());
}

/// Encode a nullable string
pub fn encode_nullable_string(buf: &mut BytesMut, s: Option<&str>) {
    match s {
        Some(s) => encode_string(buf, s),
        None => buf.put_i16(-1),
    }
}

/// Encode nullable bytes (int32 length + bytes, -1 for null)
pub fn encode_nullable_bytes(buf: &mut BytesMut, b: Option<&[u8]>) {
    match b {
        Some(b) => {
            buf.put_i32(b.len() as i32);
            buf.put_slice(b);
        }
        None => buf.put_i32(-1),
    }
}

/// Wrap `payload` in a length prefix.
pub fn frame(payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
    buf.put_u32(payload.len() as u32);
    buf.put_slice(payload);
    buf.freeze()
}
