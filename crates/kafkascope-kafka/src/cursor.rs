//! Primitive decoder
//!
//! [`DecodeCursor`] walks a single message buffer. Fixed-width reads are
//! big-endian and return [`KafkaError::Truncated`] without moving the cursor
//! when the buffer is too short, so the position never exceeds the buffer.
//!
//! Length-prefixed reads (strings, bytes, arrays) are total with respect to
//! bad lengths: a malformed length or varint is reported to the
//! [`DiagnosticSink`] and the cursor is forced forward by a defined fallback
//! width so the rest of the message stays decodable. Only running off the end
//! of the buffer is an error.
//!
//! Two length encodings coexist on the wire:
//!
//! ```text
//! legacy string   i16 length   -1 = null
//! legacy bytes    i32 length   -1 = null
//! compact         zig-zag varint length, -1 = null, 0 = empty
//! ```

use bytes::Bytes;
use kafkascope_core::varint::{read_varint, MAX_VARINT32_LEN, MAX_VARINT64_LEN};

use crate::diagnostics::{DiagnosticKind, DiagnosticSink, Severity};
use crate::error::{KafkaError, KafkaResult};

/// Read position inside one message buffer.
#[derive(Debug, Clone)]
pub struct DecodeCursor {
    buffer: Bytes,
    position: usize,
}

/// Outcome of an array read.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayValue<T> {
    /// Count of -1.
    Null,
    /// Zero or more decoded elements.
    Elements(Vec<T>),
    /// Count below -1; no elements were decoded.
    BadLength(i32),
}

impl<T> ArrayValue<T> {
    pub fn is_null(&self) -> bool {
        matches!(self, ArrayValue::Null)
    }

    pub fn elements(&self) -> &[T] {
        match self {
            ArrayValue::Elements(elements) => elements,
            _ => &[],
        }
    }

    pub fn into_elements(self) -> Vec<T> {
        match self {
            ArrayValue::Elements(elements) => elements,
            _ => Vec::new(),
        }
    }
}

macro_rules! read_fixed {
    ($name:ident, $ty:ty) => {
        pub fn $name(&mut self) -> KafkaResult<$ty> {
            const WIDTH: usize = std::mem::size_of::<$ty>();
            let bytes = self.take_array::<WIDTH>()?;
            Ok(<$ty>::from_be_bytes(bytes))
        }
    };
}

impl DecodeCursor {
    pub fn new(buffer: Bytes) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.position
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn buffer(&self) -> &Bytes {
        &self.buffer
    }

    /// Move forward by up to `count` bytes, stopping at the end of the buffer.
    /// Returns how far the cursor actually moved.
    pub fn skip(&mut self, count: usize) -> usize {
        let step = count.min(self.remaining());
        self.position += step;
        step
    }

    /// Jump to `position`, clamped to the buffer length.
    pub fn seek(&mut self, position: usize) {
        self.position = position.min(self.buffer.len());
    }

    fn ensure(&self, needed: usize) -> KafkaResult<()> {
        if self.remaining() < needed {
            return Err(KafkaError::Truncated {
                needed,
                available: self.remaining(),
            });
        }
        Ok(())
    }

    fn take_array<const N: usize>(&mut self) -> KafkaResult<[u8; N]> {
        self.ensure(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buffer[self.position..self.position + N]);
        self.position += N;
        Ok(out)
    }

    read_fixed!(read_i8, i8);
    read_fixed!(read_i16, i16);
    read_fixed!(read_i32, i32);
    read_fixed!(read_i64, i64);
    read_fixed!(read_u8, u8);
    read_fixed!(read_u16, u16);
    read_fixed!(read_u32, u32);

    pub fn read_bool(&mut self) -> KafkaResult<bool> {
        Ok(self.read_u8()? != 0)
    }

    /// Zero-copy slice of the next `len` bytes.
    pub fn read_slice(&mut self, len: usize) -> KafkaResult<Bytes> {
        self.ensure(len)?;
        let slice = self.buffer.slice(self.position..self.position + len);
        self.position += len;
        Ok(slice)
    }

    /// Everything from the cursor to the end of the buffer.
    pub fn read_rest(&mut self) -> Bytes {
        let slice = self.buffer.slice(self.position..);
        self.position = self.buffer.len();
        slice
    }

    /// Look at the byte `offset` bytes ahead without moving.
    pub fn peek_u8_at(&self, offset: usize) -> Option<u8> {
        self.buffer.get(self.position + offset).copied()
    }

    /// Zig-zag varint of at most `max_len` bytes.
    ///
    /// Never fails: malformed input is reported, the cursor moves forward by
    /// `max_len` (or to the end of the buffer) and 0 is returned.
    pub fn read_zigzag_varint(
        &mut self,
        sink: &mut dyn DiagnosticSink,
        field: &str,
        max_len: usize,
    ) -> i64 {
        let start = self.position;
        let (value, width) = read_varint(&self.buffer[self.position..], max_len);
        if width == 0 {
            let skipped = self.skip(max_len);
            sink.report(
                Severity::Error,
                field,
                start,
                DiagnosticKind::MalformedVarint {
                    fallback_width: skipped,
                },
            );
            return 0;
        }
        self.position += width;
        value
    }

    pub fn read_varint32(&mut self, sink: &mut dyn DiagnosticSink, field: &str) -> i64 {
        self.read_zigzag_varint(sink, field, MAX_VARINT32_LEN)
    }

    pub fn read_varint64(&mut self, sink: &mut dyn DiagnosticSink, field: &str) -> i64 {
        self.read_zigzag_varint(sink, field, MAX_VARINT64_LEN)
    }

    /// Shared tail of every length-prefixed read. `length` has already been
    /// consumed; `start` is where its field began.
    fn read_prefixed(
        &mut self,
        sink: &mut dyn DiagnosticSink,
        field: &str,
        start: usize,
        length: i64,
        malformed_as_empty: bool,
    ) -> KafkaResult<Option<Bytes>> {
        match length {
            -1 => Ok(None),
            l if l < -1 => {
                sink.report(
                    Severity::Error,
                    field,
                    start,
                    DiagnosticKind::MalformedLength { length: l },
                );
                Ok(if malformed_as_empty {
                    Some(Bytes::new())
                } else {
                    None
                })
            }
            l => {
                let len = l as usize;
                if self.remaining() < len {
                    let available = self.remaining();
                    self.position = start;
                    return Err(KafkaError::Truncated {
                        needed: len,
                        available,
                    });
                }
                self.read_slice(len).map(Some)
            }
        }
    }

    fn to_text(
        sink: &mut dyn DiagnosticSink,
        field: &str,
        start: usize,
        bytes: Option<Bytes>,
    ) -> Option<String> {
        bytes.map(|raw| match std::str::from_utf8(&raw) {
            Ok(text) => text.to_string(),
            Err(_) => {
                sink.report(Severity::Warning, field, start, DiagnosticKind::InvalidUtf8);
                String::from_utf8_lossy(&raw).into_owned()
            }
        })
    }

    /// i16-length string. `None` for null and for a malformed length.
    pub fn read_legacy_string(
        &mut self,
        sink: &mut dyn DiagnosticSink,
        field: &str,
    ) -> KafkaResult<Option<String>> {
        let start = self.position;
        let length = self.read_i16()? as i64;
        let raw = self.read_prefixed(sink, field, start, length, false)?;
        Ok(Self::to_text(sink, field, start, raw))
    }

    /// i32-length bytes. `None` for null and for a malformed length.
    pub fn read_legacy_bytes(
        &mut self,
        sink: &mut dyn DiagnosticSink,
        field: &str,
    ) -> KafkaResult<Option<Bytes>> {
        let start = self.position;
        let length = self.read_i32()? as i64;
        self.read_prefixed(sink, field, start, length, false)
    }

    /// Zig-zag varint length prefix. A malformed length reads as empty, a
    /// malformed varint as null after skipping the fallback width.
    pub fn read_compact_bytes(
        &mut self,
        sink: &mut dyn DiagnosticSink,
        field: &str,
    ) -> KafkaResult<Option<Bytes>> {
        let start = self.position;
        let (length, width) = read_varint(&self.buffer[self.position..], MAX_VARINT32_LEN);
        if width == 0 {
            self.read_zigzag_varint(sink, field, MAX_VARINT32_LEN);
            return Ok(None);
        }
        self.position += width;
        self.read_prefixed(sink, field, start, length, true)
    }

    pub fn read_compact_string(
        &mut self,
        sink: &mut dyn DiagnosticSink,
        field: &str,
    ) -> KafkaResult<Option<String>> {
        let start = self.position;
        let raw = self.read_compact_bytes(sink, field)?;
        Ok(Self::to_text(sink, field, start, raw))
    }

    /// i32-count array. `decode_element` is called once per element with the
    /// cursor, the sink, `api_version` and the element index.
    ///
    /// A count of -1 is reported as a note and yields [`ArrayValue::Null`];
    /// a count below -1 is an error and yields [`ArrayValue::BadLength`].
    pub fn read_array<T, F>(
        &mut self,
        sink: &mut dyn DiagnosticSink,
        field: &str,
        api_version: i16,
        mut decode_element: F,
    ) -> KafkaResult<ArrayValue<T>>
    where
        F: FnMut(&mut DecodeCursor, &mut dyn DiagnosticSink, i16, usize) -> KafkaResult<T>,
    {
        let start = self.position;
        let count = self.read_i32()?;

        match count {
            -1 => {
                sink.report(Severity::Note, field, start, DiagnosticKind::NullArray);
                Ok(ArrayValue::Null)
            }
            c if c < -1 => {
                sink.report(
                    Severity::Error,
                    field,
                    start,
                    DiagnosticKind::MalformedLength { length: c as i64 },
                );
                Ok(ArrayValue::BadLength(c))
            }
            c => {
                let count = c as usize;
                // Every element takes at least one byte; don't trust the count
                // for the allocation.
                let mut elements = Vec::with_capacity(count.min(self.remaining()));
                for index in 0..count {
                    elements.push(decode_element(self, sink, api_version, index)?);
                }
                Ok(ArrayValue::Elements(elements))
            }
        }
    }
}
