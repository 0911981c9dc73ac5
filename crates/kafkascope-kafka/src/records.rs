//! Record batch decoder
//!
//! A record set (the `records` field of Produce and Fetch) is a concatenation
//! of entries. Both on-disk generations share the first 17 bytes, so the
//! format is picked from the magic byte at offset 16:
//!
//! ```text
//! legacy (magic 0/1)                  v2 RecordBatch (magic 2)
//! 0  offset        i64                0  base_offset         i64
//! 8  message_size  i32                8  batch_length        i32
//! 12 crc           u32                12 leader_epoch        i32
//! 16 magic         i8                 16 magic               i8
//! 17 attributes    u8                 17 crc (crc32c)        u32
//! 18 timestamp     i64 (magic 1)      21 attributes          i16
//!    key           bytes              23 last_offset_delta   i32
//!    value         bytes              27 first_timestamp     i64
//!                                     35 max_timestamp       i64
//!                                     43 producer_id         i64
//!                                     51 producer_epoch      i16
//!                                     53 base_sequence       i32
//!                                     57 record_count        i32
//!                                     61 records...
//! ```
//!
//! A compressed legacy message carries a nested message set as its value; it
//! is decompressed and decoded recursively up to a configured depth. A v2
//! batch compresses only the region after `record_count`.

use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, warn};

use crate::compression::{decompress, DEFAULT_MAX_DECOMPRESSED_SIZE};
use crate::cursor::DecodeCursor;
use crate::diagnostics::{DiagnosticKind, DiagnosticSink, Diagnostics, Severity};
use crate::error::{KafkaError, KafkaResult};
use crate::types::{CompressionType, ControlRecordType, TimestampType};

/// Offset and size fields that precede every entry.
pub const LOG_OVERHEAD: usize = 12;

/// Position of the magic byte in both formats.
pub const MAGIC_OFFSET: usize = 16;

/// Size of the v2 batch header.
pub const RECORD_BATCH_HEADER_SIZE: usize = 61;

/// First byte covered by the v2 batch checksum (attributes).
const BATCH_CRC_START: usize = 21;

/// Smallest legal v2 record body: attributes, two one-byte deltas, null key,
/// null value and a zero header count.
pub const MIN_RECORD_SIZE: i64 = 6;

const ATTR_TRANSACTIONAL: i16 = 0x10;
const ATTR_CONTROL: i16 = 0x20;

/// Knobs for record-set decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordOptions {
    /// Deepest allowed nesting of compressed legacy message sets.
    pub max_nesting_depth: usize,
    /// Compare stored checksums against computed ones.
    pub verify_checksums: bool,
    /// Cap on any single decompressed buffer.
    pub max_decompressed_size: usize,
}

impl Default for RecordOptions {
    fn default() -> Self {
        Self {
            max_nesting_depth: 8,
            verify_checksums: true,
            max_decompressed_size: DEFAULT_MAX_DECOMPRESSED_SIZE,
        }
    }
}

/// Decoded contents of a record set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecordSet {
    pub entries: Vec<RecordSetEntry>,
}

impl RecordSet {
    /// Every application record in the set, flattening nested legacy sets.
    pub fn record_count(&self) -> usize {
        self.entries
            .iter()
            .map(|entry| match entry {
                RecordSetEntry::Legacy(message) => match &message.nested {
                    Some(nested) => nested.record_count(),
                    None => 1,
                },
                RecordSetEntry::Batch(batch) => batch.records.len(),
                RecordSetEntry::Unknown { .. } => 0,
            })
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum RecordSetEntry {
    Legacy(LegacyMessage),
    Batch(RecordBatch),
    /// Unrecognized magic; skipped by its declared size.
    Unknown { offset: i64, magic: i8, size: usize },
}

/// One magic 0/1 message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegacyMessage {
    pub offset: i64,
    pub crc: u32,
    pub magic: i8,
    pub attributes: u8,
    /// `None` when the codec bits hold an unassigned id.
    pub codec: Option<CompressionType>,
    pub timestamp_type: TimestampType,
    /// Present from magic 1.
    pub timestamp: Option<i64>,
    #[serde(serialize_with = "serialize_opt_hex")]
    pub key: Option<Bytes>,
    /// Raw value; for a compressed message this is the compressed set.
    #[serde(serialize_with = "serialize_opt_hex")]
    pub value: Option<Bytes>,
    /// Decoded inner message set of a compressed message.
    pub nested: Option<RecordSet>,
    pub decompress_failed: bool,
}

/// Header of a magic 2 batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecordBatchHeader {
    pub base_offset: i64,
    pub batch_length: i32,
    pub leader_epoch: i32,
    pub magic: i8,
    pub crc: u32,
    pub attributes: i16,
    /// Low three attribute bits.
    pub codec: u8,
    pub timestamp_type: TimestampType,
    pub is_transactional: bool,
    pub is_control: bool,
    pub last_offset_delta: i32,
    pub first_timestamp: i64,
    pub last_timestamp: i64,
    pub producer_id: i64,
    pub producer_epoch: i16,
    pub base_sequence: i32,
    pub record_count: i32,
}

impl RecordBatchHeader {
    pub fn parse(cursor: &mut DecodeCursor) -> KafkaResult<Self> {
        let base_offset = cursor.read_i64()?;
        let batch_length = cursor.read_i32()?;
        let leader_epoch = cursor.read_i32()?;
        let magic = cursor.read_i8()?;
        let crc = cursor.read_u32()?;
        let attributes = cursor.read_i16()?;

        Ok(Self {
            base_offset,
            batch_length,
            leader_epoch,
            magic,
            crc,
            attributes,
            codec: (attributes as u8) & CompressionType::CODEC_MASK,
            timestamp_type: TimestampType::from_attributes(attributes),
            is_transactional: attributes & ATTR_TRANSACTIONAL != 0,
            is_control: attributes & ATTR_CONTROL != 0,
            last_offset_delta: cursor.read_i32()?,
            first_timestamp: cursor.read_i64()?,
            last_timestamp: cursor.read_i64()?,
            producer_id: cursor.read_i64()?,
            producer_epoch: cursor.read_i16()?,
            base_sequence: cursor.read_i32()?,
            record_count: cursor.read_i32()?,
        })
    }

    pub fn compression(&self) -> Option<CompressionType> {
        CompressionType::from_id(self.codec)
    }
}

/// A magic 2 batch and its records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordBatch {
    pub header: RecordBatchHeader,
    pub records: Vec<DecodedRecord>,
    pub decompress_failed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordHeader {
    pub key: Option<String>,
    #[serde(serialize_with = "serialize_opt_hex")]
    pub value: Option<Bytes>,
}

/// Key of a record in a control batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ControlRecord {
    pub version: i16,
    pub kind: ControlRecordType,
}

/// One record of a v2 batch with its deltas resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedRecord {
    pub offset: i64,
    pub timestamp: i64,
    pub attributes: i8,
    #[serde(serialize_with = "serialize_opt_hex")]
    pub key: Option<Bytes>,
    #[serde(serialize_with = "serialize_opt_hex")]
    pub value: Option<Bytes>,
    pub headers: Vec<RecordHeader>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control: Option<ControlRecord>,
}

/// Keys, values and raw bodies render as lowercase hex.
pub(crate) fn serialize_opt_hex<S: serde::Serializer>(
    data: &Option<Bytes>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match data {
        Some(bytes) => serializer.serialize_str(&hex::encode(bytes)),
        None => serializer.serialize_none(),
    }
}

/// Decode a record set. Never fails; problems are reported to `sink` with
/// field paths rooted at `field`.
pub fn decode_record_set(
    data: Bytes,
    options: &RecordOptions,
    field: &str,
    sink: &mut dyn DiagnosticSink,
) -> RecordSet {
    decode_entries(data, options, 0, field, sink)
}

fn decode_entries(
    data: Bytes,
    options: &RecordOptions,
    depth: usize,
    field: &str,
    sink: &mut dyn DiagnosticSink,
) -> RecordSet {
    let mut set = RecordSet::default();
    let mut cursor = DecodeCursor::new(data.clone());
    let mut index = 0usize;

    while !cursor.is_empty() {
        let start = cursor.position();
        let remaining = cursor.remaining();
        let entry_field = format!("{}[{}]", field, index);

        let declared = if remaining < LOG_OVERHEAD {
            LOG_OVERHEAD
        } else {
            let size = i32::from_be_bytes([
                data[start + 8],
                data[start + 9],
                data[start + 10],
                data[start + 11],
            ]);
            if size < 0 {
                sink.report(
                    Severity::Error,
                    &entry_field,
                    start + 8,
                    DiagnosticKind::MalformedLength {
                        length: size as i64,
                    },
                );
                break;
            }
            LOG_OVERHEAD + size as usize
        };

        if declared > remaining {
            report_short_set(sink, &entry_field, start, depth, declared, remaining, data.len());
            break;
        }

        let entry = data.slice(start..start + declared);
        cursor.skip(declared);
        index += 1;

        if declared <= MAGIC_OFFSET {
            sink.report(
                Severity::Error,
                &entry_field,
                start,
                DiagnosticKind::Truncated {
                    needed: MAGIC_OFFSET + 1,
                    available: declared,
                },
            );
            continue;
        }

        let magic = entry[MAGIC_OFFSET] as i8;
        // `local` is relative to this entry, `inner` to decompressed buffers.
        let mut local = Diagnostics::new();
        let mut inner = Diagnostics::new();
        let decoded = match magic {
            0 | 1 => decode_legacy_message(
                entry,
                options,
                depth,
                &entry_field,
                &mut local,
                &mut inner,
            )
            .map(RecordSetEntry::Legacy),
            2 => decode_batch(entry, options, &entry_field, &mut local, &mut inner)
                .map(RecordSetEntry::Batch),
            other => {
                debug!(magic = other, size = declared, "unknown record set magic");
                local.report(
                    Severity::Error,
                    &entry_field,
                    MAGIC_OFFSET,
                    DiagnosticKind::UnknownMagic { magic: other },
                );
                Ok(RecordSetEntry::Unknown {
                    offset: i64::from_be_bytes(offset_bytes(&data, start)),
                    magic: other,
                    size: declared,
                })
            }
        };

        match decoded {
            Ok(entry) => set.entries.push(entry),
            Err(err) => local.report(Severity::Error, &entry_field, 0, (&err).into()),
        }
        local.replay_into(sink, start);
        inner.replay_into(sink, 0);
    }

    set
}

fn offset_bytes(data: &Bytes, start: usize) -> [u8; 8] {
    let mut out = [0u8; 8];
    out.copy_from_slice(&data[start..start + 8]);
    out
}

/// The set ended inside an entry. At the top level this is how brokers
/// truncate fetch responses; inside a decompressed set it means the wrapper
/// and its contents disagree.
fn report_short_set(
    sink: &mut dyn DiagnosticSink,
    field: &str,
    start: usize,
    depth: usize,
    declared: usize,
    available: usize,
    total: usize,
) {
    if depth == 0 {
        sink.report(
            Severity::Note,
            field,
            start,
            DiagnosticKind::PartialMessage {
                declared,
                available,
            },
        );
    } else {
        sink.report(
            Severity::Warning,
            field,
            start,
            DiagnosticKind::MessageSizeMismatch {
                declared: total,
                consumed: start,
            },
        );
    }
}

fn verify_checksum(
    options: &RecordOptions,
    sink: &mut dyn DiagnosticSink,
    field: &str,
    offset: usize,
    stored: u32,
    computed: impl FnOnce() -> u32,
) {
    if !options.verify_checksums {
        return;
    }
    let computed = computed();
    if computed != stored {
        sink.report(
            Severity::Warning,
            field,
            offset,
            DiagnosticKind::ChecksumMismatch { stored, computed },
        );
    }
}

fn decode_legacy_message(
    entry: Bytes,
    options: &RecordOptions,
    depth: usize,
    field: &str,
    sink: &mut dyn DiagnosticSink,
    inner: &mut Diagnostics,
) -> KafkaResult<LegacyMessage> {
    let mut cursor = DecodeCursor::new(entry.clone());

    let offset = cursor.read_i64()?;
    let _message_size = cursor.read_i32()?;
    let crc = cursor.read_u32()?;
    let magic = cursor.read_i8()?;
    let attributes = cursor.read_u8()?;
    let timestamp = if magic >= 1 {
        Some(cursor.read_i64()?)
    } else {
        None
    };

    verify_checksum(options, sink, &format!("{}.crc", field), 12, crc, || {
        crc32fast::hash(&entry[MAGIC_OFFSET..])
    });

    let key = cursor.read_legacy_bytes(sink, &format!("{}.key", field))?;
    let value_field = format!("{}.value", field);
    let value_start = cursor.position();
    let value = cursor.read_legacy_bytes(sink, &value_field)?;

    if !cursor.is_empty() {
        sink.report(
            Severity::Warning,
            field,
            cursor.position(),
            DiagnosticKind::TrailingBytes {
                count: cursor.remaining(),
            },
        );
    }

    let codec_id = attributes & CompressionType::CODEC_MASK;
    let codec = CompressionType::from_id(codec_id);
    let mut message = LegacyMessage {
        offset,
        crc,
        magic,
        attributes,
        codec,
        timestamp_type: TimestampType::from_attributes(attributes as i16),
        timestamp,
        key,
        value: value.clone(),
        nested: None,
        decompress_failed: false,
    };

    let Some(codec) = codec else {
        sink.report(
            Severity::Error,
            field,
            17,
            DiagnosticKind::UnknownCodec { id: codec_id },
        );
        return Ok(message);
    };
    if codec == CompressionType::None {
        return Ok(message);
    }
    let Some(compressed) = value else {
        return Ok(message);
    };

    if depth >= options.max_nesting_depth {
        sink.report(
            Severity::Error,
            &value_field,
            value_start,
            DiagnosticKind::NestingTooDeep {
                depth: options.max_nesting_depth,
            },
        );
        return Ok(message);
    }

    match decompress(codec, compressed, options.max_decompressed_size) {
        Ok(decompressed) => {
            let nested = decode_entries(decompressed, options, depth + 1, &value_field, inner);
            message.nested = Some(nested);
        }
        Err(err) => {
            warn!(codec = codec.name(), error = %err, "legacy message set decompression failed");
            sink.report(
                Severity::Error,
                &value_field,
                value_start,
                DiagnosticKind::DecompressionFailed {
                    codec,
                    reason: err.to_string(),
                },
            );
            message.decompress_failed = true;
        }
    }

    Ok(message)
}

fn decode_batch(
    entry: Bytes,
    options: &RecordOptions,
    field: &str,
    sink: &mut dyn DiagnosticSink,
    inner: &mut Diagnostics,
) -> KafkaResult<RecordBatch> {
    let mut cursor = DecodeCursor::new(entry.clone());
    let header = RecordBatchHeader::parse(&mut cursor)?;

    verify_checksum(options, sink, &format!("{}.crc", field), 17, header.crc, || {
        crc32c::crc32c(&entry[BATCH_CRC_START..])
    });

    let mut batch = RecordBatch {
        header,
        records: Vec::new(),
        decompress_failed: false,
    };

    let records_field = format!("{}.records", field);
    let Some(codec) = header.compression() else {
        sink.report(
            Severity::Error,
            field,
            BATCH_CRC_START,
            DiagnosticKind::UnknownCodec { id: header.codec },
        );
        return Ok(batch);
    };

    let region = cursor.read_rest();
    let records = match decompress(codec, region, options.max_decompressed_size) {
        Ok(records) => records,
        Err(err) => {
            warn!(codec = codec.name(), error = %err, "record batch decompression failed");
            sink.report(
                Severity::Error,
                &records_field,
                RECORD_BATCH_HEADER_SIZE,
                DiagnosticKind::DecompressionFailed {
                    codec,
                    reason: err.to_string(),
                },
            );
            batch.decompress_failed = true;
            return Ok(batch);
        }
    };

    if codec == CompressionType::None {
        let mut local = Diagnostics::new();
        batch.records = decode_records(records, &header, &records_field, &mut local);
        local.replay_into(sink, RECORD_BATCH_HEADER_SIZE);
    } else {
        batch.records = decode_records(records, &header, &records_field, inner);
    }

    Ok(batch)
}

fn decode_records(
    data: Bytes,
    header: &RecordBatchHeader,
    field: &str,
    sink: &mut dyn DiagnosticSink,
) -> Vec<DecodedRecord> {
    let mut cursor = DecodeCursor::new(data);

    if header.record_count < 0 {
        sink.report(
            Severity::Error,
            field,
            0,
            DiagnosticKind::MalformedLength {
                length: header.record_count as i64,
            },
        );
        return Vec::new();
    }

    let declared = header.record_count as usize;
    let mut records = Vec::with_capacity(declared.min(cursor.remaining()));
    let mut attempted = 0usize;

    while attempted < declared && !cursor.is_empty() {
        let record_field = format!("{}[{}]", field, attempted);
        if let Some(record) = decode_record(&mut cursor, header, &record_field, sink) {
            records.push(record);
        }
        attempted += 1;
    }

    if attempted < declared {
        sink.report(
            Severity::Warning,
            field,
            cursor.position(),
            DiagnosticKind::RecordCountMismatch {
                declared: header.record_count,
                decoded: attempted,
            },
        );
    } else if !cursor.is_empty() {
        sink.report(
            Severity::Warning,
            field,
            cursor.position(),
            DiagnosticKind::TrailingBytes {
                count: cursor.remaining(),
            },
        );
    }

    records
}

/// Decode one record. The cursor always ends on the record's declared end
/// (or the end of the buffer), whatever happened inside it.
fn decode_record(
    cursor: &mut DecodeCursor,
    header: &RecordBatchHeader,
    field: &str,
    sink: &mut dyn DiagnosticSink,
) -> Option<DecodedRecord> {
    let start = cursor.position();
    let length = cursor.read_varint32(sink, &format!("{}.length", field));
    let body_start = cursor.position();

    if length < MIN_RECORD_SIZE {
        sink.report(
            Severity::Error,
            field,
            start,
            DiagnosticKind::RecordTooShort { length },
        );
        if length > 0 {
            cursor.skip(length as usize);
        }
        return None;
    }

    let length = length as usize;
    if length > cursor.remaining() {
        sink.report(
            Severity::Error,
            field,
            start,
            DiagnosticKind::Truncated {
                needed: length,
                available: cursor.remaining(),
            },
        );
        cursor.skip(length);
        return None;
    }

    let body = cursor.read_slice(length).ok()?;
    let mut body_cursor = DecodeCursor::new(body);
    let mut local = Diagnostics::new();
    let decoded = decode_record_body(&mut body_cursor, header, field, &mut local);
    let consumed = body_cursor.position();
    local.replay_into(sink, body_start);

    match decoded {
        Ok(record) => {
            if consumed != length {
                sink.report(
                    Severity::Error,
                    field,
                    start,
                    DiagnosticKind::RecordLengthMismatch {
                        declared: length,
                        consumed,
                    },
                );
            }
            Some(record)
        }
        Err(err) => {
            // A field ran past the declared end of the record.
            sink.report(Severity::Error, field, body_start + consumed, (&err).into());
            None
        }
    }
}

fn decode_record_body(
    cursor: &mut DecodeCursor,
    header: &RecordBatchHeader,
    field: &str,
    sink: &mut dyn DiagnosticSink,
) -> KafkaResult<DecodedRecord> {
    let attributes = cursor.read_i8()?;
    let timestamp_delta = cursor.read_varint64(sink, &format!("{}.timestamp_delta", field));
    let offset_delta = cursor.read_varint32(sink, &format!("{}.offset_delta", field));
    let key = cursor.read_compact_bytes(sink, &format!("{}.key", field))?;
    let value = cursor.read_compact_bytes(sink, &format!("{}.value", field))?;

    let headers_field = format!("{}.headers", field);
    let header_count = cursor.read_varint32(sink, &headers_field);
    let mut headers = Vec::new();
    if header_count < -1 {
        sink.report(
            Severity::Error,
            &headers_field,
            cursor.position(),
            DiagnosticKind::MalformedLength {
                length: header_count,
            },
        );
    }
    for i in 0..header_count.max(0) {
        if cursor.is_empty() {
            return Err(KafkaError::Truncated {
                needed: 1,
                available: 0,
            });
        }
        let header_field = format!("{}[{}]", headers_field, i);
        let key = cursor.read_compact_string(sink, &format!("{}.key", header_field))?;
        let value = cursor.read_compact_bytes(sink, &format!("{}.value", header_field))?;
        headers.push(RecordHeader { key, value });
    }

    let control = if header.is_control {
        key.as_ref().and_then(|k| decode_control_key(k))
    } else {
        None
    };

    Ok(DecodedRecord {
        offset: header.base_offset.wrapping_add(offset_delta),
        timestamp: header.first_timestamp.wrapping_add(timestamp_delta),
        attributes,
        key,
        value,
        headers,
        control,
    })
}

fn decode_control_key(key: &Bytes) -> Option<ControlRecord> {
    if key.len() < 4 {
        return None;
    }
    Some(ControlRecord {
        version: i16::from_be_bytes([key[0], key[1]]),
        kind: ControlRecordType::from_i16(i16::from_be_bytes([key[2], key[3]])),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{encode_legacy_message, LegacyMessageBuilder, RecordBatchBuilder};
    use bytes::{BufMut, BytesMut};
    use kafkascope_core::varint::encode_varint;

    fn decode(data: Bytes) -> (RecordSet, Diagnostics) {
        let mut diags = Diagnostics::new();
        let set = decode_record_set(data, &RecordOptions::default(), "records", &mut diags);
        (set, diags)
    }

    fn batch_of(set: &RecordSet, index: usize) -> &RecordBatch {
        match &set.entries[index] {
            RecordSetEntry::Batch(batch) => batch,
            other => panic!("expected batch, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_set() {
        let (set, diags) = decode(Bytes::new());
        assert!(set.entries.is_empty());
        assert!(diags.is_empty());
    }

    #[test]
    fn test_v2_batch_resolves_deltas() {
        let data = RecordBatchBuilder::new(100)
            .first_timestamp(1_000)
            .record(Some(b"k0"), Some(b"v0"))
            .record(None, Some(b"v1"))
            .build()
            .unwrap();

        let (set, diags) = decode(data);
        assert!(diags.is_empty(), "{:?}", diags);
        let batch = batch_of(&set, 0);
        assert_eq!(batch.header.record_count, 2);
        assert_eq!(batch.records[0].offset, 100);
        assert_eq!(batch.records[1].offset, 101);
        assert_eq!(batch.records[1].timestamp, 1_001);
        assert_eq!(batch.records[0].key.as_deref(), Some(&b"k0"[..]));
        assert_eq!(batch.records[1].key, None);
    }

    #[test]
    fn test_v2_headers() {
        let data = RecordBatchBuilder::new(0)
            .record_with_headers(
                Some(b"k"),
                Some(b"v"),
                vec![("trace-id", Some(&b"abc"[..])), ("empty", None)],
            )
            .build()
            .unwrap();

        let (set, diags) = decode(data);
        assert!(diags.is_empty());
        let headers = &batch_of(&set, 0).records[0].headers;
        assert_eq!(headers.len(), 2);
        assert_eq!(headers[0].key.as_deref(), Some("trace-id"));
        assert_eq!(headers[0].value.as_deref(), Some(&b"abc"[..]));
        assert_eq!(headers[1].value, None);
    }

    #[test]
    fn test_v2_batch_every_codec() {
        for codec in [
            CompressionType::Gzip,
            CompressionType::Snappy,
            CompressionType::Lz4,
            CompressionType::Zstd,
        ] {
            let data = RecordBatchBuilder::new(7)
                .compression(codec)
                .record(Some(b"a"), Some(b"alpha"))
                .record(Some(b"b"), Some(b"beta"))
                .build()
                .unwrap();

            let (set, diags) = decode(data);
            assert!(diags.is_empty(), "{:?}: {:?}", codec, diags);
            let batch = batch_of(&set, 0);
            assert_eq!(batch.header.compression(), Some(codec));
            assert_eq!(batch.records.len(), 2);
            assert_eq!(batch.records[1].value.as_deref(), Some(&b"beta"[..]));
        }
    }

    #[test]
    fn test_v2_control_batch() {
        let mut key = BytesMut::new();
        key.put_i16(0);
        key.put_i16(1);
        let mut value = BytesMut::new();
        value.put_i16(0);
        value.put_i32(5);

        let data = RecordBatchBuilder::new(0)
            .control(true)
            .transactional(true)
            .record(Some(&key), Some(&value))
            .build()
            .unwrap();

        let (set, _) = decode(data);
        let batch = batch_of(&set, 0);
        assert!(batch.header.is_control);
        assert!(batch.header.is_transactional);
        assert_eq!(
            batch.records[0].control,
            Some(ControlRecord {
                version: 0,
                kind: ControlRecordType::Commit
            })
        );
    }

    #[test]
    fn test_v2_checksum_mismatch_is_warning() {
        let data = RecordBatchBuilder::new(0)
            .record(Some(b"k"), Some(b"v"))
            .build()
            .unwrap();
        let mut corrupt = BytesMut::from(&data[..]);
        corrupt[17] ^= 0xFF;

        let (set, diags) = decode(corrupt.freeze());
        assert_eq!(batch_of(&set, 0).records.len(), 1);
        assert!(diags.any(|k| matches!(k, DiagnosticKind::ChecksumMismatch { .. })));
        assert!(!diags.has_errors());
    }

    #[test]
    fn test_checksum_check_can_be_disabled() {
        let data = RecordBatchBuilder::new(0)
            .record(Some(b"k"), Some(b"v"))
            .build()
            .unwrap();
        let mut corrupt = BytesMut::from(&data[..]);
        corrupt[17] ^= 0xFF;

        let options = RecordOptions {
            verify_checksums: false,
            ..RecordOptions::default()
        };
        let mut diags = Diagnostics::new();
        decode_record_set(corrupt.freeze(), &options, "records", &mut diags);
        assert!(diags.is_empty());
    }

    #[test]
    fn test_v2_short_record_is_skipped_by_declared_length() {
        // Hand-built region: a record claiming 3 bytes, then a valid record.
        let mut region = BytesMut::new();
        encode_varint(&mut region, 3);
        region.put_slice(&[0xAA, 0xBB, 0xCC]);
        let good = {
            let mut body = BytesMut::new();
            body.put_i8(0);
            encode_varint(&mut body, 0);
            encode_varint(&mut body, 1);
            encode_varint(&mut body, -1);
            encode_varint(&mut body, 1);
            body.put_u8(b'x');
            encode_varint(&mut body, 0);
            body
        };
        encode_varint(&mut region, good.len() as i64);
        region.put_slice(&good);

        let data = RecordBatchBuilder::new(10)
            .raw_records(2, region.freeze())
            .build()
            .unwrap();

        let (set, diags) = decode(data);
        let batch = batch_of(&set, 0);
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].offset, 11);
        assert_eq!(batch.records[0].value.as_deref(), Some(&b"x"[..]));
        assert!(diags.any(|k| matches!(k, DiagnosticKind::RecordTooShort { length: 3 })));
    }

    #[test]
    fn test_v2_record_resyncs_to_declared_end() {
        // Declared length is one byte longer than the fields need.
        let mut body = BytesMut::new();
        body.put_i8(0);
        encode_varint(&mut body, 0);
        encode_varint(&mut body, 0);
        encode_varint(&mut body, -1);
        encode_varint(&mut body, -1);
        encode_varint(&mut body, 0);
        body.put_u8(0xEE); // junk inside the record

        let mut region = BytesMut::new();
        encode_varint(&mut region, body.len() as i64);
        region.put_slice(&body);
        // Second, well-formed record
        let mut second = BytesMut::new();
        second.put_i8(0);
        encode_varint(&mut second, 0);
        encode_varint(&mut second, 1);
        encode_varint(&mut second, -1);
        encode_varint(&mut second, -1);
        encode_varint(&mut second, 0);
        encode_varint(&mut region, second.len() as i64);
        region.put_slice(&second);

        let data = RecordBatchBuilder::new(0)
            .raw_records(2, region.freeze())
            .build()
            .unwrap();

        let (set, diags) = decode(data);
        let batch = batch_of(&set, 0);
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.records[1].offset, 1);
        assert!(diags.any(|k| matches!(
            k,
            DiagnosticKind::RecordLengthMismatch {
                declared: 7,
                consumed: 6
            }
        )));
    }

    #[test]
    fn test_v2_record_count_mismatch() {
        let mut region = BytesMut::new();
        let mut body = BytesMut::new();
        body.put_i8(0);
        encode_varint(&mut body, 0);
        encode_varint(&mut body, 0);
        encode_varint(&mut body, -1);
        encode_varint(&mut body, -1);
        encode_varint(&mut body, 0);
        encode_varint(&mut region, body.len() as i64);
        region.put_slice(&body);

        let data = RecordBatchBuilder::new(0)
            .raw_records(3, region.freeze())
            .build()
            .unwrap();

        let (set, diags) = decode(data);
        assert_eq!(batch_of(&set, 0).records.len(), 1);
        assert!(diags.any(|k| matches!(
            k,
            DiagnosticKind::RecordCountMismatch {
                declared: 3,
                decoded: 1
            }
        )));
    }

    #[test]
    fn test_legacy_magic0_and_magic1() {
        let mut buf = BytesMut::new();
        encode_legacy_message(&mut buf, 5, 0, 0, 0, Some(b"k"), Some(b"v0"));
        encode_legacy_message(&mut buf, 6, 1, 0x08, 1_234, None, Some(b"v1"));

        let (set, diags) = decode(buf.freeze());
        assert!(diags.is_empty(), "{:?}", diags);
        assert_eq!(set.entries.len(), 2);
        match (&set.entries[0], &set.entries[1]) {
            (RecordSetEntry::Legacy(m0), RecordSetEntry::Legacy(m1)) => {
                assert_eq!(m0.offset, 5);
                assert_eq!(m0.timestamp, None);
                assert_eq!(m0.key.as_deref(), Some(&b"k"[..]));
                assert_eq!(m1.timestamp, Some(1_234));
                assert_eq!(m1.timestamp_type, TimestampType::LogAppendTime);
                assert_eq!(m1.value.as_deref(), Some(&b"v1"[..]));
            }
            other => panic!("unexpected entries {:?}", other),
        }
    }

    #[test]
    fn test_legacy_compressed_nested_set() {
        for codec in [
            CompressionType::Gzip,
            CompressionType::Snappy,
            CompressionType::Lz4,
        ] {
            let wrapper = LegacyMessageBuilder::new(1)
                .compression(codec)
                .message(Some(b"a"), Some(b"one"))
                .message(Some(b"b"), Some(b"two"))
                .build()
                .unwrap();

            let (set, diags) = decode(wrapper);
            assert!(diags.is_empty(), "{:?}: {:?}", codec, diags);
            assert_eq!(set.record_count(), 2);
            match &set.entries[0] {
                RecordSetEntry::Legacy(outer) => {
                    let nested = outer.nested.as_ref().unwrap();
                    assert_eq!(nested.entries.len(), 2);
                }
                other => panic!("unexpected entry {:?}", other),
            }
        }
    }

    #[test]
    fn test_legacy_nesting_is_capped() {
        // Three levels of gzip wrapping with a cap of one
        let mut inner = BytesMut::new();
        encode_legacy_message(&mut inner, 0, 1, 0, 0, None, Some(b"leaf"));
        let level1 = LegacyMessageBuilder::new(1)
            .compression(CompressionType::Gzip)
            .raw_set(inner.freeze())
            .build()
            .unwrap();
        let level2 = LegacyMessageBuilder::new(1)
            .compression(CompressionType::Gzip)
            .raw_set(level1)
            .build()
            .unwrap();

        let options = RecordOptions {
            max_nesting_depth: 1,
            ..RecordOptions::default()
        };
        let mut diags = Diagnostics::new();
        let set = decode_record_set(level2, &options, "records", &mut diags);

        assert_eq!(set.entries.len(), 1);
        assert!(diags.any(|k| matches!(k, DiagnosticKind::NestingTooDeep { depth: 1 })));
    }

    #[test]
    fn test_legacy_decompression_failure_continues() {
        let mut buf = BytesMut::new();
        // gzip codec bits over garbage value bytes
        encode_legacy_message(&mut buf, 0, 1, 0x01, 0, None, Some(b"not gzip"));
        encode_legacy_message(&mut buf, 1, 1, 0, 0, None, Some(b"plain"));

        let (set, diags) = decode(buf.freeze());
        assert_eq!(set.entries.len(), 2);
        match &set.entries[0] {
            RecordSetEntry::Legacy(m) => assert!(m.decompress_failed),
            other => panic!("unexpected entry {:?}", other),
        }
        assert!(diags.any(|k| matches!(k, DiagnosticKind::DecompressionFailed { .. })));
    }

    #[test]
    fn test_unknown_magic_skipped_by_size() {
        let mut buf = BytesMut::new();
        buf.put_i64(0);
        buf.put_i32(10);
        buf.put_u32(0);
        buf.put_i8(7);
        buf.put_slice(&[0u8; 5]);
        encode_legacy_message(&mut buf, 1, 1, 0, 0, None, Some(b"after"));

        let (set, diags) = decode(buf.freeze());
        assert_eq!(set.entries.len(), 2);
        assert!(matches!(
            set.entries[0],
            RecordSetEntry::Unknown {
                magic: 7,
                size: 22,
                ..
            }
        ));
        assert!(matches!(set.entries[1], RecordSetEntry::Legacy(_)));
        assert!(diags.any(|k| matches!(k, DiagnosticKind::UnknownMagic { magic: 7 })));
    }

    #[test]
    fn test_partial_trailing_message_is_note() {
        let data = RecordBatchBuilder::new(0)
            .record(Some(b"k"), Some(b"v"))
            .build()
            .unwrap();
        let mut buf = BytesMut::from(&data[..]);
        buf.extend_from_slice(&data[..data.len() - 3]);

        let (set, diags) = decode(buf.freeze());
        assert_eq!(set.entries.len(), 1);
        assert_eq!(diags.len(), 1);
        let d = diags.iter().next().unwrap();
        assert_eq!(d.severity, Severity::Note);
        assert!(matches!(d.kind, DiagnosticKind::PartialMessage { .. }));
    }

    #[test]
    fn test_unknown_codec() {
        let data = RecordBatchBuilder::new(0)
            .attributes_override(0x06)
            .record(Some(b"k"), Some(b"v"))
            .build()
            .unwrap();

        let (set, diags) = decode(data);
        assert!(batch_of(&set, 0).records.is_empty());
        assert!(diags.any(|k| matches!(k, DiagnosticKind::UnknownCodec { id: 6 })));
    }
}
