//! Record set encoders
//!
//! The decoder never produces traffic, but tests, benchmarks, fuzz seeds and
//! the CLI fixtures need well-formed (and deliberately broken) record sets.
//! Checksums are always computed, so a caller corrupting a byte afterwards
//! exercises the verification path.

use bytes::{BufMut, Bytes, BytesMut};
use flate2::write::GzEncoder;
use flate2::Compression;
use kafkascope_core::varint::encode_varint;
use std::io::Write;

use crate::compression::XERIAL_MAGIC;
use crate::error::{KafkaError, KafkaResult};
use crate::records::{LOG_OVERHEAD, MAGIC_OFFSET, RECORD_BATCH_HEADER_SIZE};
use crate::types::CompressionType;

/// xerial chunk size used by the Java snappy stream.
const XERIAL_BLOCK_SIZE: usize = 32 * 1024;

/// Compress `data` the way Kafka clients do: gzip stream, xerial-framed
/// snappy, lz4 frame, zstd frame.
pub fn compress(codec: CompressionType, data: &[u8]) -> KafkaResult<Bytes> {
    let out = match codec {
        CompressionType::None => data.to_vec(),
        CompressionType::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(data)?;
            encoder.finish()?
        }
        CompressionType::Snappy => xerial_snappy(data)?,
        CompressionType::Lz4 => {
            let mut encoder = lz4_flex::frame::FrameEncoder::new(Vec::new());
            encoder.write_all(data)?;
            encoder
                .finish()
                .map_err(|e| KafkaError::Compression(e.to_string()))?
        }
        CompressionType::Zstd => zstd::encode_all(data, 3)?,
    };
    Ok(Bytes::from(out))
}

/// xerial snappy stream: magic, version 1, compatible version 1, then
/// length-prefixed raw blocks.
pub fn xerial_snappy(data: &[u8]) -> KafkaResult<Vec<u8>> {
    let mut out = XERIAL_MAGIC.to_vec();
    out.extend_from_slice(&1u32.to_be_bytes());
    out.extend_from_slice(&1u32.to_be_bytes());

    let mut encoder = snap::raw::Encoder::new();
    for chunk in data.chunks(XERIAL_BLOCK_SIZE) {
        let block = encoder
            .compress_vec(chunk)
            .map_err(|e| KafkaError::Compression(e.to_string()))?;
        out.extend_from_slice(&(block.len() as u32).to_be_bytes());
        out.extend_from_slice(&block);
    }
    Ok(out)
}

/// Append one magic 0/1 message with a correct CRC.
pub fn encode_legacy_message(
    buf: &mut BytesMut,
    offset: i64,
    magic: i8,
    attributes: u8,
    timestamp: i64,
    key: Option<&[u8]>,
    value: Option<&[u8]>,
) {
    let mut body = BytesMut::new();
    body.put_i8(magic);
    body.put_u8(attributes);
    if magic >= 1 {
        body.put_i64(timestamp);
    }
    for field in [key, value] {
        match field {
            Some(bytes) => {
                body.put_i32(bytes.len() as i32);
                body.put_slice(bytes);
            }
            None => body.put_i32(-1),
        }
    }

    buf.put_i64(offset);
    buf.put_i32((body.len() + 4) as i32);
    buf.put_u32(crc32fast::hash(&body));
    buf.put_slice(&body);
}

/// Builds a compressed magic 1 wrapper message around an inner message set.
#[derive(Debug, Clone)]
pub struct LegacyMessageBuilder {
    offset: i64,
    codec: CompressionType,
    inner: BytesMut,
    next_inner_offset: i64,
}

impl LegacyMessageBuilder {
    pub fn new(offset: i64) -> Self {
        Self {
            offset,
            codec: CompressionType::Gzip,
            inner: BytesMut::new(),
            next_inner_offset: 0,
        }
    }

    pub fn compression(mut self, codec: CompressionType) -> Self {
        self.codec = codec;
        self
    }

    /// Add an uncompressed magic 1 message to the inner set.
    pub fn message(mut self, key: Option<&[u8]>, value: Option<&[u8]>) -> Self {
        encode_legacy_message(&mut self.inner, self.next_inner_offset, 1, 0, 0, key, value);
        self.next_inner_offset += 1;
        self
    }

    /// Append already-encoded entries to the inner set.
    pub fn raw_set(mut self, set: Bytes) -> Self {
        self.inner.extend_from_slice(&set);
        self
    }

    pub fn build(self) -> KafkaResult<Bytes> {
        let value = compress(self.codec, &self.inner)?;
        let mut buf = BytesMut::new();
        encode_legacy_message(
            &mut buf,
            self.offset,
            1,
            self.codec as u8,
            0,
            None,
            Some(&value),
        );
        Ok(buf.freeze())
    }
}

#[derive(Debug, Clone)]
struct PendingRecord {
    key: Option<Vec<u8>>,
    value: Option<Vec<u8>>,
    headers: Vec<(String, Option<Vec<u8>>)>,
}

/// Builds a magic 2 record batch.
#[derive(Debug, Clone)]
pub struct RecordBatchBuilder {
    base_offset: i64,
    first_timestamp: i64,
    codec: CompressionType,
    transactional: bool,
    control: bool,
    producer_id: i64,
    producer_epoch: i16,
    base_sequence: i32,
    attributes_override: Option<i16>,
    records: Vec<PendingRecord>,
    raw: Option<(i32, Bytes)>,
}

impl RecordBatchBuilder {
    pub fn new(base_offset: i64) -> Self {
        Self {
            base_offset,
            first_timestamp: 0,
            codec: CompressionType::None,
            transactional: false,
            control: false,
            producer_id: -1,
            producer_epoch: -1,
            base_sequence: -1,
            attributes_override: None,
            records: Vec::new(),
            raw: None,
        }
    }

    pub fn first_timestamp(mut self, timestamp: i64) -> Self {
        self.first_timestamp = timestamp;
        self
    }

    pub fn compression(mut self, codec: CompressionType) -> Self {
        self.codec = codec;
        self
    }

    pub fn transactional(mut self, transactional: bool) -> Self {
        self.transactional = transactional;
        self
    }

    pub fn control(mut self, control: bool) -> Self {
        self.control = control;
        self
    }

    pub fn producer(mut self, producer_id: i64, producer_epoch: i16, base_sequence: i32) -> Self {
        self.producer_id = producer_id;
        self.producer_epoch = producer_epoch;
        self.base_sequence = base_sequence;
        self
    }

    /// Write these attribute bits verbatim; records are left uncompressed.
    pub fn attributes_override(mut self, attributes: i16) -> Self {
        self.attributes_override = Some(attributes);
        self
    }

    pub fn record(self, key: Option<&[u8]>, value: Option<&[u8]>) -> Self {
        self.record_with_headers(key, value, Vec::new())
    }

    pub fn record_with_headers(
        mut self,
        key: Option<&[u8]>,
        value: Option<&[u8]>,
        headers: Vec<(&str, Option<&[u8]>)>,
    ) -> Self {
        self.records.push(PendingRecord {
            key: key.map(<[u8]>::to_vec),
            value: value.map(<[u8]>::to_vec),
            headers: headers
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.map(<[u8]>::to_vec)))
                .collect(),
        });
        self
    }

    /// Use `region` as the (uncompressed) record area and `count` as the
    /// declared record count instead of encoding records.
    pub fn raw_records(mut self, count: i32, region: Bytes) -> Self {
        self.raw = Some((count, region));
        self
    }

    fn encode_records(&self) -> BytesMut {
        let mut region = BytesMut::new();
        for (delta, record) in self.records.iter().enumerate() {
            let mut body = BytesMut::new();
            body.put_i8(0);
            encode_varint(&mut body, delta as i64);
            encode_varint(&mut body, delta as i64);
            put_compact(&mut body, record.key.as_deref());
            put_compact(&mut body, record.value.as_deref());
            encode_varint(&mut body, record.headers.len() as i64);
            for (key, value) in &record.headers {
                put_compact(&mut body, Some(key.as_bytes()));
                put_compact(&mut body, value.as_deref());
            }

            encode_varint(&mut region, body.len() as i64);
            region.put_slice(&body);
        }
        region
    }

    pub fn build(self) -> KafkaResult<Bytes> {
        let (count, region) = match &self.raw {
            Some((count, region)) => (*count, region.clone()),
            None => {
                let region = self.encode_records();
                let codec = if self.attributes_override.is_some() {
                    CompressionType::None
                } else {
                    self.codec
                };
                (self.records.len() as i32, compress(codec, &region)?)
            }
        };

        let attributes = self.attributes_override.unwrap_or_else(|| {
            let mut attributes = self.codec as i16;
            if self.transactional {
                attributes |= 0x10;
            }
            if self.control {
                attributes |= 0x20;
            }
            attributes
        });
        let last_offset_delta = (count - 1).max(0);

        let mut buf = BytesMut::with_capacity(RECORD_BATCH_HEADER_SIZE + region.len());
        buf.put_i64(self.base_offset);
        buf.put_i32((RECORD_BATCH_HEADER_SIZE - LOG_OVERHEAD + region.len()) as i32);
        buf.put_i32(0); // leader epoch
        buf.put_i8(2);
        buf.put_u32(0); // crc, patched below
        buf.put_i16(attributes);
        buf.put_i32(last_offset_delta);
        buf.put_i64(self.first_timestamp);
        buf.put_i64(self.first_timestamp + last_offset_delta as i64);
        buf.put_i64(self.producer_id);
        buf.put_i16(self.producer_epoch);
        buf.put_i32(self.base_sequence);
        buf.put_i32(count);
        buf.put_slice(&region);

        let crc_start = MAGIC_OFFSET + 1;
        let crc = crc32c::crc32c(&buf[crc_start + 4..]);
        buf[crc_start..crc_start + 4].copy_from_slice(&crc.to_be_bytes());

        Ok(buf.freeze())
    }
}

fn put_compact(buf: &mut BytesMut, data: Option<&[u8]>) {
    match data {
        Some(bytes) => {
            encode_varint(buf, bytes.len() as i64);
            buf.put_slice(bytes);
        }
        None => encode_varint(buf, -1),
    }
}
