//! Compression engine
//!
//! `decompress(codec, span)` turns the compressed region of a message or
//! batch into a flat buffer. Every failure is a distinct
//! [`KafkaError::Compression`]; nothing is silently truncated.
//!
//! Two codecs need more than a call into the codec crate:
//!
//! - **snappy**: Java clients wrap snappy in the xerial stream format
//!   (8-byte magic, two version words, then 4-byte big-endian length-prefixed
//!   raw blocks starting at offset 16). Anything without the magic is one raw
//!   block.
//! - **lz4**: old Kafka versions compute the frame descriptor checksum over
//!   the wrong bytes. The byte is recomputed before the frame is handed to the
//!   frame decoder.

use bytes::Bytes;
use flate2::read::GzDecoder;
use std::io::Read;
use tracing::{debug, trace};
use twox_hash::XxHash32;

use crate::error::{KafkaError, KafkaResult};
use crate::types::CompressionType;

/// Magic prefix of the xerial snappy stream format.
pub const XERIAL_MAGIC: [u8; 8] = [0x82, b'S', b'N', b'A', b'P', b'P', b'Y', 0];

/// Magic, version and compatible-version words.
const XERIAL_HEADER_LEN: usize = 16;

/// LZ4 frame magic number (little-endian on the wire).
pub const LZ4_FRAME_MAGIC: u32 = 0x184D_2204;

/// FLG bit: 8-byte content size follows BD.
const LZ4_FLG_CONTENT_SIZE: u8 = 0x08;

/// FLG bit: 4-byte dictionary id follows.
const LZ4_FLG_DICT_ID: u8 = 0x01;

/// Output chunk pulled from streaming decoders per read.
const CHUNK_SIZE: usize = 64 * 1024;

/// Default cap on a single decompressed buffer (256MB).
pub const DEFAULT_MAX_DECOMPRESSED_SIZE: usize = 256 * 1024 * 1024;

/// Sub-format of a snappy span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnappyFormat {
    /// xerial stream: chunked raw blocks after a 16-byte header.
    Framed,
    /// A single raw snappy block.
    Unframed,
}

/// Inspect the first 8 bytes of a snappy span.
pub fn snappy_format(data: &[u8]) -> SnappyFormat {
    if data.len() >= XERIAL_MAGIC.len() && data[..XERIAL_MAGIC.len()] == XERIAL_MAGIC {
        SnappyFormat::Framed
    } else {
        SnappyFormat::Unframed
    }
}

/// Decompress `data` using `codec`, producing at most `limit` bytes.
///
/// [`CompressionType::None`] returns the input unchanged without copying.
pub fn decompress(codec: CompressionType, data: Bytes, limit: usize) -> KafkaResult<Bytes> {
    trace!(codec = codec.name(), len = data.len(), "decompress");
    let out = match codec {
        CompressionType::None => return Ok(data),
        CompressionType::Gzip => read_bounded(GzDecoder::new(&data[..]), limit, codec)?,
        CompressionType::Snappy => match snappy_format(&data) {
            SnappyFormat::Framed => decompress_xerial(&data, limit)?,
            SnappyFormat::Unframed => decompress_snappy_block(&data, limit)?,
        },
        CompressionType::Lz4 => decompress_lz4(&data, limit)?,
        CompressionType::Zstd => {
            let decoder = zstd::stream::read::Decoder::new(&data[..])
                .map_err(|e| compression_error(codec, e))?;
            read_bounded(decoder, limit, codec)?
        }
    };
    Ok(Bytes::from(out))
}

fn compression_error(codec: CompressionType, err: impl std::fmt::Display) -> KafkaError {
    KafkaError::Compression(format!("{}: {}", codec.name(), err))
}

/// Pull fixed-size chunks out of a streaming decoder until it reports the end
/// of its input.
fn read_bounded(mut reader: impl Read, limit: usize, codec: CompressionType) -> KafkaResult<Vec<u8>> {
    let mut out = Vec::new();
    let mut chunk = vec![0u8; CHUNK_SIZE];
    loop {
        let n = reader
            .read(&mut chunk)
            .map_err(|e| compression_error(codec, e))?;
        if n == 0 {
            break;
        }
        if out.len() + n > limit {
            return Err(compression_error(
                codec,
                format!("output exceeds {} bytes", limit),
            ));
        }
        out.extend_from_slice(&chunk[..n]);
    }
    Ok(out)
}

fn decompress_snappy_block(data: &[u8], limit: usize) -> KafkaResult<Vec<u8>> {
    let len = snap::raw::decompress_len(data)
        .map_err(|e| compression_error(CompressionType::Snappy, e))?;
    if len > limit {
        return Err(compression_error(
            CompressionType::Snappy,
            format!("block of {} bytes exceeds {}", len, limit),
        ));
    }
    snap::raw::Decoder::new()
        .decompress_vec(data)
        .map_err(|e| compression_error(CompressionType::Snappy, e))
}

fn decompress_xerial(data: &[u8], limit: usize) -> KafkaResult<Vec<u8>> {
    debug!(len = data.len(), "xerial snappy stream");
    if data.len() < XERIAL_HEADER_LEN {
        return Err(compression_error(
            CompressionType::Snappy,
            "truncated xerial header",
        ));
    }

    let mut out = Vec::new();
    let mut pos = XERIAL_HEADER_LEN;
    while pos < data.len() {
        let Some(prefix) = data.get(pos..pos + 4) else {
            return Err(compression_error(
                CompressionType::Snappy,
                format!("truncated chunk length at offset {}", pos),
            ));
        };
        let chunk_len = u32::from_be_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
        pos += 4;

        if chunk_len > data.len() - pos {
            return Err(compression_error(
                CompressionType::Snappy,
                format!(
                    "chunk of {} bytes overruns {} remaining",
                    chunk_len,
                    data.len() - pos
                ),
            ));
        }

        let block = decompress_snappy_block(&data[pos..pos + chunk_len], limit - out.len())?;
        out.extend_from_slice(&block);
        pos += chunk_len;
    }
    Ok(out)
}

/// Offset of the header checksum byte in an LZ4 frame, after the magic,
/// FLG, BD and the optional content size and dictionary id.
fn lz4_header_checksum_offset(frame: &[u8]) -> KafkaResult<usize> {
    if frame.len() < 7 {
        return Err(compression_error(CompressionType::Lz4, "truncated frame header"));
    }
    let magic = u32::from_le_bytes([frame[0], frame[1], frame[2], frame[3]]);
    if magic != LZ4_FRAME_MAGIC {
        return Err(compression_error(
            CompressionType::Lz4,
            format!("bad frame magic 0x{:08x}", magic),
        ));
    }

    let flg = frame[4];
    let mut offset = 6;
    if flg & LZ4_FLG_CONTENT_SIZE != 0 {
        offset += 8;
    }
    if flg & LZ4_FLG_DICT_ID != 0 {
        offset += 4;
    }
    if offset >= frame.len() {
        return Err(compression_error(CompressionType::Lz4, "truncated frame header"));
    }
    Ok(offset)
}

/// Descriptor checksum: second byte of xxh32 (seed 0) over FLG..HC.
pub fn lz4_header_checksum(descriptor: &[u8]) -> u8 {
    ((XxHash32::oneshot(0, descriptor) >> 8) & 0xFF) as u8
}

/// Overwrite the frame's header checksum byte with the correct value.
pub fn fix_lz4_header_checksum(frame: &mut [u8]) -> KafkaResult<()> {
    let hc = lz4_header_checksum_offset(frame)?;
    let expected = lz4_header_checksum(&frame[4..hc]);
    if frame[hc] != expected {
        debug!(
            stored = frame[hc],
            expected, "rewriting lz4 frame header checksum"
        );
        frame[hc] = expected;
    }
    Ok(())
}

fn decompress_lz4(data: &[u8], limit: usize) -> KafkaResult<Vec<u8>> {
    let mut frame = data.to_vec();
    fix_lz4_header_checksum(&mut frame)?;
    read_bounded(
        lz4_flex::frame::FrameDecoder::new(&frame[..]),
        limit,
        CompressionType::Lz4,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    const LIMIT: usize = DEFAULT_MAX_DECOMPRESSED_SIZE;

    fn sample() -> Vec<u8> {
        b"kafka record payload ".repeat(64)
    }

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn lz4_frame(data: &[u8]) -> Vec<u8> {
        let mut encoder = lz4_flex::frame::FrameEncoder::new(Vec::new());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn xerial(chunks: &[&[u8]]) -> Vec<u8> {
        let mut out = XERIAL_MAGIC.to_vec();
        out.extend_from_slice(&1u32.to_be_bytes());
        out.extend_from_slice(&1u32.to_be_bytes());
        for chunk in chunks {
            let block = snap::raw::Encoder::new().compress_vec(chunk).unwrap();
            out.extend_from_slice(&(block.len() as u32).to_be_bytes());
            out.extend_from_slice(&block);
        }
        out
    }

    #[test]
    fn test_none_is_identity_without_copy() {
        let input = Bytes::from(sample());
        let ptr = input.as_ptr();
        let out = decompress(CompressionType::None, input, LIMIT).unwrap();
        assert_eq!(out.as_ptr(), ptr);
    }

    #[test]
    fn test_gzip() {
        let out = decompress(CompressionType::Gzip, Bytes::from(gzip(&sample())), LIMIT).unwrap();
        assert_eq!(&out[..], &sample()[..]);
    }

    #[test]
    fn test_gzip_truncated_fails() {
        let mut compressed = gzip(&sample());
        compressed.truncate(compressed.len() - 6);
        assert!(matches!(
            decompress(CompressionType::Gzip, Bytes::from(compressed), LIMIT),
            Err(KafkaError::Compression(_))
        ));
    }

    #[test]
    fn test_snappy_unframed() {
        let block = snap::raw::Encoder::new().compress_vec(&sample()).unwrap();
        assert_eq!(snappy_format(&block), SnappyFormat::Unframed);
        let out = decompress(CompressionType::Snappy, Bytes::from(block), LIMIT).unwrap();
        assert_eq!(&out[..], &sample()[..]);
    }

    #[test]
    fn test_snappy_xerial_chunks_concatenate() {
        let data = xerial(&[&b"first chunk|"[..], &b"second chunk"[..]]);
        assert_eq!(snappy_format(&data), SnappyFormat::Framed);
        let out = decompress(CompressionType::Snappy, Bytes::from(data), LIMIT).unwrap();
        assert_eq!(&out[..], b"first chunk|second chunk");
    }

    #[test]
    fn test_snappy_xerial_header_only_is_empty() {
        let data = xerial(&[]);
        let out = decompress(CompressionType::Snappy, Bytes::from(data), LIMIT).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_snappy_xerial_chunk_overrun_fails() {
        let mut data = xerial(&[&b"payload"[..]]);
        // Inflate the declared chunk length past the end of the input
        data[16..20].copy_from_slice(&1000u32.to_be_bytes());
        assert!(decompress(CompressionType::Snappy, Bytes::from(data), LIMIT).is_err());
    }

    #[test]
    fn test_lz4_frame() {
        let out = decompress(CompressionType::Lz4, Bytes::from(lz4_frame(&sample())), LIMIT).unwrap();
        assert_eq!(&out[..], &sample()[..]);
    }

    #[test]
    fn test_lz4_bad_header_checksum_is_repaired() {
        let mut frame = lz4_frame(&sample());
        let hc = lz4_header_checksum_offset(&frame).unwrap();
        frame[hc] = frame[hc].wrapping_add(1);

        // The frame decoder alone rejects it
        let mut plain = Vec::new();
        assert!(lz4_flex::frame::FrameDecoder::new(&frame[..])
            .read_to_end(&mut plain)
            .is_err());

        let out = decompress(CompressionType::Lz4, Bytes::from(frame), LIMIT).unwrap();
        assert_eq!(&out[..], &sample()[..]);
    }

    #[test]
    fn test_lz4_bad_magic_fails() {
        let mut frame = lz4_frame(&sample());
        frame[0] = 0;
        assert!(decompress(CompressionType::Lz4, Bytes::from(frame), LIMIT).is_err());
    }

    #[test]
    fn test_zstd() {
        let compressed = zstd::encode_all(&sample()[..], 3).unwrap();
        let out = decompress(CompressionType::Zstd, Bytes::from(compressed), LIMIT).unwrap();
        assert_eq!(&out[..], &sample()[..]);
    }

    #[test]
    fn test_zstd_garbage_fails() {
        let garbage = Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef, 0x00, 0x11]);
        assert!(decompress(CompressionType::Zstd, garbage, LIMIT).is_err());
    }

    #[test]
    fn test_output_limit_enforced() {
        let compressed = zstd::encode_all(&sample()[..], 3).unwrap();
        let err = decompress(CompressionType::Zstd, Bytes::from(compressed), 16).unwrap_err();
        assert!(err.to_string().contains("exceeds"));
    }
}
