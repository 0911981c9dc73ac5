//! Variable-length Integer Encoding (Varint)
//!
//! Kafka borrows Protobuf's base-128 varints for the magic-2 record format:
//! record lengths, timestamp and offset deltas, key/value/header lengths and
//! header counts are all zig-zag encoded varints.
//!
//! ## Varint Encoding
//! - Little-endian groups of 7 bits
//! - The high bit of each byte is a continuation flag
//! - A 32-bit quantity occupies at most [`MAX_VARINT32_LEN`] bytes, a 64-bit
//!   one at most [`MAX_VARINT64_LEN`]
//!
//! ## ZigZag Encoding (for signed integers)
//! Maps signed integers to unsigned so small negative numbers stay short:
//! - 0 → 0, -1 → 1, 1 → 2, -2 → 3, 2 → 4, etc.
//! - `-1` (the "null" length) therefore encodes as the single byte `0x01`
//!
//! ## Two reading styles
//! - [`decode_varint`] / [`decode_varint_u64`] consume from a [`Buf`] and
//!   return an [`Error`](crate::Error) on truncated or over-long input.
//! - [`read_varint`] / [`read_varint_u64`] look at a byte slice and return
//!   `(value, width)`. A width of `0` means the input was malformed; the
//!   caller substitutes the maximum width for the quantity to keep its own
//!   cursor moving deterministically.
//!
//! ## Usage
//! ```ignore
//! let mut buf = BytesMut::new();
//! encode_varint(&mut buf, -42);
//! assert_eq!(read_varint(&buf, MAX_VARINT64_LEN), (-42, 1));
//! ```

use bytes::{Buf, BufMut};

use crate::error::{Error, Result};

/// Maximum encoded width of a 32-bit varint.
pub const MAX_VARINT32_LEN: usize = 5;

/// Maximum encoded width of a 64-bit varint.
pub const MAX_VARINT64_LEN: usize = 10;

/// ZigZag-map a signed integer onto an unsigned one.
#[inline]
pub fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

/// Inverse of [`zigzag_encode`]: `n ⇒ (n >> 1) ^ -(n & 1)`.
#[inline]
pub fn zigzag_decode(unsigned: u64) -> i64 {
    ((unsigned >> 1) as i64) ^ (-((unsigned & 1) as i64))
}

/// Encode a signed integer as a varint (ZigZag encoding)
pub fn encode_varint(buf: &mut impl BufMut, value: i64) {
    encode_varint_u64(buf, zigzag_encode(value));
}

/// Encode an unsigned integer as a varint
pub fn encode_varint_u64(buf: &mut impl BufMut, mut value: u64) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;

        if value != 0 {
            byte |= 0x80; // Set continuation bit
        }

        buf.put_u8(byte);

        if value == 0 {
            break;
        }
    }
}

/// Number of bytes [`encode_varint`] writes for `value`.
pub fn encoded_len(value: i64) -> usize {
    encoded_len_u64(zigzag_encode(value))
}

/// Number of bytes [`encode_varint_u64`] writes for `value`.
pub fn encoded_len_u64(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.max(1).div_ceil(7)
}

/// Decode a varint to a signed integer
pub fn decode_varint(buf: &mut impl Buf) -> Result<i64> {
    decode_varint_u64(buf).map(zigzag_decode)
}

/// Decode a varint to an unsigned integer
pub fn decode_varint_u64(buf: &mut impl Buf) -> Result<u64> {
    let mut value: u64 = 0;

    for read in 0..MAX_VARINT64_LEN {
        if !buf.has_remaining() {
            return Err(Error::VarintTruncated { read });
        }

        let byte = buf.get_u8();
        value |= ((byte & 0x7F) as u64) << (7 * read);

        if (byte & 0x80) == 0 {
            return Ok(value);
        }
    }

    Err(Error::VarintTooLong {
        max_len: MAX_VARINT64_LEN,
    })
}

/// Read an unsigned varint from the front of `src`, looking at no more than
/// `max_len` bytes.
///
/// Returns `(value, width)`. `width == 0` signals malformed input: either the
/// slice ended mid-varint or no terminating byte appeared within `max_len`.
pub fn read_varint_u64(src: &[u8], max_len: usize) -> (u64, usize) {
    let mut value: u64 = 0;

    for (i, &byte) in src.iter().take(max_len).enumerate() {
        let shift = 7 * i;
        if shift < 64 {
            value |= ((byte & 0x7F) as u64) << shift;
        }
        if byte & 0x80 == 0 {
            return (value, i + 1);
        }
    }

    (0, 0)
}

/// Read a zig-zag varint from the front of `src`. Same contract as
/// [`read_varint_u64`].
pub fn read_varint(src: &[u8], max_len: usize) -> (i64, usize) {
    let (unsigned, width) = read_varint_u64(src, max_len);
    if width == 0 {
        return (0, 0);
    }
    (zigzag_decode(unsigned), width)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn test_varint_small_positive() {
        let mut buf = BytesMut::new();
        encode_varint(&mut buf, 5);

        let mut cursor = buf.as_ref();
        assert_eq!(decode_varint(&mut cursor).unwrap(), 5);
    }

    #[test]
    fn test_varint_small_negative() {
        let mut buf = BytesMut::new();
        encode_varint(&mut buf, -5);

        let mut cursor = buf.as_ref();
        assert_eq!(decode_varint(&mut cursor).unwrap(), -5);
    }

    #[test]
    fn test_varint_negative_one_is_single_byte() {
        let mut buf = BytesMut::new();
        encode_varint(&mut buf, -1);
        // ZigZag: -1 -> 1
        assert_eq!(&buf[..], &[0x01]);
        assert_eq!(read_varint(&buf, MAX_VARINT32_LEN), (-1, 1));
    }

    #[test]
    fn test_varint_compression() {
        let mut buf = BytesMut::new();
        encode_varint(&mut buf, 63);
        assert_eq!(buf.len(), 1); // encodes as 126

        let mut buf = BytesMut::new();
        encode_varint(&mut buf, 64);
        assert_eq!(buf.len(), 2); // encodes as 128
    }

    #[test]
    fn test_varint_i64_extremes() {
        for val in [i64::MIN, i64::MIN + 1, i64::MAX - 1, i64::MAX] {
            let mut buf = BytesMut::new();
            encode_varint(&mut buf, val);
            assert_eq!(buf.len(), MAX_VARINT64_LEN);
            let mut cursor = buf.as_ref();
            assert_eq!(decode_varint(&mut cursor).unwrap(), val);
        }
    }

    #[test]
    fn test_varint_u64_max() {
        let mut buf = BytesMut::new();
        encode_varint_u64(&mut buf, u64::MAX);
        let mut cursor = buf.as_ref();
        assert_eq!(decode_varint_u64(&mut cursor).unwrap(), u64::MAX);
    }

    #[test]
    fn test_decode_varint_truncated() {
        let mut cursor: &[u8] = &[0x80, 0x80];
        assert_eq!(
            decode_varint_u64(&mut cursor),
            Err(Error::VarintTruncated { read: 2 })
        );
    }

    #[test]
    fn test_decode_varint_too_long() {
        let data = [0xFFu8; 11];
        let mut cursor = &data[..];
        assert_eq!(
            decode_varint_u64(&mut cursor),
            Err(Error::VarintTooLong { max_len: 10 })
        );
    }

    #[test]
    fn test_read_varint_reports_width() {
        let mut buf = BytesMut::new();
        encode_varint(&mut buf, 300);
        buf.extend_from_slice(&[0xAA, 0xBB]); // trailing bytes are not consumed

        assert_eq!(read_varint(&buf, MAX_VARINT32_LEN), (300, 2));
    }

    #[test]
    fn test_read_varint_malformed_returns_zero_width() {
        // No terminating byte within the 32-bit window
        let data = [0x80u8, 0x80, 0x80, 0x80, 0x80, 0x01];
        assert_eq!(read_varint_u64(&data, MAX_VARINT32_LEN), (0, 0));
        // The same bytes are a valid 64-bit varint
        assert_eq!(read_varint_u64(&data, MAX_VARINT64_LEN).1, 6);
    }

    #[test]
    fn test_read_varint_empty_and_truncated() {
        assert_eq!(read_varint(&[], MAX_VARINT64_LEN), (0, 0));
        assert_eq!(read_varint(&[0x81], MAX_VARINT64_LEN), (0, 0));
    }

    #[test]
    fn test_encoded_len_matches_encoder() {
        for val in [0i64, 1, -1, 63, 64, -65, 8191, 8192, i64::MAX, i64::MIN] {
            let mut buf = BytesMut::new();
            encode_varint(&mut buf, val);
            assert_eq!(encoded_len(val), buf.len(), "width for {val}");
        }
    }
}
