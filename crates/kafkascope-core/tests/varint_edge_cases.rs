//! Edge-case tests for the varint and zigzag encodings.

use bytes::BytesMut;
use kafkascope_core::varint::{
    decode_varint, encode_varint, encode_varint_u64, encoded_len, read_varint, read_varint_u64,
    zigzag_decode, zigzag_encode, MAX_VARINT32_LEN, MAX_VARINT64_LEN,
};

/// A spread of values across every encoded width plus the i64 boundaries.
fn sample_values() -> Vec<i64> {
    let mut values = vec![0, 1, -1, 2, -2, i64::MAX, i64::MIN, i64::MAX - 1, i64::MIN + 1];
    for shift in 0..63 {
        let v = 1i64 << shift;
        values.extend([v - 1, v, v + 1, -v, -v - 1]);
    }
    values
}

// ---------------------------------------------------------------
// Zigzag
// ---------------------------------------------------------------

#[test]
fn zigzag_symmetry() {
    for v in sample_values() {
        assert_eq!(zigzag_decode(zigzag_encode(v)), v, "failed for value {v}");
    }
}

#[test]
fn zigzag_small_values_interleave() {
    assert_eq!(zigzag_encode(0), 0);
    assert_eq!(zigzag_encode(-1), 1);
    assert_eq!(zigzag_encode(1), 2);
    assert_eq!(zigzag_encode(-2), 3);
    assert_eq!(zigzag_encode(2), 4);
}

// ---------------------------------------------------------------
// Encode / read with width
// ---------------------------------------------------------------

#[test]
fn read_varint_returns_value_and_width() {
    for v in sample_values() {
        let mut buf = BytesMut::new();
        encode_varint(&mut buf, v);
        assert_eq!(
            read_varint(&buf, MAX_VARINT64_LEN),
            (v, buf.len()),
            "failed for value {v}"
        );
        assert_eq!(encoded_len(v), buf.len());
    }
}

#[test]
fn read_varint_ignores_following_bytes() {
    let mut buf = BytesMut::new();
    encode_varint(&mut buf, -12345);
    let width = buf.len();
    buf.extend_from_slice(&[0xFF; 8]);

    assert_eq!(read_varint(&buf, MAX_VARINT64_LEN), (-12345, width));
}

#[test]
fn decode_varint_from_buf_matches_slice_reader() {
    for v in sample_values() {
        let mut buf = BytesMut::new();
        encode_varint(&mut buf, v);
        let (expected, _) = read_varint(&buf, MAX_VARINT64_LEN);
        let mut cursor = &buf[..];
        assert_eq!(decode_varint(&mut cursor).unwrap(), expected);
        assert!(cursor.is_empty());
    }
}

#[test]
fn varint32_window_rejects_wide_values() {
    let mut buf = BytesMut::new();
    encode_varint_u64(&mut buf, u64::from(u32::MAX) + 1);
    assert_eq!(buf.len(), 5);
    // Fits exactly in the 5-byte window
    assert_eq!(read_varint_u64(&buf, MAX_VARINT32_LEN).1, 5);

    let mut buf = BytesMut::new();
    encode_varint_u64(&mut buf, 1 << 35);
    assert_eq!(buf.len(), 6);
    assert_eq!(read_varint_u64(&buf, MAX_VARINT32_LEN), (0, 0));
}

#[test]
fn malformed_inputs_report_zero_width() {
    assert_eq!(read_varint(&[], MAX_VARINT32_LEN), (0, 0));
    assert_eq!(read_varint(&[0x80], MAX_VARINT32_LEN), (0, 0));
    assert_eq!(read_varint(&[0xFF; 12], MAX_VARINT64_LEN), (0, 0));
}
