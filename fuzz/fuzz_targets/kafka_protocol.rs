#![no_main]

use bytes::Bytes;
use kafkascope_core::varint::{read_varint, read_varint_u64};
use kafkascope_kafka::cursor::DecodeCursor;
use kafkascope_kafka::{ConnectionKey, Diagnostics, Direction, Dissector, DissectorConfig};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes on both directions of one connection, split at a
    // data-dependent point so reassembly across feeds is exercised.
    let config = DissectorConfig {
        max_frame_size: 1 << 20,
        max_decompressed_size: 1 << 22,
        ..DissectorConfig::default()
    };
    let mut dissector = Dissector::new(config);
    let conn = ConnectionKey::new("fuzz");
    let split = data.first().map_or(0, |b| *b as usize).min(data.len());

    let _ = dissector.feed(&conn, Direction::Request, 0, &data[..split]);
    let _ = dissector.feed(&conn, Direction::Request, 1, &data[split..]);
    let _ = dissector.feed(&conn, Direction::Response, 2, data);

    // Second pass over the same frames must not panic either.
    let payload = Bytes::copy_from_slice(data);
    let _ = dissector.decode_message(
        &conn,
        Direction::Request,
        kafkascope_kafka::MessageRef::new(1, 0),
        payload.clone(),
    );

    // Primitive readers straight on the input
    let mut diags = Diagnostics::new();
    let _ = DecodeCursor::new(payload.clone()).read_legacy_string(&mut diags, "s");
    let _ = DecodeCursor::new(payload.clone()).read_legacy_bytes(&mut diags, "b");
    let _ = DecodeCursor::new(payload.clone()).read_compact_string(&mut diags, "cs");
    let _ = DecodeCursor::new(payload).read_compact_bytes(&mut diags, "cb");
    let _ = read_varint(data, 5);
    let _ = read_varint_u64(data, 10);
});
