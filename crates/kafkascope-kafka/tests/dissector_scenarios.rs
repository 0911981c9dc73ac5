//! End-to-end scenarios: captured bytes in, decoded messages out.

use bytes::{BufMut, Bytes, BytesMut};
use kafkascope_kafka::builder::RecordBatchBuilder;
use kafkascope_kafka::codec::{encode_nullable_string, encode_string, frame, RequestHeader, ResponseHeader};
use kafkascope_kafka::records::RecordSetEntry;
use kafkascope_kafka::registry;
use kafkascope_kafka::schema::FieldValue;
use kafkascope_kafka::{
    ConnectionKey, DecodedMessage, DiagnosticKind, Diagnostics, Direction, Dissector, MessageRef,
    Severity,
};

fn request(api_key: i16, api_version: i16, correlation_id: i32, body: &[u8]) -> Bytes {
    let mut buf = BytesMut::new();
    RequestHeader {
        api_key,
        api_version,
        correlation_id,
        client_id: Some("scenario".to_string()),
    }
    .encode(&mut buf);
    buf.put_slice(body);
    frame(&buf)
}

fn response(correlation_id: i32, body: &[u8]) -> Bytes {
    let mut buf = BytesMut::new();
    ResponseHeader::new(correlation_id).encode(&mut buf);
    buf.put_slice(body);
    frame(&buf)
}

fn produce_body(batch: &[u8]) -> Vec<u8> {
    let mut body = BytesMut::new();
    encode_nullable_string(&mut body, None);
    body.put_i16(-1);
    body.put_i32(30_000);
    body.put_i32(1);
    encode_string(&mut body, "events");
    body.put_i32(1);
    body.put_i32(0);
    body.put_i32(batch.len() as i32);
    body.put_slice(batch);
    body.to_vec()
}

fn fetch_response_v4(batch: &[u8]) -> Vec<u8> {
    let mut body = BytesMut::new();
    body.put_i32(0); // throttle_time_ms
    body.put_i32(1);
    encode_string(&mut body, "events");
    body.put_i32(1);
    body.put_i32(0); // partition
    body.put_i16(0); // error_code
    body.put_i64(10); // high_watermark
    body.put_i64(10); // last_stable_offset
    body.put_i32(0); // aborted_transactions
    body.put_i32(batch.len() as i32);
    body.put_slice(batch);
    body.to_vec()
}

// ---------------------------------------------------------------
// Concrete ApiVersions header
// ---------------------------------------------------------------

#[test]
fn api_versions_v2_header() {
    let conn = ConnectionKey::new("c->s");
    let mut dissector = Dissector::default();

    let payload = Bytes::from_static(&[0x00, 0x12, 0x00, 0x02, 0x00, 0x00, 0x00, 0x07]);
    let msg = dissector.decode_message(&conn, Direction::Request, MessageRef::new(1, 0), payload);

    assert_eq!(msg.api_key, Some(18));
    assert_eq!(msg.api_version, Some(2));
    assert_eq!(msg.correlation_id, Some(7));
    assert_eq!(msg.client_id, None);
    assert_eq!(msg.api_name, Some("ApiVersions"));
    assert!(msg.diagnostics.is_empty(), "{:?}", msg.diagnostics);

    let mut diags = Diagnostics::new();
    assert!(registry::validate(18, 2, &mut diags).is_some());
    assert!(diags.is_empty());
}

#[test]
fn api_versions_bytes_with_short_length_prefix() {
    // The prefix declares 6 bytes, so the framer hands out only
    // api_key, api_version and half of the correlation id.
    let conn = ConnectionKey::new("c->s");
    let mut dissector = Dissector::default();

    let out = dissector.feed(
        &conn,
        Direction::Request,
        1,
        &[0x00, 0x00, 0x00, 0x06, 0x00, 0x12, 0x00, 0x02, 0x00, 0x00, 0x00, 0x07],
    );
    assert_eq!(out.messages.len(), 1);
    assert_eq!(out.messages[0].length, 6);
    assert!(out.messages[0].diagnostics.has_errors());
    assert_eq!(out.need_more, 2);
}

// ---------------------------------------------------------------
// Framing robustness
// ---------------------------------------------------------------

fn summary(messages: &[DecodedMessage]) -> Vec<(Option<i16>, Option<i32>, usize, usize)> {
    messages
        .iter()
        .map(|m| (m.api_key, m.correlation_id, m.fields.len(), m.diagnostics.len()))
        .collect()
}

#[test]
fn chunking_at_every_byte_offset_yields_identical_messages() {
    let batch = RecordBatchBuilder::new(0)
        .record(Some(b"k"), Some(b"v"))
        .build()
        .unwrap();

    let mut stream = Vec::new();
    stream.extend_from_slice(&request(18, 2, 1, &[]));
    stream.extend_from_slice(&request(3, 1, 2, &[0xFF, 0xFF, 0xFF, 0xFF]));
    stream.extend_from_slice(&request(0, 3, 3, &produce_body(&batch)));

    let conn = ConnectionKey::new("whole");
    let mut reference = Dissector::default();
    let expected = summary(&reference.feed(&conn, Direction::Request, 1, &stream).messages);
    assert_eq!(expected.len(), 3);

    for split in 0..=stream.len() {
        let conn = ConnectionKey::new(format!("split-{}", split));
        let mut dissector = Dissector::default();
        let mut messages = dissector
            .feed(&conn, Direction::Request, 1, &stream[..split])
            .messages;
        let tail = dissector.feed(&conn, Direction::Request, 2, &stream[split..]);
        messages.extend(tail.messages);

        assert_eq!(summary(&messages), expected, "split at {}", split);
        assert_eq!(tail.need_more, 4);
    }
}

#[test]
fn byte_at_a_time_feed() {
    let mut stream = Vec::new();
    stream.extend_from_slice(&request(18, 0, 1, &[]));
    stream.extend_from_slice(&request(18, 1, 2, &[]));

    let conn = ConnectionKey::new("c->s");
    let mut dissector = Dissector::default();
    let mut seen = Vec::new();
    for (frame, byte) in stream.iter().enumerate() {
        let out = dissector.feed(&conn, Direction::Request, frame as u64, &[*byte]);
        seen.extend(out.messages.into_iter().map(|m| m.correlation_id));
    }
    assert_eq!(seen, vec![Some(1), Some(2)]);
}

// ---------------------------------------------------------------
// Records inside messages
// ---------------------------------------------------------------

#[test]
fn produce_then_fetch_round_trip() {
    let conn = ConnectionKey::new("c->s");
    let mut dissector = Dissector::default();
    let batch = RecordBatchBuilder::new(7)
        .first_timestamp(1_700_000_000_000)
        .record_with_headers(Some(b"id"), Some(b"payload"), vec![("trace", Some(b"abc"))])
        .build()
        .unwrap();

    let produced = dissector.feed(&conn, Direction::Request, 1, &request(0, 3, 1, &produce_body(&batch)));
    assert!(produced.messages[0].diagnostics.is_empty());

    dissector.feed(&conn, Direction::Request, 2, &request(1, 4, 2, &[]));
    // Produce response first, then Fetch
    let mut produce_response = BytesMut::new();
    produce_response.put_i32(0);
    produce_response.put_i32(0);
    let out = dissector.feed(&conn, Direction::Response, 3, &response(1, &produce_response));
    assert_eq!(out.messages[0].api_name, Some("Produce"));

    let out = dissector.feed(&conn, Direction::Response, 4, &response(2, &fetch_response_v4(&batch)));
    let fetch = &out.messages[0];
    assert_eq!(fetch.api_name, Some("Fetch"));
    assert!(fetch.diagnostics.is_empty(), "{:?}", fetch.diagnostics);

    let topic = &fetch.field("responses").unwrap().as_array().unwrap()[0];
    let partition = &topic.get("partitions").unwrap().as_array().unwrap()[0];
    let set = partition.get("record_set").unwrap().as_records().unwrap();
    let RecordSetEntry::Batch(decoded) = &set.entries[0] else {
        panic!("expected batch");
    };
    assert_eq!(decoded.records[0].offset, 7);
    assert_eq!(decoded.records[0].headers[0].key.as_deref(), Some("trace"));
}

#[test]
fn record_checksum_diagnostic_carries_field_path() {
    let conn = ConnectionKey::new("c->s");
    let mut dissector = Dissector::default();
    let mut batch = RecordBatchBuilder::new(0)
        .record(None, Some(b"value"))
        .build()
        .unwrap()
        .to_vec();
    let last = batch.len() - 1;
    batch[last] ^= 0x01;

    dissector.feed(&conn, Direction::Request, 1, &request(1, 4, 9, &[]));
    let out = dissector.feed(&conn, Direction::Response, 2, &response(9, &fetch_response_v4(&batch)));
    let msg = &out.messages[0];

    let d = msg
        .diagnostics
        .iter()
        .find(|d| matches!(d.kind, DiagnosticKind::ChecksumMismatch { .. }))
        .unwrap();
    assert_eq!(d.severity, Severity::Warning);
    assert_eq!(d.field, "responses[0].partitions[0].record_set[0].crc");
}

// ---------------------------------------------------------------
// Registry diagnostics
// ---------------------------------------------------------------

#[test]
fn newer_version_is_flagged_but_still_decoded() {
    let conn = ConnectionKey::new("c->s");
    let mut dissector = Dissector::default();

    let mut body = BytesMut::new();
    encode_string(&mut body, "g");
    body.put_i32(3);
    encode_string(&mut body, "m");
    body.put_i16(-1);
    let out = dissector.feed(&conn, Direction::Request, 1, &request(12, 4, 1, &body));
    let msg = &out.messages[0];

    assert!(msg.diagnostics.any(|k| matches!(
        k,
        DiagnosticKind::UnsupportedVersion { version: 4, min: 0, max: 3 }
    )));
    assert_eq!(msg.field("generation_id"), Some(&FieldValue::Int(3)));
}

#[test]
fn unknown_api_key_keeps_raw_body() {
    let conn = ConnectionKey::new("c->s");
    let mut dissector = Dissector::default();

    let out = dissector.feed(&conn, Direction::Request, 1, &request(99, 0, 1, &[1, 2]));
    let msg = &out.messages[0];
    assert_eq!(msg.api_name, Some("Unknown"));
    assert_eq!(msg.raw_body.as_deref(), Some(&[1u8, 2][..]));
    assert_eq!(msg.diagnostics.len(), 1);
    assert!(msg
        .diagnostics
        .any(|k| matches!(k, DiagnosticKind::UnknownApiKey { api_key: 99 })));
}

#[test]
fn reassignment_apis_have_no_supported_version() {
    let conn = ConnectionKey::new("c->s");
    let mut dissector = Dissector::default();

    let out = dissector.feed(&conn, Direction::Request, 1, &request(45, 0, 1, &[]));
    let text: Vec<String> = out.messages[0]
        .diagnostics
        .iter()
        .map(|d| d.kind.to_string())
        .collect();
    assert!(text[0].ends_with("no known version is supported"));
}
