//! Decoder Benchmarks
//!
//! ## What We Benchmark
//!
//! ### 1. Record set decoding (`bench_record_set`)
//! - v2 batches of 100 and 1K records
//! - Uncompressed against every codec
//!
//! ### 2. Stream dissection (`bench_dissector_feed`)
//! - A captured Produce stream fed in 1460-byte segments
//! - Measures framing, header parsing and body decoding together
//!
//! ## Running Benchmarks
//!
//! ```bash
//! cargo bench -p kafkascope-kafka
//! cargo bench -p kafkascope-kafka --bench record_set_bench record_set
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use kafkascope_kafka::builder::RecordBatchBuilder;
use kafkascope_kafka::codec::{encode_nullable_string, encode_string, frame, RequestHeader};
use kafkascope_kafka::{
    decode_record_set, CompressionType, ConnectionKey, Diagnostics, Direction, Dissector,
    RecordOptions,
};

fn build_batch(record_count: usize, codec: CompressionType) -> Bytes {
    let value = vec![b'x'; 256];
    let mut builder = RecordBatchBuilder::new(0)
        .first_timestamp(1_700_000_000_000)
        .compression(codec);
    for i in 0..record_count {
        let key = format!("key{}", i);
        builder = builder.record(Some(key.as_bytes()), Some(&value));
    }
    builder.build().unwrap()
}

fn produce_request(correlation_id: i32, batch: &[u8]) -> Bytes {
    let mut buf = BytesMut::new();
    RequestHeader {
        api_key: 0,
        api_version: 3,
        correlation_id,
        client_id: Some("bench".to_string()),
    }
    .encode(&mut buf);
    encode_nullable_string(&mut buf, None);
    buf.put_i16(1);
    buf.put_i32(30_000);
    buf.put_i32(1);
    encode_string(&mut buf, "bench");
    buf.put_i32(1);
    buf.put_i32(0);
    buf.put_i32(batch.len() as i32);
    buf.put_slice(batch);
    frame(&buf)
}

fn bench_record_set(c: &mut Criterion) {
    let mut group = c.benchmark_group("record_set");
    let options = RecordOptions::default();

    for record_count in [100usize, 1000] {
        for codec in [
            CompressionType::None,
            CompressionType::Gzip,
            CompressionType::Snappy,
            CompressionType::Lz4,
            CompressionType::Zstd,
        ] {
            let batch = build_batch(record_count, codec);
            group.throughput(Throughput::Elements(record_count as u64));
            group.bench_with_input(
                BenchmarkId::new(format!("{:?}", codec).to_lowercase(), record_count),
                &batch,
                |b, batch| {
                    b.iter(|| {
                        let mut diags = Diagnostics::new();
                        let set = decode_record_set(batch.clone(), &options, "records", &mut diags);
                        black_box(set.record_count());
                    });
                },
            );
        }
    }

    group.finish();
}

fn bench_dissector_feed(c: &mut Criterion) {
    let mut group = c.benchmark_group("dissector_feed");

    let batch = build_batch(100, CompressionType::Lz4);
    let mut stream = Vec::new();
    for correlation_id in 0..50 {
        stream.extend_from_slice(&produce_request(correlation_id, &batch));
    }

    group.throughput(Throughput::Bytes(stream.len() as u64));
    group.bench_function("produce_stream", |b| {
        b.iter(|| {
            let mut dissector = Dissector::default();
            let conn = ConnectionKey::new("bench");
            let mut messages = 0;
            for (frame, segment) in stream.chunks(1460).enumerate() {
                let out = dissector.feed(&conn, Direction::Request, frame as u64, segment);
                messages += out.messages.len();
            }
            black_box(messages);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_record_set, bench_dissector_feed);
criterion_main!(benches);
