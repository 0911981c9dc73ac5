#![no_main]

use bytes::Bytes;
use kafkascope_kafka::{decode_record_set, Diagnostics, RecordOptions};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Legacy message sets and v2 batches, including nested compressed
    // wrappers; the size cap keeps decompression bombs bounded.
    let options = RecordOptions {
        max_decompressed_size: 1 << 22,
        ..RecordOptions::default()
    };
    let mut diags = Diagnostics::new();
    let set = decode_record_set(Bytes::copy_from_slice(data), &options, "records", &mut diags);
    let _ = set.record_count();
});
