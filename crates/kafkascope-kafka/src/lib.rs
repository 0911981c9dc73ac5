//! # kafkascope Kafka protocol decoder
//!
//! Passive, best-effort decoding of captured Apache Kafka traffic. Nothing
//! here opens a socket or answers a request: a host feeds captured bytes per
//! connection and direction, and gets back decoded messages with every
//! structural problem attached as a diagnostic instead of an abort.
//!
//! ## Layers
//!
//! | Module | Role |
//! |--------|------|
//! | [`codec`] | Length-prefix framing, request/response headers |
//! | [`cursor`] | Primitive readers (fixed ints, strings, bytes, arrays, varints) |
//! | [`compression`] | gzip, snappy (raw and xerial), lz4 frame, zstd |
//! | [`records`] | Legacy message sets (magic 0/1) and record batches (magic 2) |
//! | [`registry`] | API key table with supported version windows |
//! | [`schema`] | Declarative per-API field layouts |
//! | [`correlator`] | FIFO request/response matching |
//! | [`dissector`] | Session tying the above together per connection |
//!
//! ## Usage
//!
//! ```rust,no_run
//! use kafkascope_kafka::{ConnectionKey, Direction, Dissector, DissectorConfig};
//!
//! let mut dissector = Dissector::new(DissectorConfig::default());
//! let conn = ConnectionKey::new("10.0.0.5:51234->10.0.0.9:9092");
//! let captured: &[u8] = &[0, 0, 0, 8, 0, 18, 0, 2, 0, 0, 0, 7];
//! let outcome = dissector.feed(&conn, Direction::Request, 1, captured);
//! for message in &outcome.messages {
//!     println!("{:?} {:?}", message.api_name, message.diagnostics);
//! }
//! ```

pub mod builder;
pub mod codec;
pub mod compression;
pub mod correlator;
pub mod cursor;
pub mod diagnostics;
pub mod dissector;
pub mod error;
pub mod records;
pub mod registry;
pub mod schema;
pub mod types;

pub use codec::{FrameStatus, KafkaCodec, RequestHeader, ResponseHeader, StreamFramer};
pub use correlator::{ConnectionMatchQueue, ExchangeId, FrameId, MessageRef, PendingExchange};
pub use cursor::{ArrayValue, DecodeCursor};
pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, Diagnostics, Severity};
pub use dissector::{ConnectionKey, DecodedMessage, Dissector, DissectorConfig, FeedOutcome};
pub use error::{ErrorCode, KafkaError, KafkaResult};
pub use records::{decode_record_set, RecordOptions, RecordSet, RecordSetEntry};
pub use registry::ApiDescriptor;
pub use types::{ApiKey, CompressionType, Direction};
