//! # kafkascope-core
//!
//! Low-level encodings shared by the kafkascope protocol decoder.
//!
//! The Kafka record format (magic 2) and the zig-zag length prefixes of its
//! keys, values and headers are all Protobuf-style varints. This crate holds
//! the codec for them so the decoder crates and the test fixtures agree on a
//! single implementation.

pub mod error;
pub mod varint;

pub use error::{Error, Result};
