//! Error Types for kafkascope-core
//!
//! Only the strict, `Buf`-driven varint API can fail. The slice-based readers
//! used by the protocol decoder never fail; they report a consumed width of
//! zero instead and let the caller decide how to resynchronize.
//!
//! ## Example
//! ```ignore
//! use kafkascope_core::{varint, Error};
//!
//! let mut src: &[u8] = &[0x80, 0x80];
//! match varint::decode_varint(&mut src) {
//!     Err(Error::VarintTruncated { .. }) => { /* need more bytes */ }
//!     other => println!("{other:?}"),
//! }
//! ```

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Varint truncated after {read} bytes")]
    VarintTruncated { read: usize },

    #[error("Varint too long: more than {max_len} bytes")]
    VarintTooLong { max_len: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
