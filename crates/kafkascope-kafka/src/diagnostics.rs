//! Soft decode diagnostics
//!
//! Malformed input never aborts a decode. Every reader that hits a structural
//! problem reports it to a [`DiagnosticSink`], degrades the offending field to
//! its most conservative interpretation and keeps going. The decoded value and
//! the accumulated [`Diagnostics`] are returned side by side.

use serde::Serialize;
use std::fmt;
use tracing::debug;

use crate::error::KafkaError;
use crate::types::CompressionType;

/// How bad a reported condition is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Note,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Note => write!(f, "note"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// What went wrong.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A length or count below -1.
    MalformedLength { length: i64 },
    /// A varint with no terminating byte inside its maximum width.
    MalformedVarint { fallback_width: usize },
    /// An array count of -1.
    NullArray,
    UnknownApiKey { api_key: i16 },
    UnsupportedVersion { version: i16, min: i16, max: i16 },
    UnknownMagic { magic: i8 },
    DecompressionFailed {
        codec: CompressionType,
        reason: String,
    },
    UnknownCodec { id: u8 },
    ResponseWithoutRequest,
    /// A v2 record whose declared length cannot hold its fixed fields.
    RecordTooShort { length: i64 },
    /// A v2 record whose fields did not end on its declared boundary.
    RecordLengthMismatch { declared: usize, consumed: usize },
    RecordCountMismatch { declared: i32, decoded: usize },
    /// A decompressed message set whose contents did not fill it exactly.
    MessageSizeMismatch { declared: usize, consumed: usize },
    ChecksumMismatch { stored: u32, computed: u32 },
    NestingTooDeep { depth: usize },
    Truncated { needed: usize, available: usize },
    TrailingBytes { count: usize },
    /// The last entry of a record set runs past the set.
    PartialMessage { declared: usize, available: usize },
    InvalidUtf8,
    NoFieldLayout { api_name: String },
    /// Any other structural failure.
    Malformed { reason: String },
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::MalformedLength { length } => {
                write!(f, "Invalid negative length {}", length)
            }
            DiagnosticKind::MalformedVarint { fallback_width } => write!(
                f,
                "Invalid varint, skipping {} bytes",
                fallback_width
            ),
            DiagnosticKind::NullArray => write!(f, "Null array"),
            DiagnosticKind::UnknownApiKey { api_key } => {
                write!(f, "Unknown API key {}", api_key)
            }
            DiagnosticKind::UnsupportedVersion { version, min, max } => {
                write!(f, "Unsupported version {}: ", version)?;
                if *min == -1 {
                    write!(f, "no known version is supported")
                } else if min == max {
                    write!(f, "supports v{}", min)
                } else {
                    write!(f, "supports v{}-v{}", min, max)
                }
            }
            DiagnosticKind::UnknownMagic { magic } => {
                write!(f, "Unknown message magic {}", magic)
            }
            DiagnosticKind::DecompressionFailed { codec, reason } => write!(
                f,
                "Unable to decompress {} records: {}",
                codec.name(),
                reason
            ),
            DiagnosticKind::UnknownCodec { id } => write!(f, "Unknown compression codec {}", id),
            DiagnosticKind::ResponseWithoutRequest => {
                write!(f, "Response with no matching request")
            }
            DiagnosticKind::RecordTooShort { length } => {
                write!(f, "Record length {} is too short", length)
            }
            DiagnosticKind::RecordLengthMismatch { declared, consumed } => write!(
                f,
                "Record declared {} bytes but {} were decoded",
                declared, consumed
            ),
            DiagnosticKind::RecordCountMismatch { declared, decoded } => write!(
                f,
                "Batch declared {} records but {} were decoded",
                declared, decoded
            ),
            DiagnosticKind::MessageSizeMismatch { declared, consumed } => write!(
                f,
                "Message set of {} bytes, {} consumed",
                declared, consumed
            ),
            DiagnosticKind::ChecksumMismatch { stored, computed } => write!(
                f,
                "Checksum mismatch: stored 0x{:08x}, computed 0x{:08x}",
                stored, computed
            ),
            DiagnosticKind::NestingTooDeep { depth } => {
                write!(f, "Nested message sets deeper than {}", depth)
            }
            DiagnosticKind::Truncated { needed, available } => write!(
                f,
                "Truncated: needed {} bytes, {} available",
                needed, available
            ),
            DiagnosticKind::TrailingBytes { count } => {
                write!(f, "{} trailing bytes not decoded", count)
            }
            DiagnosticKind::PartialMessage {
                declared,
                available,
            } => write!(
                f,
                "Partial trailing message: {} bytes declared, {} available",
                declared, available
            ),
            DiagnosticKind::InvalidUtf8 => write!(f, "String is not valid UTF-8"),
            DiagnosticKind::NoFieldLayout { api_name } => {
                write!(f, "No field layout for {}", api_name)
            }
            DiagnosticKind::Malformed { reason } => write!(f, "Malformed: {}", reason),
        }
    }
}

impl From<&KafkaError> for DiagnosticKind {
    fn from(err: &KafkaError) -> Self {
        match err {
            KafkaError::Truncated { needed, available } => DiagnosticKind::Truncated {
                needed: *needed,
                available: *available,
            },
            other => DiagnosticKind::Malformed {
                reason: other.to_string(),
            },
        }
    }
}

/// A single reported condition, attached to the field it concerns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path of the field, e.g. `topics[0].partitions[2].record_set`.
    pub field: String,
    /// Byte offset inside the buffer being decoded.
    pub offset: usize,
    #[serde(flatten)]
    pub kind: DiagnosticKind,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {} (+{}): {}",
            self.severity, self.field, self.offset, self.kind
        )
    }
}

/// Receiver of malformed-input reports.
pub trait DiagnosticSink {
    fn report(&mut self, severity: Severity, field: &str, offset: usize, kind: DiagnosticKind);
}

/// Ordered collection of diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.entries.iter()
    }

    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|d| d.severity == Severity::Error)
    }

    /// True if any entry satisfies `predicate`.
    pub fn any(&self, predicate: impl Fn(&DiagnosticKind) -> bool) -> bool {
        self.entries.iter().any(|d| predicate(&d.kind))
    }

    /// Move every entry of `other` into `self`, shifting offsets by `base`
    /// and prefixing field paths with `prefix`.
    pub fn absorb(&mut self, other: Diagnostics, prefix: &str, base: usize) {
        for mut diagnostic in other.entries {
            if !prefix.is_empty() {
                diagnostic.field = format!("{}.{}", prefix, diagnostic.field);
            }
            diagnostic.offset += base;
            self.entries.push(diagnostic);
        }
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }

    /// Re-report every entry to `sink`, shifting offsets by `base`.
    pub fn replay_into(self, sink: &mut dyn DiagnosticSink, base: usize) {
        for diagnostic in self.entries {
            sink.report(
                diagnostic.severity,
                &diagnostic.field,
                diagnostic.offset + base,
                diagnostic.kind,
            );
        }
    }
}

impl DiagnosticSink for Diagnostics {
    fn report(&mut self, severity: Severity, field: &str, offset: usize, kind: DiagnosticKind) {
        debug!(%severity, field, offset, "{}", kind);
        self.entries.push(Diagnostic {
            severity,
            field: field.to_string(),
            offset,
            kind,
        });
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_version_texts() {
        let none = DiagnosticKind::UnsupportedVersion {
            version: 0,
            min: -1,
            max: -1,
        };
        assert!(none.to_string().ends_with("no known version is supported"));

        let single = DiagnosticKind::UnsupportedVersion {
            version: 3,
            min: 0,
            max: 0,
        };
        assert!(single.to_string().ends_with("supports v0"));

        let range = DiagnosticKind::UnsupportedVersion {
            version: 9,
            min: 0,
            max: 7,
        };
        assert!(range.to_string().ends_with("supports v0-v7"));
    }

    #[test]
    fn test_sink_records_in_order() {
        let mut diags = Diagnostics::new();
        diags.report(Severity::Note, "topics", 4, DiagnosticKind::NullArray);
        diags.report(
            Severity::Error,
            "client_id",
            8,
            DiagnosticKind::MalformedLength { length: -4 },
        );

        assert_eq!(diags.len(), 2);
        assert!(diags.has_errors());
        let fields: Vec<_> = diags.iter().map(|d| d.field.as_str()).collect();
        assert_eq!(fields, vec!["topics", "client_id"]);
    }

    #[test]
    fn test_absorb_prefixes_and_shifts() {
        let mut inner = Diagnostics::new();
        inner.report(Severity::Warning, "crc", 3, DiagnosticKind::InvalidUtf8);

        let mut outer = Diagnostics::new();
        outer.absorb(inner, "records", 100);

        let d = outer.iter().next().unwrap();
        assert_eq!(d.field, "records.crc");
        assert_eq!(d.offset, 103);
    }

    #[test]
    fn test_diagnostic_serializes_flat() {
        let mut diags = Diagnostics::new();
        diags.report(
            Severity::Warning,
            "batch.crc",
            17,
            DiagnosticKind::ChecksumMismatch {
                stored: 1,
                computed: 2,
            },
        );
        let json = serde_json::to_value(&diags).unwrap();
        assert_eq!(json[0]["severity"], "warning");
        assert_eq!(json[0]["kind"], "checksum_mismatch");
        assert_eq!(json[0]["stored"], 1);
    }
}
