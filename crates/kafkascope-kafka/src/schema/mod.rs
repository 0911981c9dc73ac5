//! Declarative per-API field layouts
//!
//! Every request and response body is a fixed sequence of typed fields, each
//! present only for a window of API versions. A layout is a static slice of
//! [`FieldSpec`]s evaluated in order against the message's version by one
//! shared engine; the per-API modules hold nothing but data.
//!
//! ```ignore
//! const PARTITION: &[FieldSpec] = &[
//!     FieldSpec::new("partition", FieldKind::Int32),
//!     FieldSpec::new("current_leader_epoch", FieldKind::Int32).since(9),
//! ];
//! ```
//!
//! Versions newer than a layout was written for still decode: every field
//! whose window is open-ended applies, which is right for additive bumps.

mod admin;
mod fetch;
mod groups;
mod metadata;
mod offsets;
mod produce;

use bytes::Bytes;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::cursor::{ArrayValue, DecodeCursor};
use crate::diagnostics::{DiagnosticKind, DiagnosticSink, Severity};
use crate::error::{error_code_text, KafkaResult};
use crate::records::{decode_record_set, RecordOptions, RecordSet};
use crate::registry;
use crate::types::{ApiKey, Direction};

/// Wire type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Int8,
    Int16,
    Int32,
    Int64,
    Bool,
    /// i16 broker error code.
    ErrorCode,
    /// i16 API key.
    ApiKey,
    String,
    NullableString,
    Bytes,
    NullableBytes,
    /// i32-length record set.
    Records,
    /// Array of a scalar kind.
    Array(&'static FieldKind),
    /// Array of structs.
    Structs(&'static [FieldSpec]),
    /// Inline group of fields.
    Struct(&'static [FieldSpec]),
}

/// One version-gated field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub min_version: i16,
    pub max_version: i16,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            min_version: 0,
            max_version: i16::MAX,
            kind,
        }
    }

    /// Present from `version` on.
    pub const fn since(mut self, version: i16) -> Self {
        self.min_version = version;
        self
    }

    /// Absent after `version`.
    pub const fn until(mut self, version: i16) -> Self {
        self.max_version = version;
        self
    }

    pub fn applies(&self, version: i16) -> bool {
        self.min_version <= version && version <= self.max_version
    }
}

/// A decoded value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i64),
    Bool(bool),
    ErrorCode(i16),
    ApiKey(i16),
    String(Option<String>),
    Bytes(Option<Bytes>),
    /// `None` for a null or malformed array.
    Array(Option<Vec<FieldValue>>),
    Struct(Vec<DecodedField>),
    Records(RecordSet),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedField {
    pub name: &'static str,
    pub value: FieldValue,
}

impl FieldValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(v) => Some(*v),
            FieldValue::ErrorCode(v) | FieldValue::ApiKey(v) => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(Some(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::Array(Some(items)) => Some(items),
            _ => None,
        }
    }

    pub fn as_records(&self) -> Option<&RecordSet> {
        match self {
            FieldValue::Records(set) => Some(set),
            _ => None,
        }
    }

    /// Field named `name` of a struct value.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        match self {
            FieldValue::Struct(fields) => find(fields, name),
            _ => None,
        }
    }
}

/// First field named `name`.
pub fn find<'a>(fields: &'a [DecodedField], name: &str) -> Option<&'a FieldValue> {
    fields.iter().find(|f| f.name == name).map(|f| &f.value)
}

struct FieldMap<'a>(&'a [DecodedField]);

impl Serialize for FieldMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for field in self.0 {
            map.serialize_entry(field.name, &field.value)?;
        }
        map.end()
    }
}

/// Serialize a field list as a JSON-style object.
pub fn serialize_fields<S: Serializer>(
    fields: &[DecodedField],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    FieldMap(fields).serialize(serializer)
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Int(v) => serializer.serialize_i64(*v),
            FieldValue::Bool(v) => serializer.serialize_bool(*v),
            FieldValue::ErrorCode(code) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("code", code)?;
                map.serialize_entry("text", &error_code_text(*code))?;
                map.end()
            }
            FieldValue::ApiKey(key) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("key", key)?;
                map.serialize_entry("name", registry::api_name(*key))?;
                map.end()
            }
            FieldValue::String(v) => v.serialize(serializer),
            FieldValue::Bytes(v) => match v {
                Some(bytes) => serializer.serialize_str(&hex::encode(bytes)),
                None => serializer.serialize_none(),
            },
            FieldValue::Array(None) => serializer.serialize_none(),
            FieldValue::Array(Some(items)) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            FieldValue::Struct(fields) => FieldMap(fields).serialize(serializer),
            FieldValue::Records(set) => set.serialize(serializer),
        }
    }
}

/// Layout for one direction of an API, if one is shipped.
pub fn layout(api_key: i16, direction: Direction) -> Option<&'static [FieldSpec]> {
    let api = ApiKey::from_i16(api_key)?;
    let (request, response) = match api {
        ApiKey::Produce => (produce::REQUEST, produce::RESPONSE),
        ApiKey::Fetch => (fetch::REQUEST, fetch::RESPONSE),
        ApiKey::ListOffsets => (offsets::LIST_OFFSETS_REQUEST, offsets::LIST_OFFSETS_RESPONSE),
        ApiKey::Metadata => (metadata::REQUEST, metadata::RESPONSE),
        ApiKey::OffsetCommit => (offsets::OFFSET_COMMIT_REQUEST, offsets::OFFSET_COMMIT_RESPONSE),
        ApiKey::OffsetFetch => (offsets::OFFSET_FETCH_REQUEST, offsets::OFFSET_FETCH_RESPONSE),
        ApiKey::FindCoordinator => (
            groups::FIND_COORDINATOR_REQUEST,
            groups::FIND_COORDINATOR_RESPONSE,
        ),
        ApiKey::Heartbeat => (groups::HEARTBEAT_REQUEST, groups::HEARTBEAT_RESPONSE),
        ApiKey::LeaveGroup => (groups::LEAVE_GROUP_REQUEST, groups::LEAVE_GROUP_RESPONSE),
        ApiKey::ListGroups => (groups::LIST_GROUPS_REQUEST, groups::LIST_GROUPS_RESPONSE),
        ApiKey::SaslHandshake => (admin::SASL_HANDSHAKE_REQUEST, admin::SASL_HANDSHAKE_RESPONSE),
        ApiKey::ApiVersions => (metadata::API_VERSIONS_REQUEST, metadata::API_VERSIONS_RESPONSE),
        ApiKey::DeleteTopics => (admin::DELETE_TOPICS_REQUEST, admin::DELETE_TOPICS_RESPONSE),
        ApiKey::InitProducerId => (
            admin::INIT_PRODUCER_ID_REQUEST,
            admin::INIT_PRODUCER_ID_RESPONSE,
        ),
        _ => return None,
    };
    Some(match direction {
        Direction::Request => request,
        Direction::Response => response,
    })
}

fn join(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", path, name)
    }
}

/// Decode a message body against `layout`.
///
/// Fields decoded before a truncation are kept; the truncation itself and
/// any bytes left after the last field are reported.
pub fn decode_body(
    cursor: &mut DecodeCursor,
    layout: &[FieldSpec],
    version: i16,
    options: &RecordOptions,
    sink: &mut dyn DiagnosticSink,
) -> Vec<DecodedField> {
    let mut fields = Vec::with_capacity(layout.len());
    match decode_fields(cursor, layout, version, options, "", sink, &mut fields) {
        Ok(()) => {
            if !cursor.is_empty() {
                sink.report(
                    Severity::Warning,
                    "body",
                    cursor.position(),
                    DiagnosticKind::TrailingBytes {
                        count: cursor.remaining(),
                    },
                );
            }
        }
        Err(err) => sink.report(Severity::Error, "body", cursor.position(), (&err).into()),
    }
    fields
}

fn decode_fields(
    cursor: &mut DecodeCursor,
    layout: &[FieldSpec],
    version: i16,
    options: &RecordOptions,
    path: &str,
    sink: &mut dyn DiagnosticSink,
    out: &mut Vec<DecodedField>,
) -> KafkaResult<()> {
    for spec in layout.iter().filter(|spec| spec.applies(version)) {
        let field_path = join(path, spec.name);
        let value = decode_value(cursor, &spec.kind, version, options, &field_path, sink)?;
        out.push(DecodedField {
            name: spec.name,
            value,
        });
    }
    Ok(())
}

fn decode_value(
    cursor: &mut DecodeCursor,
    kind: &FieldKind,
    version: i16,
    options: &RecordOptions,
    path: &str,
    sink: &mut dyn DiagnosticSink,
) -> KafkaResult<FieldValue> {
    Ok(match kind {
        FieldKind::Int8 => FieldValue::Int(cursor.read_i8()? as i64),
        FieldKind::Int16 => FieldValue::Int(cursor.read_i16()? as i64),
        FieldKind::Int32 => FieldValue::Int(cursor.read_i32()? as i64),
        FieldKind::Int64 => FieldValue::Int(cursor.read_i64()?),
        FieldKind::Bool => FieldValue::Bool(cursor.read_bool()?),
        FieldKind::ErrorCode => FieldValue::ErrorCode(cursor.read_i16()?),
        FieldKind::ApiKey => FieldValue::ApiKey(cursor.read_i16()?),
        FieldKind::String | FieldKind::NullableString => {
            FieldValue::String(cursor.read_legacy_string(sink, path)?)
        }
        FieldKind::Bytes | FieldKind::NullableBytes => {
            FieldValue::Bytes(cursor.read_legacy_bytes(sink, path)?)
        }
        FieldKind::Records => match cursor.read_legacy_bytes(sink, path)? {
            Some(data) => FieldValue::Records(decode_record_set(data, options, path, sink)),
            None => FieldValue::Bytes(None),
        },
        FieldKind::Array(element) => {
            let items = cursor.read_array(sink, path, version, |cursor, sink, version, index| {
                let item_path = format!("{}[{}]", path, index);
                decode_value(cursor, element, version, options, &item_path, sink)
            })?;
            array_value(items)
        }
        FieldKind::Structs(layout) => {
            let items = cursor.read_array(sink, path, version, |cursor, sink, version, index| {
                let item_path = format!("{}[{}]", path, index);
                let mut fields = Vec::with_capacity(layout.len());
                decode_fields(cursor, layout, version, options, &item_path, sink, &mut fields)?;
                Ok(FieldValue::Struct(fields))
            })?;
            array_value(items)
        }
        FieldKind::Struct(layout) => {
            let mut fields = Vec::with_capacity(layout.len());
            decode_fields(cursor, layout, version, options, path, sink, &mut fields)?;
            FieldValue::Struct(fields)
        }
    })
}

fn array_value(items: ArrayValue<FieldValue>) -> FieldValue {
    match items {
        ArrayValue::Elements(elements) => FieldValue::Array(Some(elements)),
        ArrayValue::Null | ArrayValue::BadLength(_) => FieldValue::Array(None),
    }
}
