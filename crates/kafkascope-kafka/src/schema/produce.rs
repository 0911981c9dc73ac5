use super::{FieldKind, FieldSpec};

const REQUEST_PARTITION: &[FieldSpec] = &[
    FieldSpec::new("partition", FieldKind::Int32),
    FieldSpec::new("record_set", FieldKind::Records),
];

const REQUEST_TOPIC: &[FieldSpec] = &[
    FieldSpec::new("topic", FieldKind::String),
    FieldSpec::new("partitions", FieldKind::Structs(REQUEST_PARTITION)),
];

pub(super) const REQUEST: &[FieldSpec] = &[
    FieldSpec::new("transactional_id", FieldKind::NullableString).since(3),
    FieldSpec::new("acks", FieldKind::Int16),
    FieldSpec::new("timeout_ms", FieldKind::Int32),
    FieldSpec::new("topics", FieldKind::Structs(REQUEST_TOPIC)),
];

const RESPONSE_PARTITION: &[FieldSpec] = &[
    FieldSpec::new("partition", FieldKind::Int32),
    FieldSpec::new("error_code", FieldKind::ErrorCode),
    FieldSpec::new("base_offset", FieldKind::Int64),
    FieldSpec::new("log_append_time", FieldKind::Int64).since(2),
    FieldSpec::new("log_start_offset", FieldKind::Int64).since(5),
];

const RESPONSE_TOPIC: &[FieldSpec] = &[
    FieldSpec::new("topic", FieldKind::String),
    FieldSpec::new("partitions", FieldKind::Structs(RESPONSE_PARTITION)),
];

pub(super) const RESPONSE: &[FieldSpec] = &[
    FieldSpec::new("responses", FieldKind::Structs(RESPONSE_TOPIC)),
    FieldSpec::new("throttle_time_ms", FieldKind::Int32).since(1),
];
