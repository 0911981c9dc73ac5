use super::{FieldKind, FieldSpec};

pub(super) const SASL_HANDSHAKE_REQUEST: &[FieldSpec] =
    &[FieldSpec::new("mechanism", FieldKind::String)];

pub(super) const SASL_HANDSHAKE_RESPONSE: &[FieldSpec] = &[
    FieldSpec::new("error_code", FieldKind::ErrorCode),
    FieldSpec::new("mechanisms", FieldKind::Array(&FieldKind::String)),
];

pub(super) const DELETE_TOPICS_REQUEST: &[FieldSpec] = &[
    FieldSpec::new("topic_names", FieldKind::Array(&FieldKind::String)),
    FieldSpec::new("timeout_ms", FieldKind::Int32),
];

const DELETABLE_TOPIC_RESULT: &[FieldSpec] = &[
    FieldSpec::new("name", FieldKind::String),
    FieldSpec::new("error_code", FieldKind::ErrorCode),
];

pub(super) const DELETE_TOPICS_RESPONSE: &[FieldSpec] = &[
    FieldSpec::new("throttle_time_ms", FieldKind::Int32).since(1),
    FieldSpec::new("responses", FieldKind::Structs(DELETABLE_TOPIC_RESULT)),
];

pub(super) const INIT_PRODUCER_ID_REQUEST: &[FieldSpec] = &[
    FieldSpec::new("transactional_id", FieldKind::NullableString),
    FieldSpec::new("transaction_timeout_ms", FieldKind::Int32),
];

pub(super) const INIT_PRODUCER_ID_RESPONSE: &[FieldSpec] = &[
    FieldSpec::new("throttle_time_ms", FieldKind::Int32),
    FieldSpec::new("error_code", FieldKind::ErrorCode),
    FieldSpec::new("producer_id", FieldKind::Int64),
    FieldSpec::new("producer_epoch", FieldKind::Int16),
];
