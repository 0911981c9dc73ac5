use super::{FieldKind, FieldSpec};

const REQUEST_PARTITION: &[FieldSpec] = &[
    FieldSpec::new("partition", FieldKind::Int32),
    FieldSpec::new("current_leader_epoch", FieldKind::Int32).since(9),
    FieldSpec::new("fetch_offset", FieldKind::Int64),
    FieldSpec::new("log_start_offset", FieldKind::Int64).since(5),
    FieldSpec::new("partition_max_bytes", FieldKind::Int32),
];

const REQUEST_TOPIC: &[FieldSpec] = &[
    FieldSpec::new("topic", FieldKind::String),
    FieldSpec::new("partitions", FieldKind::Structs(REQUEST_PARTITION)),
];

const FORGOTTEN_TOPIC: &[FieldSpec] = &[
    FieldSpec::new("topic", FieldKind::String),
    FieldSpec::new("partitions", FieldKind::Array(&FieldKind::Int32)),
];

pub(super) const REQUEST: &[FieldSpec] = &[
    FieldSpec::new("replica_id", FieldKind::Int32),
    FieldSpec::new("max_wait_ms", FieldKind::Int32),
    FieldSpec::new("min_bytes", FieldKind::Int32),
    FieldSpec::new("max_bytes", FieldKind::Int32).since(3),
    FieldSpec::new("isolation_level", FieldKind::Int8).since(4),
    FieldSpec::new("session_id", FieldKind::Int32).since(7),
    FieldSpec::new("session_epoch", FieldKind::Int32).since(7),
    FieldSpec::new("topics", FieldKind::Structs(REQUEST_TOPIC)),
    FieldSpec::new("forgotten_topics_data", FieldKind::Structs(FORGOTTEN_TOPIC)).since(7),
    FieldSpec::new("rack_id", FieldKind::String).since(11),
];

const ABORTED_TRANSACTION: &[FieldSpec] = &[
    FieldSpec::new("producer_id", FieldKind::Int64),
    FieldSpec::new("first_offset", FieldKind::Int64),
];

const RESPONSE_PARTITION: &[FieldSpec] = &[
    FieldSpec::new("partition", FieldKind::Int32),
    FieldSpec::new("error_code", FieldKind::ErrorCode),
    FieldSpec::new("high_watermark", FieldKind::Int64),
    FieldSpec::new("last_stable_offset", FieldKind::Int64).since(4),
    FieldSpec::new("log_start_offset", FieldKind::Int64).since(5),
    FieldSpec::new("aborted_transactions", FieldKind::Structs(ABORTED_TRANSACTION)).since(4),
    FieldSpec::new("preferred_read_replica", FieldKind::Int32).since(11),
    FieldSpec::new("record_set", FieldKind::Records),
];

const RESPONSE_TOPIC: &[FieldSpec] = &[
    FieldSpec::new("topic", FieldKind::String),
    FieldSpec::new("partitions", FieldKind::Structs(RESPONSE_PARTITION)),
];

pub(super) const RESPONSE: &[FieldSpec] = &[
    FieldSpec::new("throttle_time_ms", FieldKind::Int32).since(1),
    FieldSpec::new("error_code", FieldKind::ErrorCode).since(7),
    FieldSpec::new("session_id", FieldKind::Int32).since(7),
    FieldSpec::new("responses", FieldKind::Structs(RESPONSE_TOPIC)),
];
