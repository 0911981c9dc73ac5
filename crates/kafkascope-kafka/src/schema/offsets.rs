//! ListOffsets, OffsetCommit and OffsetFetch.

use super::{FieldKind, FieldSpec};

const LIST_REQUEST_PARTITION: &[FieldSpec] = &[
    FieldSpec::new("partition", FieldKind::Int32),
    FieldSpec::new("current_leader_epoch", FieldKind::Int32).since(4),
    FieldSpec::new("timestamp", FieldKind::Int64),
    FieldSpec::new("max_num_offsets", FieldKind::Int32).until(0),
];

const LIST_REQUEST_TOPIC: &[FieldSpec] = &[
    FieldSpec::new("topic", FieldKind::String),
    FieldSpec::new("partitions", FieldKind::Structs(LIST_REQUEST_PARTITION)),
];

pub(super) const LIST_OFFSETS_REQUEST: &[FieldSpec] = &[
    FieldSpec::new("replica_id", FieldKind::Int32),
    FieldSpec::new("isolation_level", FieldKind::Int8).since(2),
    FieldSpec::new("topics", FieldKind::Structs(LIST_REQUEST_TOPIC)),
];

const LIST_RESPONSE_PARTITION: &[FieldSpec] = &[
    FieldSpec::new("partition", FieldKind::Int32),
    FieldSpec::new("error_code", FieldKind::ErrorCode),
    FieldSpec::new("old_style_offsets", FieldKind::Array(&FieldKind::Int64)).until(0),
    FieldSpec::new("timestamp", FieldKind::Int64).since(1),
    FieldSpec::new("offset", FieldKind::Int64).since(1),
    FieldSpec::new("leader_epoch", FieldKind::Int32).since(4),
];

const LIST_RESPONSE_TOPIC: &[FieldSpec] = &[
    FieldSpec::new("topic", FieldKind::String),
    FieldSpec::new("partitions", FieldKind::Structs(LIST_RESPONSE_PARTITION)),
];

pub(super) const LIST_OFFSETS_RESPONSE: &[FieldSpec] = &[
    FieldSpec::new("throttle_time_ms", FieldKind::Int32).since(2),
    FieldSpec::new("responses", FieldKind::Structs(LIST_RESPONSE_TOPIC)),
];

const COMMIT_REQUEST_PARTITION: &[FieldSpec] = &[
    FieldSpec::new("partition_index", FieldKind::Int32),
    FieldSpec::new("committed_offset", FieldKind::Int64),
    FieldSpec::new("committed_leader_epoch", FieldKind::Int32).since(6),
    FieldSpec::new("commit_timestamp", FieldKind::Int64).since(1).until(1),
    FieldSpec::new("committed_metadata", FieldKind::NullableString),
];

const COMMIT_REQUEST_TOPIC: &[FieldSpec] = &[
    FieldSpec::new("name", FieldKind::String),
    FieldSpec::new("partitions", FieldKind::Structs(COMMIT_REQUEST_PARTITION)),
];

pub(super) const OFFSET_COMMIT_REQUEST: &[FieldSpec] = &[
    FieldSpec::new("group_id", FieldKind::String),
    FieldSpec::new("generation_id", FieldKind::Int32).since(1),
    FieldSpec::new("member_id", FieldKind::String).since(1),
    FieldSpec::new("group_instance_id", FieldKind::NullableString).since(7),
    FieldSpec::new("retention_time_ms", FieldKind::Int64).since(2).until(4),
    FieldSpec::new("topics", FieldKind::Structs(COMMIT_REQUEST_TOPIC)),
];

const COMMIT_RESPONSE_PARTITION: &[FieldSpec] = &[
    FieldSpec::new("partition_index", FieldKind::Int32),
    FieldSpec::new("error_code", FieldKind::ErrorCode),
];

const COMMIT_RESPONSE_TOPIC: &[FieldSpec] = &[
    FieldSpec::new("name", FieldKind::String),
    FieldSpec::new("partitions", FieldKind::Structs(COMMIT_RESPONSE_PARTITION)),
];

pub(super) const OFFSET_COMMIT_RESPONSE: &[FieldSpec] = &[
    FieldSpec::new("throttle_time_ms", FieldKind::Int32).since(3),
    FieldSpec::new("topics", FieldKind::Structs(COMMIT_RESPONSE_TOPIC)),
];

const FETCH_REQUEST_TOPIC: &[FieldSpec] = &[
    FieldSpec::new("name", FieldKind::String),
    FieldSpec::new("partition_indexes", FieldKind::Array(&FieldKind::Int32)),
];

pub(super) const OFFSET_FETCH_REQUEST: &[FieldSpec] = &[
    FieldSpec::new("group_id", FieldKind::String),
    FieldSpec::new("topics", FieldKind::Structs(FETCH_REQUEST_TOPIC)),
];

const FETCH_RESPONSE_PARTITION: &[FieldSpec] = &[
    FieldSpec::new("partition_index", FieldKind::Int32),
    FieldSpec::new("committed_offset", FieldKind::Int64),
    FieldSpec::new("committed_leader_epoch", FieldKind::Int32).since(5),
    FieldSpec::new("metadata", FieldKind::NullableString),
    FieldSpec::new("error_code", FieldKind::ErrorCode),
];

const FETCH_RESPONSE_TOPIC: &[FieldSpec] = &[
    FieldSpec::new("name", FieldKind::String),
    FieldSpec::new("partitions", FieldKind::Structs(FETCH_RESPONSE_PARTITION)),
];

pub(super) const OFFSET_FETCH_RESPONSE: &[FieldSpec] = &[
    FieldSpec::new("throttle_time_ms", FieldKind::Int32).since(3),
    FieldSpec::new("topics", FieldKind::Structs(FETCH_RESPONSE_TOPIC)),
    FieldSpec::new("error_code", FieldKind::ErrorCode).since(2),
];
