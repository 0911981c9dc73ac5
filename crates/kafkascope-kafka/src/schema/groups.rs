//! Group coordination APIs.

use super::{FieldKind, FieldSpec};

pub(super) const FIND_COORDINATOR_REQUEST: &[FieldSpec] = &[
    FieldSpec::new("key", FieldKind::String),
    FieldSpec::new("key_type", FieldKind::Int8).since(1),
];

pub(super) const FIND_COORDINATOR_RESPONSE: &[FieldSpec] = &[
    FieldSpec::new("throttle_time_ms", FieldKind::Int32).since(1),
    FieldSpec::new("error_code", FieldKind::ErrorCode),
    FieldSpec::new("error_message", FieldKind::NullableString).since(1),
    FieldSpec::new("node_id", FieldKind::Int32),
    FieldSpec::new("host", FieldKind::String),
    FieldSpec::new("port", FieldKind::Int32),
];

pub(super) const HEARTBEAT_REQUEST: &[FieldSpec] = &[
    FieldSpec::new("group_id", FieldKind::String),
    FieldSpec::new("generation_id", FieldKind::Int32),
    FieldSpec::new("member_id", FieldKind::String),
    FieldSpec::new("group_instance_id", FieldKind::NullableString).since(3),
];

pub(super) const HEARTBEAT_RESPONSE: &[FieldSpec] = &[
    FieldSpec::new("throttle_time_ms", FieldKind::Int32).since(1),
    FieldSpec::new("error_code", FieldKind::ErrorCode),
];

pub(super) const LEAVE_GROUP_REQUEST: &[FieldSpec] = &[
    FieldSpec::new("group_id", FieldKind::String),
    FieldSpec::new("member_id", FieldKind::String),
];

pub(super) const LEAVE_GROUP_RESPONSE: &[FieldSpec] = &[
    FieldSpec::new("throttle_time_ms", FieldKind::Int32).since(1),
    FieldSpec::new("error_code", FieldKind::ErrorCode),
];

pub(super) const LIST_GROUPS_REQUEST: &[FieldSpec] = &[];

const LISTED_GROUP: &[FieldSpec] = &[
    FieldSpec::new("group_id", FieldKind::String),
    FieldSpec::new("protocol_type", FieldKind::String),
];

pub(super) const LIST_GROUPS_RESPONSE: &[FieldSpec] = &[
    FieldSpec::new("throttle_time_ms", FieldKind::Int32).since(1),
    FieldSpec::new("error_code", FieldKind::ErrorCode),
    FieldSpec::new("groups", FieldKind::Structs(LISTED_GROUP)),
];
