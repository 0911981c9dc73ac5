//! Metadata and ApiVersions.

use super::{FieldKind, FieldSpec};

const REQUEST_TOPIC: &[FieldSpec] = &[FieldSpec::new("name", FieldKind::String)];

pub(super) const REQUEST: &[FieldSpec] = &[
    // null from v1 means all topics
    FieldSpec::new("topics", FieldKind::Structs(REQUEST_TOPIC)),
    FieldSpec::new("allow_auto_topic_creation", FieldKind::Bool).since(4),
    FieldSpec::new("include_cluster_authorized_operations", FieldKind::Bool).since(8),
    FieldSpec::new("include_topic_authorized_operations", FieldKind::Bool).since(8),
];

const BROKER: &[FieldSpec] = &[
    FieldSpec::new("node_id", FieldKind::Int32),
    FieldSpec::new("host", FieldKind::String),
    FieldSpec::new("port", FieldKind::Int32),
    FieldSpec::new("rack", FieldKind::NullableString).since(1),
];

const PARTITION: &[FieldSpec] = &[
    FieldSpec::new("error_code", FieldKind::ErrorCode),
    FieldSpec::new("partition_index", FieldKind::Int32),
    FieldSpec::new("leader_id", FieldKind::Int32),
    FieldSpec::new("leader_epoch", FieldKind::Int32).since(7),
    FieldSpec::new("replica_nodes", FieldKind::Array(&FieldKind::Int32)),
    FieldSpec::new("isr_nodes", FieldKind::Array(&FieldKind::Int32)),
    FieldSpec::new("offline_replicas", FieldKind::Array(&FieldKind::Int32)).since(5),
];

const TOPIC: &[FieldSpec] = &[
    FieldSpec::new("error_code", FieldKind::ErrorCode),
    FieldSpec::new("name", FieldKind::String),
    FieldSpec::new("is_internal", FieldKind::Bool).since(1),
    FieldSpec::new("partitions", FieldKind::Structs(PARTITION)),
    FieldSpec::new("topic_authorized_operations", FieldKind::Int32).since(8),
];

pub(super) const RESPONSE: &[FieldSpec] = &[
    FieldSpec::new("throttle_time_ms", FieldKind::Int32).since(3),
    FieldSpec::new("brokers", FieldKind::Structs(BROKER)),
    FieldSpec::new("cluster_id", FieldKind::NullableString).since(2),
    FieldSpec::new("controller_id", FieldKind::Int32).since(1),
    FieldSpec::new("topics", FieldKind::Structs(TOPIC)),
    FieldSpec::new("cluster_authorized_operations", FieldKind::Int32).since(8),
];

pub(super) const API_VERSIONS_REQUEST: &[FieldSpec] = &[];

const API_VERSION_RANGE: &[FieldSpec] = &[
    FieldSpec::new("api_key", FieldKind::ApiKey),
    FieldSpec::new("min_version", FieldKind::Int16),
    FieldSpec::new("max_version", FieldKind::Int16),
];

pub(super) const API_VERSIONS_RESPONSE: &[FieldSpec] = &[
    FieldSpec::new("error_code", FieldKind::ErrorCode),
    FieldSpec::new("api_keys", FieldKind::Structs(API_VERSION_RANGE)),
    FieldSpec::new("throttle_time_ms", FieldKind::Int32).since(1),
];
