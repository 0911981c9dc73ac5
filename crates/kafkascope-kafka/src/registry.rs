//! API schema registry
//!
//! Static table of every API key at the Kafka 2.3 protocol snapshot with the
//! version window this decoder knows how to lay out. Lookup is a direct index.

use serde::Serialize;

use crate::diagnostics::{DiagnosticKind, DiagnosticSink, Severity};

/// One known API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ApiDescriptor {
    pub api_key: i16,
    pub name: &'static str,
    /// -1 when no version is supported.
    pub min_version: i16,
    pub max_version: i16,
}

impl ApiDescriptor {
    const fn new(api_key: i16, name: &'static str, min_version: i16, max_version: i16) -> Self {
        Self {
            api_key,
            name,
            min_version,
            max_version,
        }
    }

    pub fn supports(&self, version: i16) -> bool {
        self.min_version != -1 && self.min_version <= version && version <= self.max_version
    }

    /// Nearest version inside the support window, used to pick a field
    /// layout for versions the table does not cover.
    pub fn closest_version(&self, version: i16) -> i16 {
        if self.min_version == -1 {
            return version;
        }
        version.max(self.min_version).min(self.max_version)
    }
}

/// Indexed by api key.
pub static API_DESCRIPTORS: [ApiDescriptor; 47] = [
    ApiDescriptor::new(0, "Produce", 0, 7),
    ApiDescriptor::new(1, "Fetch", 0, 11),
    ApiDescriptor::new(2, "ListOffsets", 0, 5),
    ApiDescriptor::new(3, "Metadata", 0, 8),
    ApiDescriptor::new(4, "LeaderAndIsr", 0, 2),
    ApiDescriptor::new(5, "StopReplica", 0, 1),
    ApiDescriptor::new(6, "UpdateMetadata", 0, 5),
    ApiDescriptor::new(7, "ControlledShutdown", 0, 2),
    ApiDescriptor::new(8, "OffsetCommit", 0, 7),
    ApiDescriptor::new(9, "OffsetFetch", 0, 5),
    ApiDescriptor::new(10, "FindCoordinator", 0, 2),
    ApiDescriptor::new(11, "JoinGroup", 0, 5),
    ApiDescriptor::new(12, "Heartbeat", 0, 3),
    ApiDescriptor::new(13, "LeaveGroup", 0, 2),
    ApiDescriptor::new(14, "SyncGroup", 0, 3),
    ApiDescriptor::new(15, "DescribeGroups", 0, 3),
    ApiDescriptor::new(16, "ListGroups", 0, 2),
    ApiDescriptor::new(17, "SaslHandshake", 0, 1),
    ApiDescriptor::new(18, "ApiVersions", 0, 2),
    ApiDescriptor::new(19, "CreateTopics", 0, 3),
    ApiDescriptor::new(20, "DeleteTopics", 0, 3),
    ApiDescriptor::new(21, "DeleteRecords", 0, 1),
    ApiDescriptor::new(22, "InitProducerId", 0, 1),
    ApiDescriptor::new(23, "OffsetForLeaderEpoch", 0, 3),
    ApiDescriptor::new(24, "AddPartitionsToTxn", 0, 1),
    ApiDescriptor::new(25, "AddOffsetsToTxn", 0, 1),
    ApiDescriptor::new(26, "EndTxn", 0, 1),
    ApiDescriptor::new(27, "WriteTxnMarkers", 0, 0),
    ApiDescriptor::new(28, "TxnOffsetCommit", 0, 2),
    ApiDescriptor::new(29, "DescribeAcls", 0, 1),
    ApiDescriptor::new(30, "CreateAcls", 0, 1),
    ApiDescriptor::new(31, "DeleteAcls", 0, 1),
    ApiDescriptor::new(32, "DescribeConfigs", 0, 2),
    ApiDescriptor::new(33, "AlterConfigs", 0, 1),
    ApiDescriptor::new(34, "AlterReplicaLogDirs", 0, 1),
    ApiDescriptor::new(35, "DescribeLogDirs", 0, 1),
    ApiDescriptor::new(36, "SaslAuthenticate", 0, 1),
    ApiDescriptor::new(37, "CreatePartitions", 0, 1),
    ApiDescriptor::new(38, "CreateDelegationToken", 0, 1),
    ApiDescriptor::new(39, "RenewDelegationToken", 0, 1),
    ApiDescriptor::new(40, "ExpireDelegationToken", 0, 1),
    ApiDescriptor::new(41, "DescribeDelegationToken", 0, 1),
    ApiDescriptor::new(42, "DeleteGroups", 0, 1),
    ApiDescriptor::new(43, "ElectPreferredLeaders", 0, 0),
    ApiDescriptor::new(44, "IncrementalAlterConfigs", 0, 0),
    ApiDescriptor::new(45, "AlterPartitionReassignments", -1, -1),
    ApiDescriptor::new(46, "ListPartitionReassignments", -1, -1),
];

/// Descriptor for `api_key`, if it is inside the table.
pub fn lookup(api_key: i16) -> Option<&'static ApiDescriptor> {
    usize::try_from(api_key)
        .ok()
        .and_then(|index| API_DESCRIPTORS.get(index))
}

/// Display name, `Unknown` outside the table.
pub fn api_name(api_key: i16) -> &'static str {
    lookup(api_key).map_or("Unknown", |d| d.name)
}

/// Check an observed key and version. The two checks report independently:
/// an unknown key produces one diagnostic, a known key with a version outside
/// its window another. Returns the descriptor when the key is known.
pub fn validate(
    api_key: i16,
    api_version: i16,
    sink: &mut dyn DiagnosticSink,
) -> Option<&'static ApiDescriptor> {
    let descriptor = lookup(api_key);

    match descriptor {
        None => sink.report(
            Severity::Warning,
            "api_key",
            0,
            DiagnosticKind::UnknownApiKey { api_key },
        ),
        Some(d) if !d.supports(api_version) => sink.report(
            Severity::Warning,
            "api_version",
            2,
            DiagnosticKind::UnsupportedVersion {
                version: api_version,
                min: d.min_version,
                max: d.max_version,
            },
        ),
        Some(_) => {}
    }

    descriptor
}
