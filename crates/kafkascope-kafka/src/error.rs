//! Kafka protocol error handling
//!
//! Two unrelated things live here:
//! - [`KafkaError`]: hard failures inside the decoder (a read past the end of
//!   a buffer, an oversized frame, a codec that could not inflate its input).
//!   Soft, best-effort problems are [`Diagnostic`](crate::diagnostics::Diagnostic)s instead.
//! - [`ErrorCode`]: the broker's error code enumeration as it appears in
//!   response bodies, with a human-readable rendering.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use thiserror::Error;

/// Result type for Kafka decoding operations
pub type KafkaResult<T> = Result<T, KafkaError>;

/// Kafka decoding errors
#[derive(Debug, Error)]
pub enum KafkaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Frame size {size} exceeds maximum {max}")]
    FrameTooLarge { size: usize, max: usize },

    #[error("Truncated: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("Compression error: {0}")]
    Compression(String),
}

/// Kafka protocol error codes
/// See: https://kafka.apache.org/protocol#protocol_error_codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(i16)]
pub enum ErrorCode {
    UnknownServerError = -1,
    None = 0,
    OffsetOutOfRange = 1,
    CorruptMessage = 2,
    UnknownTopicOrPartition = 3,
    InvalidFetchSize = 4,
    LeaderNotAvailable = 5,
    NotLeaderForPartition = 6,
    RequestTimedOut = 7,
    BrokerNotAvailable = 8,
    ReplicaNotAvailable = 9,
    MessageTooLarge = 10,
    StaleControllerEpoch = 11,
    OffsetMetadataTooLarge = 12,
    NetworkException = 13,
    CoordinatorLoadInProgress = 14,
    CoordinatorNotAvailable = 15,
    NotCoordinator = 16,
    InvalidTopicException = 17,
    RecordListTooLarge = 18,
    NotEnoughReplicas = 19,
    NotEnoughReplicasAfterAppend = 20,
    InvalidRequiredAcks = 21,
    IllegalGeneration = 22,
    InconsistentGroupProtocol = 23,
    InvalidGroupId = 24,
    UnknownMemberId = 25,
    InvalidSessionTimeout = 26,
    RebalanceInProgress = 27,
    InvalidCommitOffsetSize = 28,
    TopicAuthorizationFailed = 29,
    GroupAuthorizationFailed = 30,
    ClusterAuthorizationFailed = 31,
    InvalidTimestamp = 32,
    UnsupportedSaslMechanism = 33,
    IllegalSaslState = 34,
    UnsupportedVersion = 35,
    TopicAlreadyExists = 36,
    InvalidPartitions = 37,
    InvalidReplicationFactor = 38,
    InvalidReplicaAssignment = 39,
    InvalidConfig = 40,
    NotController = 41,
    InvalidRequest = 42,
    UnsupportedForMessageFormat = 43,
    PolicyViolation = 44,
    OutOfOrderSequenceNumber = 45,
    DuplicateSequenceNumber = 46,
    InvalidProducerEpoch = 47,
    InvalidTxnState = 48,
    InvalidProducerIdMapping = 49,
    InvalidTransactionTimeout = 50,
    ConcurrentTransactions = 51,
    TransactionCoordinatorFenced = 52,
    TransactionalIdAuthorizationFailed = 53,
    SecurityDisabled = 54,
    OperationNotAttempted = 55,
    KafkaStorageError = 56,
    LogDirNotFound = 57,
    SaslAuthenticationFailed = 58,
    UnknownProducerId = 59,
    ReassignmentInProgress = 60,
    DelegationTokenAuthDisabled = 61,
    DelegationTokenNotFound = 62,
    DelegationTokenOwnerMismatch = 63,
    DelegationTokenRequestNotAllowed = 64,
    DelegationTokenAuthorizationFailed = 65,
    DelegationTokenExpired = 66,
    InvalidPrincipalType = 67,
    NonEmptyGroup = 68,
    GroupIdNotFound = 69,
    FetchSessionIdNotFound = 70,
    InvalidFetchSessionEpoch = 71,
    ListenerNotFound = 72,
    TopicDeletionDisabled = 73,
    FencedLeaderEpoch = 74,
    UnknownLeaderEpoch = 75,
    UnsupportedCompressionType = 76,
    StaleBrokerEpoch = 77,
    OffsetNotAvailable = 78,
    MemberIdRequired = 79,
    PreferredLeaderNotAvailable = 80,
    GroupMaxSizeReached = 81,
    FencedInstanceId = 82,
    EligibleLeadersNotAvailable = 83,
    ElectionNotNeeded = 84,
    NoReassignmentInProgress = 85,
}

impl ErrorCode {
    pub fn as_i16(self) -> i16 {
        self as i16
    }

    pub fn from_code(code: i16) -> Option<Self> {
        Self::from_i16(code)
    }

    pub fn description(self) -> &'static str {
        match self {
            ErrorCode::UnknownServerError => "Unknown Server Error",
            ErrorCode::None => "No Error",
            ErrorCode::OffsetOutOfRange => "Offset Out Of Range",
            ErrorCode::CorruptMessage => "Corrupt Message",
            ErrorCode::UnknownTopicOrPartition => "Unknown Topic Or Partition",
            ErrorCode::InvalidFetchSize => "Invalid Fetch Size",
            ErrorCode::LeaderNotAvailable => "Leader Not Available",
            ErrorCode::NotLeaderForPartition => "Not Leader For Partition",
            ErrorCode::RequestTimedOut => "Request Timed Out",
            ErrorCode::BrokerNotAvailable => "Broker Not Available",
            ErrorCode::ReplicaNotAvailable => "Replica Not Available",
            ErrorCode::MessageTooLarge => "Message Size Too Large",
            ErrorCode::StaleControllerEpoch => "Stale Controller Epoch Code",
            ErrorCode::OffsetMetadataTooLarge => "Offset Metadata Too Large",
            ErrorCode::NetworkException => "Network Exception",
            ErrorCode::CoordinatorLoadInProgress => "Coordinator Load In Progress",
            ErrorCode::CoordinatorNotAvailable => "Coordinator Not Available",
            ErrorCode::NotCoordinator => "Not Coordinator",
            ErrorCode::InvalidTopicException => "Invalid Topic",
            ErrorCode::RecordListTooLarge => "Record List Too Large",
            ErrorCode::NotEnoughReplicas => "Not Enough Replicas",
            ErrorCode::NotEnoughReplicasAfterAppend => "Not Enough Replicas After Append",
            ErrorCode::InvalidRequiredAcks => "Invalid Required Acks",
            ErrorCode::IllegalGeneration => "Illegal Generation",
            ErrorCode::InconsistentGroupProtocol => "Inconsistent Group Protocol",
            ErrorCode::InvalidGroupId => "Invalid Group Id",
            ErrorCode::UnknownMemberId => "Unknown Member Id",
            ErrorCode::InvalidSessionTimeout => "Invalid Session Timeout",
            ErrorCode::RebalanceInProgress => "Rebalance In Progress",
            ErrorCode::InvalidCommitOffsetSize => "Invalid Commit Offset Size",
            ErrorCode::TopicAuthorizationFailed => "Topic Authorization Failed",
            ErrorCode::GroupAuthorizationFailed => "Group Authorization Failed",
            ErrorCode::ClusterAuthorizationFailed => "Cluster Authorization Failed",
            ErrorCode::InvalidTimestamp => "Invalid Timestamp",
            ErrorCode::UnsupportedSaslMechanism => "Unsupported SASL Mechanism",
            ErrorCode::IllegalSaslState => "Illegal SASL State",
            ErrorCode::UnsupportedVersion => "Unsupported Version",
            ErrorCode::TopicAlreadyExists => "Topic Already Exists",
            ErrorCode::InvalidPartitions => "Invalid Partitions",
            ErrorCode::InvalidReplicationFactor => "Invalid Replication Factor",
            ErrorCode::InvalidReplicaAssignment => "Invalid Replica Assignment",
            ErrorCode::InvalidConfig => "Invalid Configuration",
            ErrorCode::NotController => "Not Controller",
            ErrorCode::InvalidRequest => "Invalid Request",
            ErrorCode::UnsupportedForMessageFormat => "Unsupported For Message Format",
            ErrorCode::PolicyViolation => "Policy Violation",
            ErrorCode::OutOfOrderSequenceNumber => "Out Of Order Sequence Number",
            ErrorCode::DuplicateSequenceNumber => "Duplicate Sequence Number",
            ErrorCode::InvalidProducerEpoch => "Invalid Producer Epoch",
            ErrorCode::InvalidTxnState => "Invalid Transaction State",
            ErrorCode::InvalidProducerIdMapping => "Invalid Producer Id Mapping",
            ErrorCode::InvalidTransactionTimeout => "Invalid Transaction Timeout",
            ErrorCode::ConcurrentTransactions => "Concurrent Transactions",
            ErrorCode::TransactionCoordinatorFenced => "Transaction Coordinator Fenced",
            ErrorCode::TransactionalIdAuthorizationFailed => {
                "Transactional Id Authorization Failed"
            }
            ErrorCode::SecurityDisabled => "Security Disabled",
            ErrorCode::OperationNotAttempted => "Operation Not Attempted",
            ErrorCode::KafkaStorageError => "Kafka Storage Error",
            ErrorCode::LogDirNotFound => "Log Directory Not Found",
            ErrorCode::SaslAuthenticationFailed => "SASL Authentication Failed",
            ErrorCode::UnknownProducerId => "Unknown Producer Id",
            ErrorCode::ReassignmentInProgress => "Reassignment In Progress",
            ErrorCode::DelegationTokenAuthDisabled => "Delegation Token Auth Disabled",
            ErrorCode::DelegationTokenNotFound => "Delegation Token Not Found",
            ErrorCode::DelegationTokenOwnerMismatch => "Delegation Token Owner Mismatch",
            ErrorCode::DelegationTokenRequestNotAllowed => "Delegation Token Request Not Allowed",
            ErrorCode::DelegationTokenAuthorizationFailed => {
                "Delegation Token Authorization Failed"
            }
            ErrorCode::DelegationTokenExpired => "Delegation Token Expired",
            ErrorCode::InvalidPrincipalType => "Invalid Principal Type",
            ErrorCode::NonEmptyGroup => "Non Empty Group",
            ErrorCode::GroupIdNotFound => "Group Id Not Found",
            ErrorCode::FetchSessionIdNotFound => "Fetch Session Id Not Found",
            ErrorCode::InvalidFetchSessionEpoch => "Invalid Fetch Session Epoch",
            ErrorCode::ListenerNotFound => "Listener Not Found",
            ErrorCode::TopicDeletionDisabled => "Topic Deletion Disabled",
            ErrorCode::FencedLeaderEpoch => "Fenced Leader Epoch",
            ErrorCode::UnknownLeaderEpoch => "Unknown Leader Epoch",
            ErrorCode::UnsupportedCompressionType => "Unsupported Compression Type",
            ErrorCode::StaleBrokerEpoch => "Stale Broker Epoch",
            ErrorCode::OffsetNotAvailable => "Offset Not Available",
            ErrorCode::MemberIdRequired => "Member Id Required",
            ErrorCode::PreferredLeaderNotAvailable => "Preferred Leader Not Available",
            ErrorCode::GroupMaxSizeReached => "Group Max Size Reached",
            ErrorCode::FencedInstanceId => "Fenced Instance Id",
            ErrorCode::EligibleLeadersNotAvailable => "Eligible Leaders Not Available",
            ErrorCode::ElectionNotNeeded => "Election Not Needed",
            ErrorCode::NoReassignmentInProgress => "No Reassignment In Progress",
        }
    }
}

/// Render a wire error code; codes outside the known table render as
/// `Unknown {n}`.
pub fn error_code_text(code: i16) -> String {
    match ErrorCode::from_code(code) {
        Some(known) => known.description().to_string(),
        None => format!("Unknown {}", code),
    }
}
