//! Dissector session
//!
//! Owns everything that lives longer than one message: the per-connection
//! match queues and the per-direction stream framers. A host hands it
//! captured bytes (or already reassembled payloads) tagged with a connection
//! and a direction and gets decoded messages back.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, instrument, warn};

use crate::codec::{FrameStatus, RequestHeader, ResponseHeader, StreamFramer, MAX_FRAME_SIZE};
use crate::compression::DEFAULT_MAX_DECOMPRESSED_SIZE;
use crate::correlator::{self, ConnectionMatchQueue, FrameId, MessageRef, PendingExchange};
use crate::cursor::DecodeCursor;
use crate::diagnostics::{DiagnosticKind, DiagnosticSink, Diagnostics, Severity};
use crate::records::RecordOptions;
use crate::registry;
use crate::schema::{self, DecodedField};
use crate::types::Direction;

/// Decoder limits and switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DissectorConfig {
    /// Largest accepted length prefix.
    pub max_frame_size: usize,
    /// Deepest nesting of compressed legacy message sets.
    pub max_nesting_depth: usize,
    pub verify_checksums: bool,
    /// Cap on any single decompressed buffer.
    pub max_decompressed_size: usize,
}

impl Default for DissectorConfig {
    fn default() -> Self {
        Self {
            max_frame_size: MAX_FRAME_SIZE,
            max_nesting_depth: 8,
            verify_checksums: true,
            max_decompressed_size: DEFAULT_MAX_DECOMPRESSED_SIZE,
        }
    }
}

impl DissectorConfig {
    pub fn record_options(&self) -> RecordOptions {
        RecordOptions {
            max_nesting_depth: self.max_nesting_depth,
            verify_checksums: self.verify_checksums,
            max_decompressed_size: self.max_decompressed_size,
        }
    }
}

/// Host-chosen name of a connection, e.g. `10.0.0.5:51234->10.0.0.9:9092`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionKey(String);

impl ConnectionKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One decoded Kafka message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedMessage {
    pub connection: ConnectionKey,
    pub direction: Direction,
    pub message: MessageRef,
    /// Payload length, without the length prefix.
    pub length: usize,
    pub api_key: Option<i16>,
    pub api_name: Option<&'static str>,
    pub api_version: Option<i16>,
    pub correlation_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange: Option<PendingExchange>,
    #[serde(serialize_with = "schema::serialize_fields")]
    pub fields: Vec<DecodedField>,
    /// Undecoded body, kept when no layout applies.
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "crate::records::serialize_opt_hex"
    )]
    pub raw_body: Option<Bytes>,
    pub diagnostics: Diagnostics,
}

impl DecodedMessage {
    fn new(
        connection: &ConnectionKey,
        direction: Direction,
        message: MessageRef,
        length: usize,
    ) -> Self {
        Self {
            connection: connection.clone(),
            direction,
            message,
            length,
            api_key: None,
            api_name: None,
            api_version: None,
            correlation_id: None,
            client_id: None,
            exchange: None,
            fields: Vec::new(),
            raw_body: None,
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&schema::FieldValue> {
        schema::find(&self.fields, name)
    }
}

/// Messages completed by one [`Dissector::feed`] call.
#[derive(Debug, Default)]
pub struct FeedOutcome {
    pub messages: Vec<DecodedMessage>,
    /// Bytes still needed to complete the buffered tail.
    pub need_more: usize,
    /// Stream-level problems, such as an oversized length prefix.
    pub diagnostics: Diagnostics,
}

/// Framing state for one direction of a connection.
#[derive(Debug)]
struct DirectionState {
    framer: StreamFramer,
    /// Highest frame whose bytes went into the framer.
    last_frame: Option<FrameId>,
    /// Payloads each frame completed, handed out again when it is replayed.
    completed: HashMap<FrameId, Vec<Bytes>>,
}

impl DirectionState {
    fn new(max_frame_size: usize) -> Self {
        Self {
            framer: StreamFramer::new(max_frame_size),
            last_frame: None,
            completed: HashMap::new(),
        }
    }

    fn is_replay(&self, frame: FrameId) -> bool {
        self.last_frame.is_some_and(|last| frame <= last)
    }
}

#[derive(Debug)]
struct ConnectionState {
    queue: ConnectionMatchQueue,
    requests: DirectionState,
    responses: DirectionState,
}

impl ConnectionState {
    fn new(config: &DissectorConfig) -> Self {
        Self {
            queue: ConnectionMatchQueue::new(),
            requests: DirectionState::new(config.max_frame_size),
            responses: DirectionState::new(config.max_frame_size),
        }
    }

    fn direction_mut(&mut self, direction: Direction) -> &mut DirectionState {
        match direction {
            Direction::Request => &mut self.requests,
            Direction::Response => &mut self.responses,
        }
    }
}

/// Decoding session over any number of connections.
#[derive(Debug, Default)]
pub struct Dissector {
    config: DissectorConfig,
    record_options: RecordOptions,
    connections: HashMap<ConnectionKey, ConnectionState>,
}

impl Dissector {
    pub fn new(config: DissectorConfig) -> Self {
        let record_options = config.record_options();
        Self {
            config,
            record_options,
            connections: HashMap::new(),
        }
    }

    pub fn config(&self) -> &DissectorConfig {
        &self.config
    }

    /// Connections with live state.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Requests on `connection` still waiting for a response.
    pub fn pending(&self, connection: &ConnectionKey) -> usize {
        self.connections
            .get(connection)
            .map_or(0, |state| state.queue.pending())
    }

    fn state_mut(&mut self, connection: &ConnectionKey) -> &mut ConnectionState {
        let config = &self.config;
        self.connections
            .entry(connection.clone())
            .or_insert_with(|| ConnectionState::new(config))
    }

    /// Push captured bytes for one direction of a connection and decode
    /// every message they complete. Messages are numbered by their position
    /// among those completed by `frame`.
    ///
    /// A frame at or below the highest one already fed on this direction is
    /// a replay: its bytes are not buffered again and the messages it
    /// completed the first time are decoded again from their stored payloads.
    pub fn feed(
        &mut self,
        connection: &ConnectionKey,
        direction: Direction,
        frame: FrameId,
        data: &[u8],
    ) -> FeedOutcome {
        let mut outcome = FeedOutcome::default();

        let state = self.state_mut(connection).direction_mut(direction);
        let payloads = if state.is_replay(frame) {
            debug!(%connection, %direction, frame, "frame already fed, replaying");
            outcome.need_more = state.framer.missing();
            state.completed.get(&frame).cloned().unwrap_or_default()
        } else {
            state.last_frame = Some(frame);
            let payloads = Self::drain(connection, direction, &mut state.framer, data, &mut outcome);
            if !payloads.is_empty() {
                state.completed.insert(frame, payloads.clone());
            }
            payloads
        };

        for (index, payload) in payloads.into_iter().enumerate() {
            let message = MessageRef::new(frame, index as u32);
            outcome
                .messages
                .push(self.decode_message(connection, direction, message, payload));
        }
        outcome
    }

    fn drain(
        connection: &ConnectionKey,
        direction: Direction,
        framer: &mut StreamFramer,
        data: &[u8],
        outcome: &mut FeedOutcome,
    ) -> Vec<Bytes> {
        let mut payloads = Vec::new();
        framer.push(data);
        loop {
            match framer.next_frame() {
                Ok(FrameStatus::Frame(payload)) => payloads.push(payload),
                Ok(FrameStatus::NeedMore(missing)) => {
                    outcome.need_more = missing;
                    break;
                }
                Err(err) => {
                    // No way to find the next message boundary
                    warn!(%connection, %direction, "{}", err);
                    outcome
                        .diagnostics
                        .report(Severity::Error, "length", 0, (&err).into());
                    framer.clear();
                    outcome.need_more = crate::codec::LENGTH_PREFIX_SIZE;
                    break;
                }
            }
        }
        payloads
    }

    /// Decode one complete payload (length prefix already stripped).
    ///
    /// Decoding the same `message` again reuses the stored correlation.
    #[instrument(
        level = "debug",
        skip_all,
        fields(%connection, %direction, frame = message.frame, index = message.index)
    )]
    pub fn decode_message(
        &mut self,
        connection: &ConnectionKey,
        direction: Direction,
        message: MessageRef,
        payload: Bytes,
    ) -> DecodedMessage {
        let mut decoded = DecodedMessage::new(connection, direction, message, payload.len());
        let mut cursor = DecodeCursor::new(payload);

        match direction {
            Direction::Request => self.decode_request(connection, &mut cursor, &mut decoded),
            Direction::Response => self.decode_response(connection, &mut cursor, &mut decoded),
        }

        debug!(
            api = decoded.api_name.unwrap_or("?"),
            diagnostics = decoded.diagnostics.len(),
            "decoded"
        );
        decoded
    }

    fn decode_request(
        &mut self,
        connection: &ConnectionKey,
        cursor: &mut DecodeCursor,
        decoded: &mut DecodedMessage,
    ) {
        let header = match RequestHeader::parse(cursor, &mut decoded.diagnostics) {
            Ok(header) => header,
            Err(err) => {
                decoded.diagnostics.report(
                    Severity::Error,
                    "header",
                    cursor.position(),
                    (&err).into(),
                );
                return;
            }
        };

        let descriptor = registry::validate(header.api_key, header.api_version, &mut decoded.diagnostics);
        decoded.api_key = Some(header.api_key);
        decoded.api_name = Some(descriptor.map_or("Unknown", |d| d.name));
        decoded.api_version = Some(header.api_version);
        decoded.correlation_id = Some(header.correlation_id);
        decoded.client_id = header.client_id.clone();

        let body = cursor.buffer().slice(cursor.position()..);
        let expects_response = correlator::expects_response(&header, &body);
        let exchange = self
            .state_mut(connection)
            .queue
            .on_request(decoded.message, &header, expects_response)
            .clone();
        decoded.exchange = Some(exchange);

        self.decode_body(cursor, header.api_key, header.api_version, decoded);
    }

    fn decode_response(
        &mut self,
        connection: &ConnectionKey,
        cursor: &mut DecodeCursor,
        decoded: &mut DecodedMessage,
    ) {
        let header = match ResponseHeader::parse(cursor) {
            Ok(header) => header,
            Err(err) => {
                decoded.diagnostics.report(
                    Severity::Error,
                    "header",
                    cursor.position(),
                    (&err).into(),
                );
                return;
            }
        };
        decoded.correlation_id = Some(header.correlation_id);

        let exchange = self
            .state_mut(connection)
            .queue
            .on_response(decoded.message, header.correlation_id)
            .cloned();
        let Some(exchange) = exchange else {
            decoded.diagnostics.report(
                Severity::Warning,
                "correlation_id",
                0,
                DiagnosticKind::ResponseWithoutRequest,
            );
            return;
        };

        decoded.api_key = Some(exchange.api_key);
        decoded.api_name = Some(registry::api_name(exchange.api_key));
        decoded.api_version = Some(exchange.api_version);
        let (api_key, api_version) = (exchange.api_key, exchange.api_version);
        decoded.exchange = Some(exchange);

        self.decode_body(cursor, api_key, api_version, decoded);
    }

    fn decode_body(
        &self,
        cursor: &mut DecodeCursor,
        api_key: i16,
        api_version: i16,
        decoded: &mut DecodedMessage,
    ) {
        match schema::layout(api_key, decoded.direction) {
            Some(layout) => {
                let version = registry::lookup(api_key)
                    .map_or(api_version, |d| d.closest_version(api_version));
                decoded.fields = schema::decode_body(
                    cursor,
                    layout,
                    version,
                    &self.record_options,
                    &mut decoded.diagnostics,
                );
            }
            None => {
                if let Some(descriptor) = registry::lookup(api_key) {
                    decoded.diagnostics.report(
                        Severity::Note,
                        "body",
                        cursor.position(),
                        DiagnosticKind::NoFieldLayout {
                            api_name: descriptor.name.to_string(),
                        },
                    );
                }
                decoded.raw_body = Some(cursor.read_rest());
            }
        }
    }

    /// Drop all state for `connection`. Returns whether it existed.
    pub fn close(&mut self, connection: &ConnectionKey) -> bool {
        let existed = self.connections.remove(connection).is_some();
        if existed {
            debug!(%connection, "connection closed");
        }
        existed
    }
}
