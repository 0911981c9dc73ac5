//! Request/response correlation
//!
//! Kafka answers requests on a connection strictly in the order they were
//! sent, so pairing is FIFO: each response takes the oldest request still
//! waiting. The correlation id on the wire is not consulted for matching.
//!
//! Every decision is remembered per [`MessageRef`], which makes decoding the
//! same captured message a second time a lookup instead of a queue mutation.

use bytes::Buf;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use tracing::debug;

use crate::codec::RequestHeader;
use crate::types::{ApiKey, ACKS_NONE};

/// Host-assigned identifier of a captured frame.
pub type FrameId = u64;

/// One Kafka message: the host frame it completed in and its position among
/// the messages completed by that frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MessageRef {
    pub frame: FrameId,
    pub index: u32,
}

impl MessageRef {
    pub fn new(frame: FrameId, index: u32) -> Self {
        Self { frame, index }
    }
}

/// Index of an exchange inside its connection's queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ExchangeId(pub usize);

/// A request and, once seen, its response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingExchange {
    pub id: ExchangeId,
    pub api_key: i16,
    pub api_version: i16,
    pub correlation_id: i32,
    pub request: MessageRef,
    pub response: Option<MessageRef>,
    /// False for a produce with acks=0; the broker never answers it.
    pub expects_response: bool,
}

impl PendingExchange {
    pub fn is_matched(&self) -> bool {
        self.response.is_some()
    }
}

/// FIFO match state for one connection.
#[derive(Debug, Default)]
pub struct ConnectionMatchQueue {
    exchanges: Vec<PendingExchange>,
    waiting: VecDeque<ExchangeId>,
    requests: HashMap<MessageRef, ExchangeId>,
    responses: HashMap<MessageRef, ExchangeId>,
}

impl ConnectionMatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests still waiting for a response.
    pub fn pending(&self) -> usize {
        self.waiting.len()
    }

    pub fn exchange(&self, id: ExchangeId) -> Option<&PendingExchange> {
        self.exchanges.get(id.0)
    }

    /// Every exchange seen so far, in request order.
    pub fn exchanges(&self) -> &[PendingExchange] {
        &self.exchanges
    }

    /// Record a request. Seeing the same message again returns the stored
    /// exchange untouched.
    pub fn on_request(
        &mut self,
        message: MessageRef,
        header: &RequestHeader,
        expects_response: bool,
    ) -> &PendingExchange {
        if let Some(id) = self.requests.get(&message) {
            debug!(frame = message.frame, index = message.index, "request replay");
            return &self.exchanges[id.0];
        }

        let id = ExchangeId(self.exchanges.len());
        self.exchanges.push(PendingExchange {
            id,
            api_key: header.api_key,
            api_version: header.api_version,
            correlation_id: header.correlation_id,
            request: message,
            response: None,
            expects_response,
        });
        self.requests.insert(message, id);
        if expects_response {
            self.waiting.push_back(id);
        }
        &self.exchanges[id.0]
    }

    /// Pair a response with the oldest waiting request.
    ///
    /// Returns `None` when nothing is waiting or when the oldest request was
    /// captured after this response, which means its real request was never
    /// seen. The queue is left untouched in both cases.
    pub fn on_response(
        &mut self,
        message: MessageRef,
        correlation_id: i32,
    ) -> Option<&PendingExchange> {
        if let Some(id) = self.responses.get(&message) {
            debug!(frame = message.frame, index = message.index, "response replay");
            return self.exchanges.get(id.0);
        }

        let head = *self.waiting.front()?;
        if self.exchanges[head.0].request > message {
            debug!(
                frame = message.frame,
                request_frame = self.exchanges[head.0].request.frame,
                "oldest pending request follows response"
            );
            return None;
        }

        self.waiting.pop_front();
        self.responses.insert(message, head);
        let exchange = &mut self.exchanges[head.0];
        exchange.response = Some(message);
        if exchange.correlation_id != correlation_id {
            debug!(
                request = exchange.correlation_id,
                response = correlation_id,
                "correlation id differs from FIFO match"
            );
        }
        Some(&*exchange)
    }

    pub fn clear(&mut self) {
        self.exchanges.clear();
        self.waiting.clear();
        self.requests.clear();
        self.responses.clear();
    }
}

/// The `acks` field of a produce request body, read without decoding the
/// rest. `None` if the body is too short.
pub fn produce_required_acks(body: &[u8], api_version: i16) -> Option<i16> {
    let mut buf = body;
    if api_version >= 3 {
        // transactional_id
        if buf.remaining() < 2 {
            return None;
        }
        let length = buf.get_i16();
        if length > 0 {
            let length = length as usize;
            if buf.remaining() < length {
                return None;
            }
            buf.advance(length);
        }
    }
    if buf.remaining() < 2 {
        return None;
    }
    Some(buf.get_i16())
}

/// Whether the broker will answer this request.
pub fn expects_response(header: &RequestHeader, body: &[u8]) -> bool {
    header.api_key != ApiKey::Produce.as_i16()
        || produce_required_acks(body, header.api_version) != Some(ACKS_NONE)
}
