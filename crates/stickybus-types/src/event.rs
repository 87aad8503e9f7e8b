//! Event types flowing through the bus.
//!
//! `OutgoingEvent` is what a publisher hands to `send`/`send_sticky`.
//! `Occurrence` is what a transport carries to every subscription: the
//! routing key plus a frozen, shared payload.

use std::sync::Arc;

use crate::payload::Payload;
use crate::routing::RoutingKey;

/// An event about to be published.
///
/// Covers every send shape: id only, id + payload, id + receiver, and
/// id + receiver + payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEvent {
    pub event_id: i32,
    pub receiver_id: Option<String>,
    pub payload: Payload,
}

impl OutgoingEvent {
    pub fn new(event_id: i32) -> Self {
        Self {
            event_id,
            receiver_id: None,
            payload: Payload::new(),
        }
    }

    /// Narrowcast to subscribers registered with `receiver_id`.
    pub fn to(mut self, receiver_id: impl Into<String>) -> Self {
        self.receiver_id = Some(receiver_id.into());
        self
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    pub fn routing_key(&self) -> RoutingKey {
        RoutingKey::new(self.event_id, self.receiver_id.clone())
    }
}

impl From<i32> for OutgoingEvent {
    fn from(event_id: i32) -> Self {
        Self::new(event_id)
    }
}

impl From<(i32, Payload)> for OutgoingEvent {
    fn from((event_id, payload): (i32, Payload)) -> Self {
        Self::new(event_id).with_payload(payload)
    }
}

impl From<(i32, &str)> for OutgoingEvent {
    fn from((event_id, receiver_id): (i32, &str)) -> Self {
        Self::new(event_id).to(receiver_id)
    }
}

impl From<(i32, &str, Payload)> for OutgoingEvent {
    fn from((event_id, receiver_id, payload): (i32, &str, Payload)) -> Self {
        Self::new(event_id).to(receiver_id).with_payload(payload)
    }
}

impl From<(i32, String)> for OutgoingEvent {
    fn from((event_id, receiver_id): (i32, String)) -> Self {
        Self::new(event_id).to(receiver_id)
    }
}

impl From<(i32, String, Payload)> for OutgoingEvent {
    fn from((event_id, receiver_id, payload): (i32, String, Payload)) -> Self {
        Self::new(event_id).to(receiver_id).with_payload(payload)
    }
}

/// One published event as seen by the transport and the subscriptions.
#[derive(Debug, Clone)]
pub struct Occurrence {
    pub key: RoutingKey,
    pub payload: Arc<Payload>,
}

impl Occurrence {
    pub fn new(key: RoutingKey, payload: Arc<Payload>) -> Self {
        Self { key, payload }
    }

    pub fn event_id(&self) -> i32 {
        self.key.event_id
    }

    pub fn receiver_id(&self) -> Option<&str> {
        self.key.receiver_id()
    }

    /// Untargeted occurrences reach every subscription.
    pub fn is_broadcast(&self) -> bool {
        self.key.is_broadcast()
    }
}
