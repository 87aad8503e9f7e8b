//! Broadcast transport port.
//!
//! The bus never delivers an occurrence itself: it publishes on a
//! [`BroadcastTransport`], and every subscription it registered there decides
//! for itself whether the occurrence is addressed to it. Adapters live here
//! (`InMemoryTransport`) and in `stickybus-infra`.

pub mod in_memory;

use std::fmt;
use std::sync::Arc;

use stickybus_types::error::BusError;
use stickybus_types::event::Occurrence;
use stickybus_types::routing::{ChannelId, Topic};

pub use in_memory::InMemoryTransport;

/// Callback a transport invokes for every occurrence on a subscribed channel.
pub type TransportCallback = Arc<dyn Fn(&Occurrence) + Send + Sync>;

/// Opaque token identifying one transport-level subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransportHandle(pub u64);

impl fmt::Display for TransportHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transport#{}", self.0)
    }
}

/// Delivers occurrences to every callback subscribed to a channel.
///
/// Implementations must only deliver to callbacks registered within the same
/// process; no persistence, ordering, or cross-process guarantees are needed.
pub trait BroadcastTransport: Send + Sync {
    /// Register `callback` for all occurrences published on `channel`.
    fn subscribe(
        &self,
        channel: &ChannelId,
        callback: TransportCallback,
    ) -> Result<TransportHandle, BusError>;

    /// Publish `occurrence` on `topic`. Rejecting a malformed topic is an error.
    fn publish(&self, topic: &Topic, occurrence: Occurrence) -> Result<(), BusError>;

    /// Detach a previously registered callback. Unknown handles are ignored.
    fn unsubscribe(&self, handle: TransportHandle);
}
