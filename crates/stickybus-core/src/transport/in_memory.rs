//! Synchronous in-process transport.
//!
//! Publishing invokes every matching callback directly on the caller's
//! thread. The subscriber map is snapshotted before any callback runs, so
//! callbacks may subscribe, unsubscribe, or publish again without deadlocking.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use stickybus_types::error::BusError;
use stickybus_types::event::Occurrence;
use stickybus_types::routing::{ChannelId, Topic};
use tracing::debug;

use super::{BroadcastTransport, TransportCallback, TransportHandle};

struct Registration {
    channel: ChannelId,
    callback: TransportCallback,
}

/// Direct callback dispatch transport.
pub struct InMemoryTransport {
    next_handle: AtomicU64,
    subscribers: DashMap<TransportHandle, Registration>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self {
            next_handle: AtomicU64::new(0),
            subscribers: DashMap::new(),
        }
    }

    /// Number of live transport subscriptions across all channels.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl BroadcastTransport for InMemoryTransport {
    fn subscribe(
        &self,
        channel: &ChannelId,
        callback: TransportCallback,
    ) -> Result<TransportHandle, BusError> {
        let handle = TransportHandle(self.next_handle.fetch_add(1, Ordering::Relaxed) + 1);
        self.subscribers.insert(
            handle,
            Registration {
                channel: channel.clone(),
                callback,
            },
        );
        debug!(%handle, channel = %channel, "in-memory transport subscribed");
        Ok(handle)
    }

    fn publish(&self, topic: &Topic, occurrence: Occurrence) -> Result<(), BusError> {
        // Snapshot under the shard locks, invoke after releasing them.
        let callbacks: Vec<TransportCallback> = self
            .subscribers
            .iter()
            .filter(|entry| entry.value().channel == *topic.channel())
            .map(|entry| Arc::clone(&entry.value().callback))
            .collect();

        for callback in callbacks {
            callback(&occurrence);
        }
        Ok(())
    }

    fn unsubscribe(&self, handle: TransportHandle) {
        if self.subscribers.remove(&handle).is_some() {
            debug!(%handle, "in-memory transport unsubscribed");
        }
    }
}

impl std::fmt::Debug for InMemoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryTransport")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
