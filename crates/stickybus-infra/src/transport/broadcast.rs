//! `tokio::sync::broadcast` transport.
//!
//! Publishing pushes an envelope into a single broadcast ring buffer. Each
//! subscription owns a forwarding task that drains its receiver, drops
//! envelopes of other channels, and invokes its callback. Delivery is
//! therefore asynchronous with respect to `publish`.
//!
//! Publishing with no active subscribers is a no-op. A forwarding task that
//! falls more than `capacity` envelopes behind skips the oldest ones and logs
//! a warning.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use stickybus_core::transport::{BroadcastTransport, TransportCallback, TransportHandle};
use stickybus_types::error::BusError;
use stickybus_types::event::Occurrence;
use stickybus_types::routing::{ChannelId, Topic};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
struct Envelope {
    channel: ChannelId,
    occurrence: Occurrence,
}

/// Multi-consumer transport on a tokio broadcast channel.
pub struct TokioBroadcastTransport {
    sender: broadcast::Sender<Envelope>,
    runtime: Handle,
    next_handle: AtomicU64,
    forwarders: DashMap<TransportHandle, CancellationToken>,
}

impl TokioBroadcastTransport {
    /// Create a transport on the current tokio runtime.
    ///
    /// Fails with [`BusError::Transport`] when called outside a runtime.
    pub fn new(capacity: usize) -> Result<Self, BusError> {
        let runtime = Handle::try_current()
            .map_err(|e| BusError::Transport(format!("no tokio runtime available: {e}")))?;
        Ok(Self::with_runtime(capacity, runtime))
    }

    /// Create a transport that spawns its forwarding tasks on `runtime`.
    ///
    /// The capacity is shared by all subscriptions and clamped to at least 1.
    pub fn with_runtime(capacity: usize, runtime: Handle) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            runtime,
            next_handle: AtomicU64::new(0),
            forwarders: DashMap::new(),
        }
    }

    /// Number of live forwarding tasks.
    pub fn subscriber_count(&self) -> usize {
        self.forwarders.len()
    }
}

impl BroadcastTransport for TokioBroadcastTransport {
    fn subscribe(
        &self,
        channel: &ChannelId,
        callback: TransportCallback,
    ) -> Result<TransportHandle, BusError> {
        let handle = TransportHandle(self.next_handle.fetch_add(1, Ordering::Relaxed) + 1);
        let mut rx = self.sender.subscribe();
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let channel = channel.clone();

        self.runtime.spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    received = rx.recv() => match received {
                        Ok(envelope) => {
                            if envelope.channel == channel {
                                callback(&envelope.occurrence);
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(%handle, skipped, "broadcast subscriber lagged, events dropped");
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
            debug!(%handle, "broadcast forwarder stopped");
        });

        self.forwarders.insert(handle, token);
        Ok(handle)
    }

    fn publish(&self, topic: &Topic, occurrence: Occurrence) -> Result<(), BusError> {
        let envelope = Envelope {
            channel: topic.channel().clone(),
            occurrence,
        };
        if self.sender.send(envelope).is_err() {
            debug!(%topic, "no active broadcast subscribers");
        }
        Ok(())
    }

    fn unsubscribe(&self, handle: TransportHandle) {
        if let Some((_, token)) = self.forwarders.remove(&handle) {
            token.cancel();
        }
    }
}

impl Drop for TokioBroadcastTransport {
    fn drop(&mut self) {
        for entry in self.forwarders.iter() {
            entry.value().cancel();
        }
    }
}

impl std::fmt::Debug for TokioBroadcastTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioBroadcastTransport")
            .field("receiver_count", &self.sender.receiver_count())
            .field("forwarders", &self.forwarders.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use stickybus_types::context::AppContext;
    use stickybus_types::payload::Payload;
    use stickybus_types::routing::RoutingKey;
    use tokio::sync::mpsc;

    fn channel(salt: &str) -> ChannelId {
        ChannelId::with_salt(&AppContext::new("test"), salt).unwrap()
    }

    fn forwarding() -> (mpsc::UnboundedReceiver<i32>, TransportCallback) {
        let (tx, rx) = mpsc::unbounded_channel();
        let callback: TransportCallback = Arc::new(move |occ: &Occurrence| {
            let _ = tx.send(occ.event_id());
        });
        (rx, callback)
    }

    fn occurrence(key: &RoutingKey) -> Occurrence {
        Occurrence::new(key.clone(), Arc::new(Payload::new()))
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<i32>) -> Option<i32> {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .ok()
            .flatten()
    }

    #[tokio::test]
    async fn publish_and_subscribe_delivers_occurrence() {
        let transport = TokioBroadcastTransport::new(16).unwrap();
        let ch = channel("a");
        let (mut rx, cb) = forwarding();
        transport.subscribe(&ch, cb).unwrap();

        let key = RoutingKey::broadcast(4);
        transport.publish(&ch.topic(&key), occurrence(&key)).unwrap();

        assert_eq!(next(&mut rx).await, Some(4));
    }

    #[tokio::test]
    async fn multiple_subscribers_each_receive_occurrence() {
        let transport = TokioBroadcastTransport::new(16).unwrap();
        let ch = channel("a");
        let (mut rx1, cb1) = forwarding();
        let (mut rx2, cb2) = forwarding();
        transport.subscribe(&ch, cb1).unwrap();
        transport.subscribe(&ch, cb2).unwrap();

        let key = RoutingKey::broadcast(9);
        transport.publish(&ch.topic(&key), occurrence(&key)).unwrap();

        assert_eq!(next(&mut rx1).await, Some(9));
        assert_eq!(next(&mut rx2).await, Some(9));
    }

    #[tokio::test]
    async fn other_channels_are_filtered_out() {
        let transport = TokioBroadcastTransport::new(16).unwrap();
        let ch = channel("a");
        let (mut rx, cb) = forwarding();
        transport.subscribe(&ch, cb).unwrap();

        let key = RoutingKey::broadcast(1);
        let other = channel("b");
        transport.publish(&other.topic(&key), occurrence(&key)).unwrap();
        let key = RoutingKey::broadcast(2);
        transport.publish(&ch.topic(&key), occurrence(&key)).unwrap();

        assert_eq!(next(&mut rx).await, Some(2));
    }

    #[tokio::test]
    async fn unsubscribe_stops_forwarder() {
        let transport = TokioBroadcastTransport::new(16).unwrap();
        let ch = channel("a");
        let (mut rx, cb) = forwarding();
        let handle = transport.subscribe(&ch, cb).unwrap();
        transport.unsubscribe(handle);
        transport.unsubscribe(handle);
        assert_eq!(transport.subscriber_count(), 0);

        let key = RoutingKey::broadcast(1);
        transport.publish(&ch.topic(&key), occurrence(&key)).unwrap();
        // The forwarder exits and drops the callback, closing the channel.
        assert_eq!(next(&mut rx).await, None);
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_does_not_fail() {
        let transport = TokioBroadcastTransport::new(16).unwrap();
        let ch = channel("a");
        let key = RoutingKey::broadcast(1);
        transport.publish(&ch.topic(&key), occurrence(&key)).unwrap();
        transport.publish(&ch.topic(&key), occurrence(&key)).unwrap();
    }

    #[tokio::test]
    async fn receiver_with_whitespace_is_delivered() {
        let transport = TokioBroadcastTransport::new(16).unwrap();
        let ch = channel("a");
        let (mut rx, cb) = forwarding();
        transport.subscribe(&ch, cb).unwrap();

        let key = RoutingKey::targeted(1, "two words");
        transport.publish(&ch.topic(&key), occurrence(&key)).unwrap();

        assert_eq!(next(&mut rx).await, Some(1));
    }

    #[test]
    fn new_outside_runtime_fails() {
        let err = TokioBroadcastTransport::new(16).unwrap_err();
        assert!(matches!(err, BusError::Transport(_)));
    }

    #[tokio::test]
    async fn debug_impl() {
        let transport = TokioBroadcastTransport::new(0).unwrap();
        let debug = format!("{transport:?}");
        assert!(debug.contains("TokioBroadcastTransport"));
        assert!(debug.contains("forwarders"));
    }
}
