//! The `EventBus` facade: init, register/unregister, send/send_sticky,
//! remove_sticky.
//!
//! One bus instance is owned by the host application and injected wherever
//! events are published or consumed. All registry and sticky-store access
//! happens inside a single re-entrant critical section, so:
//! - updating a sticky value and publishing it is atomic with respect to a
//!   concurrent `register` replaying that value;
//! - a listener may call back into the bus from the same thread without
//!   deadlocking, because the state is never borrowed across a listener call.

use std::cell::RefCell;
use std::sync::{Arc, OnceLock};

use parking_lot::ReentrantMutex;
use stickybus_types::context::AppContext;
use stickybus_types::error::BusError;
use stickybus_types::event::{Occurrence, OutgoingEvent};
use stickybus_types::payload::Payload;
use stickybus_types::routing::{ChannelId, RoutingKey};
use tracing::{debug, warn};

use crate::listener::EventListener;
use crate::registry::{Delivery, Registry, Subscription, SubscriptionHandle};
use crate::sticky::StickyStore;
use crate::transport::BroadcastTransport;

#[derive(Debug, Default)]
struct BusState {
    registry: Registry,
    sticky: StickyStore,
}

/// In-process publish/subscribe bus with sticky events.
pub struct EventBus {
    transport: Arc<dyn BroadcastTransport>,
    channel: OnceLock<ChannelId>,
    state: ReentrantMutex<RefCell<BusState>>,
}

impl EventBus {
    /// Create an uninitialized bus on top of `transport`.
    ///
    /// Every operation except [`init`](Self::init) fails with
    /// [`BusError::Uninitialized`] until `init` succeeds.
    pub fn new(transport: Arc<dyn BroadcastTransport>) -> Self {
        Self {
            transport,
            channel: OnceLock::new(),
            state: ReentrantMutex::new(RefCell::new(BusState::default())),
        }
    }

    /// Create and initialize a bus in one step.
    pub fn with_context(
        transport: Arc<dyn BroadcastTransport>,
        ctx: &AppContext,
    ) -> Result<Self, BusError> {
        let bus = Self::new(transport);
        bus.init(ctx)?;
        Ok(bus)
    }

    /// Establish the channel identity for this bus.
    ///
    /// Idempotent: once a channel exists, later calls return it unchanged and
    /// never reset registrations or sticky values.
    pub fn init(&self, ctx: &AppContext) -> Result<&ChannelId, BusError> {
        if let Some(channel) = self.channel.get() {
            debug!(channel = %channel, "event bus already initialized");
            return Ok(channel);
        }
        let fresh = ChannelId::generate(ctx)?;
        let channel = self.channel.get_or_init(|| fresh);
        debug!(channel = %channel, app_id = %ctx.app_id, "event bus initialized");
        Ok(channel)
    }

    pub fn is_initialized(&self) -> bool {
        self.channel.get().is_some()
    }

    /// The channel identity, or `Uninitialized` before `init`.
    pub fn channel(&self) -> Result<&ChannelId, BusError> {
        self.channel.get().ok_or(BusError::Uninitialized)
    }

    /// Register a listener for every untargeted event.
    ///
    /// Sticky values already stored are replayed to this listener only, before
    /// this call returns.
    pub fn register<L>(&self, listener: L) -> Result<SubscriptionHandle, BusError>
    where
        L: EventListener + 'static,
    {
        self.register_listener(None, Arc::new(listener))
    }

    /// Register a listener scoped to `receiver_id`.
    ///
    /// It receives untargeted events plus events sent to `receiver_id`.
    pub fn register_for<L>(
        &self,
        receiver_id: impl Into<String>,
        listener: L,
    ) -> Result<SubscriptionHandle, BusError>
    where
        L: EventListener + 'static,
    {
        self.register_listener(Some(receiver_id.into()), Arc::new(listener))
    }

    /// Register an already shared listener with an optional receiver scope.
    pub fn register_listener(
        &self,
        receiver_id: Option<String>,
        listener: Arc<dyn EventListener>,
    ) -> Result<SubscriptionHandle, BusError> {
        let channel = self.channel()?;
        let receiver_id = receiver_id.filter(|r| !r.is_empty());

        let subscription = Arc::new(Subscription::new(receiver_id, listener));

        let guard = self.state.lock();
        let transport = match self.transport.subscribe(channel, subscription.callback()) {
            Ok(handle) => Some(handle),
            Err(err) => {
                warn!(
                    receiver_id = ?subscription.receiver_id(),
                    error = %err,
                    "transport refused subscription; only sticky replays will be delivered"
                );
                None
            }
        };

        let (handle, replay) = {
            let mut state = guard.borrow_mut();
            let handle = state.registry.insert(Arc::clone(&subscription), transport);
            (handle, state.sticky.snapshot())
        };

        let (mut replayed, mut panicked) = (0usize, 0usize);
        for entry in &replay {
            match subscription.dispatch(entry.key.event_id, entry.key.receiver_id(), &entry.payload)
            {
                Delivery::Delivered => replayed += 1,
                Delivery::Panicked => panicked += 1,
                Delivery::Skipped => {}
            }
        }
        drop(guard);

        debug!(
            %handle,
            receiver_id = ?subscription.receiver_id(),
            sticky = replay.len(),
            replayed,
            "registered subscription"
        );
        if panicked > 0 {
            warn!(%handle, panicked, "listener panicked during sticky replay");
        }

        Ok(handle)
    }

    /// Remove a subscription. Unknown or already removed handles are ignored.
    pub fn unregister(&self, handle: SubscriptionHandle) -> Result<(), BusError> {
        self.channel()?;

        let guard = self.state.lock();
        let removed = guard.borrow_mut().registry.remove(handle);
        let Some(removed) = removed else {
            debug!(%handle, "unregister for unknown handle ignored");
            return Ok(());
        };

        removed.subscription.deactivate();
        if let Some(transport) = removed.transport {
            self.transport.unsubscribe(transport);
        }
        drop(guard);

        debug!(%handle, "unregistered subscription");
        Ok(())
    }

    /// Publish an event.
    ///
    /// Accepts an event id, `(id, payload)`, `(id, receiver)`,
    /// `(id, receiver, payload)`, or a built [`OutgoingEvent`].
    pub fn send(&self, event: impl Into<OutgoingEvent>) -> Result<(), BusError> {
        self.publish(event.into(), false)
    }

    /// Publish an event and retain its payload as the sticky value for its
    /// routing key, replacing any earlier value.
    pub fn send_sticky(&self, event: impl Into<OutgoingEvent>) -> Result<(), BusError> {
        self.publish(event.into(), true)
    }

    /// Drop the sticky value for `key` and notify with the negated event id.
    ///
    /// Returns whether a value was stored. Without one, nothing is sent.
    pub fn remove_sticky(&self, key: impl Into<RoutingKey>) -> Result<bool, BusError> {
        let channel = self.channel()?;
        let key = key.into();

        let guard = self.state.lock();
        let removed = guard.borrow_mut().sticky.remove(&key);
        let Some(payload) = removed else {
            return Ok(false);
        };
        debug!(event_id = key.event_id, receiver_id = ?key.receiver_id, "sticky value removed");

        self.broadcast(channel, key.negated(), payload);
        drop(guard);
        Ok(true)
    }

    /// Current sticky value for `key`, if any.
    pub fn sticky(&self, key: impl Into<RoutingKey>) -> Result<Option<Arc<Payload>>, BusError> {
        self.channel()?;
        let key = key.into();
        let guard = self.state.lock();
        let value = guard.borrow().sticky.get(&key);
        Ok(value)
    }

    pub fn sticky_count(&self) -> usize {
        let guard = self.state.lock();
        let count = guard.borrow().sticky.len();
        count
    }

    pub fn subscription_count(&self) -> usize {
        let guard = self.state.lock();
        let count = guard.borrow().registry.len();
        count
    }

    fn publish(&self, event: OutgoingEvent, sticky: bool) -> Result<(), BusError> {
        let channel = self.channel()?;
        let key = event.routing_key();
        if sticky && key.event_id == i32::MIN {
            return Err(BusError::InvalidArgument(format!(
                "sticky event id {} has no negated removal id",
                key.event_id
            )));
        }
        let payload = Arc::new(event.payload);

        let guard = self.state.lock();
        if sticky {
            guard
                .borrow_mut()
                .sticky
                .upsert(key.clone(), Arc::clone(&payload));
            debug!(event_id = key.event_id, receiver_id = ?key.receiver_id, "sticky value stored");
        }
        self.broadcast(channel, key, payload);
        drop(guard);
        Ok(())
    }

    /// Hand an occurrence to the transport. Transport failures are logged and
    /// swallowed so they never abort the caller's send.
    fn broadcast(&self, channel: &ChannelId, key: RoutingKey, payload: Arc<Payload>) {
        let topic = channel.topic(&key);
        if let Err(err) = self.transport.publish(&topic, Occurrence::new(key, payload)) {
            warn!(%topic, error = %err, "failed to publish event");
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("channel", &self.channel.get())
            .field("subscriptions", &self.subscription_count())
            .field("sticky", &self.sticky_count())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
