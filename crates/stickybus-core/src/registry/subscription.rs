//! Subscription records and the targeting rule.
//!
//! Every occurrence is offered to every live subscription; the subscription
//! alone decides whether its listener runs:
//! - no receiver id on the occurrence: deliver with `is_broadcast = true`,
//!   whatever receiver the subscription was registered for;
//! - a receiver id: deliver with `is_broadcast = false` only when it equals
//!   the subscription's own receiver id.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use stickybus_types::event::Occurrence;
use stickybus_types::payload::Payload;
use tracing::error;

use crate::listener::EventListener;
use crate::transport::TransportCallback;

/// Outcome of offering one occurrence to one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The listener ran to completion.
    Delivered,
    /// The occurrence was addressed to another receiver, or the subscription is gone.
    Skipped,
    /// The listener panicked; the panic was contained.
    Panicked,
}

/// Decide whether an occurrence targeted at `target` reaches a subscription
/// registered for `own`. Returns the `is_broadcast` flag when it does.
pub fn route(target: Option<&str>, own: Option<&str>) -> Option<bool> {
    match target {
        None => Some(true),
        Some(target) if own == Some(target) => Some(false),
        Some(_) => None,
    }
}

/// A registered listener with its optional receiver scope.
pub struct Subscription {
    receiver_id: Option<String>,
    listener: Arc<dyn EventListener>,
    active: AtomicBool,
}

impl Subscription {
    pub fn new(receiver_id: Option<String>, listener: Arc<dyn EventListener>) -> Self {
        Self {
            receiver_id,
            listener,
            active: AtomicBool::new(true),
        }
    }

    pub fn receiver_id(&self) -> Option<&str> {
        self.receiver_id.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Stop all further deliveries, including ones already in flight on an
    /// asynchronous transport.
    pub fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
    }

    /// Apply the targeting rule and invoke the listener if addressed.
    ///
    /// A panicking listener is caught and logged so the remaining
    /// subscriptions of the same dispatch pass still receive the event.
    pub fn dispatch(&self, event_id: i32, target: Option<&str>, payload: &Payload) -> Delivery {
        if !self.is_active() {
            return Delivery::Skipped;
        }
        let Some(is_broadcast) = route(target, self.receiver_id()) else {
            return Delivery::Skipped;
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.listener.on_event(event_id, payload, is_broadcast)
        }));

        match outcome {
            Ok(()) => Delivery::Delivered,
            Err(panic_err) => {
                let info = if let Some(msg) = panic_err.downcast_ref::<&'static str>() {
                    (*msg).to_string()
                } else if let Some(msg) = panic_err.downcast_ref::<String>() {
                    msg.clone()
                } else {
                    "unknown panic".to_string()
                };
                error!(
                    event_id,
                    receiver_id = ?self.receiver_id,
                    panic = %info,
                    "event listener panicked"
                );
                Delivery::Panicked
            }
        }
    }

    pub fn dispatch_occurrence(&self, occurrence: &Occurrence) -> Delivery {
        self.dispatch(
            occurrence.event_id(),
            occurrence.receiver_id(),
            &occurrence.payload,
        )
    }

    /// Transport callback feeding occurrences into this subscription.
    pub fn callback(self: &Arc<Self>) -> TransportCallback {
        let subscription = Arc::clone(self);
        Arc::new(move |occurrence: &Occurrence| {
            subscription.dispatch_occurrence(occurrence);
        })
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("receiver_id", &self.receiver_id)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    type Calls = Arc<Mutex<Vec<(i32, bool)>>>;

    fn recording(receiver_id: Option<&str>) -> (Calls, Subscription) {
        let calls: Calls = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&calls);
        let listener = move |id: i32, _p: &Payload, broadcast: bool| {
            sink.lock().unwrap().push((id, broadcast));
        };
        let sub = Subscription::new(receiver_id.map(str::to_string), Arc::new(listener));
        (calls, sub)
    }

    #[test]
    fn route_table() {
        assert_eq!(route(None, None), Some(true));
        assert_eq!(route(None, Some("r1")), Some(true));
        assert_eq!(route(Some("r1"), Some("r1")), Some(false));
        assert_eq!(route(Some("r1"), Some("r2")), None);
        assert_eq!(route(Some("r1"), None), None);
    }

    #[test]
    fn untargeted_reaches_scoped_subscription_as_broadcast() {
        let (calls, sub) = recording(Some("r1"));
        assert_eq!(sub.dispatch(5, None, &Payload::new()), Delivery::Delivered);
        assert_eq!(*calls.lock().unwrap(), vec![(5, true)]);
    }

    #[test]
    fn targeted_reaches_only_matching_receiver() {
        let (calls, sub) = recording(Some("r1"));
        assert_eq!(sub.dispatch(5, Some("r2"), &Payload::new()), Delivery::Skipped);
        assert_eq!(sub.dispatch(5, Some("r1"), &Payload::new()), Delivery::Delivered);
        assert_eq!(*calls.lock().unwrap(), vec![(5, false)]);
    }

    #[test]
    fn inactive_subscription_is_skipped() {
        let (calls, sub) = recording(None);
        sub.deactivate();
        assert_eq!(sub.dispatch(1, None, &Payload::new()), Delivery::Skipped);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn panicking_listener_is_contained() {
        struct Exploding;
        impl EventListener for Exploding {
            fn on_event(&self, _event_id: i32, _payload: &Payload, _is_broadcast: bool) {
                panic!("listener blew up");
            }
        }
        let sub = Subscription::new(None, Arc::new(Exploding));
        assert_eq!(sub.dispatch(1, None, &Payload::new()), Delivery::Panicked);
        // Still usable afterwards.
        assert!(sub.is_active());
    }
}
