//! Listener capability invoked for every delivered event.

use stickybus_types::payload::Payload;

/// Receives events delivered to a subscription.
///
/// `is_broadcast` is true when the occurrence carried no receiver id, i.e. it
/// was addressed to every subscriber rather than narrowcast.
///
/// Any `Fn(i32, &Payload, bool) + Send + Sync` closure is a listener.
pub trait EventListener: Send + Sync {
    fn on_event(&self, event_id: i32, payload: &Payload, is_broadcast: bool);
}

impl<F> EventListener for F
where
    F: Fn(i32, &Payload, bool) + Send + Sync,
{
    fn on_event(&self, event_id: i32, payload: &Payload, is_broadcast: bool) {
        self(event_id, payload, is_broadcast)
    }
}
