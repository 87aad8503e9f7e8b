//! Publish/subscribe bus with sticky events.
//!
//! Provides an `EventBus` that routes integer-identified events to registered
//! listeners through a `BroadcastTransport`, and remembers the last payload of
//! sticky events for listeners that register later.

pub mod bus;

pub use bus::EventBus;
