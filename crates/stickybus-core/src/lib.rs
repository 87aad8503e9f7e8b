//! Event registry and dispatch engine for stickybus.
//!
//! This crate defines the `BroadcastTransport` port that transport adapters
//! implement, plus everything that owns real invariants: the subscription
//! registry and its handle allocation, the sticky store, the targeting rule,
//! and the `EventBus` facade composing them. It depends only on
//! `stickybus-types` -- never on `stickybus-infra`.

pub mod event;
pub mod listener;
pub mod registry;
pub mod sticky;
pub mod transport;

pub use event::EventBus;
pub use listener::EventListener;
pub use registry::SubscriptionHandle;
pub use transport::{BroadcastTransport, InMemoryTransport, TransportCallback, TransportHandle};
