//! Subscription registry and handle allocation.
//!
//! Handles come from a counter that starts at 1 and only ever moves forward,
//! so a handle is never reused within the lifetime of a registry, even after
//! the subscription it named has been unregistered.

pub mod subscription;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub use subscription::{Delivery, Subscription};

use crate::transport::TransportHandle;

/// Token returned by `EventBus::register`, used to unregister later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionHandle(pub(crate) u64);

impl SubscriptionHandle {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A live registry entry: the subscription and its transport attachment.
///
/// `transport` is `None` when the transport refused the subscription; the
/// subscription then only sees sticky replays.
#[derive(Debug)]
pub struct Registered {
    pub subscription: Arc<Subscription>,
    pub transport: Option<TransportHandle>,
}

/// Map from handle to live subscription.
///
/// Not synchronized on its own; the bus keeps it inside its critical section.
#[derive(Debug, Default)]
pub struct Registry {
    last_handle: u64,
    entries: HashMap<SubscriptionHandle, Registered>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a subscription under the next handle.
    pub fn insert(
        &mut self,
        subscription: Arc<Subscription>,
        transport: Option<TransportHandle>,
    ) -> SubscriptionHandle {
        self.last_handle += 1;
        let handle = SubscriptionHandle(self.last_handle);
        self.entries.insert(
            handle,
            Registered {
                subscription,
                transport,
            },
        );
        handle
    }

    /// Remove a subscription. Unknown handles yield `None`.
    pub fn remove(&mut self, handle: SubscriptionHandle) -> Option<Registered> {
        self.entries.remove(&handle)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
