//! Infrastructure layer for stickybus.
//!
//! Contains implementations of the `BroadcastTransport` port defined in
//! `stickybus-core` (a `tokio::sync::broadcast` adapter), the `stickybus.toml`
//! loader, and the factory wiring a config into an initialized `EventBus`.

pub mod config;
pub mod factory;
pub mod transport;

pub use factory::{build_bus, build_transport};
pub use transport::TokioBroadcastTransport;
