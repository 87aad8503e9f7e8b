//! Observability setup for stickybus hosts.
//!
//! The bus crates only emit `tracing` events; this crate installs the global
//! subscriber that renders them.

pub mod tracing_setup;

pub use tracing_setup::{TracingOptions, init_tracing, shutdown_tracing};
