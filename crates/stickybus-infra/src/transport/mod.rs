//! Transport adapters backed by async runtimes.

pub mod broadcast;

pub use broadcast::TokioBroadcastTransport;
