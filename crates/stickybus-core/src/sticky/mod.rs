//! Last-value cache for sticky events.

pub mod store;

pub use store::{StickyEntry, StickyStore};
