//! Shared domain types for stickybus.
//!
//! This crate contains the leaf types used across the bus: payloads, routing
//! keys and topics, the channel identity, event occurrences, configuration,
//! and the error type.
//!
//! Zero infrastructure dependencies -- only serde, uuid, urlencoding, thiserror.

pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod payload;
pub mod routing;
