//! Wiring: configuration to transport to initialized bus.

use std::sync::Arc;

use stickybus_core::EventBus;
use stickybus_core::transport::{BroadcastTransport, InMemoryTransport};
use stickybus_types::config::{BusConfig, TransportKind};
use stickybus_types::context::AppContext;
use stickybus_types::error::BusError;
use tracing::info;

use crate::transport::TokioBroadcastTransport;

/// Construct the transport selected by `config`.
///
/// The broadcast transport needs a running tokio runtime.
pub fn build_transport(config: &BusConfig) -> Result<Arc<dyn BroadcastTransport>, BusError> {
    let transport: Arc<dyn BroadcastTransport> = match config.transport {
        TransportKind::InMemory => Arc::new(InMemoryTransport::new()),
        TransportKind::Broadcast => {
            Arc::new(TokioBroadcastTransport::new(config.broadcast_capacity)?)
        }
    };
    Ok(transport)
}

/// Build an initialized bus for `config`.
pub fn build_bus(config: &BusConfig) -> Result<EventBus, BusError> {
    let transport = build_transport(config)?;
    let bus = EventBus::with_context(transport, &AppContext::from(config))?;
    info!(
        app_id = %config.app_id,
        transport = ?config.transport,
        "event bus ready"
    );
    Ok(bus)
}
