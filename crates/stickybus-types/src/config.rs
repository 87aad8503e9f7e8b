//! Bus configuration types.
//!
//! `BusConfig` represents the `stickybus.toml` file that selects the
//! application identity, the channel prefix, and the broadcast transport.

use serde::{Deserialize, Serialize};

use crate::context::DEFAULT_CHANNEL_PREFIX;

/// Which broadcast transport the host wires into the bus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Synchronous callback dispatch on the publishing thread.
    #[default]
    InMemory,
    /// `tokio::sync::broadcast` channel with one forwarding task per subscription.
    Broadcast,
}

/// Top-level configuration for a bus instance.
///
/// All fields have sensible defaults, so an empty file is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusConfig {
    /// Process/package identifier mixed into the channel identity.
    #[serde(default = "default_app_id")]
    pub app_id: String,

    #[serde(default = "default_channel_prefix")]
    pub channel_prefix: String,

    #[serde(default)]
    pub transport: TransportKind,

    /// Ring buffer size for the broadcast transport (clamped to at least 1).
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
}

fn default_app_id() -> String {
    "stickybus".to_string()
}

fn default_channel_prefix() -> String {
    DEFAULT_CHANNEL_PREFIX.to_string()
}

fn default_broadcast_capacity() -> usize {
    1024
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            app_id: default_app_id(),
            channel_prefix: default_channel_prefix(),
            transport: TransportKind::default(),
            broadcast_capacity: default_broadcast_capacity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bus_config_default_values() {
        let config = BusConfig::default();
        assert_eq!(config.app_id, "stickybus");
        assert_eq!(config.channel_prefix, DEFAULT_CHANNEL_PREFIX);
        assert_eq!(config.transport, TransportKind::InMemory);
        assert_eq!(config.broadcast_capacity, 1024);
    }

    #[test]
    fn test_bus_config_deserialize_with_defaults() {
        let config: BusConfig = toml::from_str("").unwrap();
        assert_eq!(config, BusConfig::default());
    }

    #[test]
    fn test_bus_config_deserialize_with_values() {
        let toml_str = r#"
app_id = "com.example.notes"
channel_prefix = "vnd.notes.events"
transport = "broadcast"
broadcast_capacity = 64
"#;
        let config: BusConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.app_id, "com.example.notes");
        assert_eq!(config.channel_prefix, "vnd.notes.events");
        assert_eq!(config.transport, TransportKind::Broadcast);
        assert_eq!(config.broadcast_capacity, 64);
    }

    #[test]
    fn test_unknown_transport_is_rejected() {
        let result: Result<BusConfig, _> = toml::from_str(r#"transport = "carrier_pigeon""#);
        assert!(result.is_err());
    }
}
