//! Host application context handed to `EventBus::init`.

use serde::{Deserialize, Serialize};

use crate::config::BusConfig;

/// Default prefix of every channel base type.
pub const DEFAULT_CHANNEL_PREFIX: &str = "vnd.stickybus.events";

/// Identity of the host application owning a bus.
///
/// The `app_id` plays the role of a package name: it is mixed into the
/// channel action so buses of different applications stay apart even before
/// the random salt is considered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppContext {
    pub app_id: String,
    pub channel_prefix: String,
}

impl AppContext {
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            channel_prefix: DEFAULT_CHANNEL_PREFIX.to_string(),
        }
    }

    pub fn with_channel_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.channel_prefix = prefix.into();
        self
    }
}

impl From<&BusConfig> for AppContext {
    fn from(config: &BusConfig) -> Self {
        Self {
            app_id: config.app_id.clone(),
            channel_prefix: config.channel_prefix.clone(),
        }
    }
}
