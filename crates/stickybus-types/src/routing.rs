//! Addressing: routing keys, channel identities, and broadcast topics.
//!
//! A [`RoutingKey`] (event id + optional receiver id) is the only thing that
//! addresses an occurrence, both for live dispatch and for the sticky cache.
//! A [`ChannelId`] is the salted, per-bus identity that keeps two buses sharing
//! one transport apart. A [`Topic`] is the routing key rendered inside a
//! channel, which is what a transport actually publishes on.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::AppContext;
use crate::error::BusError;

/// Address of an event occurrence.
///
/// An empty receiver id is normalized to `None` on construction, so "empty"
/// and "absent" are the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoutingKey {
    pub event_id: i32,
    pub receiver_id: Option<String>,
}

impl RoutingKey {
    pub fn new(event_id: i32, receiver_id: Option<String>) -> Self {
        Self {
            event_id,
            receiver_id: receiver_id.filter(|r| !r.is_empty()),
        }
    }

    /// Key addressed to every subscriber.
    pub fn broadcast(event_id: i32) -> Self {
        Self::new(event_id, None)
    }

    /// Key addressed only to subscribers registered with `receiver_id`.
    pub fn targeted(event_id: i32, receiver_id: impl Into<String>) -> Self {
        Self::new(event_id, Some(receiver_id.into()))
    }

    /// True when the key carries no receiver id.
    pub fn is_broadcast(&self) -> bool {
        self.receiver_id.is_none()
    }

    pub fn receiver_id(&self) -> Option<&str> {
        self.receiver_id.as_deref()
    }

    /// The same key with the event id negated, used for sticky removal notices.
    pub fn negated(&self) -> Self {
        Self {
            event_id: self.event_id.wrapping_neg(),
            receiver_id: self.receiver_id.clone(),
        }
    }

    /// Route segment of the topic: `event_{id}` or `event_{id}_{receiver}`.
    ///
    /// The receiver is percent-encoded, so any string yields a single
    /// topic segment.
    pub fn route(&self) -> String {
        match &self.receiver_id {
            Some(receiver) => format!(
                "event_{}_{}",
                self.event_id,
                urlencoding::encode(receiver)
            ),
            None => format!("event_{}", self.event_id),
        }
    }
}

impl From<i32> for RoutingKey {
    fn from(event_id: i32) -> Self {
        Self::broadcast(event_id)
    }
}

impl From<(i32, &str)> for RoutingKey {
    fn from((event_id, receiver_id): (i32, &str)) -> Self {
        Self::targeted(event_id, receiver_id)
    }
}

impl From<(i32, String)> for RoutingKey {
    fn from((event_id, receiver_id): (i32, String)) -> Self {
        Self::targeted(event_id, receiver_id)
    }
}

impl From<(i32, Option<String>)> for RoutingKey {
    fn from((event_id, receiver_id): (i32, Option<String>)) -> Self {
        Self::new(event_id, receiver_id)
    }
}

impl fmt::Display for RoutingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.route())
    }
}

/// True if `segment` can appear inside a channel identity unescaped.
fn is_topic_safe(segment: &str) -> bool {
    !segment.is_empty()
        && !segment
            .chars()
            .any(|c| c == '/' || c.is_whitespace() || c.is_control())
}

/// Process-unique identity of one bus instance on a broadcast medium.
///
/// Built from the configured prefix, a random salt, and the application id.
/// The salt guarantees that two buses never collide even when they share a
/// transport and an application id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelId {
    prefix: String,
    salt: String,
    app_id: String,
}

impl ChannelId {
    /// Derive a fresh channel identity for `ctx` with a random salt.
    pub fn generate(ctx: &AppContext) -> Result<Self, BusError> {
        Self::with_salt(ctx, Uuid::new_v4().simple().to_string())
    }

    /// Derive a channel identity with an explicit salt.
    pub fn with_salt(ctx: &AppContext, salt: impl Into<String>) -> Result<Self, BusError> {
        let salt = salt.into();
        for (name, value) in [
            ("channel prefix", ctx.channel_prefix.as_str()),
            ("app id", ctx.app_id.as_str()),
            ("salt", salt.as_str()),
        ] {
            if !is_topic_safe(value) {
                return Err(BusError::Config(format!("invalid {name}: '{value}'")));
            }
        }
        Ok(Self {
            prefix: ctx.channel_prefix.clone(),
            salt,
            app_id: ctx.app_id.clone(),
        })
    }

    /// Base type shared by every topic on this channel: `{prefix}.{salt}`.
    pub fn base(&self) -> String {
        format!("{}.{}", self.prefix, self.salt)
    }

    /// Action name a transport filters on: `action_{prefix}_{salt}_{app_id}`.
    pub fn action(&self) -> String {
        format!(
            "action_{}_{}_{}",
            self.prefix.replace('.', "_"),
            self.salt,
            self.app_id
        )
    }

    pub fn salt(&self) -> &str {
        &self.salt
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Topic for `key` on this channel.
    pub fn topic(&self, key: &RoutingKey) -> Topic {
        Topic {
            channel: self.clone(),
            route: key.route(),
        }
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.action())
    }
}

/// A routing key rendered inside a channel: `{base}/{route}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topic {
    channel: ChannelId,
    route: String,
}

impl Topic {
    pub fn channel(&self) -> &ChannelId {
        &self.channel
    }

    pub fn route(&self) -> &str {
        &self.route
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.channel.base(), self.route)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
