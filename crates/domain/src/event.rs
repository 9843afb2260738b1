//! Event — the envelope published through the hub.
//!
//! Every published message has the shape
//! `{channel, kind, payload, timestamp}`. Channels are a fixed set;
//! `all` exists only as a subscription wildcard ([`Topic::All`]) and
//! is never a publish target.

use serde::{Deserialize, Serialize};

use crate::time::Timestamp;

/// Fixed publish channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Telemetry batches from device polls.
    Sensors,
    /// Local pin assignments and value changes.
    Gpio,
    /// New alerts and rule firings.
    Alerts,
    /// Device status transitions.
    Devices,
    /// Runtime lifecycle notices.
    System,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sensors => f.write_str("sensors"),
            Self::Gpio => f.write_str("gpio"),
            Self::Alerts => f.write_str("alerts"),
            Self::Devices => f.write_str("devices"),
            Self::System => f.write_str("system"),
        }
    }
}

impl std::str::FromStr for Channel {
    type Err = UnknownChannel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sensors" => Ok(Self::Sensors),
            "gpio" => Ok(Self::Gpio),
            "alerts" => Ok(Self::Alerts),
            "devices" => Ok(Self::Devices),
            "system" => Ok(Self::System),
            _ => Err(UnknownChannel(s.to_string())),
        }
    }
}

/// Parse failure for [`Channel`] / [`Topic`].
#[derive(Debug, thiserror::Error)]
#[error("unknown channel: {0}")]
pub struct UnknownChannel(pub String);

/// A subscriber's expression of interest: a concrete channel, or the
/// `all` wildcard matching every channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    All,
    #[serde(untagged)]
    Channel(Channel),
}

impl Topic {
    /// Whether this topic covers `channel`.
    #[must_use]
    pub fn covers(self, channel: Channel) -> bool {
        match self {
            Self::All => true,
            Self::Channel(c) => c == channel,
        }
    }
}

impl std::str::FromStr for Topic {
    type Err = UnknownChannel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            return Ok(Self::All);
        }
        s.parse().map(Self::Channel)
    }
}

/// A published message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub channel: Channel,
    /// Event kind within the channel, e.g. `update`, `status_change`.
    pub kind: String,
    pub payload: serde_json::Value,
    pub timestamp: Timestamp,
}

impl Event {
    /// Create an event stamped with the current time.
    #[must_use]
    pub fn new(channel: Channel, kind: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            channel,
            kind: kind.into(),
            payload,
            timestamp: crate::time::now(),
        }
    }
}
