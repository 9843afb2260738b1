//! Alert — an edge-triggered notification.
//!
//! Alerts are created on status transitions (one per online/offline
//! edge, never per failed poll) and on rule firings.

use serde::{Deserialize, Serialize};

use crate::id::{AlertId, DeviceId};
use crate::time::Timestamp;

/// Severity of an alert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    #[default]
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => f.write_str("info"),
            Self::Warning => f.write_str("warning"),
            Self::Error => f.write_str("error"),
            Self::Critical => f.write_str("critical"),
        }
    }
}

/// A notification record, optionally tied to a device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    pub device_id: Option<DeviceId>,
    pub level: AlertLevel,
    pub message: String,
    pub acknowledged: bool,
    pub created_at: Timestamp,
}

impl Alert {
    /// Create an unacknowledged alert stamped with the current time.
    #[must_use]
    pub fn new(device_id: Option<DeviceId>, level: AlertLevel, message: impl Into<String>) -> Self {
        Self {
            id: AlertId::new(),
            device_id,
            level,
            message: message.into(),
            acknowledged: false,
            created_at: crate::time::now(),
        }
    }
}
