//! Device — a network sensor/actuator node polled over HTTP.

use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, VerdantError};
use crate::id::DeviceId;
use crate::time::Timestamp;

/// Reachability of a device as observed by the poll supervisor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    /// Never polled (or status lost).
    #[default]
    Unknown,
    /// Last poll succeeded.
    Online,
    /// Last poll failed.
    Offline,
}

impl std::fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => f.write_str("unknown"),
            Self::Online => f.write_str("online"),
            Self::Offline => f.write_str("offline"),
        }
    }
}

/// A network device in the greenhouse (ESP-class sensor/actuator node).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    /// Free-form category: `climate`, `irrigation`, `light`, …
    pub device_type: String,
    /// Hostname or IP address.
    pub host: String,
    pub port: u16,
    /// Seconds between polls.
    pub poll_interval_secs: u64,
    pub enabled: bool,
    pub status: DeviceStatus,
    pub last_seen: Option<Timestamp>,
    pub firmware_version: Option<String>,
    pub mac_address: Option<String>,
    pub description: Option<String>,
    pub created_at: Timestamp,
}

impl Device {
    /// Create a builder for constructing a [`Device`].
    #[must_use]
    pub fn builder() -> DeviceBuilder {
        DeviceBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`VerdantError::Validation`] when:
    /// - `name` is empty ([`ValidationError::EmptyName`])
    /// - `host` is empty ([`ValidationError::EmptyHost`])
    /// - `poll_interval_secs` is zero ([`ValidationError::ZeroPollInterval`])
    pub fn validate(&self) -> Result<(), VerdantError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        if self.host.is_empty() {
            return Err(ValidationError::EmptyHost.into());
        }
        if self.poll_interval_secs == 0 {
            return Err(ValidationError::ZeroPollInterval.into());
        }
        Ok(())
    }

    /// Base URL of the device's HTTP endpoint.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Step-by-step builder for [`Device`].
#[derive(Debug, Default)]
pub struct DeviceBuilder {
    id: Option<DeviceId>,
    name: Option<String>,
    device_type: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    poll_interval_secs: Option<u64>,
    enabled: Option<bool>,
    status: Option<DeviceStatus>,
    description: Option<String>,
}

impl DeviceBuilder {
    #[must_use]
    pub fn id(mut self, id: DeviceId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn device_type(mut self, device_type: impl Into<String>) -> Self {
        self.device_type = Some(device_type.into());
        self
    }

    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    #[must_use]
    pub fn poll_interval_secs(mut self, secs: u64) -> Self {
        self.poll_interval_secs = Some(secs);
        self
    }

    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    #[must_use]
    pub fn status(mut self, status: DeviceStatus) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Consume the builder, validate, and return a [`Device`].
    ///
    /// # Errors
    ///
    /// Returns [`VerdantError::Validation`] if required fields are missing or empty.
    pub fn build(self) -> Result<Device, VerdantError> {
        let device = Device {
            id: self.id.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            device_type: self.device_type.unwrap_or_else(|| "generic".to_string()),
            host: self.host.unwrap_or_default(),
            port: self.port.unwrap_or(80),
            poll_interval_secs: self.poll_interval_secs.unwrap_or(5),
            enabled: self.enabled.unwrap_or(true),
            status: self.status.unwrap_or_default(),
            last_seen: None,
            firmware_version: None,
            mac_address: None,
            description: self.description,
            created_at: crate::time::now(),
        };
        device.validate()?;
        Ok(device)
    }
}
