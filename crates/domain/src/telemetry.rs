//! Telemetry — sensor readings and the remote status wire shape.
//!
//! A device's `/status` endpoint returns a JSON object like:
//!
//! ```json
//! {
//!     "sensors": {
//!         "temperature": {"value": 24.5, "unit": "C"},
//!         "humidity": 65.2
//!     },
//!     "actuators": {"relay1": 0, "pwm": 128},
//!     "info": {"firmware": "1.0.0", "mac": "AA:BB:CC:DD:EE:FF", "uptime": 3600}
//! }
//! ```
//!
//! Sensor values come either as a bare number or as a `{value, unit}`
//! object; both forms are accepted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::id::DeviceId;
use crate::time::Timestamp;

/// One appended sensor reading. Append-only, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryPoint {
    pub device_id: DeviceId,
    /// Sensor key: `temperature`, `humidity`, `soil_moisture`, …
    pub sensor: String,
    pub value: f64,
    pub unit: Option<String>,
    pub timestamp: Timestamp,
}

impl TelemetryPoint {
    /// Create a point stamped with the current time.
    #[must_use]
    pub fn new(device_id: DeviceId, sensor: impl Into<String>, value: f64, unit: Option<String>) -> Self {
        Self {
            device_id,
            sensor: sensor.into(),
            value,
            unit,
            timestamp: crate::time::now(),
        }
    }
}

/// A sensor value as reported over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SensorValue {
    /// Detailed form: `{"value": 24.5, "unit": "C"}`.
    Detailed { value: f64, unit: Option<String> },
    /// Bare numeric form: `24.5`.
    Bare(f64),
}

impl SensorValue {
    /// Numeric value regardless of form.
    #[must_use]
    pub fn value(&self) -> f64 {
        match self {
            Self::Detailed { value, .. } => *value,
            Self::Bare(value) => *value,
        }
    }

    /// Unit, when the detailed form carried one.
    #[must_use]
    pub fn unit(&self) -> Option<&str> {
        match self {
            Self::Detailed { unit, .. } => unit.as_deref(),
            Self::Bare(_) => None,
        }
    }
}

/// Firmware/identity block of a status response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub firmware: Option<String>,
    pub mac: Option<String>,
    pub uptime: Option<u64>,
}

/// Full decoded body of one successful `/status` poll.
///
/// All sections are optional; a device may report sensors only,
/// actuators only, or nothing but a heartbeat.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusSnapshot {
    #[serde(default)]
    pub sensors: BTreeMap<String, SensorValue>,
    /// Actuator states, carried opaquely into the telemetry event.
    #[serde(default)]
    pub actuators: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub info: Option<DeviceInfo>,
}

impl StatusSnapshot {
    /// Numeric value of a sensor key, if present.
    #[must_use]
    pub fn sensor_value(&self, key: &str) -> Option<f64> {
        self.sensors.get(key).map(SensorValue::value)
    }
}
