//! Storage ports — repository traits over the record-store collaborator.
//!
//! The record store serializes its own writes; the core assumes no
//! stale-read guarantee and never spans transactions across records.

use std::future::Future;

use verdant_domain::alert::Alert;
use verdant_domain::device::{Device, DeviceStatus};
use verdant_domain::error::VerdantError;
use verdant_domain::id::{AlertId, DeviceId, RuleId};
use verdant_domain::pin::PinConfig;
use verdant_domain::rule::Rule;
use verdant_domain::telemetry::TelemetryPoint;
use verdant_domain::time::Timestamp;

/// Repository for persisting and querying [`Device`]s.
pub trait DeviceRepository {
    /// Create a new device in storage.
    fn create(&self, device: Device) -> impl Future<Output = Result<Device, VerdantError>> + Send;

    /// Get a device by its unique identifier.
    fn get_by_id(
        &self,
        id: DeviceId,
    ) -> impl Future<Output = Result<Option<Device>, VerdantError>> + Send;

    /// Get all devices.
    fn get_all(&self) -> impl Future<Output = Result<Vec<Device>, VerdantError>> + Send;

    /// Get all enabled devices.
    fn get_enabled(&self) -> impl Future<Output = Result<Vec<Device>, VerdantError>> + Send;

    /// Update an existing device.
    fn update(&self, device: Device) -> impl Future<Output = Result<Device, VerdantError>> + Send;

    /// Record a poll outcome: status, and on success the last-seen
    /// time plus any reported identifiers.
    fn record_poll_outcome(
        &self,
        id: DeviceId,
        status: DeviceStatus,
        last_seen: Option<Timestamp>,
        firmware_version: Option<String>,
        mac_address: Option<String>,
    ) -> impl Future<Output = Result<(), VerdantError>> + Send;

    /// Delete a device by its unique identifier.
    fn delete(&self, id: DeviceId) -> impl Future<Output = Result<(), VerdantError>> + Send;
}

impl<T: DeviceRepository + Send + Sync> DeviceRepository for std::sync::Arc<T> {
    fn create(&self, device: Device) -> impl Future<Output = Result<Device, VerdantError>> + Send {
        (**self).create(device)
    }

    fn get_by_id(
        &self,
        id: DeviceId,
    ) -> impl Future<Output = Result<Option<Device>, VerdantError>> + Send {
        (**self).get_by_id(id)
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<Device>, VerdantError>> + Send {
        (**self).get_all()
    }

    fn get_enabled(&self) -> impl Future<Output = Result<Vec<Device>, VerdantError>> + Send {
        (**self).get_enabled()
    }

    fn update(&self, device: Device) -> impl Future<Output = Result<Device, VerdantError>> + Send {
        (**self).update(device)
    }

    fn record_poll_outcome(
        &self,
        id: DeviceId,
        status: DeviceStatus,
        last_seen: Option<Timestamp>,
        firmware_version: Option<String>,
        mac_address: Option<String>,
    ) -> impl Future<Output = Result<(), VerdantError>> + Send {
        (**self).record_poll_outcome(id, status, last_seen, firmware_version, mac_address)
    }

    fn delete(&self, id: DeviceId) -> impl Future<Output = Result<(), VerdantError>> + Send {
        (**self).delete(id)
    }
}

/// Repository for persisting and querying [`Rule`]s.
pub trait RuleRepository {
    /// Create a new rule in storage.
    fn create(&self, rule: Rule) -> impl Future<Output = Result<Rule, VerdantError>> + Send;

    /// Get a rule by its unique identifier.
    fn get_by_id(
        &self,
        id: RuleId,
    ) -> impl Future<Output = Result<Option<Rule>, VerdantError>> + Send;

    /// Get all rules.
    fn get_all(&self) -> impl Future<Output = Result<Vec<Rule>, VerdantError>> + Send;

    /// Get all enabled rules.
    fn get_enabled(&self) -> impl Future<Output = Result<Vec<Rule>, VerdantError>> + Send;

    /// Update an existing rule.
    fn update(&self, rule: Rule) -> impl Future<Output = Result<Rule, VerdantError>> + Send;

    /// Persist a firing: set `last_triggered` to `at`.
    fn mark_triggered(
        &self,
        id: RuleId,
        at: Timestamp,
    ) -> impl Future<Output = Result<(), VerdantError>> + Send;

    /// Delete a rule by its unique identifier.
    fn delete(&self, id: RuleId) -> impl Future<Output = Result<(), VerdantError>> + Send;
}

impl<T: RuleRepository + Send + Sync> RuleRepository for std::sync::Arc<T> {
    fn create(&self, rule: Rule) -> impl Future<Output = Result<Rule, VerdantError>> + Send {
        (**self).create(rule)
    }

    fn get_by_id(
        &self,
        id: RuleId,
    ) -> impl Future<Output = Result<Option<Rule>, VerdantError>> + Send {
        (**self).get_by_id(id)
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<Rule>, VerdantError>> + Send {
        (**self).get_all()
    }

    fn get_enabled(&self) -> impl Future<Output = Result<Vec<Rule>, VerdantError>> + Send {
        (**self).get_enabled()
    }

    fn update(&self, rule: Rule) -> impl Future<Output = Result<Rule, VerdantError>> + Send {
        (**self).update(rule)
    }

    fn mark_triggered(
        &self,
        id: RuleId,
        at: Timestamp,
    ) -> impl Future<Output = Result<(), VerdantError>> + Send {
        (**self).mark_triggered(id, at)
    }

    fn delete(&self, id: RuleId) -> impl Future<Output = Result<(), VerdantError>> + Send {
        (**self).delete(id)
    }
}

/// Repository for persisted pin configuration (warm-restart source).
pub trait PinRepository {
    /// Get all configured pins.
    fn get_all(&self) -> impl Future<Output = Result<Vec<PinConfig>, VerdantError>> + Send;

    /// Get one pin by BCM number.
    fn get_by_number(
        &self,
        number: u8,
    ) -> impl Future<Output = Result<Option<PinConfig>, VerdantError>> + Send;

    /// Create or replace a pin's configuration.
    fn upsert(&self, pin: PinConfig) -> impl Future<Output = Result<(), VerdantError>> + Send;

    /// Persist the duty fraction of a PWM pin.
    fn set_pwm_value(
        &self,
        number: u8,
        value: f64,
    ) -> impl Future<Output = Result<(), VerdantError>> + Send;

    /// Remove a pin's configuration.
    fn delete(&self, number: u8) -> impl Future<Output = Result<(), VerdantError>> + Send;
}

impl<T: PinRepository + Send + Sync> PinRepository for std::sync::Arc<T> {
    fn get_all(&self) -> impl Future<Output = Result<Vec<PinConfig>, VerdantError>> + Send {
        (**self).get_all()
    }

    fn get_by_number(
        &self,
        number: u8,
    ) -> impl Future<Output = Result<Option<PinConfig>, VerdantError>> + Send {
        (**self).get_by_number(number)
    }

    fn upsert(&self, pin: PinConfig) -> impl Future<Output = Result<(), VerdantError>> + Send {
        (**self).upsert(pin)
    }

    fn set_pwm_value(
        &self,
        number: u8,
        value: f64,
    ) -> impl Future<Output = Result<(), VerdantError>> + Send {
        (**self).set_pwm_value(number, value)
    }

    fn delete(&self, number: u8) -> impl Future<Output = Result<(), VerdantError>> + Send {
        (**self).delete(number)
    }
}

/// Repository for [`Alert`] records.
pub trait AlertRepository {
    /// Append a new alert.
    fn create(&self, alert: Alert) -> impl Future<Output = Result<Alert, VerdantError>> + Send;

    /// Most recent alerts, newest first.
    fn get_recent(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Alert>, VerdantError>> + Send;

    /// Mark an alert acknowledged.
    fn acknowledge(&self, id: AlertId) -> impl Future<Output = Result<(), VerdantError>> + Send;
}

impl<T: AlertRepository + Send + Sync> AlertRepository for std::sync::Arc<T> {
    fn create(&self, alert: Alert) -> impl Future<Output = Result<Alert, VerdantError>> + Send {
        (**self).create(alert)
    }

    fn get_recent(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Alert>, VerdantError>> + Send {
        (**self).get_recent(limit)
    }

    fn acknowledge(&self, id: AlertId) -> impl Future<Output = Result<(), VerdantError>> + Send {
        (**self).acknowledge(id)
    }
}

/// Append-only store for sensor readings.
pub trait TelemetryStore {
    /// Append one reading.
    fn append(
        &self,
        point: TelemetryPoint,
    ) -> impl Future<Output = Result<(), VerdantError>> + Send;

    /// Most recent readings for a device, newest first.
    fn recent_for_device(
        &self,
        device_id: DeviceId,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<TelemetryPoint>, VerdantError>> + Send;
}

impl<T: TelemetryStore + Send + Sync> TelemetryStore for std::sync::Arc<T> {
    fn append(
        &self,
        point: TelemetryPoint,
    ) -> impl Future<Output = Result<(), VerdantError>> + Send {
        (**self).append(point)
    }

    fn recent_for_device(
        &self,
        device_id: DeviceId,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<TelemetryPoint>, VerdantError>> + Send {
        (**self).recent_for_device(device_id, limit)
    }
}
