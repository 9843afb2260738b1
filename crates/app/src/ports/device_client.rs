//! Device client port — the remote device contract.
//!
//! A status fetch returns the device's decoded `/status` body; a
//! command send posts an arbitrary key/value payload to `/control`
//! and returns the implementation-defined acknowledgment body. Every
//! call carries a bounded timeout; any transport error, timeout, or
//! non-2xx response surfaces as [`VerdantError::Unreachable`] — the
//! core does not distinguish failure modes.

use std::future::Future;

use verdant_domain::device::Device;
use verdant_domain::error::VerdantError;
use verdant_domain::telemetry::StatusSnapshot;

/// Outbound HTTP access to a greenhouse device.
pub trait DeviceClient {
    /// Fetch and decode the device's status endpoint.
    fn fetch_status(
        &self,
        device: &Device,
    ) -> impl Future<Output = Result<StatusSnapshot, VerdantError>> + Send;

    /// Send a command payload, returning the acknowledgment body.
    fn send_command(
        &self,
        device: &Device,
        payload: serde_json::Value,
    ) -> impl Future<Output = Result<serde_json::Value, VerdantError>> + Send;
}

impl<T: DeviceClient + Send + Sync> DeviceClient for std::sync::Arc<T> {
    fn fetch_status(
        &self,
        device: &Device,
    ) -> impl Future<Output = Result<StatusSnapshot, VerdantError>> + Send {
        (**self).fetch_status(device)
    }

    fn send_command(
        &self,
        device: &Device,
        payload: serde_json::Value,
    ) -> impl Future<Output = Result<serde_json::Value, VerdantError>> + Send {
        (**self).send_command(device, payload)
    }
}
