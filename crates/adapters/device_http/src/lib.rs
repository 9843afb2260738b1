//! # verdant-adapter-device-http
//!
//! HTTP client adapter using [reqwest](https://docs.rs/reqwest).
//!
//! ## Responsibilities
//! - Implement the `DeviceClient` port defined in `verdant-app`
//! - Fetch and decode `GET {base_url}/status`
//! - Post command payloads to `POST {base_url}/control`
//!
//! Greenhouse nodes are small ESP-class boards on flaky Wi-Fi: every
//! request carries the configured timeout, and timeouts, refused
//! connections, and non-2xx responses are all reported uniformly as
//! [`VerdantError::Unreachable`].
//!
//! ## Dependency rule
//! Depends on `verdant-app` (for the port trait) and `verdant-domain`
//! (for domain types). The `app` and `domain` crates must never
//! reference this adapter.

use std::future::Future;
use std::time::Duration;

use verdant_app::ports::DeviceClient;
use verdant_domain::device::Device;
use verdant_domain::error::VerdantError;
use verdant_domain::telemetry::StatusSnapshot;

/// Errors originating from the HTTP transport.
#[derive(Debug, thiserror::Error)]
pub enum DeviceHttpError {
    /// Connection, timeout, decode, or status failure.
    #[error("device request failed")]
    Transport(#[from] reqwest::Error),
}

impl From<DeviceHttpError> for VerdantError {
    fn from(err: DeviceHttpError) -> Self {
        Self::Unreachable(Box::new(err))
    }
}

/// Default per-request timeout when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// [`DeviceClient`] implementation over plain HTTP.
///
/// Cheap to clone: the inner `reqwest::Client` shares its connection
/// pool across clones.
#[derive(Debug, Clone)]
pub struct HttpDeviceClient {
    client: reqwest::Client,
}

impl HttpDeviceClient {
    /// Build a client whose requests all time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceHttpError`] when the client cannot be
    /// constructed.
    pub fn new(timeout: Duration) -> Result<Self, DeviceHttpError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl DeviceClient for HttpDeviceClient {
    #[tracing::instrument(skip(self, device), fields(device_id = %device.id))]
    fn fetch_status(
        &self,
        device: &Device,
    ) -> impl Future<Output = Result<StatusSnapshot, VerdantError>> + Send {
        let client = self.client.clone();
        let url = format!("{}/status", device.base_url());
        async move {
            let snapshot = client
                .get(&url)
                .send()
                .await
                .and_then(reqwest::Response::error_for_status)
                .map_err(DeviceHttpError::from)?
                .json::<StatusSnapshot>()
                .await
                .map_err(DeviceHttpError::from)?;
            Ok(snapshot)
        }
    }

    #[tracing::instrument(skip(self, device, payload), fields(device_id = %device.id))]
    fn send_command(
        &self,
        device: &Device,
        payload: serde_json::Value,
    ) -> impl Future<Output = Result<serde_json::Value, VerdantError>> + Send {
        let client = self.client.clone();
        let url = format!("{}/control", device.base_url());
        async move {
            let ack = client
                .post(&url)
                .json(&payload)
                .send()
                .await
                .and_then(reqwest::Response::error_for_status)
                .map_err(DeviceHttpError::from)?
                .json::<serde_json::Value>()
                .await
                .map_err(DeviceHttpError::from)?;
            Ok(ack)
        }
    }
}
