//! Device poll supervisor — one cooperative task per enabled device.
//!
//! Each task re-reads its device record every cycle, so edits and
//! disablement take effect on the next tick without restarting the
//! task. Offline alerts are edge-triggered: a device that stays
//! unreachable produces exactly one alert until it recovers.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

use verdant_domain::alert::{Alert, AlertLevel};
use verdant_domain::device::{Device, DeviceStatus};
use verdant_domain::error::{NotFoundError, VerdantError};
use verdant_domain::event::Channel;
use verdant_domain::id::DeviceId;
use verdant_domain::telemetry::{StatusSnapshot, TelemetryPoint};
use verdant_domain::time;

use crate::hub::PubSubHub;
use crate::ports::{AlertRepository, DeviceClient, DeviceRepository, TelemetryStore};

/// Inbound seam for components that react to fresh readings, such as
/// the rule engine. Evaluation failures must stay inside the
/// implementation; the poll loop never aborts because of an observer.
pub trait TelemetryObserver: Send + Sync {
    fn on_telemetry(
        &self,
        device_id: DeviceId,
        snapshot: &StatusSnapshot,
    ) -> impl Future<Output = ()> + Send;
}

/// Observer for deployments that run polling without automation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl TelemetryObserver for NoopObserver {
    async fn on_telemetry(&self, _device_id: DeviceId, _snapshot: &StatusSnapshot) {}
}

enum Cycle {
    Continue(Duration),
    Stop,
}

struct PollInner<DR, TS, AR, DC, TO> {
    devices: DR,
    telemetry: TS,
    alerts: AR,
    client: DC,
    observer: TO,
    hub: Arc<PubSubHub>,
    fetch_timeout: Duration,
    tasks: Mutex<HashMap<DeviceId, JoinHandle<()>>>,
}

/// Supervisor owning one polling task per active device.
pub struct PollSupervisor<DR, TS, AR, DC, TO> {
    inner: Arc<PollInner<DR, TS, AR, DC, TO>>,
}

impl<DR, TS, AR, DC, TO> Clone for PollSupervisor<DR, TS, AR, DC, TO> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<DR, TS, AR, DC, TO> PollSupervisor<DR, TS, AR, DC, TO>
where
    DR: DeviceRepository + Send + Sync + 'static,
    TS: TelemetryStore + Send + Sync + 'static,
    AR: AlertRepository + Send + Sync + 'static,
    DC: DeviceClient + Send + Sync + 'static,
    TO: TelemetryObserver + 'static,
{
    pub fn new(
        devices: DR,
        telemetry: TS,
        alerts: AR,
        client: DC,
        observer: TO,
        hub: Arc<PubSubHub>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(PollInner {
                devices,
                telemetry,
                alerts,
                client,
                observer,
                hub,
                fetch_timeout,
                tasks: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Start the polling task for a device. Idempotent: a second call
    /// while the task is alive changes nothing.
    pub fn start(&self, device_id: DeviceId) -> bool {
        let mut tasks = self.inner.tasks.lock().expect("task map poisoned");
        if let Some(existing) = tasks.get(&device_id) {
            if !existing.is_finished() {
                return false;
            }
        }
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            tracing::debug!(device_id = %device_id, "poll task started");
            loop {
                match poll_cycle(&inner, device_id).await {
                    Cycle::Continue(interval) => tokio::time::sleep(interval).await,
                    Cycle::Stop => break,
                }
            }
            inner.tasks.lock().expect("task map poisoned").remove(&device_id);
            tracing::debug!(device_id = %device_id, "poll task stopped");
        });
        tasks.insert(device_id, handle);
        true
    }

    /// Cancel the polling task for a device, if any.
    pub fn stop(&self, device_id: DeviceId) -> bool {
        let removed = self
            .inner
            .tasks
            .lock()
            .expect("task map poisoned")
            .remove(&device_id);
        match removed {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Start a polling task for every enabled device.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the device list cannot be read.
    pub async fn start_all(&self) -> Result<usize, VerdantError> {
        let devices = self.inner.devices.get_enabled().await?;
        let mut started = 0;
        for device in devices {
            if self.start(device.id) {
                started += 1;
            }
        }
        tracing::info!(count = started, "started device polling");
        Ok(started)
    }

    /// Cancel every polling task.
    pub fn stop_all(&self) {
        let mut tasks = self.inner.tasks.lock().expect("task map poisoned");
        for (_, handle) in tasks.drain() {
            handle.abort();
        }
    }

    /// Number of live polling tasks.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.inner.tasks.lock().expect("task map poisoned").len()
    }

    /// One-shot status fetch outside the polling loop. Does not touch
    /// stored state.
    ///
    /// # Errors
    ///
    /// Returns [`NotFoundError`] for an unknown device, or an
    /// unreachable error when the device does not answer in time.
    pub async fn poll_once(&self, device_id: DeviceId) -> Result<StatusSnapshot, VerdantError> {
        let device = self
            .inner
            .devices
            .get_by_id(device_id)
            .await?
            .ok_or_else(|| NotFoundError::new("Device", device_id))?;
        fetch_with_timeout(&self.inner, &device).await
    }
}

async fn fetch_with_timeout<DR, TS, AR, DC, TO>(
    inner: &PollInner<DR, TS, AR, DC, TO>,
    device: &Device,
) -> Result<StatusSnapshot, VerdantError>
where
    DC: DeviceClient,
{
    match tokio::time::timeout(inner.fetch_timeout, inner.client.fetch_status(device)).await {
        Ok(result) => result,
        Err(elapsed) => Err(VerdantError::unreachable(elapsed)),
    }
}

async fn poll_cycle<DR, TS, AR, DC, TO>(
    inner: &PollInner<DR, TS, AR, DC, TO>,
    device_id: DeviceId,
) -> Cycle
where
    DR: DeviceRepository,
    TS: TelemetryStore,
    AR: AlertRepository,
    DC: DeviceClient,
    TO: TelemetryObserver,
{
    let device = match inner.devices.get_by_id(device_id).await {
        Ok(Some(device)) => device,
        Ok(None) => {
            tracing::info!(device_id = %device_id, "device removed, ending poll task");
            return Cycle::Stop;
        }
        Err(err) => {
            tracing::warn!(device_id = %device_id, error = %err, "failed to read device record");
            return Cycle::Continue(Duration::from_secs(5));
        }
    };
    if !device.enabled {
        tracing::info!(device_id = %device_id, "device disabled, ending poll task");
        return Cycle::Stop;
    }

    let interval = Duration::from_secs(device.poll_interval_secs);
    match fetch_with_timeout(inner, &device).await {
        Ok(snapshot) => handle_online(inner, &device, &snapshot).await,
        Err(err) => {
            tracing::debug!(device_id = %device_id, error = %err, "device unreachable");
            handle_offline(inner, &device).await;
        }
    }
    Cycle::Continue(interval)
}

async fn handle_online<DR, TS, AR, DC, TO>(
    inner: &PollInner<DR, TS, AR, DC, TO>,
    device: &Device,
    snapshot: &StatusSnapshot,
) where
    DR: DeviceRepository,
    TS: TelemetryStore,
    TO: TelemetryObserver,
{
    let info = snapshot.info.as_ref();
    if let Err(err) = inner
        .devices
        .record_poll_outcome(
            device.id,
            DeviceStatus::Online,
            Some(time::now()),
            info.and_then(|i| i.firmware.clone()),
            info.and_then(|i| i.mac.clone()),
        )
        .await
    {
        tracing::warn!(device_id = %device.id, error = %err, "failed to record poll outcome");
    }

    if device.status != DeviceStatus::Online {
        inner
            .hub
            .publish(
                Channel::Devices,
                "status_change",
                serde_json::json!({
                    "device_id": device.id,
                    "device_name": device.name,
                    "status": DeviceStatus::Online,
                }),
            )
            .await;
    }

    if snapshot.sensors.is_empty() {
        return;
    }

    for (key, value) in &snapshot.sensors {
        let point = TelemetryPoint::new(
            device.id,
            key.clone(),
            value.value(),
            value.unit().map(str::to_string),
        );
        if let Err(err) = inner.telemetry.append(point).await {
            tracing::warn!(device_id = %device.id, sensor = %key, error = %err, "failed to store reading");
        }
    }

    inner
        .hub
        .publish(
            Channel::Sensors,
            "update",
            serde_json::json!({
                "device_id": device.id,
                "device_name": device.name,
                "sensors": snapshot.sensors,
                "actuators": snapshot.actuators,
            }),
        )
        .await;

    inner.observer.on_telemetry(device.id, snapshot).await;
}

async fn handle_offline<DR, TS, AR, DC, TO>(inner: &PollInner<DR, TS, AR, DC, TO>, device: &Device)
where
    DR: DeviceRepository,
    AR: AlertRepository,
{
    if let Err(err) = inner
        .devices
        .record_poll_outcome(device.id, DeviceStatus::Offline, None, None, None)
        .await
    {
        tracing::warn!(device_id = %device.id, error = %err, "failed to record poll outcome");
    }

    // Alert only on the transition, never while the device stays down.
    if device.status == DeviceStatus::Offline {
        return;
    }

    let alert = Alert::new(
        Some(device.id),
        AlertLevel::Error,
        format!("Device '{}' is unreachable", device.name),
    );
    if let Err(err) = inner.alerts.create(alert.clone()).await {
        tracing::warn!(device_id = %device.id, error = %err, "failed to store alert");
    }

    inner
        .hub
        .publish(
            Channel::Alerts,
            "new_alert",
            serde_json::json!({
                "id": alert.id,
                "device_id": device.id,
                "level": alert.level,
                "message": alert.message,
                "created_at": alert.created_at,
            }),
        )
        .await;
    inner
        .hub
        .publish(
            Channel::Devices,
            "status_change",
            serde_json::json!({
                "device_id": device.id,
                "device_name": device.name,
                "status": DeviceStatus::Offline,
            }),
        )
        .await;
}
