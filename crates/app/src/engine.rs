//! Rule engine — evaluates automation rules against fresh telemetry.
//!
//! The engine sits behind the poll supervisor's telemetry seam: every
//! successful poll hands it the decoded snapshot. Local pin actions
//! run inline; remote commands are dispatched on their own task so a
//! slow device never stalls the poll cycle that fired the rule.
//!
//! A firing rule enters cooldown whether or not its action succeeded,
//! so a broken actuator cannot make the rule fire on every poll.

use std::sync::Arc;

use verdant_domain::alert::{Alert, AlertLevel};
use verdant_domain::error::{NotFoundError, VerdantError};
use verdant_domain::event::Channel;
use verdant_domain::id::{DeviceId, RuleId};
use verdant_domain::rule::{Action, PinLevel, Rule};
use verdant_domain::telemetry::StatusSnapshot;
use verdant_domain::time;

use crate::hub::PubSubHub;
use crate::pins::PinSupervisor;
use crate::poller::TelemetryObserver;
use crate::ports::{AlertRepository, DeviceClient, DeviceRepository, PinRepository, RuleRepository};

struct EngineInner<RR, DR, AR, PR, DC> {
    rules: RR,
    devices: DR,
    alerts: AR,
    pins: Arc<PinSupervisor<PR>>,
    client: DC,
    hub: Arc<PubSubHub>,
}

/// Evaluates enabled rules against each telemetry batch and carries
/// out the actions of those that fire.
pub struct RuleEngine<RR, DR, AR, PR, DC> {
    inner: Arc<EngineInner<RR, DR, AR, PR, DC>>,
}

impl<RR, DR, AR, PR, DC> Clone for RuleEngine<RR, DR, AR, PR, DC> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<RR, DR, AR, PR, DC> RuleEngine<RR, DR, AR, PR, DC>
where
    RR: RuleRepository + Send + Sync + 'static,
    DR: DeviceRepository + Send + Sync + 'static,
    AR: AlertRepository + Send + Sync + 'static,
    PR: PinRepository + Send + Sync + 'static,
    DC: DeviceClient + Send + Sync + 'static,
{
    pub fn new(
        rules: RR,
        devices: DR,
        alerts: AR,
        pins: Arc<PinSupervisor<PR>>,
        client: DC,
        hub: Arc<PubSubHub>,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                rules,
                devices,
                alerts,
                pins,
                client,
                hub,
            }),
        }
    }

    /// Evaluate every enabled rule against one telemetry batch and
    /// return the ids of those that fired.
    ///
    /// A rule whose action fails still fires (and cools down); the
    /// failure is logged and the remaining rules are evaluated.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the rule list cannot be read.
    #[tracing::instrument(skip(self, snapshot), fields(device_id = %device_id))]
    pub async fn evaluate(
        &self,
        device_id: DeviceId,
        snapshot: &StatusSnapshot,
    ) -> Result<Vec<RuleId>, VerdantError> {
        let rules = self.inner.rules.get_enabled().await?;
        let now = time::now();
        let mut fired = Vec::new();

        for rule in rules {
            if !rule.trigger.matches(device_id, &snapshot.sensors) {
                continue;
            }
            if rule.in_cooldown(now) {
                tracing::debug!(rule_id = %rule.id, "rule matched but is cooling down");
                continue;
            }

            tracing::info!(rule_id = %rule.id, rule = %rule.name, trigger = %rule.trigger, "rule fired");
            self.dispatch(&rule).await;

            if let Err(err) = self.inner.rules.mark_triggered(rule.id, now).await {
                tracing::warn!(rule_id = %rule.id, error = %err, "failed to record firing time");
            }

            let alert = Alert::new(
                Some(device_id),
                AlertLevel::Info,
                format!("Automation rule '{}' triggered", rule.name),
            );
            if let Err(err) = self.inner.alerts.create(alert).await {
                tracing::warn!(rule_id = %rule.id, error = %err, "failed to store firing alert");
            }

            self.inner
                .hub
                .publish(
                    Channel::Alerts,
                    "automation_triggered",
                    serde_json::json!({
                        "rule_id": rule.id,
                        "rule_name": rule.name,
                        "device_id": device_id,
                        "action": rule.action.to_string(),
                    }),
                )
                .await;

            fired.push(rule.id);
        }
        Ok(fired)
    }

    /// Carry out a fired rule's action. Local pin actions run inline;
    /// remote commands are spawned so the caller never waits on the
    /// target device.
    async fn dispatch(&self, rule: &Rule) {
        match &rule.action {
            Action::SetPin { pin, level } => {
                let result = match level {
                    PinLevel::Digital(high) => self.inner.pins.set_digital(*pin, *high).await,
                    PinLevel::Duty(duty) => self.inner.pins.set_pwm(*pin, *duty).await,
                };
                if let Err(err) = result {
                    tracing::warn!(rule_id = %rule.id, pin, error = %err, "pin action failed");
                }
            }
            Action::SendCommand { device_id, payload } => {
                let inner = Arc::clone(&self.inner);
                let rule_id = rule.id;
                let device_id = *device_id;
                let payload = payload.clone();
                tokio::spawn(async move {
                    if let Err(err) = send_command(&inner, device_id, payload).await {
                        tracing::warn!(rule_id = %rule_id, device_id = %device_id, error = %err, "command action failed");
                    }
                });
            }
        }
    }
}

async fn send_command<RR, DR, AR, PR, DC>(
    inner: &EngineInner<RR, DR, AR, PR, DC>,
    device_id: DeviceId,
    payload: serde_json::Value,
) -> Result<(), VerdantError>
where
    DR: DeviceRepository,
    DC: DeviceClient,
{
    let device = inner
        .devices
        .get_by_id(device_id)
        .await?
        .ok_or_else(|| NotFoundError::new("Device", device_id))?;
    inner.client.send_command(&device, payload).await?;
    Ok(())
}

impl<RR, DR, AR, PR, DC> TelemetryObserver for RuleEngine<RR, DR, AR, PR, DC>
where
    RR: RuleRepository + Send + Sync + 'static,
    DR: DeviceRepository + Send + Sync + 'static,
    AR: AlertRepository + Send + Sync + 'static,
    PR: PinRepository + Send + Sync + 'static,
    DC: DeviceClient + Send + Sync + 'static,
{
    async fn on_telemetry(&self, device_id: DeviceId, snapshot: &StatusSnapshot) {
        if let Err(err) = self.evaluate(device_id, snapshot).await {
            tracing::warn!(device_id = %device_id, error = %err, "rule evaluation failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, HashMap, HashSet};
    use std::future::Future;
    use std::sync::Mutex;
    use std::time::Duration;

    use chrono::Duration as ChronoDuration;
    use tokio::sync::mpsc;

    use verdant_domain::device::{Device, DeviceStatus};
    use verdant_domain::error::GpioError;
    use verdant_domain::event::{Event, Topic};
    use verdant_domain::id::AlertId;
    use verdant_domain::pin::{PinConfig, PinFunction};
    use verdant_domain::rule::{Comparison, Trigger};
    use verdant_domain::telemetry::SensorValue;
    use verdant_domain::time::Timestamp;

    use crate::ports::{InputHandle, OutputHandle, PinBackend, PinEdge, PwmHandle};

    // ── Fakes ──────────────────────────────────────────────────────

    #[derive(Default)]
    struct InMemoryRuleRepo {
        store: Mutex<HashMap<RuleId, Rule>>,
    }

    impl InMemoryRuleRepo {
        fn with(rules: Vec<Rule>) -> Self {
            let repo = Self::default();
            let mut store = repo.store.lock().unwrap();
            for rule in rules {
                store.insert(rule.id, rule);
            }
            drop(store);
            repo
        }
    }

    impl RuleRepository for InMemoryRuleRepo {
        fn create(&self, rule: Rule) -> impl Future<Output = Result<Rule, VerdantError>> + Send {
            self.store.lock().unwrap().insert(rule.id, rule.clone());
            async { Ok(rule) }
        }
        fn get_by_id(
            &self,
            id: RuleId,
        ) -> impl Future<Output = Result<Option<Rule>, VerdantError>> + Send {
            let r = self.store.lock().unwrap().get(&id).cloned();
            async { Ok(r) }
        }
        fn get_all(&self) -> impl Future<Output = Result<Vec<Rule>, VerdantError>> + Send {
            let r: Vec<_> = self.store.lock().unwrap().values().cloned().collect();
            async { Ok(r) }
        }
        fn get_enabled(&self) -> impl Future<Output = Result<Vec<Rule>, VerdantError>> + Send {
            let mut r: Vec<_> = self
                .store
                .lock()
                .unwrap()
                .values()
                .filter(|rule| rule.enabled)
                .cloned()
                .collect();
            r.sort_by(|a, b| a.name.cmp(&b.name));
            async { Ok(r) }
        }
        fn update(&self, rule: Rule) -> impl Future<Output = Result<Rule, VerdantError>> + Send {
            self.store.lock().unwrap().insert(rule.id, rule.clone());
            async { Ok(rule) }
        }
        fn mark_triggered(
            &self,
            id: RuleId,
            at: Timestamp,
        ) -> impl Future<Output = Result<(), VerdantError>> + Send {
            if let Some(rule) = self.store.lock().unwrap().get_mut(&id) {
                rule.last_triggered = Some(at);
            }
            async { Ok(()) }
        }
        fn delete(&self, id: RuleId) -> impl Future<Output = Result<(), VerdantError>> + Send {
            self.store.lock().unwrap().remove(&id);
            async { Ok(()) }
        }
    }

    #[derive(Default)]
    struct InMemoryDeviceRepo {
        store: Mutex<HashMap<DeviceId, Device>>,
    }

    impl DeviceRepository for InMemoryDeviceRepo {
        fn create(
            &self,
            device: Device,
        ) -> impl Future<Output = Result<Device, VerdantError>> + Send {
            self.store.lock().unwrap().insert(device.id, device.clone());
            async { Ok(device) }
        }
        fn get_by_id(
            &self,
            id: DeviceId,
        ) -> impl Future<Output = Result<Option<Device>, VerdantError>> + Send {
            let r = self.store.lock().unwrap().get(&id).cloned();
            async { Ok(r) }
        }
        fn get_all(&self) -> impl Future<Output = Result<Vec<Device>, VerdantError>> + Send {
            let r: Vec<_> = self.store.lock().unwrap().values().cloned().collect();
            async { Ok(r) }
        }
        fn get_enabled(&self) -> impl Future<Output = Result<Vec<Device>, VerdantError>> + Send {
            let r: Vec<_> = self
                .store
                .lock()
                .unwrap()
                .values()
                .filter(|d| d.enabled)
                .cloned()
                .collect();
            async { Ok(r) }
        }
        fn update(
            &self,
            device: Device,
        ) -> impl Future<Output = Result<Device, VerdantError>> + Send {
            self.store.lock().unwrap().insert(device.id, device.clone());
            async { Ok(device) }
        }
        fn record_poll_outcome(
            &self,
            _id: DeviceId,
            _status: DeviceStatus,
            _last_seen: Option<Timestamp>,
            _firmware_version: Option<String>,
            _mac_address: Option<String>,
        ) -> impl Future<Output = Result<(), VerdantError>> + Send {
            async { Ok(()) }
        }
        fn delete(&self, id: DeviceId) -> impl Future<Output = Result<(), VerdantError>> + Send {
            self.store.lock().unwrap().remove(&id);
            async { Ok(()) }
        }
    }

    #[derive(Default)]
    struct RecordingAlertRepo {
        alerts: Mutex<Vec<Alert>>,
    }

    impl AlertRepository for RecordingAlertRepo {
        fn create(&self, alert: Alert) -> impl Future<Output = Result<Alert, VerdantError>> + Send {
            self.alerts.lock().unwrap().push(alert.clone());
            async { Ok(alert) }
        }
        fn get_recent(
            &self,
            limit: usize,
        ) -> impl Future<Output = Result<Vec<Alert>, VerdantError>> + Send {
            let r: Vec<_> = self
                .alerts
                .lock()
                .unwrap()
                .iter()
                .rev()
                .take(limit)
                .cloned()
                .collect();
            async { Ok(r) }
        }
        fn acknowledge(
            &self,
            id: AlertId,
        ) -> impl Future<Output = Result<(), VerdantError>> + Send {
            if let Some(alert) = self.alerts.lock().unwrap().iter_mut().find(|a| a.id == id) {
                alert.acknowledged = true;
            }
            async { Ok(()) }
        }
    }

    #[derive(Default)]
    struct RecordingClient {
        commands: Mutex<Vec<(DeviceId, serde_json::Value)>>,
    }

    impl DeviceClient for RecordingClient {
        fn fetch_status(
            &self,
            _device: &Device,
        ) -> impl Future<Output = Result<StatusSnapshot, VerdantError>> + Send {
            async { Ok(StatusSnapshot::default()) }
        }
        fn send_command(
            &self,
            device: &Device,
            payload: serde_json::Value,
        ) -> impl Future<Output = Result<serde_json::Value, VerdantError>> + Send {
            self.commands.lock().unwrap().push((device.id, payload));
            async { Ok(serde_json::json!({"ok": true})) }
        }
    }

    // Minimal in-memory GPIO stack so actions land on a real pin
    // supervisor.

    struct MemBackend;

    struct MemOutput {
        high: bool,
    }

    impl OutputHandle for MemOutput {
        fn set(&mut self, high: bool) -> Result<(), GpioError> {
            self.high = high;
            Ok(())
        }
        fn get(&self) -> bool {
            self.high
        }
    }

    struct MemPwm {
        duty: f64,
    }

    impl PwmHandle for MemPwm {
        fn set_duty(&mut self, duty: f64) -> Result<(), GpioError> {
            self.duty = duty;
            Ok(())
        }
        fn duty(&self) -> f64 {
            self.duty
        }
    }

    impl PinBackend for MemBackend {
        fn supports_input(&self) -> bool {
            false
        }
        fn open_input(
            &self,
            pin: u8,
            _edges: mpsc::UnboundedSender<PinEdge>,
        ) -> Result<Box<dyn InputHandle>, GpioError> {
            Err(GpioError::InputUnsupported { pin })
        }
        fn open_output(&self, _pin: u8) -> Result<Box<dyn OutputHandle>, GpioError> {
            Ok(Box::new(MemOutput { high: false }))
        }
        fn open_pwm(&self, _pin: u8, initial_duty: f64) -> Result<Box<dyn PwmHandle>, GpioError> {
            Ok(Box::new(MemPwm { duty: initial_duty }))
        }
    }

    #[derive(Default)]
    struct MemPinRepo {
        store: Mutex<HashMap<u8, PinConfig>>,
    }

    impl PinRepository for MemPinRepo {
        fn get_all(&self) -> impl Future<Output = Result<Vec<PinConfig>, VerdantError>> + Send {
            let r: Vec<_> = self.store.lock().unwrap().values().cloned().collect();
            async { Ok(r) }
        }
        fn get_by_number(
            &self,
            number: u8,
        ) -> impl Future<Output = Result<Option<PinConfig>, VerdantError>> + Send {
            let r = self.store.lock().unwrap().get(&number).cloned();
            async { Ok(r) }
        }
        fn upsert(&self, pin: PinConfig) -> impl Future<Output = Result<(), VerdantError>> + Send {
            self.store.lock().unwrap().insert(pin.number, pin);
            async { Ok(()) }
        }
        fn set_pwm_value(
            &self,
            number: u8,
            value: f64,
        ) -> impl Future<Output = Result<(), VerdantError>> + Send {
            if let Some(config) = self.store.lock().unwrap().get_mut(&number) {
                config.pwm_value = Some(value);
            }
            async { Ok(()) }
        }
        fn delete(&self, number: u8) -> impl Future<Output = Result<(), VerdantError>> + Send {
            self.store.lock().unwrap().remove(&number);
            async { Ok(()) }
        }
    }

    // ── Helpers ────────────────────────────────────────────────────

    type TestEngine = RuleEngine<
        Arc<InMemoryRuleRepo>,
        Arc<InMemoryDeviceRepo>,
        Arc<RecordingAlertRepo>,
        MemPinRepo,
        Arc<RecordingClient>,
    >;

    struct Harness {
        engine: TestEngine,
        rules: Arc<InMemoryRuleRepo>,
        devices: Arc<InMemoryDeviceRepo>,
        alerts: Arc<RecordingAlertRepo>,
        pins: Arc<PinSupervisor<MemPinRepo>>,
        client: Arc<RecordingClient>,
        hub: Arc<PubSubHub>,
    }

    fn harness(rules: Vec<Rule>) -> Harness {
        let rules = Arc::new(InMemoryRuleRepo::with(rules));
        let devices = Arc::new(InMemoryDeviceRepo::default());
        let alerts = Arc::new(RecordingAlertRepo::default());
        let client = Arc::new(RecordingClient::default());
        let hub = Arc::new(PubSubHub::new());
        let pins = Arc::new(PinSupervisor::new(
            Box::new(MemBackend),
            MemPinRepo::default(),
            Arc::clone(&hub),
            Duration::from_millis(10),
        ));
        let engine = RuleEngine::new(
            Arc::clone(&rules),
            Arc::clone(&devices),
            Arc::clone(&alerts),
            Arc::clone(&pins),
            Arc::clone(&client),
            Arc::clone(&hub),
        );
        Harness {
            engine,
            rules,
            devices,
            alerts,
            pins,
            client,
            hub,
        }
    }

    fn temperature_rule(device_id: DeviceId, threshold: f64, action: Action) -> Rule {
        Rule::builder()
            .name("Hot greenhouse")
            .trigger(Trigger {
                device_id,
                sensor: "temperature".to_string(),
                op: Comparison::Greater,
                threshold,
            })
            .action(action)
            .build()
            .unwrap()
    }

    fn fan_on() -> Action {
        Action::SetPin {
            pin: 17,
            level: PinLevel::Digital(true),
        }
    }

    fn snapshot(sensor: &str, value: f64) -> StatusSnapshot {
        StatusSnapshot {
            sensors: BTreeMap::from([(sensor.to_string(), SensorValue::Bare(value))]),
            actuators: BTreeMap::new(),
            info: None,
        }
    }

    async fn alert_events(hub: &PubSubHub) -> mpsc::UnboundedReceiver<Event> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = hub.register(tx).await;
        hub.set_interest(id, HashSet::from([Topic::Channel(Channel::Alerts)]))
            .await;
        rx
    }

    // ── Tests ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn should_fire_rule_and_drive_pin() {
        let device_id = DeviceId::new();
        let rule = temperature_rule(device_id, 30.0, fan_on());
        let rule_id = rule.id;
        let h = harness(vec![rule]);
        h.pins
            .assign_function(17, PinFunction::Output, None)
            .await
            .unwrap();
        let mut rx = alert_events(&h.hub).await;

        let fired = h.engine.evaluate(device_id, &snapshot("temperature", 31.0)).await.unwrap();

        assert_eq!(fired, vec![rule_id]);
        assert_eq!(h.pins.current_state(17).unwrap().value, 1.0);
        // Firing time recorded, alert stored, event published.
        let stored = h.rules.get_by_id(rule_id).await.unwrap().unwrap();
        assert!(stored.last_triggered.is_some());
        assert_eq!(h.alerts.alerts.lock().unwrap().len(), 1);
        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, "automation_triggered");
        assert_eq!(event.payload["rule_name"], "Hot greenhouse");
    }

    #[tokio::test]
    async fn should_not_fire_at_or_below_threshold() {
        let device_id = DeviceId::new();
        let h = harness(vec![temperature_rule(device_id, 30.0, fan_on())]);

        let fired = h.engine.evaluate(device_id, &snapshot("temperature", 30.0)).await.unwrap();
        assert!(fired.is_empty());
        assert!(h.alerts.alerts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_skip_rules_for_other_devices_and_missing_sensors() {
        let device_id = DeviceId::new();
        let h = harness(vec![temperature_rule(device_id, 30.0, fan_on())]);

        let fired = h
            .engine
            .evaluate(DeviceId::new(), &snapshot("temperature", 99.0))
            .await
            .unwrap();
        assert!(fired.is_empty());

        let fired = h.engine.evaluate(device_id, &snapshot("humidity", 99.0)).await.unwrap();
        assert!(fired.is_empty());
    }

    #[tokio::test]
    async fn should_suppress_firing_during_cooldown() {
        let device_id = DeviceId::new();
        let h = harness(vec![temperature_rule(device_id, 30.0, fan_on())]);
        h.pins
            .assign_function(17, PinFunction::Output, None)
            .await
            .unwrap();
        let hot = snapshot("temperature", 31.0);

        let first = h.engine.evaluate(device_id, &hot).await.unwrap();
        assert_eq!(first.len(), 1);

        // Still hot on the next poll, well inside the 60s default:
        // the rule matches but stays quiet.
        let second = h.engine.evaluate(device_id, &hot).await.unwrap();
        assert!(second.is_empty());
        assert_eq!(h.alerts.alerts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn should_fire_again_after_cooldown_expires() {
        let device_id = DeviceId::new();
        let mut rule = temperature_rule(device_id, 30.0, fan_on());
        rule.cooldown_secs = 60;
        rule.last_triggered = Some(time::now() - ChronoDuration::seconds(61));
        let h = harness(vec![rule]);
        h.pins
            .assign_function(17, PinFunction::Output, None)
            .await
            .unwrap();

        let fired = h.engine.evaluate(device_id, &snapshot("temperature", 31.0)).await.unwrap();
        assert_eq!(fired.len(), 1);
    }

    #[tokio::test]
    async fn should_ignore_disabled_rules() {
        let device_id = DeviceId::new();
        let mut rule = temperature_rule(device_id, 30.0, fan_on());
        rule.enabled = false;
        let h = harness(vec![rule]);

        let fired = h.engine.evaluate(device_id, &snapshot("temperature", 99.0)).await.unwrap();
        assert!(fired.is_empty());
    }

    #[tokio::test]
    async fn should_set_pwm_duty_from_rule_action() {
        let device_id = DeviceId::new();
        let rule = temperature_rule(
            device_id,
            30.0,
            Action::SetPin {
                pin: 18,
                level: PinLevel::Duty(0.75),
            },
        );
        let h = harness(vec![rule]);
        h.pins
            .assign_function(18, PinFunction::Pwm, None)
            .await
            .unwrap();

        h.engine.evaluate(device_id, &snapshot("temperature", 31.0)).await.unwrap();
        assert_eq!(h.pins.current_state(18).unwrap().value, 0.75);
    }

    #[tokio::test]
    async fn should_send_command_to_remote_device() {
        let source = DeviceId::new();
        let target = Device::builder()
            .name("irrigation-1")
            .host("10.0.0.20")
            .build()
            .unwrap();
        let target_id = target.id;
        let payload = serde_json::json!({"relay1": 1});
        let rule = temperature_rule(
            source,
            30.0,
            Action::SendCommand {
                device_id: target_id,
                payload: payload.clone(),
            },
        );
        let h = harness(vec![rule]);
        h.devices.create(target).await.unwrap();

        h.engine.evaluate(source, &snapshot("temperature", 31.0)).await.unwrap();

        // The command runs on its own task.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let commands = h.client.commands.lock().unwrap();
        assert_eq!(commands.as_slice(), &[(target_id, payload)]);
    }

    #[tokio::test]
    async fn should_keep_evaluating_after_failed_action() {
        let device_id = DeviceId::new();
        // First rule targets an unassigned pin and fails; names order
        // the evaluation so it runs first.
        let mut broken = temperature_rule(device_id, 30.0, fan_on());
        broken.name = "A broken fan".to_string();
        let broken_id = broken.id;
        let working = temperature_rule(
            device_id,
            30.0,
            Action::SetPin {
                pin: 27,
                level: PinLevel::Digital(true),
            },
        );
        let working_id = working.id;
        let h = harness(vec![broken, working]);
        h.pins
            .assign_function(27, PinFunction::Output, None)
            .await
            .unwrap();

        let fired = h.engine.evaluate(device_id, &snapshot("temperature", 31.0)).await.unwrap();

        // Both fire; the failing action is logged, not fatal, and the
        // broken rule still cools down.
        assert_eq!(fired, vec![broken_id, working_id]);
        assert_eq!(h.pins.current_state(27).unwrap().value, 1.0);
        let stored = h.rules.get_by_id(broken_id).await.unwrap().unwrap();
        assert!(stored.last_triggered.is_some());
    }

    #[tokio::test]
    async fn should_evaluate_through_telemetry_observer_seam() {
        let device_id = DeviceId::new();
        let h = harness(vec![temperature_rule(device_id, 30.0, fan_on())]);
        h.pins
            .assign_function(17, PinFunction::Output, None)
            .await
            .unwrap();

        h.engine
            .on_telemetry(device_id, &snapshot("temperature", 31.0))
            .await;
        assert_eq!(h.pins.current_state(17).unwrap().value, 1.0);
    }
}
