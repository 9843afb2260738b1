//! Pin state supervisor — live GPIO handles, change detection, and
//! function exclusivity.
//!
//! The supervisor owns every live pin handle. A pin has exactly one
//! function at a time: assignment drops the previous handle before a
//! new one is opened. Every successful value change publishes exactly
//! one event on the `gpio` channel.
//!
//! Two background tasks keep INPUT pins fresh:
//! - the **watcher** polls all INPUT pins on a short fixed interval
//!   and publishes only when a value differs from the last known one
//!   (so it never duplicates interrupt-delivered changes);
//! - the **interrupt pump** drains the cross-thread edge channel that
//!   hardware backends feed from their callback threads.
//!
//! On machines without real hardware the backend cannot read pins, so
//! INPUT assignment is refused while OUTPUT/PWM fall back to the
//! simulated handles.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use verdant_domain::error::{GpioError, VerdantError};
use verdant_domain::event::Channel;
use verdant_domain::pin::{normalize_duty, supports_hw_pwm, PinConfig, PinFunction, PinState};

use crate::hub::PubSubHub;
use crate::ports::{InputHandle, OutputHandle, PinBackend, PinEdge, PinRepository, PwmHandle};

enum LivePin {
    Input {
        handle: Box<dyn InputHandle>,
        last: bool,
    },
    Output {
        handle: Box<dyn OutputHandle>,
    },
    Pwm {
        handle: Box<dyn PwmHandle>,
    },
}

impl LivePin {
    fn function(&self) -> PinFunction {
        match self {
            Self::Input { .. } => PinFunction::Input,
            Self::Output { .. } => PinFunction::Output,
            Self::Pwm { .. } => PinFunction::Pwm,
        }
    }

    fn value(&self) -> f64 {
        match self {
            Self::Input { last, .. } => f64::from(u8::from(*last)),
            Self::Output { handle } => f64::from(u8::from(handle.get())),
            Self::Pwm { handle } => handle.duty(),
        }
    }
}

/// Supervisor owning live pin handles and the watcher/pump tasks.
pub struct PinSupervisor<PR> {
    backend: Box<dyn PinBackend>,
    repo: PR,
    hub: Arc<PubSubHub>,
    watcher_interval: Duration,
    live: Mutex<HashMap<u8, LivePin>>,
    edge_tx: mpsc::UnboundedSender<PinEdge>,
    edge_rx: Mutex<Option<mpsc::UnboundedReceiver<PinEdge>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl<PR> PinSupervisor<PR>
where
    PR: PinRepository + Send + Sync + 'static,
{
    /// Create a supervisor over the given backend and pin store.
    pub fn new(
        backend: Box<dyn PinBackend>,
        repo: PR,
        hub: Arc<PubSubHub>,
        watcher_interval: Duration,
    ) -> Self {
        let (edge_tx, edge_rx) = mpsc::unbounded_channel();
        Self {
            backend,
            repo,
            hub,
            watcher_interval,
            live: Mutex::new(HashMap::new()),
            edge_tx,
            edge_rx: Mutex::new(Some(edge_rx)),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Assign a function to a pin, releasing any previous handle first.
    ///
    /// # Errors
    ///
    /// - [`GpioError::PwmUnsupported`] when PWM is requested outside
    ///   the hardware-capable pin subset
    /// - [`GpioError::InputUnsupported`] when INPUT is requested and
    ///   the backend cannot read pins
    /// - [`GpioError::Hardware`] when handle acquisition fails; the
    ///   pin is left unassigned
    /// - a storage error from persisting the configuration; the
    ///   freshly opened handle is released so the pin stays unassigned
    #[tracing::instrument(skip(self, description))]
    pub async fn assign_function(
        &self,
        pin: u8,
        function: PinFunction,
        description: Option<String>,
    ) -> Result<(), VerdantError> {
        if function == PinFunction::Pwm && !supports_hw_pwm(pin) {
            return Err(GpioError::PwmUnsupported { pin }.into());
        }
        if function == PinFunction::Input && !self.backend.supports_input() {
            return Err(GpioError::InputUnsupported { pin }.into());
        }

        self.open_live(pin, function, 0.0)?;

        let persisted = self
            .repo
            .upsert(PinConfig {
                number: pin,
                description: description.clone(),
                function,
                pwm_value: (function == PinFunction::Pwm).then_some(0.0),
            })
            .await;
        if let Err(err) = persisted {
            // The handle opened above must not outlive a config that
            // was never stored.
            self.live.lock().expect("pin map poisoned").remove(&pin);
            return Err(err);
        }

        self.hub
            .publish(
                Channel::Gpio,
                "function_changed",
                serde_json::json!({
                    "pin": pin,
                    "function": function,
                    "description": description,
                    "supports_hw_pwm": supports_hw_pwm(pin),
                }),
            )
            .await;
        Ok(())
    }

    /// Set a digital OUTPUT pin high or low.
    ///
    /// # Errors
    ///
    /// Returns [`GpioError::Unassigned`] or
    /// [`GpioError::FunctionConflict`] when the pin is not an OUTPUT;
    /// no state changes on error.
    pub async fn set_digital(&self, pin: u8, high: bool) -> Result<(), VerdantError> {
        {
            let mut live = self.live.lock().expect("pin map poisoned");
            match live.get_mut(&pin) {
                None => return Err(GpioError::Unassigned { pin }.into()),
                Some(LivePin::Output { handle }) => handle.set(high)?,
                Some(other) => {
                    return Err(GpioError::FunctionConflict {
                        pin,
                        expected: "OUTPUT",
                        actual: other.function().as_str(),
                    }
                    .into());
                }
            }
        }
        self.publish_state(pin, PinFunction::Output, f64::from(u8::from(high)))
            .await;
        Ok(())
    }

    /// Set a PWM pin's duty cycle.
    ///
    /// Raw values greater than 1 are treated as a 0–100 percentage;
    /// the result is clamped to `[0, 1]` and persisted for warm
    /// restart.
    ///
    /// # Errors
    ///
    /// Returns [`GpioError::Unassigned`] or
    /// [`GpioError::FunctionConflict`] when the pin is not PWM, or a
    /// storage error from persisting the duty.
    pub async fn set_pwm(&self, pin: u8, raw: f64) -> Result<(), VerdantError> {
        let duty = normalize_duty(raw);
        {
            let mut live = self.live.lock().expect("pin map poisoned");
            match live.get_mut(&pin) {
                None => return Err(GpioError::Unassigned { pin }.into()),
                Some(LivePin::Pwm { handle }) => handle.set_duty(duty)?,
                Some(other) => {
                    return Err(GpioError::FunctionConflict {
                        pin,
                        expected: "PWM",
                        actual: other.function().as_str(),
                    }
                    .into());
                }
            }
        }
        self.repo.set_pwm_value(pin, duty).await?;
        self.publish_state(pin, PinFunction::Pwm, duty).await;
        Ok(())
    }

    /// Release a pin: drop its live handle and remove its stored
    /// configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GpioError::Unassigned`] when the pin has neither a
    /// live handle nor a stored configuration.
    #[tracing::instrument(skip(self))]
    pub async fn unassign(&self, pin: u8) -> Result<(), VerdantError> {
        let had_live = self
            .live
            .lock()
            .expect("pin map poisoned")
            .remove(&pin)
            .is_some();
        let config = self.repo.get_by_number(pin).await?;
        if !had_live && config.is_none() {
            return Err(GpioError::Unassigned { pin }.into());
        }
        self.repo.delete(pin).await?;
        self.hub
            .publish(Channel::Gpio, "unassigned", serde_json::json!({"pin": pin}))
            .await;
        Ok(())
    }

    /// Live state of one pin, if assigned.
    #[must_use]
    pub fn current_state(&self, pin: u8) -> Option<PinState> {
        let live = self.live.lock().expect("pin map poisoned");
        live.get(&pin).map(|p| PinState {
            pin,
            function: p.function(),
            value: p.value(),
        })
    }

    /// Live state of every assigned pin, ordered by pin number.
    #[must_use]
    pub fn states(&self) -> Vec<PinState> {
        let live = self.live.lock().expect("pin map poisoned");
        let mut states: Vec<PinState> = live
            .iter()
            .map(|(pin, p)| PinState {
                pin: *pin,
                function: p.function(),
                value: p.value(),
            })
            .collect();
        states.sort_by_key(|s| s.pin);
        states
    }

    /// Reopen every stored pin at boot. PWM pins resume their
    /// persisted duty. Pins the backend cannot provide are skipped
    /// with a warning, never fatally.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the pin store cannot be read.
    pub async fn restore_from_store(&self) -> Result<(), VerdantError> {
        let configs = self.repo.get_all().await?;
        for config in configs {
            let pin = config.number;
            if config.function == PinFunction::Input && !self.backend.supports_input() {
                tracing::warn!(pin, "skipping stored INPUT pin, no hardware to read");
                continue;
            }
            let initial_duty = config.pwm_value.unwrap_or(0.0);
            if let Err(err) = self.open_live(pin, config.function, initial_duty) {
                tracing::warn!(pin, error = %err, "failed to restore pin");
            }
        }
        Ok(())
    }

    /// Spawn the INPUT watcher loop.
    pub fn run_watcher(self: &Arc<Self>) {
        let supervisor = Arc::clone(self);
        let interval = self.watcher_interval;
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let changes = supervisor.collect_input_changes();
                for (pin, high) in changes {
                    supervisor
                        .publish_state(pin, PinFunction::Input, f64::from(u8::from(high)))
                        .await;
                }
            }
        });
        self.tasks.lock().expect("task list poisoned").push(handle);
    }

    /// Spawn the interrupt pump, draining edges delivered from
    /// backend callback threads onto the scheduler.
    pub fn run_interrupt_pump(self: &Arc<Self>) {
        let Some(mut rx) = self.edge_rx.lock().expect("edge receiver poisoned").take() else {
            return;
        };
        let supervisor = Arc::clone(self);
        let handle = tokio::spawn(async move {
            while let Some(edge) = rx.recv().await {
                if supervisor.note_input_value(edge.pin, edge.high) {
                    supervisor
                        .publish_state(edge.pin, PinFunction::Input, f64::from(u8::from(edge.high)))
                        .await;
                }
            }
        });
        self.tasks.lock().expect("task list poisoned").push(handle);
    }

    /// Cancel background tasks and release every live handle.
    pub fn shutdown(&self) {
        for task in self.tasks.lock().expect("task list poisoned").drain(..) {
            task.abort();
        }
        self.live.lock().expect("pin map poisoned").clear();
    }

    /// Drop any existing handle for `pin` and open a new one.
    fn open_live(&self, pin: u8, function: PinFunction, initial_duty: f64) -> Result<(), GpioError> {
        // The old handle must be gone before the backend reacquires
        // the pin, and must stay gone if acquisition fails.
        self.live.lock().expect("pin map poisoned").remove(&pin);

        let live = match function {
            PinFunction::Output => LivePin::Output {
                handle: self.backend.open_output(pin)?,
            },
            PinFunction::Input => {
                let handle = self.backend.open_input(pin, self.edge_tx.clone())?;
                let last = handle.read();
                LivePin::Input { handle, last }
            }
            PinFunction::Pwm => LivePin::Pwm {
                handle: self.backend.open_pwm(pin, initial_duty)?,
            },
        };
        self.live.lock().expect("pin map poisoned").insert(pin, live);
        Ok(())
    }

    /// Read all INPUT pins, returning those whose value changed.
    fn collect_input_changes(&self) -> Vec<(u8, bool)> {
        let mut live = self.live.lock().expect("pin map poisoned");
        let mut changes = Vec::new();
        for (pin, entry) in live.iter_mut() {
            if let LivePin::Input { handle, last } = entry {
                let current = handle.read();
                if current != *last {
                    *last = current;
                    changes.push((*pin, current));
                }
            }
        }
        changes
    }

    /// Record an interrupt-reported value; returns `true` when it is
    /// new (so the watcher won't publish it again).
    fn note_input_value(&self, pin: u8, high: bool) -> bool {
        let mut live = self.live.lock().expect("pin map poisoned");
        match live.get_mut(&pin) {
            Some(LivePin::Input { last, .. }) if *last != high => {
                *last = high;
                true
            }
            _ => false,
        }
    }

    async fn publish_state(&self, pin: u8, function: PinFunction, value: f64) {
        self.hub
            .publish(
                Channel::Gpio,
                "state_change",
                serde_json::json!({
                    "pin": pin,
                    "function": function,
                    "value": value,
                }),
            )
            .await;
    }
}
