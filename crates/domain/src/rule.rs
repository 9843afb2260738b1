//! Rule — threshold trigger → action automations.
//!
//! A rule watches one sensor of one device and fires when the reported
//! value compares true against a threshold, subject to a cooldown.
//!
//! Example trigger JSON:
//!
//! ```json
//! {"device_id": "…", "sensor": "temperature", "op": ">", "threshold": 30.0}
//! ```
//!
//! Example action JSON:
//!
//! ```json
//! {"type": "set_pin", "pin": 17, "level": true}
//! {"type": "send_command", "device_id": "…", "payload": {"relay1": 1}}
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, VerdantError};
use crate::id::{DeviceId, RuleId};
use crate::telemetry::SensorValue;
use crate::time::Timestamp;

/// Numeric comparison operator of a trigger predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = "<")]
    Less,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = "<=")]
    LessOrEqual,
    #[serde(rename = "==")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
}

impl Comparison {
    /// Apply the operator to `(value, threshold)`.
    #[must_use]
    pub fn compare(self, value: f64, threshold: f64) -> bool {
        match self {
            Self::Greater => value > threshold,
            Self::Less => value < threshold,
            Self::GreaterOrEqual => value >= threshold,
            Self::LessOrEqual => value <= threshold,
            Self::Equal => (value - threshold).abs() < f64::EPSILON,
            Self::NotEqual => (value - threshold).abs() >= f64::EPSILON,
        }
    }

    /// The operator's wire symbol.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Greater => ">",
            Self::Less => "<",
            Self::GreaterOrEqual => ">=",
            Self::LessOrEqual => "<=",
            Self::Equal => "==",
            Self::NotEqual => "!=",
        }
    }
}

impl std::fmt::Display for Comparison {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The predicate that fires a rule: one sensor of one device compared
/// against a threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub device_id: DeviceId,
    /// Sensor key within the telemetry batch.
    pub sensor: String,
    pub op: Comparison,
    pub threshold: f64,
}

impl Trigger {
    /// Check whether this trigger matches a telemetry batch.
    ///
    /// Returns `false` when the batch belongs to another device or the
    /// configured sensor key is absent — a skip, never an error.
    #[must_use]
    pub fn matches(&self, device_id: DeviceId, sensors: &BTreeMap<String, SensorValue>) -> bool {
        if self.device_id != device_id {
            return false;
        }
        match sensors.get(&self.sensor) {
            Some(reading) => self.op.compare(reading.value(), self.threshold),
            None => false,
        }
    }
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.sensor, self.op, self.threshold)
    }
}

/// Target level for a local pin action: digital on/off or a duty fraction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PinLevel {
    Digital(bool),
    Duty(f64),
}

/// The effect performed when a rule fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Set a local GPIO pin to a boolean or duty value.
    SetPin { pin: u8, level: PinLevel },
    /// POST an arbitrary command payload to a remote device.
    SendCommand {
        device_id: DeviceId,
        payload: serde_json::Value,
    },
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SetPin { pin, level } => match level {
                PinLevel::Digital(on) => write!(f, "set_pin({pin}, {on})"),
                PinLevel::Duty(duty) => write!(f, "set_pin({pin}, duty {duty})"),
            },
            Self::SendCommand { device_id, .. } => write!(f, "send_command({device_id})"),
        }
    }
}

/// An automation rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: RuleId,
    pub name: String,
    pub description: Option<String>,
    pub enabled: bool,
    pub trigger: Trigger,
    pub action: Action,
    /// Minimum seconds between successive firings.
    pub cooldown_secs: u32,
    pub last_triggered: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl Rule {
    /// Create a builder for constructing a [`Rule`].
    #[must_use]
    pub fn builder() -> RuleBuilder {
        RuleBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`VerdantError::Validation`] when `name` is empty.
    pub fn validate(&self) -> Result<(), VerdantError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        Ok(())
    }

    /// Whether the rule is still cooling down at `now`.
    ///
    /// A rule that has never triggered is always eligible.
    #[must_use]
    pub fn in_cooldown(&self, now: Timestamp) -> bool {
        match self.last_triggered {
            Some(last) => (now - last).num_seconds() < i64::from(self.cooldown_secs),
            None => false,
        }
    }
}

/// Step-by-step builder for [`Rule`].
#[derive(Debug, Default)]
pub struct RuleBuilder {
    id: Option<RuleId>,
    name: Option<String>,
    description: Option<String>,
    enabled: Option<bool>,
    trigger: Option<Trigger>,
    action: Option<Action>,
    cooldown_secs: Option<u32>,
    last_triggered: Option<Timestamp>,
}

impl RuleBuilder {
    #[must_use]
    pub fn id(mut self, id: RuleId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    #[must_use]
    pub fn trigger(mut self, trigger: Trigger) -> Self {
        self.trigger = Some(trigger);
        self
    }

    #[must_use]
    pub fn action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }

    #[must_use]
    pub fn cooldown_secs(mut self, secs: u32) -> Self {
        self.cooldown_secs = Some(secs);
        self
    }

    #[must_use]
    pub fn last_triggered(mut self, ts: Timestamp) -> Self {
        self.last_triggered = Some(ts);
        self
    }

    /// Consume the builder, validate, and return a [`Rule`].
    ///
    /// # Errors
    ///
    /// Returns [`VerdantError::Validation`] if required fields are
    /// missing or empty. A trigger and an action are required.
    pub fn build(self) -> Result<Rule, VerdantError> {
        let rule = Rule {
            id: self.id.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            description: self.description,
            enabled: self.enabled.unwrap_or(true),
            trigger: self.trigger.ok_or(ValidationError::MissingTrigger)?,
            action: self.action.ok_or(ValidationError::MissingAction)?,
            cooldown_secs: self.cooldown_secs.unwrap_or(60),
            last_triggered: self.last_triggered,
            created_at: crate::time::now(),
        };
        rule.validate()?;
        Ok(rule)
    }
}
