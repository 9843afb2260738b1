//! Pin — local GPIO configuration and live state.
//!
//! Hardware PWM on the Raspberry Pi (BCM numbering) is limited to
//! GPIO 12, 13, 18 and 19; PWM assignment is refused elsewhere.

use serde::{Deserialize, Serialize};

/// BCM pins with hardware PWM support.
pub const HW_PWM_PINS: [u8; 4] = [12, 13, 18, 19];

/// Whether `pin` belongs to the hardware-PWM-capable subset.
#[must_use]
pub fn supports_hw_pwm(pin: u8) -> bool {
    HW_PWM_PINS.contains(&pin)
}

/// Normalize a raw PWM input into a duty fraction.
///
/// Values greater than 1 are interpreted as a 0–100 percentage; the
/// result is clamped to `[0, 1]`.
#[must_use]
pub fn normalize_duty(raw: f64) -> f64 {
    let fraction = if raw > 1.0 { raw / 100.0 } else { raw };
    fraction.clamp(0.0, 1.0)
}

/// The function a pin is assigned. A pin has exactly one function at
/// a time; reassignment releases the prior handle first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PinFunction {
    Input,
    Output,
    Pwm,
}

impl PinFunction {
    /// Uppercase wire/storage name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Input => "INPUT",
            Self::Output => "OUTPUT",
            Self::Pwm => "PWM",
        }
    }
}

impl std::fmt::Display for PinFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PinFunction {
    type Err = UnknownPinFunction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "INPUT" => Ok(Self::Input),
            "OUTPUT" => Ok(Self::Output),
            "PWM" => Ok(Self::Pwm),
            _ => Err(UnknownPinFunction(s.to_string())),
        }
    }
}

/// Parse failure for [`PinFunction`].
#[derive(Debug, thiserror::Error)]
#[error("unknown pin function: {0}")]
pub struct UnknownPinFunction(pub String);

/// Persisted pin record (the warm-restart source of truth).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinConfig {
    /// BCM pin number.
    pub number: u8,
    pub description: Option<String>,
    pub function: PinFunction,
    /// Last set duty fraction; `None` for non-PWM pins.
    pub pwm_value: Option<f64>,
}

/// Live state of an assigned pin.
///
/// `value` is 0/1 for digital functions and a duty fraction in
/// `[0, 1]` for PWM.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PinState {
    pub pin: u8,
    pub function: PinFunction,
    pub value: f64,
}
