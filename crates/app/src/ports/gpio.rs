//! GPIO backend port — hardware or simulated pin access.
//!
//! A backend is a capability set selected once at startup by a
//! platform probe: hardware-backed on a Raspberry Pi, simulated
//! elsewhere. The simulated variant cannot read pins, so it reports
//! `supports_input() == false` and INPUT assignment is refused.
//!
//! Hardware interrupt callbacks run on a backend-owned thread, outside
//! the scheduler. They must never touch supervisor state directly;
//! instead the backend sends a [`PinEdge`] through the channel handed
//! to [`PinBackend::open_input`], and the supervisor's pump task
//! drains it on the scheduler side.

use tokio::sync::mpsc;

use verdant_domain::error::GpioError;

/// A level transition reported by an interrupt callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinEdge {
    pub pin: u8,
    pub high: bool,
}

/// Live handle to a digital input pin.
pub trait InputHandle: Send {
    /// Current logic level.
    fn read(&self) -> bool;
}

/// Live handle to a digital output pin.
pub trait OutputHandle: Send {
    /// Drive the pin high (`true`) or low (`false`).
    fn set(&mut self, high: bool) -> Result<(), GpioError>;

    /// Last driven level.
    fn get(&self) -> bool;
}

/// Live handle to a PWM output pin.
pub trait PwmHandle: Send {
    /// Set the duty fraction, already normalized to `[0, 1]`.
    fn set_duty(&mut self, duty: f64) -> Result<(), GpioError>;

    /// Current duty fraction.
    fn duty(&self) -> f64;
}

/// Factory for live pin handles. Object-safe so the composition root
/// can pick one of several backends at startup.
pub trait PinBackend: Send + Sync {
    /// Whether this backend can read physical pins. Watcher and
    /// interrupt delivery only exist when this is `true`.
    fn supports_input(&self) -> bool;

    /// Open a digital input with pull-up, wiring interrupt edges into
    /// `edges`. Backends without interrupt support may ignore the
    /// sender; the watcher covers them.
    ///
    /// # Errors
    ///
    /// Returns [`GpioError::InputUnsupported`] when the backend cannot
    /// read pins, or [`GpioError::Hardware`] on acquisition failure.
    fn open_input(
        &self,
        pin: u8,
        edges: mpsc::UnboundedSender<PinEdge>,
    ) -> Result<Box<dyn InputHandle>, GpioError>;

    /// Open a digital output, initially low.
    ///
    /// # Errors
    ///
    /// Returns [`GpioError::Hardware`] on acquisition failure.
    fn open_output(&self, pin: u8) -> Result<Box<dyn OutputHandle>, GpioError>;

    /// Open a PWM output at the given initial duty fraction.
    ///
    /// # Errors
    ///
    /// Returns [`GpioError::Hardware`] on acquisition failure. Callers
    /// enforce the hardware-PWM pin subset before asking.
    fn open_pwm(&self, pin: u8, initial_duty: f64) -> Result<Box<dyn PwmHandle>, GpioError>;
}
