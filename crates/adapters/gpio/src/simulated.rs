//! In-memory pin backend for machines without GPIO hardware.
//!
//! Writes land in plain fields on the handle, which is all the
//! supervisor needs to keep its state view consistent. INPUT cannot
//! be simulated meaningfully, so the backend refuses it and reports
//! `supports_input() == false`.

use tokio::sync::mpsc;

use verdant_app::ports::{InputHandle, OutputHandle, PinBackend, PinEdge, PwmHandle};
use verdant_domain::error::GpioError;

/// [`PinBackend`] backed by nothing but memory.
#[derive(Debug, Default)]
pub struct SimulatedBackend;

impl SimulatedBackend {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

struct SimulatedOutput {
    high: bool,
}

impl OutputHandle for SimulatedOutput {
    fn set(&mut self, high: bool) -> Result<(), GpioError> {
        self.high = high;
        Ok(())
    }

    fn get(&self) -> bool {
        self.high
    }
}

struct SimulatedPwm {
    duty: f64,
}

impl PwmHandle for SimulatedPwm {
    fn set_duty(&mut self, duty: f64) -> Result<(), GpioError> {
        self.duty = duty;
        Ok(())
    }

    fn duty(&self) -> f64 {
        self.duty
    }
}

impl PinBackend for SimulatedBackend {
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
        Ok(Box::new(SimulatedOutput { high: false }))
    }

    fn open_pwm(&self, _pin: u8, initial_duty: f64) -> Result<Box<dyn PwmHandle>, GpioError> {
        Ok(Box::new(SimulatedPwm { duty: initial_duty }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_not_support_input() {
        let backend = SimulatedBackend::new();
        assert!(!backend.supports_input());

        let (tx, _rx) = mpsc::unbounded_channel();
        let result = backend.open_input(4, tx);
        assert!(matches!(result, Err(GpioError::InputUnsupported { pin: 4 })));
    }

    #[test]
    fn should_remember_driven_output_level() {
        let backend = SimulatedBackend::new();
        let mut output = backend.open_output(17).unwrap();
        assert!(!output.get());

        output.set(true).unwrap();
        assert!(output.get());
        output.set(false).unwrap();
        assert!(!output.get());
    }

    #[test]
    fn should_start_pwm_at_initial_duty() {
        let backend = SimulatedBackend::new();
        let mut pwm = backend.open_pwm(18, 0.4).unwrap();
        assert_eq!(pwm.duty(), 0.4);

        pwm.set_duty(0.9).unwrap();
        assert_eq!(pwm.duty(), 0.9);
    }
}
