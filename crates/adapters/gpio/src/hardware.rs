//! Raspberry Pi pin backend built on [rppal](https://docs.rs/rppal).
//!
//! Inputs are opened with the internal pull-up and an async interrupt
//! on both edges. rppal runs interrupt callbacks on its own thread,
//! so the callback only pushes a [`PinEdge`] onto the runtime's
//! unbounded channel; the interrupt pump task picks it up from there.
//!
//! Hardware PWM rides the Pi's two PWM channels: BCM 12 and 18 share
//! channel 0, BCM 13 and 19 share channel 1. Other pins are refused.

use tokio::sync::mpsc;

use rppal::gpio::{Gpio, InputPin, Level, OutputPin, Trigger};
use rppal::pwm::{Channel, Polarity, Pwm};

use verdant_app::ports::{InputHandle, OutputHandle, PinBackend, PinEdge, PwmHandle};
use verdant_domain::error::GpioError;

/// Carrier frequency used for all hardware PWM pins.
const PWM_FREQUENCY_HZ: f64 = 1000.0;

fn pwm_channel(pin: u8) -> Option<Channel> {
    match pin {
        12 | 18 => Some(Channel::Pwm0),
        13 | 19 => Some(Channel::Pwm1),
        _ => None,
    }
}

/// [`PinBackend`] over the Pi's memory-mapped pin controller.
pub struct HardwareBackend {
    gpio: Gpio,
}

impl HardwareBackend {
    /// Open the pin controller.
    ///
    /// # Errors
    ///
    /// Returns [`GpioError::Hardware`] when `/dev/gpiomem` is missing
    /// or inaccessible, which is the normal case off-device.
    pub fn new() -> Result<Self, GpioError> {
        let gpio = Gpio::new().map_err(|err| GpioError::hardware(0, err))?;
        Ok(Self { gpio })
    }
}

struct HardwareInput {
    // Dropping the pin tears down its interrupt registration.
    pin: InputPin,
}

impl InputHandle for HardwareInput {
    fn read(&self) -> bool {
        self.pin.is_high()
    }
}

struct HardwareOutput {
    pin: OutputPin,
}

impl OutputHandle for HardwareOutput {
    fn set(&mut self, high: bool) -> Result<(), GpioError> {
        if high {
            self.pin.set_high();
        } else {
            self.pin.set_low();
        }
        Ok(())
    }

    fn get(&self) -> bool {
        self.pin.is_set_high()
    }
}

struct HardwarePwm {
    pin: u8,
    pwm: Pwm,
    duty: f64,
}

impl PwmHandle for HardwarePwm {
    fn set_duty(&mut self, duty: f64) -> Result<(), GpioError> {
        self.pwm
            .set_duty_cycle(duty)
            .map_err(|err| GpioError::hardware(self.pin, err))?;
        self.duty = duty;
        Ok(())
    }

    fn duty(&self) -> f64 {
        self.duty
    }
}

impl PinBackend for HardwareBackend {
    fn supports_input(&self) -> bool {
        true
    }

    fn open_input(
        &self,
        pin: u8,
        edges: mpsc::UnboundedSender<PinEdge>,
    ) -> Result<Box<dyn InputHandle>, GpioError> {
        let mut input = self
            .gpio
            .get(pin)
            .map_err(|err| GpioError::hardware(pin, err))?
            .into_input_pullup();
        input
            .set_async_interrupt(Trigger::Both, move |level| {
                // Callback thread: hand off and return immediately. A
                // closed channel just means the runtime is shutting down.
                let _ = edges.send(PinEdge {
                    pin,
                    high: level == Level::High,
                });
            })
            .map_err(|err| GpioError::hardware(pin, err))?;
        Ok(Box::new(HardwareInput { pin: input }))
    }

    fn open_output(&self, pin: u8) -> Result<Box<dyn OutputHandle>, GpioError> {
        let output = self
            .gpio
            .get(pin)
            .map_err(|err| GpioError::hardware(pin, err))?
            .into_output_low();
        Ok(Box::new(HardwareOutput { pin: output }))
    }

    fn open_pwm(&self, pin: u8, initial_duty: f64) -> Result<Box<dyn PwmHandle>, GpioError> {
        let channel = pwm_channel(pin).ok_or(GpioError::PwmUnsupported { pin })?;
        let pwm = Pwm::with_frequency(
            channel,
            PWM_FREQUENCY_HZ,
            initial_duty,
            Polarity::Normal,
            true,
        )
        .map_err(|err| GpioError::hardware(pin, err))?;
        Ok(Box::new(HardwarePwm {
            pin,
            pwm,
            duty: initial_duty,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_map_hardware_pwm_pins_to_channels() {
        assert_eq!(pwm_channel(12), Some(Channel::Pwm0));
        assert_eq!(pwm_channel(18), Some(Channel::Pwm0));
        assert_eq!(pwm_channel(13), Some(Channel::Pwm1));
        assert_eq!(pwm_channel(19), Some(Channel::Pwm1));
        assert_eq!(pwm_channel(17), None);
    }
}
