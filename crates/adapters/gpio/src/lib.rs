//! # verdant-adapter-gpio
//!
//! GPIO adapter — implements the `PinBackend` port defined in
//! `verdant-app`.
//!
//! Two backends:
//! - [`simulated::SimulatedBackend`] — in-memory registers, always
//!   available. OUTPUT and PWM behave normally; INPUT is refused
//!   because there is nothing physical to read.
//! - `hardware::HardwareBackend` (feature `hardware`) — real pin
//!   access through [rppal](https://docs.rs/rppal), with pull-up
//!   inputs and interrupt edges forwarded onto the runtime's edge
//!   channel.
//!
//! ## Dependency rule
//! Depends on `verdant-app` (for the port traits) and `verdant-domain`
//! (for error types). The `app` and `domain` crates must never
//! reference this adapter.

#[cfg(feature = "hardware")]
pub mod hardware;
pub mod simulated;

use verdant_app::ports::PinBackend;

/// Pick the best available backend: real hardware when the `hardware`
/// feature is enabled and the pin controller answers, the simulated
/// backend otherwise.
#[must_use]
pub fn detect() -> Box<dyn PinBackend> {
    #[cfg(feature = "hardware")]
    {
        match hardware::HardwareBackend::new() {
            Ok(backend) => {
                tracing::info!("using hardware GPIO backend");
                return Box::new(backend);
            }
            Err(err) => {
                tracing::warn!(error = %err, "hardware GPIO unavailable, falling back");
            }
        }
    }
    tracing::info!("using simulated GPIO backend");
    Box::new(simulated::SimulatedBackend::new())
}
