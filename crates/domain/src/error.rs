//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`VerdantError`] via `#[from]` (or a local `From` impl for adapter
//! error types wrapping their source).

/// Top-level error for the verdant workspace.
#[derive(Debug, thiserror::Error)]
pub enum VerdantError {
    /// A domain invariant was violated.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// A referenced record does not exist.
    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// A GPIO operation was refused or failed.
    #[error("gpio error")]
    Gpio(#[from] GpioError),

    /// The record store failed.
    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A remote device could not be reached (timeout, refused
    /// connection, non-2xx response — all treated uniformly).
    #[error("device unreachable")]
    Unreachable(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl VerdantError {
    /// Wrap a storage-layer failure.
    pub fn storage(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Storage(Box::new(err))
    }

    /// Wrap a transport-layer failure as "unreachable".
    pub fn unreachable(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Unreachable(Box::new(err))
    }
}

/// Domain invariant violations.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A record requires a non-empty name.
    #[error("name must not be empty")]
    EmptyName,
    /// A device requires a non-empty network host.
    #[error("host must not be empty")]
    EmptyHost,
    /// A device poll interval must be at least one second.
    #[error("poll interval must be non-zero")]
    ZeroPollInterval,
    /// A rule requires a trigger predicate.
    #[error("rule requires a trigger")]
    MissingTrigger,
    /// A rule requires an action.
    #[error("rule requires an action")]
    MissingAction,
}

/// A referenced record does not exist.
#[derive(Debug, thiserror::Error)]
#[error("{entity} not found: {id}")]
pub struct NotFoundError {
    /// Record kind, e.g. `"Device"`.
    pub entity: &'static str,
    /// Stringified identifier that was looked up.
    pub id: String,
}

impl NotFoundError {
    /// Build a not-found error for one record kind.
    pub fn new(entity: &'static str, id: impl std::fmt::Display) -> Self {
        Self {
            entity,
            id: id.to_string(),
        }
    }
}

/// GPIO failures, always carrying the pin number for diagnosis.
#[derive(Debug, thiserror::Error)]
pub enum GpioError {
    /// The pin has no assigned function.
    #[error("pin {pin} is not assigned")]
    Unassigned { pin: u8 },
    /// The pin is assigned a different function than the operation needs.
    #[error("pin {pin} is assigned {actual}, operation requires {expected}")]
    FunctionConflict {
        pin: u8,
        expected: &'static str,
        actual: &'static str,
    },
    /// PWM was requested on a pin outside the hardware-capable subset.
    #[error("pin {pin} does not support hardware PWM")]
    PwmUnsupported { pin: u8 },
    /// INPUT was requested but the active backend cannot read pins.
    #[error("pin {pin}: INPUT requires real hardware")]
    InputUnsupported { pin: u8 },
    /// The underlying hardware access failed.
    #[error("pin {pin}: hardware access failed")]
    Hardware {
        pin: u8,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl GpioError {
    /// Wrap a backend failure for `pin`.
    pub fn hardware(pin: u8, err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Hardware {
            pin,
            source: Box::new(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_convert_validation_error_into_verdant_error() {
        let err: VerdantError = ValidationError::EmptyName.into();
        assert!(matches!(
            err,
            VerdantError::Validation(ValidationError::EmptyName)
        ));
    }

    #[test]
    fn should_format_not_found_with_entity_and_id() {
        let err = NotFoundError {
            entity: "Device",
            id: "42".to_string(),
        };
        assert_eq!(err.to_string(), "Device not found: 42");
    }

    #[test]
    fn should_carry_pin_number_in_gpio_errors() {
        let err = GpioError::PwmUnsupported { pin: 7 };
        assert!(err.to_string().contains('7'));

        let err = GpioError::FunctionConflict {
            pin: 17,
            expected: "OUTPUT",
            actual: "PWM",
        };
        assert!(err.to_string().contains("17"));
        assert!(err.to_string().contains("OUTPUT"));
    }
}
