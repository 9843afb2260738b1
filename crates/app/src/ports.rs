//! Port definitions — traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the core components and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod device_client;
pub mod gpio;
pub mod storage;

pub use device_client::DeviceClient;
pub use gpio::{InputHandle, OutputHandle, PinBackend, PinEdge, PwmHandle};
pub use storage::{
    AlertRepository, DeviceRepository, PinRepository, RuleRepository, TelemetryStore,
};
