//! # verdant-app
//!
//! Application core — the concurrent telemetry-and-control runtime,
//! plus **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `DeviceRepository`, `RuleRepository`, `PinRepository`,
//!     `AlertRepository` — CRUD over the record store
//!   - `TelemetryStore` — append-only sensor readings
//!   - `DeviceClient` — remote status fetch / command send
//!   - `PinBackend` — hardware or simulated GPIO access
//! - Host the four core components:
//!   - [`hub::PubSubHub`] — subscriber registry and event fan-out
//!   - [`poller::PollSupervisor`] — one polling task per enabled device
//!   - [`pins::PinSupervisor`] — live pin handles, watcher, interrupt pump
//!   - [`engine::RuleEngine`] — per-batch rule evaluation and dispatch
//!
//! ## Dependency rule
//! Depends on `verdant-domain` only (plus `tokio` for tasks and channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod engine;
pub mod hub;
pub mod pins;
pub mod poller;
pub mod ports;
