//! # verdant-domain
//!
//! Pure domain model for the verdant greenhouse runtime.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Devices** (network sensors/actuators polled over HTTP)
//! - Define **Telemetry** (append-only sensor readings and the remote
//!   status wire shape)
//! - Define **Pins** (local GPIO configuration and live state)
//! - Define **Rules** (threshold trigger → action automations)
//! - Define **Alerts** (edge-triggered notifications)
//! - Define **Events** (the published envelope and its channels)
//! - Contain all invariant enforcement and domain logic
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod alert;
pub mod device;
pub mod event;
pub mod pin;
pub mod rule;
pub mod telemetry;
