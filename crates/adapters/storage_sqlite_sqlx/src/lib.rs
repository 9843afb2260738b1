//! # verdant-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the repository port traits defined in `verdant-app::ports`
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Map between domain types and database rows
//!
//! Identifiers and timestamps are stored as text (UUID and RFC 3339);
//! rule triggers and actions are stored as JSON columns.
//!
//! ## Dependency rule
//! Depends on `verdant-app` (for port traits) and `verdant-domain`
//! (for domain types). The `app` and `domain` crates must never
//! reference this adapter.

pub mod alert_repo;
pub mod device_repo;
pub mod error;
pub mod pin_repo;
pub mod pool;
pub mod rule_repo;
pub mod telemetry_store;

pub use alert_repo::SqliteAlertRepository;
pub use device_repo::SqliteDeviceRepository;
pub use error::StorageError;
pub use pin_repo::SqlitePinRepository;
pub use pool::{Config, Database};
pub use rule_repo::SqliteRuleRepository;
pub use telemetry_store::SqliteTelemetryStore;
