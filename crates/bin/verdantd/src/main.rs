//! # verdantd — greenhouse daemon
//!
//! Composition root that wires the adapters together and runs the
//! telemetry-and-control runtime.
//!
//! ## Responsibilities
//! - Load configuration (TOML file + env overrides)
//! - Initialize structured logging
//! - Initialize the `SQLite` connection pool and run migrations
//! - Pick a GPIO backend (hardware when available, simulated otherwise)
//! - Construct the hub, pin supervisor, rule engine, and poll supervisor
//! - Restore pin assignments and start polling every enabled device
//! - Shut down cleanly on SIGINT
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use verdant_adapter_device_http::HttpDeviceClient;
use verdant_adapter_storage_sqlite_sqlx::{
    SqliteAlertRepository, SqliteDeviceRepository, SqlitePinRepository, SqliteRuleRepository,
    SqliteTelemetryStore,
};
use verdant_app::engine::RuleEngine;
use verdant_app::hub::PubSubHub;
use verdant_app::pins::PinSupervisor;
use verdant_app::poller::PollSupervisor;
use verdant_domain::event::Channel;

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.logging.filter)?)
        .init();

    // Database — a broken record store is fatal.
    let db = verdant_adapter_storage_sqlite_sqlx::Config {
        database_url: config.database_url().to_string(),
    }
    .build()
    .await?;
    let pool = db.pool().clone();

    // Event hub
    let hub = Arc::new(PubSubHub::new());

    // Pin supervisor over the best available backend.
    let backend = verdant_adapter_gpio::detect();
    let pins = Arc::new(PinSupervisor::new(
        backend,
        SqlitePinRepository::new(pool.clone()),
        Arc::clone(&hub),
        Duration::from_millis(config.gpio.watcher_interval_ms),
    ));
    pins.restore_from_store().await?;
    pins.run_watcher();
    pins.run_interrupt_pump();

    // Device HTTP client shared by the poller and the rule engine.
    let fetch_timeout = Duration::from_secs(config.poller.fetch_timeout_secs);
    let client = HttpDeviceClient::new(fetch_timeout)?;

    // Rule engine, fed by the poll supervisor's telemetry seam.
    let engine = RuleEngine::new(
        SqliteRuleRepository::new(pool.clone()),
        SqliteDeviceRepository::new(pool.clone()),
        SqliteAlertRepository::new(pool.clone()),
        Arc::clone(&pins),
        client.clone(),
        Arc::clone(&hub),
    );

    // Poll supervisor — one task per enabled device.
    let poller = PollSupervisor::new(
        SqliteDeviceRepository::new(pool.clone()),
        SqliteTelemetryStore::new(pool.clone()),
        SqliteAlertRepository::new(pool),
        client,
        engine,
        Arc::clone(&hub),
        fetch_timeout,
    );
    let started = poller.start_all().await?;

    hub.publish(
        Channel::System,
        "started",
        serde_json::json!({"polling_devices": started}),
    )
    .await;
    tracing::info!(polling_devices = started, "verdantd running");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");

    poller.stop_all();
    pins.shutdown();

    Ok(())
}
