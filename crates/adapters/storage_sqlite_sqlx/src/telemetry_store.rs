//! `SQLite` implementation of [`TelemetryStore`].
//!
//! Readings are append-only; rows are never updated.

use std::future::Future;
use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use verdant_app::ports::TelemetryStore;
use verdant_domain::error::VerdantError;
use verdant_domain::id::DeviceId;
use verdant_domain::telemetry::TelemetryPoint;

use crate::error::StorageError;

/// Wrapper for converting database rows into domain [`TelemetryPoint`].
struct Wrapper(TelemetryPoint);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let device_id: String = row.try_get("device_id")?;
        let sensor: String = row.try_get("sensor")?;
        let value: f64 = row.try_get("value")?;
        let unit: Option<String> = row.try_get("unit")?;
        let timestamp: String = row.try_get("timestamp")?;

        let device_id =
            DeviceId::from_str(&device_id).map_err(|err| sqlx::Error::Decode(Box::new(err)))?;
        let timestamp = chrono::DateTime::parse_from_rfc3339(&timestamp)
            .map_err(|err| sqlx::Error::Decode(Box::new(err)))?
            .to_utc();

        Ok(Self(TelemetryPoint {
            device_id,
            sensor,
            value,
            unit,
            timestamp,
        }))
    }
}

const INSERT: &str = r"
    INSERT INTO telemetry (device_id, sensor, value, unit, timestamp)
    VALUES (?, ?, ?, ?, ?)
";
const SELECT_RECENT_FOR_DEVICE: &str = r"
    SELECT * FROM telemetry WHERE device_id = ? ORDER BY timestamp DESC, id DESC LIMIT ?
";

/// `SQLite`-backed append-only telemetry store.
pub struct SqliteTelemetryStore {
    pool: SqlitePool,
}

impl SqliteTelemetryStore {
    /// Create a new store using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl TelemetryStore for SqliteTelemetryStore {
    fn append(&self, point: TelemetryPoint) -> impl Future<Output = Result<(), VerdantError>> + Send {
        let pool = self.pool.clone();
        async move {
            sqlx::query(INSERT)
                .bind(point.device_id.to_string())
                .bind(&point.sensor)
                .bind(point.value)
                .bind(&point.unit)
                .bind(point.timestamp.to_rfc3339())
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(())
        }
    }

    fn recent_for_device(
        &self,
        device_id: DeviceId,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<TelemetryPoint>, VerdantError>> + Send {
        let pool = self.pool.clone();
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        async move {
            let rows: Vec<Wrapper> = sqlx::query_as(SELECT_RECENT_FOR_DEVICE)
                .bind(device_id.to_string())
                .bind(limit)
                .fetch_all(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(rows.into_iter().map(|w| w.0).collect())
        }
    }
}
