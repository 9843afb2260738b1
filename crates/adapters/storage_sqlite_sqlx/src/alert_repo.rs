//! `SQLite` implementation of [`AlertRepository`].

use std::future::Future;
use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use verdant_app::ports::AlertRepository;
use verdant_domain::alert::{Alert, AlertLevel};
use verdant_domain::error::VerdantError;
use verdant_domain::id::{AlertId, DeviceId};

use crate::error::StorageError;

/// Wrapper for converting database rows into domain [`Alert`].
struct Wrapper(Alert);

fn decode<E>(err: E) -> sqlx::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    sqlx::Error::Decode(Box::new(err))
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("id")?;
        let device_id: Option<String> = row.try_get("device_id")?;
        let level: String = row.try_get("level")?;
        let message: String = row.try_get("message")?;
        let acknowledged: bool = row.try_get("acknowledged")?;
        let created_at: String = row.try_get("created_at")?;

        let id = AlertId::from_str(&id).map_err(decode)?;
        let device_id = device_id
            .map(|s| DeviceId::from_str(&s))
            .transpose()
            .map_err(decode)?;
        let level: AlertLevel = serde_json::from_str(&format!("\"{level}\"")).map_err(decode)?;
        let created_at = chrono::DateTime::parse_from_rfc3339(&created_at)
            .map_err(decode)?
            .to_utc();

        Ok(Self(Alert {
            id,
            device_id,
            level,
            message,
            acknowledged,
            created_at,
        }))
    }
}

const INSERT: &str = r"
    INSERT INTO alerts (id, device_id, level, message, acknowledged, created_at)
    VALUES (?, ?, ?, ?, ?, ?)
";
const SELECT_RECENT: &str = "SELECT * FROM alerts ORDER BY created_at DESC LIMIT ?";
const ACKNOWLEDGE: &str = "UPDATE alerts SET acknowledged = 1 WHERE id = ?";

/// `SQLite`-backed alert repository.
pub struct SqliteAlertRepository {
    pool: SqlitePool,
}

impl SqliteAlertRepository {
    /// Create a new repository using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl AlertRepository for SqliteAlertRepository {
    fn create(&self, alert: Alert) -> impl Future<Output = Result<Alert, VerdantError>> + Send {
        let pool = self.pool.clone();
        async move {
            sqlx::query(INSERT)
                .bind(alert.id.to_string())
                .bind(alert.device_id.map(|id| id.to_string()))
                .bind(alert.level.to_string())
                .bind(&alert.message)
                .bind(alert.acknowledged)
                .bind(alert.created_at.to_rfc3339())
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(alert)
        }
    }

    fn get_recent(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Alert>, VerdantError>> + Send {
        let pool = self.pool.clone();
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        async move {
            let rows: Vec<Wrapper> = sqlx::query_as(SELECT_RECENT)
                .bind(limit)
                .fetch_all(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(rows.into_iter().map(|w| w.0).collect())
        }
    }

    fn acknowledge(&self, id: AlertId) -> impl Future<Output = Result<(), VerdantError>> + Send {
        let pool = self.pool.clone();
        async move {
            sqlx::query(ACKNOWLEDGE)
                .bind(id.to_string())
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(())
        }
    }
}
