//! `SQLite` implementation of [`DeviceRepository`].

use std::future::Future;
use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use verdant_app::ports::DeviceRepository;
use verdant_domain::device::{Device, DeviceStatus};
use verdant_domain::error::VerdantError;
use verdant_domain::id::DeviceId;
use verdant_domain::time::Timestamp;

use crate::error::StorageError;

/// Wrapper for converting database rows into domain [`Device`].
struct Wrapper(Device);

impl Wrapper {
    fn maybe(value: Option<Self>) -> Option<Device> {
        value.map(|w| w.0)
    }
}

fn decode<E>(err: E) -> sqlx::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    sqlx::Error::Decode(Box::new(err))
}

fn parse_timestamp(value: &str) -> Result<Timestamp, sqlx::Error> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.to_utc())
        .map_err(decode)
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("id")?;
        let name: String = row.try_get("name")?;
        let device_type: String = row.try_get("device_type")?;
        let host: String = row.try_get("host")?;
        let port: i64 = row.try_get("port")?;
        let poll_interval_secs: i64 = row.try_get("poll_interval_secs")?;
        let enabled: bool = row.try_get("enabled")?;
        let status: String = row.try_get("status")?;
        let last_seen: Option<String> = row.try_get("last_seen")?;
        let firmware_version: Option<String> = row.try_get("firmware_version")?;
        let mac_address: Option<String> = row.try_get("mac_address")?;
        let description: Option<String> = row.try_get("description")?;
        let created_at: String = row.try_get("created_at")?;

        let id = DeviceId::from_str(&id).map_err(decode)?;
        let status: DeviceStatus =
            serde_json::from_str(&format!("\"{status}\"")).map_err(decode)?;
        let last_seen = last_seen.as_deref().map(parse_timestamp).transpose()?;
        let created_at = parse_timestamp(&created_at)?;

        Ok(Self(Device {
            id,
            name,
            device_type,
            host,
            port: u16::try_from(port).map_err(decode)?,
            poll_interval_secs: u64::try_from(poll_interval_secs).map_err(decode)?,
            enabled,
            status,
            last_seen,
            firmware_version,
            mac_address,
            description,
            created_at,
        }))
    }
}

const INSERT: &str = r"
    INSERT INTO devices (
        id, name, device_type, host, port, poll_interval_secs, enabled,
        status, last_seen, firmware_version, mac_address, description, created_at
    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
";
const SELECT_BY_ID: &str = "SELECT * FROM devices WHERE id = ?";
const SELECT_ALL: &str = "SELECT * FROM devices ORDER BY name";
const SELECT_ENABLED: &str = "SELECT * FROM devices WHERE enabled = 1 ORDER BY name";
const UPDATE: &str = r"
    UPDATE devices SET
        name = ?, device_type = ?, host = ?, port = ?, poll_interval_secs = ?,
        enabled = ?, status = ?, last_seen = ?, firmware_version = ?,
        mac_address = ?, description = ?
    WHERE id = ?
";
const RECORD_POLL_OUTCOME: &str = r"
    UPDATE devices SET
        status = ?,
        last_seen = COALESCE(?, last_seen),
        firmware_version = COALESCE(?, firmware_version),
        mac_address = COALESCE(?, mac_address)
    WHERE id = ?
";
const DELETE_BY_ID: &str = "DELETE FROM devices WHERE id = ?";

/// `SQLite`-backed device repository.
pub struct SqliteDeviceRepository {
    pool: SqlitePool,
}

impl SqliteDeviceRepository {
    /// Create a new repository using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl DeviceRepository for SqliteDeviceRepository {
    fn create(&self, device: Device) -> impl Future<Output = Result<Device, VerdantError>> + Send {
        let pool = self.pool.clone();
        async move {
            sqlx::query(INSERT)
                .bind(device.id.to_string())
                .bind(&device.name)
                .bind(&device.device_type)
                .bind(&device.host)
                .bind(i64::from(device.port))
                .bind(i64::try_from(device.poll_interval_secs).unwrap_or(i64::MAX))
                .bind(device.enabled)
                .bind(device.status.to_string())
                .bind(device.last_seen.map(|ts| ts.to_rfc3339()))
                .bind(&device.firmware_version)
                .bind(&device.mac_address)
                .bind(&device.description)
                .bind(device.created_at.to_rfc3339())
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(device)
        }
    }

    fn get_by_id(
        &self,
        id: DeviceId,
    ) -> impl Future<Output = Result<Option<Device>, VerdantError>> + Send {
        let pool = self.pool.clone();
        async move {
            let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_ID)
                .bind(id.to_string())
                .fetch_optional(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(Wrapper::maybe(row))
        }
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<Device>, VerdantError>> + Send {
        let pool = self.pool.clone();
        async move {
            let rows: Vec<Wrapper> = sqlx::query_as(SELECT_ALL)
                .fetch_all(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(rows.into_iter().map(|w| w.0).collect())
        }
    }

    fn get_enabled(&self) -> impl Future<Output = Result<Vec<Device>, VerdantError>> + Send {
        let pool = self.pool.clone();
        async move {
            let rows: Vec<Wrapper> = sqlx::query_as(SELECT_ENABLED)
                .fetch_all(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(rows.into_iter().map(|w| w.0).collect())
        }
    }

    fn update(&self, device: Device) -> impl Future<Output = Result<Device, VerdantError>> + Send {
        let pool = self.pool.clone();
        async move {
            sqlx::query(UPDATE)
                .bind(&device.name)
                .bind(&device.device_type)
                .bind(&device.host)
                .bind(i64::from(device.port))
                .bind(i64::try_from(device.poll_interval_secs).unwrap_or(i64::MAX))
                .bind(device.enabled)
                .bind(device.status.to_string())
                .bind(device.last_seen.map(|ts| ts.to_rfc3339()))
                .bind(&device.firmware_version)
                .bind(&device.mac_address)
                .bind(&device.description)
                .bind(device.id.to_string())
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(device)
        }
    }

    fn record_poll_outcome(
        &self,
        id: DeviceId,
        status: DeviceStatus,
        last_seen: Option<Timestamp>,
        firmware_version: Option<String>,
        mac_address: Option<String>,
    ) -> impl Future<Output = Result<(), VerdantError>> + Send {
        let pool = self.pool.clone();
        async move {
            sqlx::query(RECORD_POLL_OUTCOME)
                .bind(status.to_string())
                .bind(last_seen.map(|ts| ts.to_rfc3339()))
                .bind(firmware_version)
                .bind(mac_address)
                .bind(id.to_string())
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(())
        }
    }

    fn delete(&self, id: DeviceId) -> impl Future<Output = Result<(), VerdantError>> + Send {
        let pool = self.pool.clone();
        async move {
            sqlx::query(DELETE_BY_ID)
                .bind(id.to_string())
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Config;

    async fn repo() -> SqliteDeviceRepository {
        let db = Config {
            database_url: "sqlite::memory:".to_string(),
        }
        .build()
        .await
        .unwrap();
        SqliteDeviceRepository::new(db.pool().clone())
    }

    fn climate_node() -> Device {
        Device::builder()
            .name("climate-node")
            .device_type("climate")
            .host("10.0.0.12")
            .port(8080)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn should_create_and_fetch_device() {
        let repo = repo().await;
        let device = repo.create(climate_node()).await.unwrap();

        let fetched = repo.get_by_id(device.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "climate-node");
        assert_eq!(fetched.port, 8080);
        assert_eq!(fetched.status, DeviceStatus::Unknown);
        assert!(fetched.last_seen.is_none());
    }

    #[tokio::test]
    async fn should_return_none_for_unknown_device() {
        let repo = repo().await;
        assert!(repo.get_by_id(DeviceId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn should_list_only_enabled_devices() {
        let repo = repo().await;
        repo.create(climate_node()).await.unwrap();
        let disabled = Device::builder()
            .name("spare-node")
            .host("10.0.0.13")
            .enabled(false)
            .build()
            .unwrap();
        repo.create(disabled).await.unwrap();

        let enabled = repo.get_enabled().await.unwrap();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].name, "climate-node");
        assert_eq!(repo.get_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn should_record_poll_outcome_and_keep_prior_fields() {
        let repo = repo().await;
        let device = repo.create(climate_node()).await.unwrap();

        let seen = verdant_domain::time::now();
        repo.record_poll_outcome(
            device.id,
            DeviceStatus::Online,
            Some(seen),
            Some("1.2.0".to_string()),
            None,
        )
        .await
        .unwrap();

        // A later offline outcome must not erase what the device
        // reported while it was up.
        repo.record_poll_outcome(device.id, DeviceStatus::Offline, None, None, None)
            .await
            .unwrap();

        let stored = repo.get_by_id(device.id).await.unwrap().unwrap();
        assert_eq!(stored.status, DeviceStatus::Offline);
        assert_eq!(stored.firmware_version.as_deref(), Some("1.2.0"));
        assert!(stored.last_seen.is_some());
    }

    #[tokio::test]
    async fn should_update_device_fields() {
        let repo = repo().await;
        let mut device = repo.create(climate_node()).await.unwrap();
        device.name = "climate-node-2".to_string();
        device.enabled = false;

        repo.update(device.clone()).await.unwrap();

        let stored = repo.get_by_id(device.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "climate-node-2");
        assert!(!stored.enabled);
    }

    #[tokio::test]
    async fn should_delete_device() {
        let repo = repo().await;
        let device = repo.create(climate_node()).await.unwrap();

        repo.delete(device.id).await.unwrap();
        assert!(repo.get_by_id(device.id).await.unwrap().is_none());
    }
}
