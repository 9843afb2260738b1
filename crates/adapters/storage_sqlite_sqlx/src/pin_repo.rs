//! `SQLite` implementation of [`PinRepository`].

use std::future::Future;
use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use verdant_app::ports::PinRepository;
use verdant_domain::error::VerdantError;
use verdant_domain::pin::{PinConfig, PinFunction};

use crate::error::StorageError;

/// Wrapper for converting database rows into domain [`PinConfig`].
struct Wrapper(PinConfig);

impl Wrapper {
    fn maybe(value: Option<Self>) -> Option<PinConfig> {
        value.map(|w| w.0)
    }
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let number: i64 = row.try_get("number")?;
        let description: Option<String> = row.try_get("description")?;
        let function: String = row.try_get("function")?;
        let pwm_value: Option<f64> = row.try_get("pwm_value")?;

        let number = u8::try_from(number).map_err(|err| sqlx::Error::Decode(Box::new(err)))?;
        let function = PinFunction::from_str(&function)
            .map_err(|err| sqlx::Error::Decode(Box::new(err)))?;

        Ok(Self(PinConfig {
            number,
            description,
            function,
            pwm_value,
        }))
    }
}

const UPSERT: &str = r"
    INSERT INTO pins (number, description, function, pwm_value)
    VALUES (?, ?, ?, ?)
    ON CONFLICT (number) DO UPDATE SET
        description = excluded.description,
        function = excluded.function,
        pwm_value = excluded.pwm_value
";
const SELECT_ALL: &str = "SELECT * FROM pins ORDER BY number";
const SELECT_BY_NUMBER: &str = "SELECT * FROM pins WHERE number = ?";
const SET_PWM_VALUE: &str = "UPDATE pins SET pwm_value = ? WHERE number = ?";
const DELETE_BY_NUMBER: &str = "DELETE FROM pins WHERE number = ?";

/// `SQLite`-backed pin configuration repository.
pub struct SqlitePinRepository {
    pool: SqlitePool,
}

impl SqlitePinRepository {
    /// Create a new repository using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl PinRepository for SqlitePinRepository {
    fn get_all(&self) -> impl Future<Output = Result<Vec<PinConfig>, VerdantError>> + Send {
        let pool = self.pool.clone();
        async move {
            let rows: Vec<Wrapper> = sqlx::query_as(SELECT_ALL)
                .fetch_all(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(rows.into_iter().map(|w| w.0).collect())
        }
    }

    fn get_by_number(
        &self,
        number: u8,
    ) -> impl Future<Output = Result<Option<PinConfig>, VerdantError>> + Send {
        let pool = self.pool.clone();
        async move {
            let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_NUMBER)
                .bind(i64::from(number))
                .fetch_optional(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(Wrapper::maybe(row))
        }
    }

    fn upsert(&self, pin: PinConfig) -> impl Future<Output = Result<(), VerdantError>> + Send {
        let pool = self.pool.clone();
        async move {
            sqlx::query(UPSERT)
                .bind(i64::from(pin.number))
                .bind(&pin.description)
                .bind(pin.function.as_str())
                .bind(pin.pwm_value)
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(())
        }
    }

    fn set_pwm_value(
        &self,
        number: u8,
        value: f64,
    ) -> impl Future<Output = Result<(), VerdantError>> + Send {
        let pool = self.pool.clone();
        async move {
            sqlx::query(SET_PWM_VALUE)
                .bind(value)
                .bind(i64::from(number))
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(())
        }
    }

    fn delete(&self, number: u8) -> impl Future<Output = Result<(), VerdantError>> + Send {
        let pool = self.pool.clone();
        async move {
            sqlx::query(DELETE_BY_NUMBER)
                .bind(i64::from(number))
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

    async fn repo() -> SqlitePinRepository {
        let db = Config {
            database_url: "sqlite::memory:".to_string(),
        }
        .build()
        .await
        .unwrap();
        SqlitePinRepository::new(db.pool().clone())
    }

    #[tokio::test]
    async fn should_upsert_and_fetch_pin() {
        let repo = repo().await;
        repo.upsert(PinConfig {
            number: 17,
            description: Some("exhaust fan".to_string()),
            function: PinFunction::Output,
            pwm_value: None,
        })
        .await
        .unwrap();

        let stored = repo.get_by_number(17).await.unwrap().unwrap();
        assert_eq!(stored.function, PinFunction::Output);
        assert_eq!(stored.description.as_deref(), Some("exhaust fan"));
    }

    #[tokio::test]
    async fn should_replace_pin_on_reassignment() {
        let repo = repo().await;
        repo.upsert(PinConfig {
            number: 18,
            description: None,
            function: PinFunction::Output,
            pwm_value: None,
        })
        .await
        .unwrap();
        repo.upsert(PinConfig {
            number: 18,
            description: Some("mist pump".to_string()),
            function: PinFunction::Pwm,
            pwm_value: Some(0.0),
        })
        .await
        .unwrap();

        let all = repo.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].function, PinFunction::Pwm);
    }

    #[tokio::test]
    async fn should_persist_pwm_duty() {
        let repo = repo().await;
        repo.upsert(PinConfig {
            number: 13,
            description: None,
            function: PinFunction::Pwm,
            pwm_value: Some(0.0),
        })
        .await
        .unwrap();

        repo.set_pwm_value(13, 0.65).await.unwrap();

        let stored = repo.get_by_number(13).await.unwrap().unwrap();
        assert_eq!(stored.pwm_value, Some(0.65));
    }

    #[tokio::test]
    async fn should_delete_pin() {
        let repo = repo().await;
        repo.upsert(PinConfig {
            number: 4,
            description: None,
            function: PinFunction::Input,
            pwm_value: None,
        })
        .await
        .unwrap();

        repo.delete(4).await.unwrap();
        assert!(repo.get_by_number(4).await.unwrap().is_none());
        assert!(repo.get_all().await.unwrap().is_empty());
    }
}
