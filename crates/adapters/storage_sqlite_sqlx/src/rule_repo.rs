//! `SQLite` implementation of [`RuleRepository`].

use std::future::Future;
use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use verdant_app::ports::RuleRepository;
use verdant_domain::error::VerdantError;
use verdant_domain::id::RuleId;
use verdant_domain::rule::{Action, Rule, Trigger};
use verdant_domain::time::Timestamp;

use crate::error::StorageError;

/// Wrapper for converting database rows into domain [`Rule`].
struct Wrapper(Rule);

impl Wrapper {
    fn maybe(value: Option<Self>) -> Option<Rule> {
        value.map(|w| w.0)
    }

    /// Decode a batch of rows, dropping any that fail to decode.
    ///
    /// One rule with corrupt stored JSON must not take down every
    /// other rule in the same fetch.
    fn collect(rows: &[SqliteRow]) -> Vec<Rule> {
        rows.iter()
            .filter_map(|row| match Self::from_row(row) {
                Ok(wrapper) => Some(wrapper.0),
                Err(err) => {
                    tracing::warn!(error = %err, "skipping rule row that failed to decode");
                    None
                }
            })
            .collect()
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
        let description: Option<String> = row.try_get("description")?;
        let enabled: bool = row.try_get("enabled")?;
        let trigger_json: String = row.try_get("trigger")?;
        let action_json: String = row.try_get("action")?;
        let cooldown_secs: i64 = row.try_get("cooldown_secs")?;
        let last_triggered: Option<String> = row.try_get("last_triggered")?;
        let created_at: String = row.try_get("created_at")?;

        let id = RuleId::from_str(&id).map_err(decode)?;
        let trigger: Trigger = serde_json::from_str(&trigger_json).map_err(decode)?;
        let action: Action = serde_json::from_str(&action_json).map_err(decode)?;
        let last_triggered = last_triggered.as_deref().map(parse_timestamp).transpose()?;
        let created_at = parse_timestamp(&created_at)?;

        Ok(Self(Rule {
            id,
            name,
            description,
            enabled,
            trigger,
            action,
            cooldown_secs: u32::try_from(cooldown_secs).map_err(decode)?,
            last_triggered,
            created_at,
        }))
    }
}

const INSERT: &str = r"
    INSERT INTO rules (
        id, name, description, enabled, trigger, action,
        cooldown_secs, last_triggered, created_at
    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
";
const SELECT_BY_ID: &str = "SELECT * FROM rules WHERE id = ?";
const SELECT_ALL: &str = "SELECT * FROM rules ORDER BY name";
const SELECT_ENABLED: &str = "SELECT * FROM rules WHERE enabled = 1 ORDER BY name";
const UPDATE: &str = r"
    UPDATE rules SET
        name = ?, description = ?, enabled = ?, trigger = ?, action = ?,
        cooldown_secs = ?, last_triggered = ?
    WHERE id = ?
";
const MARK_TRIGGERED: &str = "UPDATE rules SET last_triggered = ? WHERE id = ?";
const DELETE_BY_ID: &str = "DELETE FROM rules WHERE id = ?";

/// `SQLite`-backed rule repository.
pub struct SqliteRuleRepository {
    pool: SqlitePool,
}

impl SqliteRuleRepository {
    /// Create a new repository using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl RuleRepository for SqliteRuleRepository {
    fn create(&self, rule: Rule) -> impl Future<Output = Result<Rule, VerdantError>> + Send {
        let pool = self.pool.clone();
        async move {
            let trigger_json = serde_json::to_string(&rule.trigger).map_err(StorageError::from)?;
            let action_json = serde_json::to_string(&rule.action).map_err(StorageError::from)?;

            sqlx::query(INSERT)
                .bind(rule.id.to_string())
                .bind(&rule.name)
                .bind(&rule.description)
                .bind(rule.enabled)
                .bind(&trigger_json)
                .bind(&action_json)
                .bind(i64::from(rule.cooldown_secs))
                .bind(rule.last_triggered.map(|ts| ts.to_rfc3339()))
                .bind(rule.created_at.to_rfc3339())
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(rule)
        }
    }

    fn get_by_id(
        &self,
        id: RuleId,
    ) -> impl Future<Output = Result<Option<Rule>, VerdantError>> + Send {
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

    fn get_all(&self) -> impl Future<Output = Result<Vec<Rule>, VerdantError>> + Send {
        let pool = self.pool.clone();
        async move {
            let rows = sqlx::query(SELECT_ALL)
                .fetch_all(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(Wrapper::collect(&rows))
        }
    }

    fn get_enabled(&self) -> impl Future<Output = Result<Vec<Rule>, VerdantError>> + Send {
        let pool = self.pool.clone();
        async move {
            let rows = sqlx::query(SELECT_ENABLED)
                .fetch_all(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(Wrapper::collect(&rows))
        }
    }

    fn update(&self, rule: Rule) -> impl Future<Output = Result<Rule, VerdantError>> + Send {
        let pool = self.pool.clone();
        async move {
            let trigger_json = serde_json::to_string(&rule.trigger).map_err(StorageError::from)?;
            let action_json = serde_json::to_string(&rule.action).map_err(StorageError::from)?;

            sqlx::query(UPDATE)
                .bind(&rule.name)
                .bind(&rule.description)
                .bind(rule.enabled)
                .bind(&trigger_json)
                .bind(&action_json)
                .bind(i64::from(rule.cooldown_secs))
                .bind(rule.last_triggered.map(|ts| ts.to_rfc3339()))
                .bind(rule.id.to_string())
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(rule)
        }
    }

    fn mark_triggered(
        &self,
        id: RuleId,
        at: Timestamp,
    ) -> impl Future<Output = Result<(), VerdantError>> + Send {
        let pool = self.pool.clone();
        async move {
            sqlx::query(MARK_TRIGGERED)
                .bind(at.to_rfc3339())
                .bind(id.to_string())
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(())
        }
    }

    fn delete(&self, id: RuleId) -> impl Future<Output = Result<(), VerdantError>> + Send {
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
