//! `SQLite` implementation of [`AutomationRuleRepository`].

use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};
use uuid::fmt::Hyphenated;

use orderflow_app::ports::AutomationRuleRepository;
use orderflow_domain::automation::{Action, AutomationRule, Condition, TriggerEvent};
use orderflow_domain::error::{NotFoundError, OrderFlowError};
use orderflow_domain::id::{RuleId, TenantId};
use orderflow_domain::time::Timestamp;

use crate::codec::{decode_error, encode_uuid, parse_json, parse_timestamp, timestamp};
use crate::error::StorageError;

const ORDER_BY_EXECUTION: &str = "ORDER BY priority DESC, created_at ASC, id ASC";

struct Wrapper(AutomationRule);

impl Wrapper {
    fn maybe(value: Option<Self>) -> Option<AutomationRule> {
        value.map(|w| w.0)
    }
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: Hyphenated = row.try_get("id")?;
        let tenant_id: Hyphenated = row.try_get("tenant_id")?;
        let trigger_event: String = row.try_get("trigger_event")?;
        let conditions_json: String = row.try_get("conditions")?;
        let actions_json: String = row.try_get("actions")?;
        let fire_count: i64 = row.try_get("fire_count")?;
        let last_fired_at: Option<String> = row.try_get("last_fired_at")?;
        let created_at: String = row.try_get("created_at")?;
        let updated_at: String = row.try_get("updated_at")?;

        let trigger_event = TriggerEvent::from_str(&trigger_event).map_err(decode_error)?;
        let conditions: Vec<Condition> = parse_json(&conditions_json)?;
        let actions: Vec<Action> = parse_json(&actions_json)?;
        let fire_count = u64::try_from(fire_count).map_err(decode_error)?;
        let last_fired_at = last_fired_at.as_deref().map(parse_timestamp).transpose()?;

        Ok(Self(AutomationRule {
            id: RuleId::from_uuid(id.into_uuid()),
            tenant_id: TenantId::from_uuid(tenant_id.into_uuid()),
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            enabled: row.try_get("enabled")?,
            priority: row.try_get("priority")?,
            trigger_event,
            conditions,
            actions,
            fire_count,
            last_fired_at,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
        }))
    }
}

fn not_found(id: RuleId) -> OrderFlowError {
    NotFoundError {
        entity: "AutomationRule",
        id: id.to_string(),
    }
    .into()
}

/// `SQLite`-backed automation rule repository.
pub struct SqliteAutomationRuleRepository {
    pool: SqlitePool,
}

impl SqliteAutomationRuleRepository {
    /// Create a new repository backed by the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl AutomationRuleRepository for SqliteAutomationRuleRepository {
    async fn create(&self, rule: AutomationRule) -> Result<AutomationRule, OrderFlowError> {
        let conditions_json = serde_json::to_string(&rule.conditions).map_err(StorageError::from)?;
        let actions_json = serde_json::to_string(&rule.actions).map_err(StorageError::from)?;
        let fire_count =
            i64::try_from(rule.fire_count).map_err(|_| StorageError::OutOfRange("fire_count"))?;

        sqlx::query(
            "INSERT INTO automation_rules (id, tenant_id, name, description, enabled, priority, trigger_event, conditions, actions, fire_count, last_fired_at, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(encode_uuid(rule.id.as_uuid()))
        .bind(encode_uuid(rule.tenant_id.as_uuid()))
        .bind(&rule.name)
        .bind(&rule.description)
        .bind(rule.enabled)
        .bind(rule.priority)
        .bind(rule.trigger_event.as_str())
        .bind(&conditions_json)
        .bind(&actions_json)
        .bind(fire_count)
        .bind(rule.last_fired_at.map(timestamp))
        .bind(timestamp(rule.created_at))
        .bind(timestamp(rule.updated_at))
        .execute(&self.pool)
        .await
        .map_err(StorageError::from)?;

        Ok(rule)
    }

    async fn get_by_id(
        &self,
        tenant_id: TenantId,
        id: RuleId,
    ) -> Result<Option<AutomationRule>, OrderFlowError> {
        let row: Option<Wrapper> =
            sqlx::query_as("SELECT * FROM automation_rules WHERE tenant_id = ? AND id = ?")
                .bind(encode_uuid(tenant_id.as_uuid()))
                .bind(encode_uuid(id.as_uuid()))
                .fetch_optional(&self.pool)
                .await
                .map_err(StorageError::from)?;
        Ok(Wrapper::maybe(row))
    }

    async fn list(&self, tenant_id: TenantId) -> Result<Vec<AutomationRule>, OrderFlowError> {
        let rows: Vec<Wrapper> = sqlx::query_as(&format!(
            "SELECT * FROM automation_rules WHERE tenant_id = ? {ORDER_BY_EXECUTION}"
        ))
        .bind(encode_uuid(tenant_id.as_uuid()))
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn find_enabled_by_trigger(
        &self,
        tenant_id: TenantId,
        trigger_event: TriggerEvent,
    ) -> Result<Vec<AutomationRule>, OrderFlowError> {
        let rows: Vec<Wrapper> = sqlx::query_as(&format!(
            "SELECT * FROM automation_rules WHERE tenant_id = ? AND trigger_event = ? AND enabled = 1 {ORDER_BY_EXECUTION}"
        ))
        .bind(encode_uuid(tenant_id.as_uuid()))
        .bind(trigger_event.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    /// Fire statistics and `created_at` are left alone; only
    /// [`record_fire`](AutomationRuleRepository::record_fire) writes them.
    async fn update(&self, rule: AutomationRule) -> Result<AutomationRule, OrderFlowError> {
        let conditions_json = serde_json::to_string(&rule.conditions).map_err(StorageError::from)?;
        let actions_json = serde_json::to_string(&rule.actions).map_err(StorageError::from)?;

        let result = sqlx::query(
            "UPDATE automation_rules SET name = ?, description = ?, enabled = ?, priority = ?, trigger_event = ?, conditions = ?, actions = ?, updated_at = ? WHERE tenant_id = ? AND id = ?",
        )
        .bind(&rule.name)
        .bind(&rule.description)
        .bind(rule.enabled)
        .bind(rule.priority)
        .bind(rule.trigger_event.as_str())
        .bind(&conditions_json)
        .bind(&actions_json)
        .bind(timestamp(rule.updated_at))
        .bind(encode_uuid(rule.tenant_id.as_uuid()))
        .bind(encode_uuid(rule.id.as_uuid()))
        .execute(&self.pool)
        .await
        .map_err(StorageError::from)?;

        if result.rows_affected() == 0 {
            return Err(not_found(rule.id));
        }
        Ok(rule)
    }

    async fn delete(&self, tenant_id: TenantId, id: RuleId) -> Result<(), OrderFlowError> {
        let result = sqlx::query("DELETE FROM automation_rules WHERE tenant_id = ? AND id = ?")
            .bind(encode_uuid(tenant_id.as_uuid()))
            .bind(encode_uuid(id.as_uuid()))
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    async fn record_fire(
        &self,
        tenant_id: TenantId,
        id: RuleId,
        fired_at: Timestamp,
    ) -> Result<(), OrderFlowError> {
        let result = sqlx::query(
            "UPDATE automation_rules SET fire_count = fire_count + 1, last_fired_at = ? WHERE tenant_id = ? AND id = ?",
        )
        .bind(timestamp(fired_at))
        .bind(encode_uuid(tenant_id.as_uuid()))
        .bind(encode_uuid(id.as_uuid()))
        .execute(&self.pool)
        .await
        .map_err(StorageError::from)?;
        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }
}
