//! `SQLite` implementation of [`RuleLogRepository`].

use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};
use uuid::fmt::Hyphenated;

use orderflow_app::ports::RuleLogRepository;
use orderflow_domain::automation::TriggerEvent;
use orderflow_domain::error::OrderFlowError;
use orderflow_domain::id::{RuleId, RuleLogId, TenantId};
use orderflow_domain::rule_log::AutomationRuleLog;

use crate::codec::{decode_error, encode_uuid, parse_json, parse_timestamp, timestamp};
use crate::error::StorageError;

struct Wrapper(AutomationRuleLog);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: Hyphenated = row.try_get("id")?;
        let tenant_id: Hyphenated = row.try_get("tenant_id")?;
        let rule_id: Hyphenated = row.try_get("rule_id")?;
        let entity_id: Hyphenated = row.try_get("entity_id")?;
        let trigger_event: String = row.try_get("trigger_event")?;
        let condition_results: String = row.try_get("condition_results")?;
        let executed_actions: String = row.try_get("executed_actions")?;
        let executed_at: String = row.try_get("executed_at")?;

        Ok(Self(AutomationRuleLog {
            id: RuleLogId::from_uuid(id.into_uuid()),
            tenant_id: TenantId::from_uuid(tenant_id.into_uuid()),
            rule_id: RuleId::from_uuid(rule_id.into_uuid()),
            trigger_event: TriggerEvent::from_str(&trigger_event).map_err(decode_error)?,
            entity_type: row.try_get("entity_type")?,
            entity_id: entity_id.into_uuid(),
            conditions_met: row.try_get("conditions_met")?,
            condition_results: parse_json(&condition_results)?,
            executed_actions: parse_json(&executed_actions)?,
            error: row.try_get("error")?,
            executed_at: parse_timestamp(&executed_at)?,
        }))
    }
}

/// `SQLite`-backed append-only rule log.
pub struct SqliteRuleLogRepository {
    pool: SqlitePool,
}

impl SqliteRuleLogRepository {
    /// Create a new repository backed by the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl RuleLogRepository for SqliteRuleLogRepository {
    async fn append(&self, log: AutomationRuleLog) -> Result<AutomationRuleLog, OrderFlowError> {
        let condition_results =
            serde_json::to_string(&log.condition_results).map_err(StorageError::from)?;
        let executed_actions =
            serde_json::to_string(&log.executed_actions).map_err(StorageError::from)?;

        sqlx::query(
            "INSERT INTO automation_rule_logs (id, tenant_id, rule_id, trigger_event, entity_type, entity_id, conditions_met, condition_results, executed_actions, error, executed_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(encode_uuid(log.id.as_uuid()))
        .bind(encode_uuid(log.tenant_id.as_uuid()))
        .bind(encode_uuid(log.rule_id.as_uuid()))
        .bind(log.trigger_event.as_str())
        .bind(&log.entity_type)
        .bind(encode_uuid(log.entity_id))
        .bind(log.conditions_met)
        .bind(&condition_results)
        .bind(&executed_actions)
        .bind(&log.error)
        .bind(timestamp(log.executed_at))
        .execute(&self.pool)
        .await
        .map_err(StorageError::from)?;

        Ok(log)
    }

    async fn find_by_rule(
        &self,
        tenant_id: TenantId,
        rule_id: RuleId,
        limit: usize,
    ) -> Result<Vec<AutomationRuleLog>, OrderFlowError> {
        let limit = i64::try_from(limit).map_err(|_| StorageError::OutOfRange("limit"))?;
        let rows: Vec<Wrapper> = sqlx::query_as(
            "SELECT * FROM automation_rule_logs WHERE tenant_id = ? AND rule_id = ? ORDER BY executed_at DESC, rowid DESC LIMIT ?",
        )
        .bind(encode_uuid(tenant_id.as_uuid()))
        .bind(encode_uuid(rule_id.as_uuid()))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }
}
