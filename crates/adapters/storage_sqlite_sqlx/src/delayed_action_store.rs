//! `SQLite` implementation of [`DelayedActionStore`].

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};
use uuid::fmt::Hyphenated;

use orderflow_app::ports::DelayedActionStore;
use orderflow_domain::context::SystemContext;
use orderflow_domain::delayed_action::{DelayedAction, OUTCOME_NOT_RECORDED};
use orderflow_domain::error::{NotFoundError, OrderFlowError};
use orderflow_domain::id::{DelayedActionId, RuleId, TenantId};
use orderflow_domain::time::Timestamp;

use crate::codec::{decode_error, encode_uuid, parse_json, parse_timestamp, timestamp};
use crate::error::StorageError;

struct Wrapper(DelayedAction);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: Hyphenated = row.try_get("id")?;
        let tenant_id: Hyphenated = row.try_get("tenant_id")?;
        let rule_id: Hyphenated = row.try_get("rule_id")?;
        let action_index: i64 = row.try_get("action_index")?;
        let order_id: Option<Hyphenated> = row.try_get("order_id")?;
        let execute_at: String = row.try_get("execute_at")?;
        let executed_at: Option<String> = row.try_get("executed_at")?;
        let created_at: String = row.try_get("created_at")?;
        let action_data: String = row.try_get("action_data")?;
        let event_data: String = row.try_get("event_data")?;

        Ok(Self(DelayedAction {
            id: DelayedActionId::from_uuid(id.into_uuid()),
            tenant_id: TenantId::from_uuid(tenant_id.into_uuid()),
            rule_id: RuleId::from_uuid(rule_id.into_uuid()),
            action_index: u32::try_from(action_index).map_err(decode_error)?,
            order_id: order_id.map(Hyphenated::into_uuid),
            execute_at: parse_timestamp(&execute_at)?,
            executed: row.try_get("executed")?,
            executed_at: executed_at.as_deref().map(parse_timestamp).transpose()?,
            error: row.try_get("error")?,
            created_at: parse_timestamp(&created_at)?,
            action_data: parse_json(&action_data)?,
            event_data: parse_json(&event_data)?,
        }))
    }
}

/// `SQLite`-backed delayed action queue.
pub struct SqliteDelayedActionStore {
    pool: SqlitePool,
}

impl SqliteDelayedActionStore {
    /// Create a new store backed by the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl DelayedActionStore for SqliteDelayedActionStore {
    async fn enqueue(&self, action: DelayedAction) -> Result<DelayedAction, OrderFlowError> {
        let action_data = serde_json::to_string(&action.action_data).map_err(StorageError::from)?;
        let event_data = serde_json::to_string(&action.event_data).map_err(StorageError::from)?;

        sqlx::query(
            "INSERT INTO delayed_actions (id, tenant_id, rule_id, action_index, order_id, execute_at, executed, executed_at, error, created_at, action_data, event_data) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(encode_uuid(action.id.as_uuid()))
        .bind(encode_uuid(action.tenant_id.as_uuid()))
        .bind(encode_uuid(action.rule_id.as_uuid()))
        .bind(i64::from(action.action_index))
        .bind(action.order_id.map(encode_uuid))
        .bind(timestamp(action.execute_at))
        .bind(action.executed)
        .bind(action.executed_at.map(timestamp))
        .bind(&action.error)
        .bind(timestamp(action.created_at))
        .bind(&action_data)
        .bind(&event_data)
        .execute(&self.pool)
        .await
        .map_err(StorageError::from)?;

        Ok(action)
    }

    async fn fetch_due(
        &self,
        ctx: &SystemContext,
        now: Timestamp,
        limit: usize,
    ) -> Result<Vec<DelayedAction>, OrderFlowError> {
        let limit = i64::try_from(limit).map_err(|_| StorageError::OutOfRange("limit"))?;
        let rows: Vec<Wrapper> = sqlx::query_as(
            "SELECT * FROM delayed_actions WHERE executed = 0 AND execute_at <= ? ORDER BY execute_at ASC, created_at ASC LIMIT ?",
        )
        .bind(timestamp(now))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::from)?;
        tracing::trace!(purpose = ctx.purpose(), due = rows.len(), "fetched due delayed actions");
        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn claim(
        &self,
        _ctx: &SystemContext,
        id: DelayedActionId,
        at: Timestamp,
    ) -> Result<bool, OrderFlowError> {
        let result = sqlx::query(
            "UPDATE delayed_actions SET executed = 1, executed_at = ?, error = ? WHERE id = ? AND executed = 0",
        )
        .bind(timestamp(at))
        .bind(OUTCOME_NOT_RECORDED)
        .bind(encode_uuid(id.as_uuid()))
        .execute(&self.pool)
        .await
        .map_err(StorageError::from)?;
        Ok(result.rows_affected() == 1)
    }

    async fn complete(
        &self,
        _ctx: &SystemContext,
        id: DelayedActionId,
        error: Option<String>,
    ) -> Result<(), OrderFlowError> {
        let result =
            sqlx::query("UPDATE delayed_actions SET error = ? WHERE id = ? AND executed = 1")
                .bind(&error)
                .bind(encode_uuid(id.as_uuid()))
                .execute(&self.pool)
                .await
                .map_err(StorageError::from)?;
        if result.rows_affected() == 0 {
            return Err(NotFoundError {
                entity: "DelayedAction",
                id: id.to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn get_by_id(
        &self,
        tenant_id: TenantId,
        id: DelayedActionId,
    ) -> Result<Option<DelayedAction>, OrderFlowError> {
        let row: Option<Wrapper> =
            sqlx::query_as("SELECT * FROM delayed_actions WHERE tenant_id = ? AND id = ?")
                .bind(encode_uuid(tenant_id.as_uuid()))
                .bind(encode_uuid(id.as_uuid()))
                .fetch_optional(&self.pool)
                .await
                .map_err(StorageError::from)?;
        Ok(row.map(|w| w.0))
    }

    async fn find_by_rule(
        &self,
        tenant_id: TenantId,
        rule_id: RuleId,
        limit: usize,
    ) -> Result<Vec<DelayedAction>, OrderFlowError> {
        let limit = i64::try_from(limit).map_err(|_| StorageError::OutOfRange("limit"))?;
        let rows: Vec<Wrapper> = sqlx::query_as(
            "SELECT * FROM delayed_actions WHERE tenant_id = ? AND rule_id = ? ORDER BY created_at DESC, rowid DESC LIMIT ?",
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Config;
    use chrono::TimeDelta;
    use orderflow_domain::automation::{Action, ActionKind, SetStatusConfig};
    use orderflow_domain::delayed_action::DelayedActionStatus;
    use orderflow_domain::event::EventContext;
    use orderflow_domain::time;
    use serde_json::json;

    async fn setup() -> SqliteDelayedActionStore {
        let db = Config::default().build().await.unwrap();
        SqliteDelayedActionStore::new(db.pool().clone())
    }

    fn scheduled(tenant_id: TenantId, delay: u32, now: Timestamp) -> DelayedAction {
        let action = Action::delayed(
            ActionKind::SetStatus(SetStatusConfig {
                status: "archived".to_string(),
            }),
            delay,
        );
        let event = EventContext::new(
            "order.status_changed",
            "order",
            uuid::Uuid::new_v4(),
            json!({"status": "delivered", "items": [{"sku": "A-1"}]}),
        );
        DelayedAction::schedule(tenant_id, RuleId::new(), 1, &action, &event, now)
    }

    #[tokio::test]
    async fn should_persist_all_fields_of_delayed_action() {
        let store = setup().await;
        let tenant = TenantId::new();
        let action = scheduled(tenant, 60, time::now());

        store.enqueue(action.clone()).await.unwrap();

        let fetched = store.get_by_id(tenant, action.id).await.unwrap().unwrap();
        assert_eq!(fetched, action);
        assert!(store.get_by_id(TenantId::new(), action.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn should_fetch_only_due_pending_actions_across_tenants() {
        let store = setup().await;
        let now = time::now();
        let first = scheduled(TenantId::new(), 10, now);
        let second = scheduled(TenantId::new(), 20, now);
        let later = scheduled(TenantId::new(), 3600, now);
        for action in [second.clone(), later, first.clone()] {
            store.enqueue(action).await.unwrap();
        }

        let due = store
            .fetch_due(
                &SystemContext::background_worker(),
                now + TimeDelta::seconds(30),
                10,
            )
            .await
            .unwrap();

        let ids: Vec<DelayedActionId> = due.iter().map(|a| a.id).collect();
        assert_eq!(ids, [first.id, second.id]);
    }

    #[tokio::test]
    async fn should_limit_due_batch() {
        let store = setup().await;
        let now = time::now();
        for _ in 0..4 {
            store.enqueue(scheduled(TenantId::new(), 1, now)).await.unwrap();
        }

        let due = store
            .fetch_due(&SystemContext::background_worker(), now + TimeDelta::seconds(5), 3)
            .await
            .unwrap();

        assert_eq!(due.len(), 3);
    }

    #[tokio::test]
    async fn should_claim_exactly_once() {
        let store = setup().await;
        let system = SystemContext::background_worker();
        let now = time::now();
        let action = scheduled(TenantId::new(), 1, now);
        store.enqueue(action.clone()).await.unwrap();
        let at = now + TimeDelta::seconds(5);

        let (first, second) = tokio::join!(
            store.claim(&system, action.id, at),
            store.claim(&system, action.id, at)
        );

        assert_eq!(
            [first.unwrap(), second.unwrap()]
                .iter()
                .filter(|claimed| **claimed)
                .count(),
            1
        );
        assert!(store.fetch_due(&system, at, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_record_failure_on_completed_action() {
        let store = setup().await;
        let system = SystemContext::background_worker();
        let tenant = TenantId::new();
        let now = time::now();
        let action = scheduled(tenant, 1, now);
        store.enqueue(action.clone()).await.unwrap();
        let at = now + TimeDelta::seconds(1);

        assert!(store.claim(&system, action.id, at).await.unwrap());
        store
            .complete(&system, action.id, Some("status rejected".to_string()))
            .await
            .unwrap();

        let fetched = store.get_by_id(tenant, action.id).await.unwrap().unwrap();
        assert_eq!(fetched.status(), DelayedActionStatus::Failed);
        assert_eq!(fetched.executed_at, Some(at));
        assert_eq!(fetched.error.as_deref(), Some("status rejected"));
    }

    #[tokio::test]
    async fn should_read_claimed_action_as_failed_until_outcome_is_recorded() {
        let store = setup().await;
        let system = SystemContext::background_worker();
        let tenant = TenantId::new();
        let now = time::now();
        let action = scheduled(tenant, 1, now);
        store.enqueue(action.clone()).await.unwrap();

        assert!(store.claim(&system, action.id, now).await.unwrap());
        let claimed = store.get_by_id(tenant, action.id).await.unwrap().unwrap();
        assert_eq!(claimed.status(), DelayedActionStatus::Failed);
        assert_eq!(claimed.error.as_deref(), Some(OUTCOME_NOT_RECORDED));

        store.complete(&system, action.id, None).await.unwrap();
        let completed = store.get_by_id(tenant, action.id).await.unwrap().unwrap();
        assert_eq!(completed.status(), DelayedActionStatus::Succeeded);
    }

    #[tokio::test]
    async fn should_refuse_to_complete_unclaimed_action() {
        let store = setup().await;
        let action = scheduled(TenantId::new(), 1, time::now());
        store.enqueue(action.clone()).await.unwrap();

        let result = store
            .complete(&SystemContext::background_worker(), action.id, None)
            .await;

        assert!(matches!(result, Err(OrderFlowError::NotFound(_))));
    }

    #[tokio::test]
    async fn should_list_actions_of_rule_newest_first() {
        let store = setup().await;
        let tenant = TenantId::new();
        let now = time::now();
        let older = scheduled(tenant, 1, now);
        let mut newer = older.replay(now + TimeDelta::seconds(10));
        newer.execute_at = now + TimeDelta::seconds(10);
        store.enqueue(older.clone()).await.unwrap();
        store.enqueue(newer.clone()).await.unwrap();

        let listed = store.find_by_rule(tenant, older.rule_id, 10).await.unwrap();

        let ids: Vec<DelayedActionId> = listed.iter().map(|a| a.id).collect();
        assert_eq!(ids, [newer.id, older.id]);
        assert!(
            store
                .find_by_rule(TenantId::new(), older.rule_id, 10)
                .await
                .unwrap()
                .is_empty()
        );
    }
}
