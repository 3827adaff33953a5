//! Delayed action: a persisted, not-yet-executed step of a fired rule.
//!
//! A delayed action points back at its rule and the *index* of the action
//! in that rule's list. The worker resolves the rule's current definition
//! at execution time; `action_data` only records what the action looked
//! like when it was scheduled.
//!
//! Rows are never deleted. Each one moves from pending to executed exactly
//! once, with `error` telling success from failure. A claimed row carries
//! [`OUTCOME_NOT_RECORDED`] until its outcome is written, so a crash between
//! claim and completion never reads as a success.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::automation::Action;
use crate::event::EventContext;
use crate::id::{DelayedActionId, RuleId, TenantId};
use crate::time::{self, Timestamp};

/// Error held by a claimed action until its outcome is recorded.
pub const OUTCOME_NOT_RECORDED: &str = "outcome not recorded";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelayedAction {
    pub id: DelayedActionId,
    pub tenant_id: TenantId,
    pub rule_id: RuleId,
    pub action_index: u32,
    pub order_id: Option<Uuid>,
    pub execute_at: Timestamp,
    pub executed: bool,
    pub executed_at: Option<Timestamp>,
    pub error: Option<String>,
    pub created_at: Timestamp,
    /// Action definition at scheduling time (audit only).
    pub action_data: serde_json::Value,
    /// Snapshot of the triggering event.
    pub event_data: EventContext,
}

/// Where a delayed action stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelayedActionStatus {
    Pending,
    Succeeded,
    Failed,
}

impl DelayedAction {
    /// Schedule the action at `action_index` of a rule fired at `now`.
    #[must_use]
    pub fn schedule(
        tenant_id: TenantId,
        rule_id: RuleId,
        action_index: u32,
        action: &Action,
        event: &EventContext,
        now: Timestamp,
    ) -> Self {
        Self {
            id: DelayedActionId::new(),
            tenant_id,
            rule_id,
            action_index,
            order_id: event.order_id(),
            execute_at: time::after_seconds(now, action.delay_seconds),
            executed: false,
            executed_at: None,
            error: None,
            created_at: now,
            action_data: serde_json::to_value(action).unwrap_or(serde_json::Value::Null),
            event_data: event.clone(),
        }
    }

    /// A fresh pending copy due at `now`, for manually replaying this one.
    ///
    /// The original row is left untouched.
    #[must_use]
    pub fn replay(&self, now: Timestamp) -> Self {
        Self {
            id: DelayedActionId::new(),
            execute_at: now,
            executed: false,
            executed_at: None,
            error: None,
            created_at: now,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn is_due(&self, now: Timestamp) -> bool {
        !self.executed && self.execute_at <= now
    }

    #[must_use]
    pub fn status(&self) -> DelayedActionStatus {
        match (self.executed, &self.error) {
            (false, _) => DelayedActionStatus::Pending,
            (true, None) => DelayedActionStatus::Succeeded,
            (true, Some(_)) => DelayedActionStatus::Failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::{ActionKind, AddTagConfig};
    use chrono::TimeDelta;

    fn scheduled(delay: u32, now: Timestamp) -> DelayedAction {
        let action = Action::delayed(
            ActionKind::AddTag(AddTagConfig {
                tag: "follow-up".to_string(),
            }),
            delay,
        );
        let event = EventContext::new(
            "order.created",
            "order",
            Uuid::new_v4(),
            serde_json::json!({"total": 10}),
        );
        DelayedAction::schedule(TenantId::new(), RuleId::new(), 2, &action, &event, now)
    }

    #[test]
    fn should_schedule_execute_at_now_plus_delay() {
        let now = time::now();
        let delayed = scheduled(60, now);
        assert_eq!(delayed.execute_at, now + TimeDelta::seconds(60));
        assert_eq!(delayed.created_at, now);
        assert_eq!(delayed.action_index, 2);
        assert_eq!(delayed.status(), DelayedActionStatus::Pending);
        assert_eq!(delayed.order_id, Some(delayed.event_data.entity_id));
        assert_eq!(delayed.action_data["type"], "add_tag");
    }

    #[test]
    fn should_only_be_due_once_execute_at_is_reached() {
        let now = time::now();
        let delayed = scheduled(60, now);
        assert!(!delayed.is_due(now));
        assert!(!delayed.is_due(now + TimeDelta::seconds(59)));
        assert!(delayed.is_due(now + TimeDelta::seconds(60)));
    }

    #[test]
    fn should_never_be_due_after_execution() {
        let now = time::now();
        let mut delayed = scheduled(1, now);
        delayed.executed = true;
        assert!(!delayed.is_due(now + TimeDelta::hours(1)));
    }

    #[test]
    fn should_derive_status_from_executed_and_error() {
        let mut delayed = scheduled(1, time::now());
        delayed.executed = true;
        assert_eq!(delayed.status(), DelayedActionStatus::Succeeded);
        delayed.error = Some("smtp down".to_string());
        assert_eq!(delayed.status(), DelayedActionStatus::Failed);
    }

    #[test]
    fn should_replay_as_new_pending_row_due_now() {
        let now = time::now();
        let mut original = scheduled(60, now);
        original.executed = true;
        original.executed_at = Some(now);
        original.error = Some("timeout".to_string());

        let later = now + TimeDelta::hours(2);
        let replay = original.replay(later);
        assert_ne!(replay.id, original.id);
        assert_eq!(replay.rule_id, original.rule_id);
        assert_eq!(replay.action_index, original.action_index);
        assert_eq!(replay.event_data, original.event_data);
        assert_eq!(replay.execute_at, later);
        assert_eq!(replay.status(), DelayedActionStatus::Pending);
        assert!(replay.is_due(later));
    }
}
