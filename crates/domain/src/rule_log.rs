//! Rule log: the immutable audit record of one rule evaluation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::automation::{ActionType, ConditionResult, TriggerEvent};
use crate::id::{DelayedActionId, RuleId, RuleLogId, TenantId};
use crate::time::Timestamp;

/// What happened to one action of a fired rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ActionOutcome {
    /// The Action Sink accepted the action inline.
    Executed,
    /// The action was persisted for the delayed action worker.
    Scheduled {
        delayed_action_id: DelayedActionId,
        execute_at: Timestamp,
    },
    /// The sink call (or the enqueue) failed.
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutedAction {
    pub index: usize,
    pub action_type: ActionType,
    #[serde(flatten)]
    pub outcome: ActionOutcome,
}

impl ExecutedAction {
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, ActionOutcome::Failed { .. })
    }
}

/// One row per (rule, triggering event), whether or not it matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomationRuleLog {
    pub id: RuleLogId,
    pub tenant_id: TenantId,
    pub rule_id: RuleId,
    pub trigger_event: TriggerEvent,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub conditions_met: bool,
    pub condition_results: Vec<ConditionResult>,
    pub executed_actions: Vec<ExecutedAction>,
    pub error: Option<String>,
    pub executed_at: Timestamp,
}

/// Summarize failed actions as `action <n> (<type>) failed: <reason>`.
///
/// `n` is 1-based. Returns `None` when nothing failed.
#[must_use]
pub fn summarize_failures(actions: &[ExecutedAction]) -> Option<String> {
    let failures: Vec<String> = actions
        .iter()
        .filter_map(|action| match &action.outcome {
            ActionOutcome::Failed { error } => Some(format!(
                "action {} ({}) failed: {error}",
                action.index + 1,
                action.action_type
            )),
            _ => None,
        })
        .collect();
    (!failures.is_empty()).then(|| failures.join("; "))
}
