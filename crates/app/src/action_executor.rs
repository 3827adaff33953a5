//! Action executor: runs a fired rule's actions in list order.
//!
//! Immediate actions go straight to the [`ActionSink`]; actions with a delay
//! are persisted as [`DelayedAction`]s for the worker. A failing action is
//! recorded and never stops the ones after it.

use orderflow_domain::automation::{ActionKind, AutomationRule};
use orderflow_domain::context::TenantContext;
use orderflow_domain::delayed_action::DelayedAction;
use orderflow_domain::error::ActionError;
use orderflow_domain::event::EventContext;
use orderflow_domain::rule_log::{ActionOutcome, ExecutedAction, summarize_failures};
use orderflow_domain::time::Timestamp;

use crate::ports::{ActionSink, DelayedActionStore};

/// Per-action outcomes of one rule firing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActionRun {
    pub executed_actions: Vec<ExecutedAction>,
    /// Summary of the failed actions, `None` when all succeeded.
    pub error: Option<String>,
}

pub struct ActionExecutor<'a, S, D> {
    sink: &'a S,
    store: &'a D,
}

impl<'a, S, D> ActionExecutor<'a, S, D>
where
    S: ActionSink,
    D: DelayedActionStore,
{
    pub fn new(sink: &'a S, store: &'a D) -> Self {
        Self { sink, store }
    }

    /// Run every action of `rule` for `event`.
    #[tracing::instrument(skip_all, fields(rule_id = %rule.id, tenant_id = %ctx.tenant_id()))]
    pub async fn execute(
        &self,
        ctx: &TenantContext,
        rule: &AutomationRule,
        event: &EventContext,
        now: Timestamp,
    ) -> ActionRun {
        let mut executed_actions = Vec::with_capacity(rule.actions.len());

        for (index, action) in rule.actions.iter().enumerate() {
            let outcome = if action.is_delayed() {
                self.schedule(ctx, rule, index, event, now).await
            } else {
                match self.invoke(ctx, &action.kind, event).await {
                    Ok(()) => ActionOutcome::Executed,
                    Err(err) => ActionOutcome::Failed {
                        error: err.reason,
                    },
                }
            };
            executed_actions.push(ExecutedAction {
                index,
                action_type: action.action_type(),
                outcome,
            });
        }

        let error = summarize_failures(&executed_actions);
        ActionRun {
            executed_actions,
            error,
        }
    }

    /// Hand a single action to the sink.
    ///
    /// # Errors
    ///
    /// Returns the sink's [`ActionError`].
    pub async fn invoke(
        &self,
        ctx: &TenantContext,
        action: &ActionKind,
        event: &EventContext,
    ) -> Result<(), ActionError> {
        let result = self.sink.invoke(ctx, action, event).await;
        match &result {
            Ok(()) => tracing::debug!(action = %action, "action executed"),
            Err(err) => tracing::warn!(action = %action, error = %err, "action failed"),
        }
        result
    }

    async fn schedule(
        &self,
        ctx: &TenantContext,
        rule: &AutomationRule,
        index: usize,
        event: &EventContext,
        now: Timestamp,
    ) -> ActionOutcome {
        let Ok(action_index) = u32::try_from(index) else {
            return ActionOutcome::Failed {
                error: format!("action index {index} out of range"),
            };
        };
        let delayed = DelayedAction::schedule(
            ctx.tenant_id(),
            rule.id,
            action_index,
            &rule.actions[index],
            event,
            now,
        );
        match self.store.enqueue(delayed).await {
            Ok(delayed) => {
                tracing::debug!(
                    delayed_action_id = %delayed.id,
                    execute_at = %delayed.execute_at,
                    "action scheduled"
                );
                ActionOutcome::Scheduled {
                    delayed_action_id: delayed.id,
                    execute_at: delayed.execute_at,
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to schedule delayed action");
                ActionOutcome::Failed {
                    error: format!("failed to schedule: {err}"),
                }
            }
        }
    }
}
