//! Automation engine: reacts to trigger events by evaluating and firing rules.
//!
//! For each incoming [`EventContext`] the engine walks the tenant's enabled
//! rules for that event in execution order. Every rule gets one
//! [`AutomationRuleLog`] row, matched or not. A matching rule runs its
//! actions through the [`ActionExecutor`] and has its fire count bumped
//! exactly once, no matter how many of its actions failed.
//!
//! Action failures end up in the log. Storage failures (loading rules,
//! bumping the fire count, appending the log) abort processing and
//! propagate to the caller.

use orderflow_domain::automation::{AutomationRule, TriggerEvent};
use orderflow_domain::context::TenantContext;
use orderflow_domain::error::OrderFlowError;
use orderflow_domain::event::EventContext;
use orderflow_domain::id::{RuleId, RuleLogId};
use orderflow_domain::rule_log::AutomationRuleLog;
use orderflow_domain::time::{self, Timestamp};

use crate::action_executor::{ActionExecutor, ActionRun};
use crate::ports::{ActionSink, AutomationRuleRepository, DelayedActionStore, RuleLogRepository};
use crate::rule_matcher::{RuleMatch, RuleMatcher};

/// What processing one trigger event did, one log per evaluated rule.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriggerOutcome {
    pub logs: Vec<AutomationRuleLog>,
}

impl TriggerOutcome {
    /// Rules whose conditions held, in the order they fired.
    pub fn fired(&self) -> impl Iterator<Item = RuleId> + '_ {
        self.logs
            .iter()
            .filter(|log| log.conditions_met)
            .map(|log| log.rule_id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }
}

/// Evaluates rules for trigger events and executes the matching ones.
pub struct AutomationEngine<R, D, L, S> {
    rules: R,
    delayed: D,
    logs: L,
    sink: S,
}

impl<R, D, L, S> AutomationEngine<R, D, L, S>
where
    R: AutomationRuleRepository,
    D: DelayedActionStore,
    L: RuleLogRepository,
    S: ActionSink,
{
    /// Create a new engine.
    pub fn new(rules: R, delayed: D, logs: L, sink: S) -> Self {
        Self {
            rules,
            delayed,
            logs,
            sink,
        }
    }

    /// Process a trigger event at the current time.
    ///
    /// # Errors
    ///
    /// See [`Self::process_at`].
    pub async fn process(
        &self,
        ctx: &TenantContext,
        event: &EventContext,
    ) -> Result<TriggerOutcome, OrderFlowError> {
        self.process_at(ctx, event, time::now()).await
    }

    /// Process a trigger event as if it happened at `now`.
    ///
    /// Rules are evaluated lazily: a rule is only evaluated once the ones
    /// before it have fired (or not).
    ///
    /// # Errors
    ///
    /// Returns a storage error if loading rules, recording a fire or
    /// appending a log fails. Rules processed before the failure keep
    /// their side effects.
    #[tracing::instrument(
        skip_all,
        fields(
            tenant_id = %ctx.tenant_id(),
            trigger_event = %event.trigger_event,
            entity_id = %event.entity_id,
        )
    )]
    pub async fn process_at(
        &self,
        ctx: &TenantContext,
        event: &EventContext,
        now: Timestamp,
    ) -> Result<TriggerOutcome, OrderFlowError> {
        let Ok(trigger_event) = event.trigger_event.parse::<TriggerEvent>() else {
            tracing::debug!("unsupported trigger event, no rules apply");
            return Ok(TriggerOutcome::default());
        };

        let candidates = RuleMatcher::new(&self.rules)
            .candidates(ctx.tenant_id(), trigger_event)
            .await?;
        let mut outcome = TriggerOutcome {
            logs: Vec::with_capacity(candidates.len()),
        };

        for rule in candidates {
            let matched = RuleMatch::evaluate(rule, &event.data);
            let run = if matched.conditions_met {
                self.fire(ctx, &matched.rule, event, now).await?
            } else {
                tracing::debug!(rule_id = %matched.rule.id, "conditions not met");
                ActionRun::default()
            };
            let log = self
                .logs
                .append(build_log(ctx, trigger_event, event, matched, run, now))
                .await?;
            outcome.logs.push(log);
        }

        Ok(outcome)
    }

    async fn fire(
        &self,
        ctx: &TenantContext,
        rule: &AutomationRule,
        event: &EventContext,
        now: Timestamp,
    ) -> Result<ActionRun, OrderFlowError> {
        let run = ActionExecutor::new(&self.sink, &self.delayed)
            .execute(ctx, rule, event, now)
            .await;
        self.rules
            .record_fire(ctx.tenant_id(), rule.id, now)
            .await?;
        tracing::info!(
            rule_id = %rule.id,
            rule_name = %rule.name,
            failed = run.error.is_some(),
            "automation rule fired"
        );
        Ok(run)
    }
}

fn build_log(
    ctx: &TenantContext,
    trigger_event: TriggerEvent,
    event: &EventContext,
    matched: RuleMatch,
    run: ActionRun,
    now: Timestamp,
) -> AutomationRuleLog {
    AutomationRuleLog {
        id: RuleLogId::new(),
        tenant_id: ctx.tenant_id(),
        rule_id: matched.rule.id,
        trigger_event,
        entity_type: event.entity_type.clone(),
        entity_id: event.entity_id,
        conditions_met: matched.conditions_met,
        condition_results: matched.condition_results,
        executed_actions: run.executed_actions,
        error: run.error,
        executed_at: now,
    }
}
