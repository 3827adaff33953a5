//! Rule matcher: selects the rules a trigger event applies to.
//!
//! Candidates are the tenant's enabled rules for the event, ordered by
//! [`AutomationRule::execution_order`]. Each candidate is then evaluated
//! against the event payload; evaluation itself is pure.

use orderflow_domain::automation::{AutomationRule, ConditionResult, TriggerEvent, evaluate_all};
use orderflow_domain::error::OrderFlowError;
use orderflow_domain::id::TenantId;

use crate::ports::AutomationRuleRepository;

/// A candidate rule together with its per-condition results.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleMatch {
    pub rule: AutomationRule,
    pub condition_results: Vec<ConditionResult>,
    pub conditions_met: bool,
}

impl RuleMatch {
    /// Evaluate every condition of `rule` against `data`.
    #[must_use]
    pub fn evaluate(rule: AutomationRule, data: &serde_json::Value) -> Self {
        let condition_results = evaluate_all(&rule.conditions, data);
        let conditions_met = condition_results.iter().all(|result| result.matched);
        Self {
            rule,
            condition_results,
            conditions_met,
        }
    }
}

/// Looks up and evaluates candidate rules through a borrowed repository.
pub struct RuleMatcher<'a, R> {
    repo: &'a R,
}

impl<'a, R> RuleMatcher<'a, R>
where
    R: AutomationRuleRepository,
{
    pub fn new(repo: &'a R) -> Self {
        Self { repo }
    }

    /// Enabled rules of `tenant_id` for `trigger_event`, in execution order.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the repository fails.
    pub async fn candidates(
        &self,
        tenant_id: TenantId,
        trigger_event: TriggerEvent,
    ) -> Result<Vec<AutomationRule>, OrderFlowError> {
        let mut rules = self
            .repo
            .find_enabled_by_trigger(tenant_id, trigger_event)
            .await?;
        rules.retain(|rule| rule.enabled && rule.tenant_id == tenant_id);
        rules.sort_by(AutomationRule::execution_order);
        Ok(rules)
    }

    /// Evaluate every candidate for a raw trigger event name.
    ///
    /// An unsupported event name matches nothing.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the repository fails.
    pub async fn match_rules(
        &self,
        tenant_id: TenantId,
        trigger_event: &str,
        data: &serde_json::Value,
    ) -> Result<Vec<RuleMatch>, OrderFlowError> {
        let Ok(trigger_event) = trigger_event.parse::<TriggerEvent>() else {
            tracing::debug!(trigger_event, "unsupported trigger event, no rules apply");
            return Ok(Vec::new());
        };
        let candidates = self.candidates(tenant_id, trigger_event).await?;
        Ok(candidates
            .into_iter()
            .map(|rule| RuleMatch::evaluate(rule, data))
            .collect())
    }
}
