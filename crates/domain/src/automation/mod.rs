//! Automation rules: trigger event → conditions → actions.
//!
//! A rule belongs to one tenant and subscribes to a single
//! [`TriggerEvent`]. When that event occurs, all its [`Condition`]s must
//! hold (logical AND) for the rule to fire; firing runs its [`Action`]s in
//! list order, deferring the ones with a delay.

mod action;
mod condition;
mod trigger;

pub use action::{
    Action, ActionKind, ActionType, AddTagConfig, CreateInvoiceConfig, SendEmailConfig,
    SetStatusConfig, WebhookConfig,
};
pub use condition::{Condition, ConditionResult, Operator, all_match, evaluate_all};
pub use trigger::TriggerEvent;

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::{OrderFlowError, ValidationError};
use crate::id::{RuleId, TenantId};
use crate::time::Timestamp;

/// A tenant-defined rule reacting to one trigger event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomationRule {
    pub id: RuleId,
    pub tenant_id: TenantId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub enabled: bool,
    /// Higher runs first; ties go to the oldest rule.
    pub priority: i32,
    pub trigger_event: TriggerEvent,
    pub conditions: Vec<Condition>,
    pub actions: Vec<Action>,
    pub fire_count: u64,
    pub last_fired_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl AutomationRule {
    /// Create a builder for constructing an [`AutomationRule`].
    #[must_use]
    pub fn builder() -> AutomationRuleBuilder {
        AutomationRuleBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// Rules without conditions fire unconditionally, and rules without
    /// actions are allowed (they still count fires).
    ///
    /// # Errors
    ///
    /// Returns [`OrderFlowError::Validation`] when:
    /// - `name` is empty ([`ValidationError::EmptyName`])
    /// - a condition is malformed for its operator
    /// - an action config is invalid
    pub fn validate(&self) -> Result<(), OrderFlowError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        for condition in &self.conditions {
            condition.validate()?;
        }
        for action in &self.actions {
            action.kind.validate()?;
        }
        Ok(())
    }

    /// Execution order: `priority` descending, then `created_at` ascending.
    ///
    /// The id is a last tie-breaker so the order is total.
    #[must_use]
    pub fn execution_order(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| self.created_at.cmp(&other.created_at))
            .then_with(|| self.id.as_uuid().cmp(&other.id.as_uuid()))
    }

    /// Evaluate the rule against `data` without any side effect.
    #[must_use]
    pub fn dry_run(&self, data: &serde_json::Value) -> DryRunReport {
        let condition_results = evaluate_all(&self.conditions, data);
        let conditions_met = condition_results.iter().all(|r| r.matched);
        let would_execute = if conditions_met {
            self.actions
                .iter()
                .enumerate()
                .map(|(index, action)| PlannedAction {
                    index,
                    action: action.clone(),
                })
                .collect()
        } else {
            Vec::new()
        };
        DryRunReport {
            condition_results,
            conditions_met,
            would_execute,
        }
    }
}

/// Result of evaluating a rule definition against synthetic data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DryRunReport {
    pub condition_results: Vec<ConditionResult>,
    pub conditions_met: bool,
    pub would_execute: Vec<PlannedAction>,
}

/// An action a dry run says would execute (inline or deferred).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedAction {
    pub index: usize,
    pub action: Action,
}

/// Step-by-step builder for [`AutomationRule`].
#[derive(Debug, Default)]
pub struct AutomationRuleBuilder {
    id: Option<RuleId>,
    tenant_id: Option<TenantId>,
    name: Option<String>,
    description: Option<String>,
    enabled: Option<bool>,
    priority: i32,
    trigger_event: Option<TriggerEvent>,
    conditions: Vec<Condition>,
    actions: Vec<Action>,
    created_at: Option<Timestamp>,
}

impl AutomationRuleBuilder {
    #[must_use]
    pub fn id(mut self, id: RuleId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn tenant_id(mut self, tenant_id: TenantId) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    #[must_use]
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn trigger_event(mut self, trigger_event: TriggerEvent) -> Self {
        self.trigger_event = Some(trigger_event);
        self
    }

    #[must_use]
    pub fn condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    #[must_use]
    pub fn action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    #[must_use]
    pub fn created_at(mut self, ts: Timestamp) -> Self {
        self.created_at = Some(ts);
        self
    }

    /// Consume the builder, validate, and return an [`AutomationRule`].
    ///
    /// New rules start with `fire_count = 0` and no `last_fired_at`.
    ///
    /// # Errors
    ///
    /// Returns [`OrderFlowError::Validation`] if the definition is invalid.
    pub fn build(self) -> Result<AutomationRule, OrderFlowError> {
        let created_at = self.created_at.unwrap_or_else(crate::time::now);
        let rule = AutomationRule {
            id: self.id.unwrap_or_default(),
            tenant_id: self.tenant_id.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            description: self.description,
            enabled: self.enabled.unwrap_or(true),
            priority: self.priority,
            trigger_event: self.trigger_event.unwrap_or(TriggerEvent::OrderCreated),
            conditions: self.conditions,
            actions: self.actions,
            fire_count: 0,
            last_fired_at: None,
            created_at,
            updated_at: created_at,
        };
        rule.validate()?;
        Ok(rule)
    }
}
