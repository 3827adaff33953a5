//! In-memory port implementations for unit tests.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Mutex;

use orderflow_domain::automation::{
    Action, ActionKind, ActionType, AddTagConfig, AutomationRule, SendEmailConfig, TriggerEvent,
    WebhookConfig,
};
use orderflow_domain::context::{SystemContext, TenantContext};
use orderflow_domain::delayed_action::{DelayedAction, OUTCOME_NOT_RECORDED};
use orderflow_domain::error::{ActionError, NotFoundError, OrderFlowError};
use orderflow_domain::event::EventContext;
use orderflow_domain::id::{DelayedActionId, RuleId, TenantId};
use orderflow_domain::rule_log::AutomationRuleLog;
use orderflow_domain::time::Timestamp;

use crate::ports::{ActionSink, AutomationRuleRepository, DelayedActionStore, RuleLogRepository};

pub(crate) fn storage_error(reason: &str) -> OrderFlowError {
    OrderFlowError::Storage(Box::new(std::io::Error::other(reason.to_string())))
}

pub(crate) fn tag(tag: &str) -> Action {
    Action::immediate(ActionKind::AddTag(AddTagConfig {
        tag: tag.to_string(),
    }))
}

pub(crate) fn email(subject: &str) -> Action {
    Action::immediate(ActionKind::SendEmail(SendEmailConfig {
        to: None,
        subject: subject.to_string(),
        template: None,
    }))
}

pub(crate) fn webhook(url: &str) -> Action {
    Action::immediate(ActionKind::Webhook(WebhookConfig {
        url: url.to_string(),
        headers: std::collections::BTreeMap::new(),
    }))
}

pub(crate) fn order_created(data: serde_json::Value) -> EventContext {
    EventContext::new(
        TriggerEvent::OrderCreated.as_str(),
        "order",
        uuid::Uuid::new_v4(),
        data,
    )
}

// ── Rules ──────────────────────────────────────────────────────────

#[derive(Default)]
pub(crate) struct InMemoryRuleRepo {
    rules: Mutex<HashMap<RuleId, AutomationRule>>,
}

impl InMemoryRuleRepo {
    pub(crate) fn with(rules: Vec<AutomationRule>) -> Self {
        Self {
            rules: Mutex::new(rules.into_iter().map(|r| (r.id, r)).collect()),
        }
    }

    pub(crate) fn snapshot(&self, id: RuleId) -> Option<AutomationRule> {
        self.rules.lock().unwrap().get(&id).cloned()
    }

    pub(crate) fn put(&self, rule: AutomationRule) {
        self.rules.lock().unwrap().insert(rule.id, rule);
    }
}

impl AutomationRuleRepository for InMemoryRuleRepo {
    fn create(
        &self,
        rule: AutomationRule,
    ) -> impl Future<Output = Result<AutomationRule, OrderFlowError>> + Send {
        self.rules.lock().unwrap().insert(rule.id, rule.clone());
        async { Ok(rule) }
    }

    fn get_by_id(
        &self,
        tenant_id: TenantId,
        id: RuleId,
    ) -> impl Future<Output = Result<Option<AutomationRule>, OrderFlowError>> + Send {
        let result = self
            .rules
            .lock()
            .unwrap()
            .get(&id)
            .filter(|r| r.tenant_id == tenant_id)
            .cloned();
        async { Ok(result) }
    }

    fn list(
        &self,
        tenant_id: TenantId,
    ) -> impl Future<Output = Result<Vec<AutomationRule>, OrderFlowError>> + Send {
        let mut result: Vec<_> = self
            .rules
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.tenant_id == tenant_id)
            .cloned()
            .collect();
        result.sort_by(AutomationRule::execution_order);
        async { Ok(result) }
    }

    fn find_enabled_by_trigger(
        &self,
        tenant_id: TenantId,
        trigger_event: TriggerEvent,
    ) -> impl Future<Output = Result<Vec<AutomationRule>, OrderFlowError>> + Send {
        // HashMap order on purpose: callers must not rely on storage order.
        let result: Vec<_> = self
            .rules
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.tenant_id == tenant_id && r.enabled && r.trigger_event == trigger_event)
            .cloned()
            .collect();
        async { Ok(result) }
    }

    fn update(
        &self,
        rule: AutomationRule,
    ) -> impl Future<Output = Result<AutomationRule, OrderFlowError>> + Send {
        let mut rules = self.rules.lock().unwrap();
        let result = match rules.get(&rule.id) {
            Some(existing) if existing.tenant_id == rule.tenant_id => {
                rules.insert(rule.id, rule.clone());
                Ok(rule)
            }
            _ => Err(NotFoundError {
                entity: "AutomationRule",
                id: rule.id.to_string(),
            }
            .into()),
        };
        async { result }
    }

    fn delete(
        &self,
        tenant_id: TenantId,
        id: RuleId,
    ) -> impl Future<Output = Result<(), OrderFlowError>> + Send {
        let mut rules = self.rules.lock().unwrap();
        let result = match rules.get(&id) {
            Some(existing) if existing.tenant_id == tenant_id => {
                rules.remove(&id);
                Ok(())
            }
            _ => Err(NotFoundError {
                entity: "AutomationRule",
                id: id.to_string(),
            }
            .into()),
        };
        async { result }
    }

    fn record_fire(
        &self,
        tenant_id: TenantId,
        id: RuleId,
        fired_at: Timestamp,
    ) -> impl Future<Output = Result<(), OrderFlowError>> + Send {
        if let Some(rule) = self
            .rules
            .lock()
            .unwrap()
            .get_mut(&id)
            .filter(|r| r.tenant_id == tenant_id)
        {
            rule.fire_count += 1;
            rule.last_fired_at = Some(fired_at);
        }
        async { Ok(()) }
    }
}

// ── Delayed actions ────────────────────────────────────────────────

#[derive(Default)]
pub(crate) struct InMemoryDelayedStore {
    items: Mutex<Vec<DelayedAction>>,
    failing_enqueue: bool,
    failing_complete: bool,
    yield_on_fetch: bool,
}

impl InMemoryDelayedStore {
    pub(crate) fn failing_enqueue() -> Self {
        Self {
            failing_enqueue: true,
            ..Self::default()
        }
    }

    pub(crate) fn failing_complete() -> Self {
        Self {
            failing_complete: true,
            ..Self::default()
        }
    }

    /// Yield once inside `fetch_due`, after reading, so that concurrent
    /// pollers see the same batch.
    pub(crate) fn yielding() -> Self {
        Self {
            yield_on_fetch: true,
            ..Self::default()
        }
    }

    pub(crate) fn all(&self) -> Vec<DelayedAction> {
        self.items.lock().unwrap().clone()
    }

    pub(crate) fn insert(&self, action: DelayedAction) {
        self.items.lock().unwrap().push(action);
    }
}

impl DelayedActionStore for InMemoryDelayedStore {
    fn enqueue(
        &self,
        action: DelayedAction,
    ) -> impl Future<Output = Result<DelayedAction, OrderFlowError>> + Send {
        let result = if self.failing_enqueue {
            Err(storage_error("queue unavailable"))
        } else {
            self.items.lock().unwrap().push(action.clone());
            Ok(action)
        };
        async { result }
    }

    fn fetch_due(
        &self,
        _ctx: &SystemContext,
        now: Timestamp,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<DelayedAction>, OrderFlowError>> + Send {
        let mut due: Vec<_> = self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.is_due(now))
            .cloned()
            .collect();
        due.sort_by_key(|a| a.execute_at);
        due.truncate(limit);
        let yield_on_fetch = self.yield_on_fetch;
        async move {
            if yield_on_fetch {
                tokio::task::yield_now().await;
            }
            Ok(due)
        }
    }

    fn claim(
        &self,
        _ctx: &SystemContext,
        id: DelayedActionId,
        at: Timestamp,
    ) -> impl Future<Output = Result<bool, OrderFlowError>> + Send {
        let mut items = self.items.lock().unwrap();
        let claimed = match items.iter_mut().find(|a| a.id == id && !a.executed) {
            Some(action) => {
                action.executed = true;
                action.executed_at = Some(at);
                action.error = Some(OUTCOME_NOT_RECORDED.to_string());
                true
            }
            None => false,
        };
        async move { Ok(claimed) }
    }

    fn complete(
        &self,
        _ctx: &SystemContext,
        id: DelayedActionId,
        error: Option<String>,
    ) -> impl Future<Output = Result<(), OrderFlowError>> + Send {
        let result = if self.failing_complete {
            Err(storage_error("queue unavailable"))
        } else {
            if let Some(action) = self.items.lock().unwrap().iter_mut().find(|a| a.id == id) {
                action.error = error;
            }
            Ok(())
        };
        async { result }
    }

    fn get_by_id(
        &self,
        tenant_id: TenantId,
        id: DelayedActionId,
    ) -> impl Future<Output = Result<Option<DelayedAction>, OrderFlowError>> + Send {
        let result = self
            .items
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id == id && a.tenant_id == tenant_id)
            .cloned();
        async { Ok(result) }
    }

    fn find_by_rule(
        &self,
        tenant_id: TenantId,
        rule_id: RuleId,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<DelayedAction>, OrderFlowError>> + Send {
        let mut result: Vec<_> = self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.tenant_id == tenant_id && a.rule_id == rule_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        result.truncate(limit);
        async { Ok(result) }
    }
}

// ── Rule logs ──────────────────────────────────────────────────────

#[derive(Default)]
pub(crate) struct InMemoryLogRepo {
    logs: Mutex<Vec<AutomationRuleLog>>,
    failing: bool,
}

impl InMemoryLogRepo {
    pub(crate) fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub(crate) fn all(&self) -> Vec<AutomationRuleLog> {
        self.logs.lock().unwrap().clone()
    }
}

impl RuleLogRepository for InMemoryLogRepo {
    fn append(
        &self,
        log: AutomationRuleLog,
    ) -> impl Future<Output = Result<AutomationRuleLog, OrderFlowError>> + Send {
        let result = if self.failing {
            Err(storage_error("log table locked"))
        } else {
            self.logs.lock().unwrap().push(log.clone());
            Ok(log)
        };
        async { result }
    }

    fn find_by_rule(
        &self,
        tenant_id: TenantId,
        rule_id: RuleId,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<AutomationRuleLog>, OrderFlowError>> + Send {
        let mut result: Vec<_> = self
            .logs
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.tenant_id == tenant_id && l.rule_id == rule_id)
            .cloned()
            .collect();
        result.reverse();
        result.truncate(limit);
        async { Ok(result) }
    }
}

// ── Action sink ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Invocation {
    pub tenant_id: TenantId,
    pub action: ActionKind,
    pub entity_id: uuid::Uuid,
}

/// Records every invocation; fails for the configured action types.
#[derive(Default)]
pub(crate) struct RecordingSink {
    calls: Mutex<Vec<Invocation>>,
    failing: HashSet<ActionType>,
}

impl RecordingSink {
    pub(crate) fn failing_on(action_type: ActionType) -> Self {
        Self {
            failing: HashSet::from([action_type]),
            ..Self::default()
        }
    }

    pub(crate) fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }
}

impl ActionSink for RecordingSink {
    fn invoke(
        &self,
        ctx: &TenantContext,
        action: &ActionKind,
        event: &EventContext,
    ) -> impl Future<Output = Result<(), ActionError>> + Send {
        self.calls.lock().unwrap().push(Invocation {
            tenant_id: ctx.tenant_id(),
            action: action.clone(),
            entity_id: event.entity_id,
        });
        let action_type = action.action_type();
        let result = if self.failing.contains(&action_type) {
            Err(ActionError::new(action_type.as_str(), "integration unavailable"))
        } else {
            Ok(())
        };
        async { result }
    }
}
