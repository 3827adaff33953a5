//! Automation rule repository port: tenant-scoped persistence for rules.

use std::future::Future;
use std::sync::Arc;

use orderflow_domain::automation::{AutomationRule, TriggerEvent};
use orderflow_domain::error::OrderFlowError;
use orderflow_domain::id::{RuleId, TenantId};
use orderflow_domain::time::Timestamp;

/// Repository for persisting and querying [`AutomationRule`]s.
///
/// Every read and write is scoped to a tenant; a rule owned by another
/// tenant behaves exactly like a missing one.
pub trait AutomationRuleRepository {
    /// Create a new rule in storage.
    fn create(
        &self,
        rule: AutomationRule,
    ) -> impl Future<Output = Result<AutomationRule, OrderFlowError>> + Send;

    /// Get a rule by its identifier within a tenant.
    fn get_by_id(
        &self,
        tenant_id: TenantId,
        id: RuleId,
    ) -> impl Future<Output = Result<Option<AutomationRule>, OrderFlowError>> + Send;

    /// All rules of a tenant, in execution order.
    fn list(
        &self,
        tenant_id: TenantId,
    ) -> impl Future<Output = Result<Vec<AutomationRule>, OrderFlowError>> + Send;

    /// Enabled rules of a tenant subscribed to `trigger_event`.
    ///
    /// Implementations may return them in any order; callers sort.
    fn find_enabled_by_trigger(
        &self,
        tenant_id: TenantId,
        trigger_event: TriggerEvent,
    ) -> impl Future<Output = Result<Vec<AutomationRule>, OrderFlowError>> + Send;

    /// Replace the stored definition of an existing rule.
    ///
    /// Returns [`OrderFlowError::NotFound`] when the rule does not exist
    /// for `rule.tenant_id`.
    fn update(
        &self,
        rule: AutomationRule,
    ) -> impl Future<Output = Result<AutomationRule, OrderFlowError>> + Send;

    /// Delete a rule.
    fn delete(
        &self,
        tenant_id: TenantId,
        id: RuleId,
    ) -> impl Future<Output = Result<(), OrderFlowError>> + Send;

    /// Atomically add one to `fire_count` and set `last_fired_at`.
    fn record_fire(
        &self,
        tenant_id: TenantId,
        id: RuleId,
        fired_at: Timestamp,
    ) -> impl Future<Output = Result<(), OrderFlowError>> + Send;
}

impl<T: AutomationRuleRepository + Send + Sync> AutomationRuleRepository for Arc<T> {
    fn create(
        &self,
        rule: AutomationRule,
    ) -> impl Future<Output = Result<AutomationRule, OrderFlowError>> + Send {
        (**self).create(rule)
    }

    fn get_by_id(
        &self,
        tenant_id: TenantId,
        id: RuleId,
    ) -> impl Future<Output = Result<Option<AutomationRule>, OrderFlowError>> + Send {
        (**self).get_by_id(tenant_id, id)
    }

    fn list(
        &self,
        tenant_id: TenantId,
    ) -> impl Future<Output = Result<Vec<AutomationRule>, OrderFlowError>> + Send {
        (**self).list(tenant_id)
    }

    fn find_enabled_by_trigger(
        &self,
        tenant_id: TenantId,
        trigger_event: TriggerEvent,
    ) -> impl Future<Output = Result<Vec<AutomationRule>, OrderFlowError>> + Send {
        (**self).find_enabled_by_trigger(tenant_id, trigger_event)
    }

    fn update(
        &self,
        rule: AutomationRule,
    ) -> impl Future<Output = Result<AutomationRule, OrderFlowError>> + Send {
        (**self).update(rule)
    }

    fn delete(
        &self,
        tenant_id: TenantId,
        id: RuleId,
    ) -> impl Future<Output = Result<(), OrderFlowError>> + Send {
        (**self).delete(tenant_id, id)
    }

    fn record_fire(
        &self,
        tenant_id: TenantId,
        id: RuleId,
        fired_at: Timestamp,
    ) -> impl Future<Output = Result<(), OrderFlowError>> + Send {
        (**self).record_fire(tenant_id, id, fired_at)
    }
}
