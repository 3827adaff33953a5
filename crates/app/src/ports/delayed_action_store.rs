//! Delayed action store port: the durable queue behind deferred actions.

use std::future::Future;
use std::sync::Arc;

use orderflow_domain::context::SystemContext;
use orderflow_domain::delayed_action::DelayedAction;
use orderflow_domain::error::OrderFlowError;
use orderflow_domain::id::{DelayedActionId, RuleId, TenantId};
use orderflow_domain::time::Timestamp;

/// Persistence for [`DelayedAction`]s.
///
/// The worker-facing operations (`fetch_due`, `claim`, `complete`) cross
/// tenant boundaries and therefore demand a [`SystemContext`].
pub trait DelayedActionStore {
    /// Persist a newly scheduled action.
    fn enqueue(
        &self,
        action: DelayedAction,
    ) -> impl Future<Output = Result<DelayedAction, OrderFlowError>> + Send;

    /// Pending actions with `execute_at <= now`, oldest due first, across
    /// all tenants, at most `limit` of them.
    fn fetch_due(
        &self,
        ctx: &SystemContext,
        now: Timestamp,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<DelayedAction>, OrderFlowError>> + Send;

    /// Mark a pending action executed at `at`, with
    /// [`OUTCOME_NOT_RECORDED`](orderflow_domain::delayed_action::OUTCOME_NOT_RECORDED)
    /// as its error until [`Self::complete`] overwrites it.
    ///
    /// Returns `false` when the action was already executed, so that of
    /// several concurrent claimers exactly one gets `true`.
    fn claim(
        &self,
        ctx: &SystemContext,
        id: DelayedActionId,
        at: Timestamp,
    ) -> impl Future<Output = Result<bool, OrderFlowError>> + Send;

    /// Record the outcome of a claimed action (`None` means success).
    fn complete(
        &self,
        ctx: &SystemContext,
        id: DelayedActionId,
        error: Option<String>,
    ) -> impl Future<Output = Result<(), OrderFlowError>> + Send;

    /// Get one delayed action of a tenant.
    fn get_by_id(
        &self,
        tenant_id: TenantId,
        id: DelayedActionId,
    ) -> impl Future<Output = Result<Option<DelayedAction>, OrderFlowError>> + Send;

    /// Delayed actions scheduled by a rule, newest first.
    fn find_by_rule(
        &self,
        tenant_id: TenantId,
        rule_id: RuleId,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<DelayedAction>, OrderFlowError>> + Send;
}

impl<T: DelayedActionStore + Send + Sync> DelayedActionStore for Arc<T> {
    fn enqueue(
        &self,
        action: DelayedAction,
    ) -> impl Future<Output = Result<DelayedAction, OrderFlowError>> + Send {
        (**self).enqueue(action)
    }

    fn fetch_due(
        &self,
        ctx: &SystemContext,
        now: Timestamp,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<DelayedAction>, OrderFlowError>> + Send {
        (**self).fetch_due(ctx, now, limit)
    }

    fn claim(
        &self,
        ctx: &SystemContext,
        id: DelayedActionId,
        at: Timestamp,
    ) -> impl Future<Output = Result<bool, OrderFlowError>> + Send {
        (**self).claim(ctx, id, at)
    }

    fn complete(
        &self,
        ctx: &SystemContext,
        id: DelayedActionId,
        error: Option<String>,
    ) -> impl Future<Output = Result<(), OrderFlowError>> + Send {
        (**self).complete(ctx, id, error)
    }

    fn get_by_id(
        &self,
        tenant_id: TenantId,
        id: DelayedActionId,
    ) -> impl Future<Output = Result<Option<DelayedAction>, OrderFlowError>> + Send {
        (**self).get_by_id(tenant_id, id)
    }

    fn find_by_rule(
        &self,
        tenant_id: TenantId,
        rule_id: RuleId,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<DelayedAction>, OrderFlowError>> + Send {
        (**self).find_by_rule(tenant_id, rule_id, limit)
    }
}
