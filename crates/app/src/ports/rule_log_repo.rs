//! Rule log repository port: append-only audit trail.

use std::future::Future;
use std::sync::Arc;

use orderflow_domain::error::OrderFlowError;
use orderflow_domain::id::{RuleId, TenantId};
use orderflow_domain::rule_log::AutomationRuleLog;

/// Append-only storage for [`AutomationRuleLog`]s.
pub trait RuleLogRepository {
    /// Append one log row. Rows are never updated afterwards.
    fn append(
        &self,
        log: AutomationRuleLog,
    ) -> impl Future<Output = Result<AutomationRuleLog, OrderFlowError>> + Send;

    /// Most recent logs of a rule, newest first.
    fn find_by_rule(
        &self,
        tenant_id: TenantId,
        rule_id: RuleId,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<AutomationRuleLog>, OrderFlowError>> + Send;
}

impl<T: RuleLogRepository + Send + Sync> RuleLogRepository for Arc<T> {
    fn append(
        &self,
        log: AutomationRuleLog,
    ) -> impl Future<Output = Result<AutomationRuleLog, OrderFlowError>> + Send {
        (**self).append(log)
    }

    fn find_by_rule(
        &self,
        tenant_id: TenantId,
        rule_id: RuleId,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<AutomationRuleLog>, OrderFlowError>> + Send {
        (**self).find_by_rule(tenant_id, rule_id, limit)
    }
}
