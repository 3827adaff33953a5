//! Automation service: use-cases for managing rules and reading their history.

use orderflow_domain::automation::{AutomationRule, DryRunReport};
use orderflow_domain::context::TenantContext;
use orderflow_domain::error::{NotFoundError, OrderFlowError};
use orderflow_domain::id::RuleId;
use orderflow_domain::rule_log::AutomationRuleLog;
use orderflow_domain::time;

use crate::ports::{AutomationRuleRepository, RuleLogRepository};

/// Application service for rule CRUD, dry runs and execution logs.
pub struct AutomationService<R, L> {
    repo: R,
    logs: L,
}

impl<R, L> AutomationService<R, L>
where
    R: AutomationRuleRepository,
    L: RuleLogRepository,
{
    /// Create a new service backed by the given repositories.
    pub fn new(repo: R, logs: L) -> Self {
        Self { repo, logs }
    }

    /// Create a new rule in the caller's tenant after validating it.
    ///
    /// The tenant and the fire statistics are taken from the context, not
    /// from the submitted rule.
    ///
    /// # Errors
    ///
    /// Returns [`OrderFlowError::Validation`] if invariants fail, or a
    /// storage error propagated from the repository.
    #[tracing::instrument(
        skip(self, rule),
        fields(tenant_id = %ctx.tenant_id(), rule_name = %rule.name)
    )]
    pub async fn create_rule(
        &self,
        ctx: &TenantContext,
        mut rule: AutomationRule,
    ) -> Result<AutomationRule, OrderFlowError> {
        rule.tenant_id = ctx.tenant_id();
        rule.fire_count = 0;
        rule.last_fired_at = None;
        rule.validate()?;
        self.repo.create(rule).await
    }

    /// Look up a rule by id, returning an error if not found.
    ///
    /// # Errors
    ///
    /// Returns [`OrderFlowError::NotFound`] when no rule with `id` exists in
    /// the caller's tenant, or a storage error from the repository.
    #[tracing::instrument(skip(self), fields(tenant_id = %ctx.tenant_id()))]
    pub async fn get_rule(
        &self,
        ctx: &TenantContext,
        id: RuleId,
    ) -> Result<AutomationRule, OrderFlowError> {
        self.repo
            .get_by_id(ctx.tenant_id(), id)
            .await?
            .ok_or_else(|| rule_not_found(id))
    }

    /// List the tenant's rules in execution order.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn list_rules(
        &self,
        ctx: &TenantContext,
    ) -> Result<Vec<AutomationRule>, OrderFlowError> {
        self.repo.list(ctx.tenant_id()).await
    }

    /// Replace a rule's definition.
    ///
    /// Fire statistics and `created_at` are preserved; `updated_at` is
    /// bumped. Pending delayed actions of the rule will pick up the new
    /// actions when they run.
    ///
    /// # Errors
    ///
    /// Returns [`OrderFlowError::NotFound`] if the rule does not exist,
    /// [`OrderFlowError::Validation`] if invariants fail, or a storage error.
    #[tracing::instrument(
        skip(self, rule),
        fields(tenant_id = %ctx.tenant_id(), rule_id = %rule.id)
    )]
    pub async fn update_rule(
        &self,
        ctx: &TenantContext,
        mut rule: AutomationRule,
    ) -> Result<AutomationRule, OrderFlowError> {
        let existing = self.get_rule(ctx, rule.id).await?;
        rule.tenant_id = existing.tenant_id;
        rule.fire_count = existing.fire_count;
        rule.last_fired_at = existing.last_fired_at;
        rule.created_at = existing.created_at;
        rule.updated_at = time::now();
        rule.validate()?;
        self.repo.update(rule).await
    }

    /// Enable or disable a rule.
    ///
    /// # Errors
    ///
    /// Returns [`OrderFlowError::NotFound`] if the rule does not exist, or a
    /// storage error.
    #[tracing::instrument(skip(self), fields(tenant_id = %ctx.tenant_id()))]
    pub async fn set_enabled(
        &self,
        ctx: &TenantContext,
        id: RuleId,
        enabled: bool,
    ) -> Result<AutomationRule, OrderFlowError> {
        let mut rule = self.get_rule(ctx, id).await?;
        if rule.enabled == enabled {
            return Ok(rule);
        }
        rule.enabled = enabled;
        rule.updated_at = time::now();
        self.repo.update(rule).await
    }

    /// Delete a rule. Its logs and delayed actions are kept.
    ///
    /// # Errors
    ///
    /// Returns [`OrderFlowError::NotFound`] if the rule does not exist, or a
    /// storage error.
    #[tracing::instrument(skip(self), fields(tenant_id = %ctx.tenant_id()))]
    pub async fn delete_rule(&self, ctx: &TenantContext, id: RuleId) -> Result<(), OrderFlowError> {
        self.repo.delete(ctx.tenant_id(), id).await
    }

    /// Evaluate an unsaved rule definition against synthetic data.
    ///
    /// Nothing is persisted and no action runs.
    ///
    /// # Errors
    ///
    /// Returns [`OrderFlowError::Validation`] if the definition is invalid.
    pub fn dry_run(
        &self,
        rule: &AutomationRule,
        data: &serde_json::Value,
    ) -> Result<DryRunReport, OrderFlowError> {
        rule.validate()?;
        Ok(rule.dry_run(data))
    }

    /// Evaluate a saved rule against synthetic data.
    ///
    /// # Errors
    ///
    /// Returns [`OrderFlowError::NotFound`] if the rule does not exist, or a
    /// storage error.
    #[tracing::instrument(skip(self, data), fields(tenant_id = %ctx.tenant_id()))]
    pub async fn dry_run_saved(
        &self,
        ctx: &TenantContext,
        id: RuleId,
        data: &serde_json::Value,
    ) -> Result<DryRunReport, OrderFlowError> {
        let rule = self.get_rule(ctx, id).await?;
        Ok(rule.dry_run(data))
    }

    /// Most recent execution logs of a rule, newest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn list_logs(
        &self,
        ctx: &TenantContext,
        rule_id: RuleId,
        limit: usize,
    ) -> Result<Vec<AutomationRuleLog>, OrderFlowError> {
        self.logs.find_by_rule(ctx.tenant_id(), rule_id, limit).await
    }
}

fn rule_not_found(id: RuleId) -> OrderFlowError {
    NotFoundError {
        entity: "AutomationRule",
        id: id.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation_engine::AutomationEngine;
    use crate::testing::{
        InMemoryDelayedStore, InMemoryLogRepo, InMemoryRuleRepo, RecordingSink, order_created,
        tag,
    };
    use orderflow_domain::automation::{Condition, Operator, TriggerEvent};
    use orderflow_domain::error::ValidationError;
    use orderflow_domain::id::TenantId;
    use serde_json::json;
    use std::sync::Arc;

    fn service() -> AutomationService<InMemoryRuleRepo, InMemoryLogRepo> {
        AutomationService::new(InMemoryRuleRepo::default(), InMemoryLogRepo::default())
    }

    fn draft(name: &str) -> AutomationRule {
        AutomationRule::builder()
            .name(name)
            .trigger_event(TriggerEvent::OrderPaid)
            .condition(Condition::new("total", Operator::Gte, json!(50)))
            .action(tag("paid"))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn should_create_rule_in_callers_tenant() {
        let svc = service();
        let ctx = TenantContext::new(TenantId::new());
        let mut rule = draft("Paid");
        rule.fire_count = 99;

        let created = svc.create_rule(&ctx, rule).await.unwrap();

        assert_eq!(created.tenant_id, ctx.tenant_id());
        assert_eq!(created.fire_count, 0);
        let fetched = svc.get_rule(&ctx, created.id).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn should_reject_invalid_rule_on_create() {
        let svc = service();
        let mut rule = draft("x");
        rule.name = "  ".to_string();

        let result = svc
            .create_rule(&TenantContext::new(TenantId::new()), rule)
            .await;

        assert!(matches!(
            result,
            Err(OrderFlowError::Validation(ValidationError::EmptyName))
        ));
    }

    #[tokio::test]
    async fn should_return_not_found_when_rule_belongs_to_other_tenant() {
        let svc = service();
        let owner = TenantContext::new(TenantId::new());
        let created = svc.create_rule(&owner, draft("Mine")).await.unwrap();

        let result = svc
            .get_rule(&TenantContext::new(TenantId::new()), created.id)
            .await;

        assert!(matches!(result, Err(OrderFlowError::NotFound(_))));
    }

    #[tokio::test]
    async fn should_preserve_fire_stats_when_updating() {
        let ctx = TenantContext::new(TenantId::new());
        let rules = Arc::new(InMemoryRuleRepo::default());
        let logs = Arc::new(InMemoryLogRepo::default());
        let svc = AutomationService::new(Arc::clone(&rules), Arc::clone(&logs));
        let created = svc.create_rule(&ctx, draft("Paid")).await.unwrap();
        let engine = AutomationEngine::new(
            Arc::clone(&rules),
            InMemoryDelayedStore::default(),
            Arc::clone(&logs),
            RecordingSink::default(),
        );
        let mut event = order_created(json!({"total": 80}));
        event.trigger_event = "order.paid".to_string();
        engine.process(&ctx, &event).await.unwrap();

        let mut edited = created.clone();
        edited.name = "Paid (renamed)".to_string();
        edited.fire_count = 0;
        let updated = svc.update_rule(&ctx, edited).await.unwrap();

        assert_eq!(updated.name, "Paid (renamed)");
        assert_eq!(updated.fire_count, 1);
        assert!(updated.last_fired_at.is_some());
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(svc.list_logs(&ctx, created.id, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn should_toggle_enabled_flag() {
        let svc = service();
        let ctx = TenantContext::new(TenantId::new());
        let created = svc.create_rule(&ctx, draft("Paid")).await.unwrap();

        let disabled = svc.set_enabled(&ctx, created.id, false).await.unwrap();
        assert!(!disabled.enabled);
        assert!(!svc.get_rule(&ctx, created.id).await.unwrap().enabled);
    }

    #[tokio::test]
    async fn should_delete_rule_and_fail_second_delete() {
        let svc = service();
        let ctx = TenantContext::new(TenantId::new());
        let created = svc.create_rule(&ctx, draft("Paid")).await.unwrap();

        svc.delete_rule(&ctx, created.id).await.unwrap();

        assert!(svc.list_rules(&ctx).await.unwrap().is_empty());
        assert!(matches!(
            svc.delete_rule(&ctx, created.id).await,
            Err(OrderFlowError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn should_dry_run_saved_rule_without_side_effects() {
        let svc = service();
        let ctx = TenantContext::new(TenantId::new());
        let created = svc.create_rule(&ctx, draft("Paid")).await.unwrap();

        let report = svc
            .dry_run_saved(&ctx, created.id, &json!({"total": 50}))
            .await
            .unwrap();

        assert!(report.conditions_met);
        assert_eq!(report.would_execute.len(), 1);
        let stored = svc.get_rule(&ctx, created.id).await.unwrap();
        assert_eq!(stored.fire_count, 0);
        assert!(svc.list_logs(&ctx, created.id, 10).await.unwrap().is_empty());
    }

    #[test]
    fn should_dry_run_unsaved_definition() {
        let report = service()
            .dry_run(&draft("Draft"), &json!({"total": 10}))
            .unwrap();
        assert!(!report.conditions_met);
        assert!(report.would_execute.is_empty());
    }
}
