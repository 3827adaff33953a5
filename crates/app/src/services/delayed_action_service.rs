//! Delayed action service: inspection and manual replay of deferred actions.

use orderflow_domain::context::TenantContext;
use orderflow_domain::delayed_action::{DelayedAction, DelayedActionStatus};
use orderflow_domain::error::{NotFoundError, OrderFlowError, ValidationError};
use orderflow_domain::id::{DelayedActionId, RuleId};
use orderflow_domain::time;

use crate::ports::DelayedActionStore;

pub struct DelayedActionService<D> {
    store: D,
}

impl<D: DelayedActionStore> DelayedActionService<D> {
    pub fn new(store: D) -> Self {
        Self { store }
    }

    /// # Errors
    ///
    /// Returns [`OrderFlowError::NotFound`] when the action does not exist in
    /// the caller's tenant, or a storage error.
    #[tracing::instrument(skip(self), fields(tenant_id = %ctx.tenant_id()))]
    pub async fn get(
        &self,
        ctx: &TenantContext,
        id: DelayedActionId,
    ) -> Result<DelayedAction, OrderFlowError> {
        self.store
            .get_by_id(ctx.tenant_id(), id)
            .await?
            .ok_or_else(|| {
                NotFoundError {
                    entity: "DelayedAction",
                    id: id.to_string(),
                }
                .into()
            })
    }

    /// Delayed actions a rule scheduled, newest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the store.
    pub async fn list_for_rule(
        &self,
        ctx: &TenantContext,
        rule_id: RuleId,
        limit: usize,
    ) -> Result<Vec<DelayedAction>, OrderFlowError> {
        self.store.find_by_rule(ctx.tenant_id(), rule_id, limit).await
    }

    /// Queue an executed action again, due immediately.
    ///
    /// A new row is created; the original keeps its outcome.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::DelayedActionPending`] when the action has
    /// not run yet, [`OrderFlowError::NotFound`] when it does not exist, or
    /// a storage error.
    #[tracing::instrument(skip(self), fields(tenant_id = %ctx.tenant_id()))]
    pub async fn replay(
        &self,
        ctx: &TenantContext,
        id: DelayedActionId,
    ) -> Result<DelayedAction, OrderFlowError> {
        let original = self.get(ctx, id).await?;
        if original.status() == DelayedActionStatus::Pending {
            return Err(ValidationError::DelayedActionPending(id.to_string()).into());
        }
        let replay = self.store.enqueue(original.replay(time::now())).await?;
        tracing::info!(replay_id = %replay.id, "delayed action replayed");
        Ok(replay)
    }
}
