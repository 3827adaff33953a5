//! Delayed action worker: executes deferred actions once they are due.
//!
//! Each poll fetches a batch of due actions across all tenants under a
//! [`SystemContext`], then handles them one by one:
//!
//! 1. claim the row (a conditional update, so only one worker wins it),
//! 2. narrow to the row's tenant and re-resolve the rule's *current*
//!    action at the stored index,
//! 3. invoke the sink and record the outcome on the row.
//!
//! A claimed row reads as failed until step 3 records its outcome, so a
//! lost outcome write is never mistaken for a success.
//!
//! A failure on one row never affects the others in the batch. Claimed rows
//! are never retried automatically; use replay for that.

use std::time::Duration;

use orderflow_domain::context::{SystemContext, TenantContext};
use orderflow_domain::delayed_action::{DelayedAction, OUTCOME_NOT_RECORDED};
use orderflow_domain::error::{ActionError, OrderFlowError};
use orderflow_domain::id::RuleId;
use orderflow_domain::time::{self, Timestamp};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::action_executor::ActionExecutor;
use crate::ports::{ActionSink, AutomationRuleRepository, DelayedActionStore};

/// Why a claimed delayed action could not be carried out.
#[derive(Debug, thiserror::Error)]
pub enum DelayedExecutionError {
    #[error("rule {0} no longer exists")]
    RuleNotFound(RuleId),

    #[error("rule {0} is disabled")]
    RuleDisabled(RuleId),

    #[error("rule has no action at index {index} (it has {len})")]
    ActionMissing { index: u32, len: usize },

    #[error("failed to load rule: {0}")]
    Lookup(#[source] OrderFlowError),

    #[error(transparent)]
    Action(#[from] ActionError),
}

/// Counters for one polling pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Rows returned by the due query.
    pub due: usize,
    /// Rows this worker won the claim for.
    pub claimed: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Rows another worker claimed first (or whose claim errored).
    pub skipped: usize,
    /// Claimed rows whose outcome could not be written; they stay failed
    /// with [`OUTCOME_NOT_RECORDED`].
    pub unrecorded: usize,
}

enum ItemOutcome {
    Succeeded,
    Failed,
    Unrecorded,
    Skipped,
}

/// Polls the delayed action store and executes due actions.
pub struct DelayedActionWorker<R, D, S> {
    rules: R,
    store: D,
    sink: S,
    batch_size: usize,
}

impl<R, D, S> DelayedActionWorker<R, D, S>
where
    R: AutomationRuleRepository,
    D: DelayedActionStore,
    S: ActionSink,
{
    pub fn new(rules: R, store: D, sink: S, batch_size: usize) -> Self {
        Self {
            rules,
            store,
            sink,
            batch_size: batch_size.max(1),
        }
    }

    /// Run a single polling pass as of `now`.
    ///
    /// # Errors
    ///
    /// Returns a storage error only if the due query itself fails.
    /// Per-row failures are logged and counted in the report.
    #[tracing::instrument(skip(self), fields(batch_size = self.batch_size))]
    pub async fn poll_once(&self, now: Timestamp) -> Result<PollReport, OrderFlowError> {
        let system = SystemContext::background_worker();
        let due = self.store.fetch_due(&system, now, self.batch_size).await?;
        let mut report = PollReport {
            due: due.len(),
            ..PollReport::default()
        };

        for action in due {
            match self.handle(&system, &action, now).await {
                ItemOutcome::Succeeded => {
                    report.claimed += 1;
                    report.succeeded += 1;
                }
                ItemOutcome::Failed => {
                    report.claimed += 1;
                    report.failed += 1;
                }
                ItemOutcome::Unrecorded => {
                    report.claimed += 1;
                    report.unrecorded += 1;
                }
                ItemOutcome::Skipped => report.skipped += 1,
            }
        }

        if report.due > 0 {
            tracing::info!(
                due = report.due,
                succeeded = report.succeeded,
                failed = report.failed,
                skipped = report.skipped,
                unrecorded = report.unrecorded,
                "delayed actions processed"
            );
        }
        Ok(report)
    }

    #[tracing::instrument(
        skip_all,
        fields(
            purpose = system.purpose(),
            delayed_action_id = %action.id,
            tenant_id = %action.tenant_id,
        )
    )]
    async fn handle(
        &self,
        system: &SystemContext,
        action: &DelayedAction,
        now: Timestamp,
    ) -> ItemOutcome {
        match self.store.claim(system, action.id, now).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!("already claimed by another worker");
                return ItemOutcome::Skipped;
            }
            Err(err) => {
                tracing::warn!(%err, "failed to claim delayed action");
                return ItemOutcome::Skipped;
            }
        }

        let ctx = system.scoped(action.tenant_id);
        let error = match self.execute(&ctx, action).await {
            Ok(()) => None,
            Err(err) => {
                tracing::warn!(%err, "delayed action failed");
                Some(err.to_string())
            }
        };
        let outcome = if error.is_some() {
            ItemOutcome::Failed
        } else {
            ItemOutcome::Succeeded
        };

        if let Err(err) = self.store.complete(system, action.id, error).await {
            tracing::error!(
                %err,
                stored_error = OUTCOME_NOT_RECORDED,
                "failed to record delayed action outcome"
            );
            return ItemOutcome::Unrecorded;
        }
        outcome
    }

    async fn execute(
        &self,
        ctx: &TenantContext,
        action: &DelayedAction,
    ) -> Result<(), DelayedExecutionError> {
        let rule = self
            .rules
            .get_by_id(ctx.tenant_id(), action.rule_id)
            .await
            .map_err(DelayedExecutionError::Lookup)?
            .ok_or(DelayedExecutionError::RuleNotFound(action.rule_id))?;
        if !rule.enabled {
            return Err(DelayedExecutionError::RuleDisabled(rule.id));
        }
        let current = usize::try_from(action.action_index)
            .ok()
            .and_then(|index| rule.actions.get(index))
            .ok_or(DelayedExecutionError::ActionMissing {
                index: action.action_index,
                len: rule.actions.len(),
            })?;

        ActionExecutor::new(&self.sink, &self.store)
            .invoke(ctx, &current.kind, &action.event_data)
            .await?;
        Ok(())
    }
}

impl<R, D, S> DelayedActionWorker<R, D, S>
where
    R: AutomationRuleRepository + Send + Sync + 'static,
    D: DelayedActionStore + Send + Sync + 'static,
    S: ActionSink + Send + Sync + 'static,
{
    /// Spawn the polling loop.
    ///
    /// The loop stops once `shutdown` flips to `true` (or its sender is
    /// dropped); a pass already in progress is finished first.
    pub fn start(self, interval: Duration, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tracing::info!(
            ?interval,
            batch_size = self.batch_size,
            "delayed action worker started"
        );
        tokio::spawn(self.run(interval, shutdown))
    }

    async fn run(self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                break;
            }
            if let Err(err) = self.poll_once(time::now()).await {
                tracing::warn!(%err, "delayed action poll failed, retrying next interval");
            }
            tokio::select! {
                () = tokio::time::sleep(interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        tracing::info!("delayed action worker stopped");
    }
}
