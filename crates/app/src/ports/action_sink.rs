//! Action sink port: where side effects leave the engine.

use std::future::Future;
use std::sync::Arc;

use orderflow_domain::automation::ActionKind;
use orderflow_domain::context::TenantContext;
use orderflow_domain::error::ActionError;
use orderflow_domain::event::EventContext;

/// Performs one action (set a status, send an email, call a webhook...).
///
/// Implementations report failures as [`ActionError`]; the caller records
/// them and carries on with the next action.
pub trait ActionSink {
    fn invoke(
        &self,
        ctx: &TenantContext,
        action: &ActionKind,
        event: &EventContext,
    ) -> impl Future<Output = Result<(), ActionError>> + Send;
}

impl<T: ActionSink + Send + Sync> ActionSink for Arc<T> {
    fn invoke(
        &self,
        ctx: &TenantContext,
        action: &ActionKind,
        event: &EventContext,
    ) -> impl Future<Output = Result<(), ActionError>> + Send {
        (**self).invoke(ctx, action, event)
    }
}
