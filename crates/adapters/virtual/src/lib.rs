//! # orderflow-adapter-virtual
//!
//! Virtual/demo [`ActionSink`] that simulates the order-management
//! integrations in memory, for testing and demonstration purposes.
//!
//! ## Simulated integrations
//!
//! | Action | Behaviour |
//! |--------|-----------|
//! | `set_status` | Sets the status of the event's order |
//! | `add_tag` | Adds a tag to the event's order |
//! | `send_email` | Appends to an outbox; recipient from config or `customer.email` |
//! | `create_invoice` | Records an invoice for the event's order |
//! | `webhook` | Records a delivery carrying the event payload |
//!
//! Any action type can be made to fail with [`VirtualActionSink::fail`].
//!
//! ## Dependency rule
//!
//! Depends on `orderflow-app` (port traits) and `orderflow-domain` only.

mod records;

pub use records::{Invocation, IssuedInvoice, SentEmail, VirtualState, WebhookDelivery};

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use orderflow_app::ports::ActionSink;
use orderflow_domain::automation::{ActionKind, ActionType};
use orderflow_domain::context::TenantContext;
use orderflow_domain::error::ActionError;
use orderflow_domain::event::EventContext;
use orderflow_domain::id::TenantId;
use uuid::Uuid;

/// In-memory action sink recording the effect of every action.
#[derive(Default)]
pub struct VirtualActionSink {
    state: Mutex<VirtualState>,
    failures: Mutex<HashMap<ActionType, String>>,
}

impl VirtualActionSink {
    /// Make every subsequent `action_type` invocation fail with `reason`.
    pub fn fail(&self, action_type: ActionType, reason: impl Into<String>) {
        lock(&self.failures).insert(action_type, reason.into());
    }

    /// Undo [`Self::fail`].
    pub fn recover(&self, action_type: ActionType) {
        lock(&self.failures).remove(&action_type);
    }

    /// Copy of the current simulated state.
    #[must_use]
    pub fn snapshot(&self) -> VirtualState {
        lock(&self.state).clone()
    }

    #[must_use]
    pub fn invocations(&self) -> Vec<Invocation> {
        lock(&self.state).invocations.clone()
    }

    #[must_use]
    pub fn status_of(&self, tenant_id: TenantId, order_id: Uuid) -> Option<String> {
        lock(&self.state).statuses.get(&(tenant_id, order_id)).cloned()
    }

    #[must_use]
    pub fn tags_of(&self, tenant_id: TenantId, order_id: Uuid) -> BTreeSet<String> {
        lock(&self.state)
            .tags
            .get(&(tenant_id, order_id))
            .cloned()
            .unwrap_or_default()
    }

    fn apply(
        &self,
        tenant_id: TenantId,
        action: &ActionKind,
        event: &EventContext,
    ) -> Result<(), ActionError> {
        let action_type = action.action_type();
        if let Some(reason) = lock(&self.failures).get(&action_type) {
            return Err(ActionError::new(action_type.as_str(), reason.clone()));
        }

        let mut state = lock(&self.state);
        match action {
            ActionKind::SetStatus(config) => {
                let order_id = require_order(action_type, event)?;
                state
                    .statuses
                    .insert((tenant_id, order_id), config.status.clone());
            }
            ActionKind::AddTag(config) => {
                let order_id = require_order(action_type, event)?;
                state
                    .tags
                    .entry((tenant_id, order_id))
                    .or_default()
                    .insert(config.tag.clone());
            }
            ActionKind::SendEmail(config) => {
                let to = config
                    .to
                    .clone()
                    .or_else(|| customer_email(&event.data))
                    .ok_or_else(|| ActionError::new(action_type.as_str(), "no recipient"))?;
                state.outbox.push(SentEmail {
                    tenant_id,
                    to,
                    subject: config.subject.clone(),
                    template: config.template.clone(),
                });
            }
            ActionKind::CreateInvoice(config) => {
                let order_id = require_order(action_type, event)?;
                state.invoices.push(IssuedInvoice {
                    tenant_id,
                    order_id,
                    sent_to_customer: config.send_to_customer,
                });
            }
            ActionKind::Webhook(config) => {
                state.deliveries.push(WebhookDelivery {
                    tenant_id,
                    url: config.url.clone(),
                    headers: config.headers.clone(),
                    payload: serde_json::to_value(event).unwrap_or_default(),
                });
            }
        }
        Ok(())
    }
}

impl ActionSink for VirtualActionSink {
    fn invoke(
        &self,
        ctx: &TenantContext,
        action: &ActionKind,
        event: &EventContext,
    ) -> impl Future<Output = Result<(), ActionError>> + Send {
        let tenant_id = ctx.tenant_id();
        let result = self.apply(tenant_id, action, event);
        match &result {
            Ok(()) => tracing::info!(%tenant_id, %action, "virtual action applied"),
            Err(err) => tracing::warn!(%tenant_id, %action, %err, "virtual action rejected"),
        }
        lock(&self.state).invocations.push(Invocation {
            tenant_id,
            action_type: action.action_type(),
            entity_id: event.entity_id,
            error: result.as_ref().err().map(ToString::to_string),
        });
        async { result }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn require_order(action_type: ActionType, event: &EventContext) -> Result<Uuid, ActionError> {
    event
        .order_id()
        .ok_or_else(|| ActionError::new(action_type.as_str(), "event is not related to an order"))
}

fn customer_email(data: &serde_json::Value) -> Option<String> {
    data.pointer("/customer/email")
        .or_else(|| data.get("customer_email"))
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
}
