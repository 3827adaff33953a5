//! What the simulated integrations did, kept for inspection.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use orderflow_domain::automation::ActionType;
use orderflow_domain::id::TenantId;
use serde::Serialize;
use uuid::Uuid;

/// One call into the sink, successful or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invocation {
    pub tenant_id: TenantId,
    pub action_type: ActionType,
    pub entity_id: Uuid,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentEmail {
    pub tenant_id: TenantId,
    pub to: String,
    pub subject: String,
    pub template: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedInvoice {
    pub tenant_id: TenantId,
    pub order_id: Uuid,
    pub sent_to_customer: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookDelivery {
    pub tenant_id: TenantId,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub payload: serde_json::Value,
}

/// State of every simulated integration.
#[derive(Debug, Clone, Default)]
pub struct VirtualState {
    pub statuses: HashMap<(TenantId, Uuid), String>,
    pub tags: HashMap<(TenantId, Uuid), BTreeSet<String>>,
    pub outbox: Vec<SentEmail>,
    pub invoices: Vec<IssuedInvoice>,
    pub deliveries: Vec<WebhookDelivery>,
    pub invocations: Vec<Invocation>,
}
