//! Event context: the trigger input handed to the engine by event producers.
//!
//! Producers (order, shipment and invoice services) describe *what happened*
//! with a trigger event name, the entity it happened to, and a JSON payload
//! that conditions are evaluated against. The same structure is snapshotted
//! into delayed actions so they execute against the data that fired them.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Entity type whose id doubles as the related order id of delayed actions.
pub const ORDER_ENTITY_TYPE: &str = "order";

/// A domain occurrence that causes rule evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventContext {
    /// Trigger event name as emitted by the producer, e.g. `order.created`.
    ///
    /// Kept as a string: the engine resolves it against the supported set
    /// and unknown names simply match no rules.
    pub trigger_event: String,
    pub entity_type: String,
    pub entity_id: Uuid,
    /// Event payload; condition fields are dotted paths into this value.
    #[serde(default)]
    pub data: serde_json::Value,
}

impl EventContext {
    #[must_use]
    pub fn new(
        trigger_event: impl Into<String>,
        entity_type: impl Into<String>,
        entity_id: Uuid,
        data: serde_json::Value,
    ) -> Self {
        Self {
            trigger_event: trigger_event.into(),
            entity_type: entity_type.into(),
            entity_id,
            data,
        }
    }

    /// The order this event relates to, if any.
    ///
    /// Order events relate to their own entity; other events may carry an
    /// `order_id` field in their payload.
    #[must_use]
    pub fn order_id(&self) -> Option<Uuid> {
        if self.entity_type == ORDER_ENTITY_TYPE {
            return Some(self.entity_id);
        }
        self.data
            .get("order_id")
            .and_then(serde_json::Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok())
    }
}
