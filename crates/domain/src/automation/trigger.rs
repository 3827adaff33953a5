//! Trigger event: the domain occurrence that activates a rule.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// The closed set of events rules can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerEvent {
    #[serde(rename = "order.created")]
    OrderCreated,
    #[serde(rename = "order.status_changed")]
    OrderStatusChanged,
    #[serde(rename = "order.paid")]
    OrderPaid,
    #[serde(rename = "order.cancelled")]
    OrderCancelled,
    #[serde(rename = "shipment.created")]
    ShipmentCreated,
    #[serde(rename = "shipment.delivered")]
    ShipmentDelivered,
    #[serde(rename = "invoice.created")]
    InvoiceCreated,
    #[serde(rename = "customer.created")]
    CustomerCreated,
    #[serde(rename = "stock.low")]
    StockLow,
}

impl TriggerEvent {
    /// Every supported trigger event.
    pub const ALL: [Self; 9] = [
        Self::OrderCreated,
        Self::OrderStatusChanged,
        Self::OrderPaid,
        Self::OrderCancelled,
        Self::ShipmentCreated,
        Self::ShipmentDelivered,
        Self::InvoiceCreated,
        Self::CustomerCreated,
        Self::StockLow,
    ];

    /// Wire name, e.g. `order.status_changed`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OrderCreated => "order.created",
            Self::OrderStatusChanged => "order.status_changed",
            Self::OrderPaid => "order.paid",
            Self::OrderCancelled => "order.cancelled",
            Self::ShipmentCreated => "shipment.created",
            Self::ShipmentDelivered => "shipment.delivered",
            Self::InvoiceCreated => "invoice.created",
            Self::CustomerCreated => "customer.created",
            Self::StockLow => "stock.low",
        }
    }
}

impl fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerEvent {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|event| event.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownTriggerEvent(s.to_string()))
    }
}
