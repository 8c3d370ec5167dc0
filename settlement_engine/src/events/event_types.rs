use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderItem, OrderStatusType, Payment};

/// Published after an order and its items have been committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

impl OrderCreatedEvent {
    pub fn new(order: Order, items: Vec<OrderItem>) -> Self {
        Self { order, items }
    }
}

/// Published after an order status change has been committed. `order` carries the new status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusChangedEvent {
    pub order: Order,
    pub old_status: OrderStatusType,
}

impl OrderStatusChangedEvent {
    pub fn new(order: Order, old_status: OrderStatusType) -> Self {
        Self { order, old_status }
    }
}

/// What moved a payment out of `pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SettlementTrigger {
    /// The payer's browser came back through the return URL.
    ReturnUrl,
    /// The gateway's server-to-server notification.
    Ipn,
    /// The payment was never completed and timed out.
    Expiry,
}

impl Display for SettlementTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettlementTrigger::ReturnUrl => write!(f, "return URL"),
            SettlementTrigger::Ipn => write!(f, "IPN"),
            SettlementTrigger::Expiry => write!(f, "expiry"),
        }
    }
}

/// Published once per payment, when it reaches a terminal status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentSettledEvent {
    pub payment: Payment,
    pub trigger: SettlementTrigger,
}

impl PaymentSettledEvent {
    pub fn new(payment: Payment, trigger: SettlementTrigger) -> Self {
        Self { payment, trigger }
    }
}
