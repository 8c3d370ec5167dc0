use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sps_common::Vnd;

use crate::db_types::{Order, OrderStatusType, Payment, PaymentStatus};

/// The event name admin observers subscribe to.
pub const ADMIN_EVENT_CHANNEL: &str = "notification";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub data: Value,
}

impl PushMessage {
    pub fn new<S: Into<String>>(title: S, body: S, data: Value) -> Self {
        Self { title: title.into(), body: body.into(), data }
    }

    /// Sent to every admin when an order is placed.
    pub fn new_order(order: &Order) -> Self {
        Self::new(
            "New order".to_string(),
            format!("New order from {}", order.phone),
            json!({ "type": "NEW_ORDER", "orderId": order.id, "total": order.total }),
        )
    }

    /// Sent to the customer when the shop moves their order along.
    pub fn order_status_changed(order: &Order) -> Self {
        let id = order.id;
        let body = match order.status {
            OrderStatusType::Pending => format!("Order #{id} is waiting for confirmation"),
            OrderStatusType::Processing => format!("Order #{id} has been confirmed and is being prepared"),
            OrderStatusType::Completed => format!("Order #{id} has been delivered. Thank you for shopping with us"),
            OrderStatusType::Cancelled => format!("Order #{id} has been cancelled"),
        };
        Self::new(
            "Order update".to_string(),
            body,
            json!({ "type": "ORDER_STATUS", "orderId": id, "status": order.status }),
        )
    }

    /// Sent to the payer once the gateway outcome (or expiry) is recorded.
    pub fn payment_settled(payment: &Payment) -> Self {
        let order_id = payment.order_id;
        let body = match payment.status {
            PaymentStatus::Success => format!("Payment of {} for order #{order_id} was successful", payment.amount),
            PaymentStatus::Cancelled => format!("Payment for order #{order_id} was cancelled"),
            _ => format!("Payment for order #{order_id} did not go through"),
        };
        Self::new(
            "Payment update".to_string(),
            body,
            json!({ "type": "PAYMENT", "orderId": order_id, "status": payment.status }),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub id: i64,
    pub phone: String,
    pub total: Vnd,
    pub created_at: DateTime<Utc>,
    pub status: OrderStatusType,
}

impl From<&Order> for OrderSummary {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            phone: order.phone.clone(),
            total: order.total,
            created_at: order.created_at,
            status: order.status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSummary {
    pub id: i64,
    pub order_id: i64,
    pub txn_ref: String,
    pub amount: Vnd,
    pub status: PaymentStatus,
}

impl From<&Payment> for PaymentSummary {
    fn from(payment: &Payment) -> Self {
        Self {
            id: payment.id,
            order_id: payment.order_id,
            txn_ref: payment.txn_ref.clone(),
            amount: payment.amount,
            status: payment.status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdminNotification {
    NewOrder { message: String, order: OrderSummary },
    PaymentSettled { message: String, payment: PaymentSummary },
}

/// An event for the admin dashboard: the channel name and its JSON payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminEvent {
    pub event: String,
    pub payload: AdminNotification,
}

impl AdminEvent {
    pub fn new(payload: AdminNotification) -> Self {
        Self { event: ADMIN_EVENT_CHANNEL.to_string(), payload }
    }

    pub fn new_order(order: &Order) -> Self {
        let message = format!("New order from {} with a total of {}", order.phone, order.total);
        Self::new(AdminNotification::NewOrder { message, order: order.into() })
    }

    pub fn payment_settled(payment: &Payment) -> Self {
        let message = format!("Payment {} for order #{} is now {}", payment.txn_ref, payment.order_id, payment.status);
        Self::new(AdminNotification::PaymentSettled { message, payment: payment.into() })
    }
}
