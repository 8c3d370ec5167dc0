use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sps_common::Vnd;
pub use sqlx::types::Json;
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid conversion: {0}")]
pub struct ConversionError(String);

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatusType {
    /// The order has been placed and is waiting for the shop to act on it.
    Pending,
    /// The shop is preparing the order.
    Processing,
    /// The order has been delivered. Terminal.
    Completed,
    /// The order was cancelled by the shop or the customer. Terminal.
    Cancelled,
}

impl OrderStatusType {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Orders move forward one step at a time and can be cancelled until they reach a terminal state.
    pub fn can_transition_to(&self, next: OrderStatusType) -> bool {
        use OrderStatusType::*;
        matches!((self, next), (Pending, Processing) | (Processing, Completed) | (Pending | Processing, Cancelled))
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Pending => write!(f, "pending"),
            OrderStatusType::Processing => write!(f, "processing"),
            OrderStatusType::Completed => write!(f, "completed"),
            OrderStatusType::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------        Order         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub user_id: Option<i64>,
    pub name: String,
    pub phone: String,
    pub address: Option<String>,
    pub total: Vnd,
    pub status: OrderStatusType,
    pub voucher_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      OrderItem       ---------------------------------------------------------
/// A line of an order. `price` is the unit price captured when the order was placed and is never re-derived from the
/// catalog.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub variant_id: i64,
    pub quantity: i64,
    pub price: Vnd,
}

impl OrderItem {
    pub fn line_total(&self) -> Vnd {
        self.price * self.quantity
    }
}

//--------------------------------------       NewOrder       ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub product_id: i64,
    #[serde(default, alias = "product_color_id")]
    pub color_id: Option<i64>,
    #[serde(default)]
    pub size_id: Option<i64>,
    pub quantity: i64,
}

impl NewOrderItem {
    pub fn new(product_id: i64, color_id: i64, size_id: i64, quantity: i64) -> Self {
        Self { product_id, color_id: Some(color_id), size_id: Some(size_id), quantity }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    #[serde(default)]
    pub user_id: Option<i64>,
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub address: Option<String>,
    /// The total the client expects to pay. It must agree with the total computed from catalog prices and the voucher.
    pub total: Vnd,
    #[serde(default)]
    pub voucher_id: Option<i64>,
    pub items: Vec<NewOrderItem>,
}

impl NewOrder {
    pub fn new<S: Into<String>>(name: S, phone: S, total: Vnd) -> Self {
        Self {
            user_id: None,
            name: name.into(),
            phone: phone.into(),
            address: None,
            total,
            voucher_id: None,
            items: Vec::new(),
        }
    }

    pub fn with_user(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_address<S: Into<String>>(mut self, address: S) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_voucher(mut self, voucher_id: i64) -> Self {
        self.voucher_id = Some(voucher_id);
        self
    }

    pub fn with_item(mut self, item: NewOrderItem) -> Self {
        self.items.push(item);
        self
    }
}

//--------------------------------------     OrderWithItems   ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

//--------------------------------------   OrderStatusChange  ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusChange {
    pub old_status: OrderStatusType,
    pub order: Order,
}

impl OrderStatusChange {
    pub fn is_changed(&self) -> bool {
        self.old_status != self.order.status
    }
}

//--------------------------------------       Catalog        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: Vnd,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct SizeVariant {
    pub id: i64,
    pub product_id: i64,
    pub product_color_id: i64,
    pub size_id: i64,
    pub created_at: DateTime<Utc>,
}

/// The outcome of resolving a color/size selection against the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantRef {
    pub variant_id: i64,
    pub product_id: i64,
    pub unit_price: Vnd,
}

//--------------------------------------       Voucher        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Voucher {
    pub id: i64,
    pub code: String,
    pub usage_limit: i64,
    pub used_count: i64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_free_shipping: bool,
}

impl Voucher {
    /// The amount this voucher takes off an item subtotal. Free-shipping vouchers waive delivery, which is not part
    /// of the item subtotal, so they discount nothing here.
    pub fn discount_for(&self, _subtotal: Vnd) -> Vnd {
        Vnd::default()
    }
}

//--------------------------------------    PaymentStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// The payer has been redirected to the gateway and no outcome has been received.
    Pending,
    Success,
    Failed,
    /// The order was cancelled before the payment settled.
    Cancelled,
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Success => write!(f, "success"),
            PaymentStatus::Failed => write!(f, "failed"),
            PaymentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}


//--------------------------------------       Payment        ---------------------------------------------------------
pub const PAYMENT_TYPE_VNPAY: &str = "VNPay";

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub order_id: i64,
    pub user_id: Option<i64>,
    pub amount: Vnd,
    pub payment_type: String,
    /// The reference handed to the gateway. Unique across all payments.
    pub txn_ref: String,
    pub status: PaymentStatus,
    /// Everything the gateway has told us about this payment, merged over time.
    pub response_data: Json<Value>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub order_id: i64,
    pub user_id: Option<i64>,
    pub amount: Vnd,
    pub payment_type: String,
    pub txn_ref: String,
    pub response_data: Value,
    pub expires_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod test {
    use chrono::Duration;

    use super::*;

    #[test]
    fn order_status_transitions() {
        use OrderStatusType::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Completed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Processing.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Pending));
        assert!(!Processing.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Pending));
        assert!(Completed.is_terminal() && Cancelled.is_terminal());
    }

    #[test]
    fn order_status_strings() {
        assert_eq!("Processing".parse::<OrderStatusType>().unwrap(), OrderStatusType::Processing);
        assert_eq!(OrderStatusType::Cancelled.to_string(), "cancelled");
        assert!("shipped".parse::<OrderStatusType>().is_err());
        let json = serde_json::to_string(&OrderStatusType::Completed).unwrap();
        assert_eq!(json, "\"completed\"");
    }

    #[test]
    fn free_shipping_vouchers_discount_no_items() {
        let now = Utc::now();
        let voucher = Voucher {
            id: 1,
            code: "FREESHIP".into(),
            usage_limit: 2,
            used_count: 1,
            start_date: now - Duration::days(1),
            end_date: now + Duration::days(1),
            is_free_shipping: true,
        };
        assert_eq!(voucher.discount_for(Vnd::from(200_000)), Vnd::from(0));
    }

    #[test]
    fn payment_status_terminality() {
        assert!(!PaymentStatus::Pending.is_terminal());
        assert!(PaymentStatus::Success.is_terminal());
        assert!(PaymentStatus::Failed.is_terminal());
    }
}
