use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::{
    db_types::{NewPayment, Payment, PaymentStatus},
    errors::SettlementError,
};

/// Storage for gateway payments and their settlement.
#[allow(async_fn_in_trait)]
pub trait PaymentGatewayDatabase {
    /// Stores a new pending payment. Fails with `OrderNotFound` if the order does not exist.
    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, SettlementError>;

    /// Finds the payment a callback refers to, strictly within the given order.
    async fn fetch_payment_for_callback(
        &self,
        order_id: i64,
        txn_ref: Option<String>,
    ) -> Result<Option<Payment>, SettlementError>;

    /// Applies a terminal outcome to a pending payment. Returns `None`, and writes nothing, if the payment is not
    /// pending anymore.
    async fn settle_payment(
        &self,
        payment_id: i64,
        status: PaymentStatus,
        patch: Value,
    ) -> Result<Option<Payment>, SettlementError>;

    async fn fetch_payments_for_order(&self, order_id: i64) -> Result<Vec<Payment>, SettlementError>;

    /// Fails every pending payment whose gateway expiry is at or before `cutoff` and returns them.
    async fn expire_payments(&self, cutoff: DateTime<Utc>) -> Result<Vec<Payment>, SettlementError>;
}
