use chrono::{DateTime, Utc};

use crate::{
    db_types::{NewOrder, Order, OrderItem, OrderStatusChange, OrderStatusType, OrderWithItems, Voucher},
    errors::SettlementError,
    sps_api::order_objects::{OrderPage, OrderQueryFilter, Pagination},
};

/// The `OrderManagement` trait defines the behaviour a backend needs to store and query orders.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Creates the order, its items and the voucher redemption as one all-or-nothing unit.
    ///
    /// Implementations must
    /// * resolve (or create) the size variant of every item and snapshot the product's current price,
    /// * reserve one use of the voucher, if any, failing the whole order when it is not redeemable,
    /// * reject the order when the supplied total differs from the total computed from the snapshots and the voucher,
    /// * leave no trace of the order if any step fails.
    async fn insert_order(&self, order: NewOrder) -> Result<OrderWithItems, SettlementError>;

    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, SettlementError>;

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, SettlementError>;

    async fn search_orders(
        &self,
        filter: OrderQueryFilter,
        pagination: Pagination,
    ) -> Result<OrderPage, SettlementError>;

    /// Changes the order's status if the transition is allowed. Requesting the current status is a no-op. Cancelling
    /// an order also cancels its pending payments.
    async fn update_order_status(
        &self,
        id: i64,
        status: OrderStatusType,
    ) -> Result<OrderStatusChange, SettlementError>;

    async fn fetch_available_vouchers(&self, now: DateTime<Utc>) -> Result<Vec<Voucher>, SettlementError>;
}
