use std::fmt::Debug;

use chrono::Utc;
use log::*;

use crate::{
    db::traits::OrderManagement,
    db_types::{NewOrder, OrderItem, OrderStatusChange, OrderStatusType, OrderWithItems, Voucher},
    errors::SettlementError,
    events::{EventProducers, OrderCreatedEvent, OrderStatusChangedEvent},
    sps_api::order_objects::{validate_new_order, OrderPage, OrderQueryFilter, Pagination},
};

/// `OrderFlowApi` places orders and moves them through their lifecycle.
///
/// Orders are written in a single transaction. Follow-up work (clearing the cart, notifying admins and customers) is
/// handed to the event hooks after the commit and can never undo or fail the order.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> OrderFlowApi<B>
where B: OrderManagement
{
    /// Places a new order.
    ///
    /// The items are priced from the catalog at this moment and the voucher, if any, is redeemed. The whole order is
    /// rejected, leaving nothing behind, if any item cannot be resolved, the voucher cannot be redeemed or `total`
    /// does not match the computed total.
    pub async fn create_order(&self, order: NewOrder) -> Result<OrderWithItems, SettlementError> {
        validate_new_order(&order)?;
        let saved = self.db.insert_order(order).await?;
        info!("🔄️📦️ Order #{} placed for {} with {} items", saved.order.id, saved.order.total, saved.items.len());
        self.call_order_created_hook(&saved).await;
        Ok(saved)
    }

    async fn call_order_created_hook(&self, saved: &OrderWithItems) {
        for emitter in &self.producers.order_created_producer {
            trace!("🔄️📦️ Notifying order created hook subscribers");
            let event = OrderCreatedEvent::new(saved.order.clone(), saved.items.clone());
            emitter.publish_event(event).await;
        }
    }

    /// Moves an order to `status`.
    ///
    /// | From \ To  | processing | completed | cancelled |
    /// |------------|------------|-----------|-----------|
    /// | pending    | ok         | Err       | ok        |
    /// | processing | no-op      | ok        | ok        |
    /// | completed  | Err        | no-op     | Err       |
    /// | cancelled  | Err        | Err       | no-op     |
    ///
    /// Asking for the current status is a no-op. Cancelling an order also cancels its pending payments. The
    /// customer is only notified when the status really changed.
    pub async fn update_status(&self, id: i64, status: OrderStatusType) -> Result<OrderStatusChange, SettlementError> {
        let change = self.db.update_order_status(id, status).await?;
        if change.is_changed() {
            info!("🔄️📦️ Order #{id} moved from {} to {}", change.old_status, change.order.status);
            self.call_order_status_changed_hook(&change).await;
        } else {
            debug!("🔄️📦️ Order #{id} is already {status}");
        }
        Ok(change)
    }

    async fn call_order_status_changed_hook(&self, change: &OrderStatusChange) {
        if change.order.user_id.is_none() {
            return;
        }
        for emitter in &self.producers.order_status_changed_producer {
            trace!("🔄️📦️ Notifying order status changed hook subscribers");
            let event = OrderStatusChangedEvent::new(change.order.clone(), change.old_status);
            emitter.publish_event(event).await;
        }
    }

    pub async fn fetch_order(&self, id: i64) -> Result<OrderWithItems, SettlementError> {
        let order = self.db.fetch_order(id).await?.ok_or(SettlementError::OrderNotFound(id))?;
        let items = self.db.fetch_order_items(id).await?;
        Ok(OrderWithItems { order, items })
    }

    pub async fn fetch_order_items(&self, id: i64) -> Result<Vec<OrderItem>, SettlementError> {
        if self.db.fetch_order(id).await?.is_none() {
            return Err(SettlementError::OrderNotFound(id));
        }
        self.db.fetch_order_items(id).await
    }

    pub async fn search_orders(
        &self,
        filter: OrderQueryFilter,
        pagination: Pagination,
    ) -> Result<OrderPage, SettlementError> {
        self.db.search_orders(filter, pagination).await
    }

    /// Vouchers that can be redeemed right now.
    pub async fn available_vouchers(&self) -> Result<Vec<Voucher>, SettlementError> {
        self.db.fetch_available_vouchers(Utc::now()).await
    }
}
