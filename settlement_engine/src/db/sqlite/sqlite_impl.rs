//! `SqliteDatabase` is the SQLite implementation of the settlement engine backend.
//!
//! It implements the storage traits in [`crate::db::traits`] as well as the store-backed side-effect capabilities
//! ([`CartStore`] and [`PushTokenStore`]).
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use serde_json::Value;
use sps_common::Vnd;
use sqlx::SqlitePool;

use super::{
    db::{carts, catalog, order_items, order_items::ResolvedLine, orders, payments, users, vouchers},
    db_url,
    new_pool,
};
use crate::{
    db::traits::{OrderManagement, PaymentGatewayDatabase},
    db_types::{
        NewOrder,
        NewPayment,
        Order,
        OrderItem,
        OrderStatusChange,
        OrderStatusType,
        OrderWithItems,
        Payment,
        PaymentStatus,
        Voucher,
        PAYMENT_TYPE_VNPAY,
    },
    errors::SettlementError,
    side_effects::{CartStore, PushTokenStore},
    sps_api::order_objects::{OrderPage, OrderQueryFilter, Pagination},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SqliteDatabase ({})", self.url)
    }
}

impl SqliteDatabase {
    /// Connects to the database named by `SPS_DATABASE_URL`.
    pub async fn new(max_connections: u32) -> Result<Self, SettlementError> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SettlementError> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date.
    pub async fn migrate(&self) -> Result<(), SettlementError> {
        sqlx::migrate!("./src/db/sqlite/migrations").run(&self.pool).await?;
        debug!("🗃️ Migrations complete");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl OrderManagement for SqliteDatabase {
    async fn insert_order(&self, order: NewOrder) -> Result<OrderWithItems, SettlementError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let saved = orders::insert_order(&order, &mut tx).await?;
        let mut lines = Vec::with_capacity(order.items.len());
        for (i, item) in order.items.iter().enumerate() {
            let (Some(color_id), Some(size_id)) = (item.color_id, item.size_id) else {
                return Err(SettlementError::MissingVariantSelection(i + 1));
            };
            let variant = catalog::resolve_variant(item.product_id, color_id, size_id, &mut tx).await?;
            lines.push(ResolvedLine { variant, quantity: item.quantity });
        }
        let voucher = vouchers::reserve(order.voucher_id, now, &mut tx).await?;
        let subtotal = lines
            .iter()
            .try_fold(Vnd::default(), |acc, l| {
                l.variant.unit_price.checked_mul(l.quantity).and_then(|line| acc.checked_add(line))
            })
            .ok_or_else(|| SettlementError::ValidationError("The order total is too large".into()))?;
        let discount = voucher.as_ref().map(|v| v.discount_for(subtotal)).unwrap_or_default();
        let computed = subtotal - discount;
        if computed != order.total {
            debug!("🗃️ Order rejected. Supplied total {} but computed {computed}", order.total);
            return Err(SettlementError::OrderTotalMismatch { supplied: order.total, computed });
        }
        let items = order_items::insert_items(saved.id, &lines, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order #{} saved with {} items for {}", saved.id, items.len(), saved.total);
        Ok(OrderWithItems { order: saved, items })
    }

    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order(id, &mut conn).await
    }

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        order_items::fetch_items(order_id, &mut conn).await
    }

    async fn search_orders(
        &self,
        filter: OrderQueryFilter,
        pagination: Pagination,
    ) -> Result<OrderPage, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        orders::search_orders(&filter, pagination, &mut conn).await
    }

    async fn update_order_status(
        &self,
        id: i64,
        status: OrderStatusType,
    ) -> Result<OrderStatusChange, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let current = orders::lock_order(id, &mut tx).await?.ok_or(SettlementError::OrderNotFound(id))?;
        let old_status = current.status;
        if old_status == status {
            trace!("🗃️ Order #{id} is already {status}. Nothing to do");
            return Ok(OrderStatusChange { old_status, order: current });
        }
        if !old_status.can_transition_to(status) {
            return Err(SettlementError::OrderModificationForbidden { id, from: old_status, to: status });
        }
        let order = orders::compare_and_set_status(id, old_status, status, &mut tx).await?.ok_or_else(|| {
            SettlementError::IntegrityError(format!("Order #{id} changed status while it was locked"))
        })?;
        if status == OrderStatusType::Cancelled {
            let cancelled = payments::cancel_pending_for_order(id, &mut tx).await?;
            if !cancelled.is_empty() {
                debug!("🗃️ Cancelled {} pending payments of order #{id}", cancelled.len());
            }
        }
        tx.commit().await?;
        Ok(OrderStatusChange { old_status, order })
    }

    async fn fetch_available_vouchers(&self, now: DateTime<Utc>) -> Result<Vec<Voucher>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        vouchers::fetch_available(now, &mut conn).await
    }
}

impl PaymentGatewayDatabase for SqliteDatabase {
    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        payments::insert_payment(&payment, &mut conn).await
    }

    async fn fetch_payment_for_callback(
        &self,
        order_id: i64,
        txn_ref: Option<String>,
    ) -> Result<Option<Payment>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        payments::fetch_payment_for_callback(order_id, PAYMENT_TYPE_VNPAY, txn_ref.as_deref(), &mut conn).await
    }

    async fn settle_payment(
        &self,
        payment_id: i64,
        status: PaymentStatus,
        patch: Value,
    ) -> Result<Option<Payment>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        payments::settle_payment(payment_id, status, &patch, &mut conn).await
    }

    async fn fetch_payments_for_order(&self, order_id: i64) -> Result<Vec<Payment>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        payments::fetch_payments_for_order(order_id, &mut conn).await
    }

    async fn expire_payments(&self, cutoff: DateTime<Utc>) -> Result<Vec<Payment>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        payments::expire_pending(cutoff, &mut conn).await
    }
}

impl CartStore for SqliteDatabase {
    async fn clear_cart(&self, user_id: i64) -> Result<u64, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        carts::clear_cart(user_id, &mut conn).await
    }
}

impl PushTokenStore for SqliteDatabase {
    async fn push_token_for_user(&self, user_id: i64) -> Result<Option<String>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        users::push_token_for_user(user_id, &mut conn).await
    }

    async fn admin_push_tokens(&self) -> Result<Vec<(i64, String)>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        users::admin_push_tokens(&mut conn).await
    }

    async fn set_push_token(&self, user_id: i64, token: Option<String>) -> Result<bool, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        users::set_push_token(user_id, token.as_deref(), &mut conn).await
    }
}
