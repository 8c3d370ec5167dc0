use chrono::{DateTime, TimeZone, Utc};
use mockall::mock;
use serde_json::{json, Value};
use settlement_engine::{
    db_types::{
        Json,
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
    },
    order_objects::{OrderPage, OrderQueryFilter, Pagination},
    OrderManagement,
    PaymentGatewayDatabase,
    SettlementError,
};
use sps_common::Vnd;

mock! {
    pub Backend {}
    impl OrderManagement for Backend {
        async fn insert_order(&self, order: NewOrder) -> Result<OrderWithItems, SettlementError>;
        async fn fetch_order(&self, id: i64) -> Result<Option<Order>, SettlementError>;
        async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, SettlementError>;
        async fn search_orders(&self, filter: OrderQueryFilter, pagination: Pagination) -> Result<OrderPage, SettlementError>;
        async fn update_order_status(&self, id: i64, status: OrderStatusType) -> Result<OrderStatusChange, SettlementError>;
        async fn fetch_available_vouchers(&self, now: DateTime<Utc>) -> Result<Vec<Voucher>, SettlementError>;
    }
    impl PaymentGatewayDatabase for Backend {
        async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, SettlementError>;
        async fn fetch_payment_for_callback(&self, order_id: i64, txn_ref: Option<String>) -> Result<Option<Payment>, SettlementError>;
        async fn settle_payment(&self, payment_id: i64, status: PaymentStatus, patch: Value) -> Result<Option<Payment>, SettlementError>;
        async fn fetch_payments_for_order(&self, order_id: i64) -> Result<Vec<Payment>, SettlementError>;
        async fn expire_payments(&self, cutoff: DateTime<Utc>) -> Result<Vec<Payment>, SettlementError>;
    }
}

pub fn timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap()
}

pub fn order(id: i64, status: OrderStatusType) -> Order {
    Order {
        id,
        user_id: Some(7),
        name: "Lan".into(),
        phone: "0901234567".into(),
        address: Some("12 Hang Bac, Ha Noi".into()),
        total: Vnd::from(200_000),
        status,
        voucher_id: None,
        created_at: timestamp(),
        updated_at: timestamp(),
    }
}

pub fn order_with_items(id: i64) -> OrderWithItems {
    let item = OrderItem { id: 1, order_id: id, product_id: 3, variant_id: 11, quantity: 2, price: Vnd::from(100_000) };
    OrderWithItems { order: order(id, OrderStatusType::Pending), items: vec![item] }
}

pub fn payment(order_id: i64, txn_ref: &str, status: PaymentStatus) -> Payment {
    Payment {
        id: 21,
        order_id,
        user_id: Some(7),
        amount: Vnd::from(200_000),
        payment_type: "VNPay".into(),
        txn_ref: txn_ref.into(),
        status,
        response_data: Json(json!({ "vnpTxnRef": txn_ref })),
        expires_at: Some(timestamp()),
        created_at: timestamp(),
        updated_at: timestamp(),
    }
}

/// What the store would return for a payment that was just inserted.
pub fn stored_payment(p: NewPayment) -> Payment {
    Payment {
        id: 21,
        order_id: p.order_id,
        user_id: p.user_id,
        amount: p.amount,
        payment_type: p.payment_type,
        txn_ref: p.txn_ref,
        status: PaymentStatus::Pending,
        response_data: Json(p.response_data),
        expires_at: p.expires_at,
        created_at: timestamp(),
        updated_at: timestamp(),
    }
}
