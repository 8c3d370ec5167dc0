//! Settlement Engine
//!
//! The settlement engine is the core of the shop payment settlement server. It turns a customer's checkout into a
//! priced, voucher-discounted order, sends the customer to the VNPay gateway and reconciles the gateway's callbacks
//! into exactly-once payment outcomes.
//!
//! The library is divided into these sections:
//! 1. Storage ([`mod@db`]). The backend contracts live in [`db::traits`]; SQLite is the supported backend. Use the
//!    public API rather than the low-level queries. The data types are defined in [`db_types`].
//! 2. The public API ([`mod@sps_api`]): [`OrderFlowApi`] for orders and [`PaymentFlowApi`] for gateway payments.
//! 3. The gateway codec ([`mod@gateway`]): request signing and callback verification.
//! 4. Events and side effects. The APIs publish events ([`mod@events`]) once their changes are committed. The hooks in
//!    [`side_effects::hooks`] clear carts, push notifications and broadcast to admin dashboards in response. These are
//!    best-effort and never affect the operation that triggered them.
pub mod db;
pub mod db_types;
pub mod errors;
pub mod events;
pub mod gateway;
pub mod side_effects;
pub mod sps_api;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use db::sqlite::SqliteDatabase;
pub use db::traits::{OrderManagement, PaymentGatewayDatabase};
pub use errors::{ErrorKind, SettlementError};
pub use sps_api::{
    order_flow_api::OrderFlowApi,
    order_objects,
    payment_flow_api::PaymentFlowApi,
    payment_objects,
};
