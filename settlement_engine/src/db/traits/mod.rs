//! # Backend contracts
//!
//! Storage backends implement these traits to support the settlement engine.
//!
//! * [`OrderManagement`] covers the order transaction (order, items, variants and voucher redemption), order queries
//!   and status changes.
//! * [`PaymentGatewayDatabase`] covers gateway payments: creating them, matching callbacks and settling them.
//!
//! The best-effort collaborators used after a commit (cart, push tokens) are defined in
//! [`crate::side_effects`].
mod order_management;
mod payment_gateway_database;

pub use order_management::OrderManagement;
pub use payment_gateway_database::PaymentGatewayDatabase;
