//! # Shop payment settlement server
//! This crate hosts the HTTP surface of the settlement engine. It is responsible for:
//! * Accepting orders and moving them through their lifecycle.
//! * Creating VNPay payment requests and reconciling the gateway's return URL and IPN callbacks.
//! * Running the engine's side effects (cart clearing, push notifications, admin broadcasts) after each change.
//! * Expiring payments that the gateway never reported back on.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/orders`, `/api/orders/{id}`, `/api/orders/{id}/status`: order placement, listing and status changes.
//! * `/api/payments/create`, `/api/payments/vnpay-return`, `/api/payments/vnpay-ipn`,
//!   `/api/payments/order/{order_id}`: the payment flow.
//! * `/api/vouchers/available`: vouchers that can be redeemed right now.
//! * `/api/users/{id}/push-token`: device token registration (`PUT`) and removal (`DELETE`).
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod expiry_worker;
pub mod helpers;
pub mod push_transport;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
