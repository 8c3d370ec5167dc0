//! The public face of the settlement engine.
//!
//! * [`order_flow_api::OrderFlowApi`] places orders, moves them through their lifecycle and answers order queries.
//! * [`payment_flow_api::PaymentFlowApi`] creates gateway payment requests and reconciles the gateway's callbacks
//!   against stored payments.
//!
//! Both are generic over the storage backend and publish engine events once their changes are committed.
pub mod order_flow_api;
pub mod order_objects;
pub mod payment_flow_api;
pub mod payment_objects;
