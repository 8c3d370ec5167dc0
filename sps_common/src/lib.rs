//! Value types shared by the settlement engine and the settlement server.
mod secret;
mod vnd;

pub mod helpers;
pub mod op;

pub use secret::Secret;
pub use vnd::{Vnd, VndConversionError, GATEWAY_AMOUNT_SCALE, VND_CURRENCY_CODE};
