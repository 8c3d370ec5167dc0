//! Low-level SQLite queries.
//!
//! Every function takes a `&mut SqliteConnection`, so callers decide whether it runs on its own or as one step of a
//! transaction (pass `&mut tx`).
pub mod carts;
pub mod catalog;
pub mod order_items;
pub mod orders;
pub mod payments;
pub mod users;
pub mod vouchers;
