//! Trolley
//!
//! Trolley is a shopping cart engine: a line-item cart with variant merging, a
//! drawer flag, cart-level discount codes and best-effort per-visitor persistence.

pub mod cart;
pub mod catalog;
pub mod config;
pub mod discounts;
pub mod observability;
pub mod orders;
pub mod prelude;
pub mod pricing;
pub mod products;
pub mod storage;
pub mod summary;
