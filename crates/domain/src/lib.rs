//! Order fulfillment and billing rules.
//!
//! Every function in this crate is pure: it takes the current state as
//! explicit arguments and returns the derived value or a [`DomainError`].
//! Persisting the result atomically is the caller's job.
//!
//! - [`total`]: order totals from line items, price snapshots
//! - [`status`]: the order/item status machine
//! - [`ledger`]: payment validation and settlement
//! - [`tables`]: table availability from live orders
//! - [`loyalty`]: loyalty point adjustments
//! - [`money`]: bounds and checked sums for money values

pub mod error;
pub mod ledger;
pub mod loyalty;
pub mod money;
pub mod status;
pub mod tables;
pub mod total;

pub use error::{DomainError, Entity};
