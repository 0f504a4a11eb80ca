//! Shopping cart domain.
//!
//! - [`item`] - Line items and their size/color variant
//! - [`product`] - The validated product projection a line is snapshotted from
//! - [`scope`] - Which namespace (guest session or user) a cart belongs to
//! - [`state`] - The cart reducer and its derived totals
//!
//! The reducer never performs I/O. Callers plan a mutation with
//! [`Cart::plan_add`], [`Cart::plan_update`] or [`Cart::plan_remove`], persist
//! the resulting [`CartAction`], and only then [`Cart::apply`] it, so a failed
//! write leaves the in-memory cart untouched.

pub mod item;
pub mod product;
pub mod scope;
pub mod state;

pub use item::{CartItem, Variant};
pub use product::{Product, ProductError};
pub use scope::{CartScope, SessionToken};
pub use state::{Cart, CartAction, CartError, CartTotals, MAX_LINE_QUANTITY};
