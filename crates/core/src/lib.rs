//! Corner Shop Core - Shared types and cart logic.
//!
//! This crate provides common types used across all Corner Shop components:
//! - `storefront` - Public-facing e-commerce site
//! - `cli` - Command-line tools for migrations and catalog seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP clients. The cart reducer lives here so it can be tested
//! without a runtime.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices and emails
//! - [`cart`] - Line items, cart scopes, product projection and the cart reducer

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod types;

pub use cart::{
    Cart, CartAction, CartError, CartItem, CartScope, CartTotals, MAX_LINE_QUANTITY, Product,
    ProductError, SessionToken, Variant,
};
pub use types::*;
