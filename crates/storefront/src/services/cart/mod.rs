//! Cart service.
//!
//! # Layout
//!
//! - [`storage`] - key-value capability behind guest carts
//! - [`rows`] - row capability behind signed-in carts
//! - [`guest`] / [`user`] - the two [`CartPersistence`] adapters
//! - [`merge`] - guest to user hand-off on sign-in
//! - [`service`] - [`CartService`], constructed per request
//!
//! Which adapter is active follows the shopper's authentication state: a
//! signed-out shopper's cart lives in their session, a signed-in shopper's
//! cart lives in `storefront.cart_line`.

mod error;
pub mod guest;
pub mod merge;
mod persistence;
pub mod rows;
pub mod service;
pub mod storage;
pub mod user;

pub use error::CartServiceError;
pub use guest::{GUEST_CART_KEY, GUEST_SCOPE_KEY, GuestCart};
pub use merge::{MergeOutcome, merge_guest_cart};
pub use persistence::{ActiveCart, CartPersistence};
pub use rows::{CartLineRow, CartRows, MemoryCartRows};
pub use service::{CartService, CheckoutSummary};
pub use storage::{KeyValueStore, MemoryStore, StorageError};
pub use user::UserCart;
