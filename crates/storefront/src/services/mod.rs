//! Business logic services for storefront.
//!
//! # Services
//!
//! - `auth` - Email and password authentication
//! - `cart` - Guest and signed-in carts, merge on sign-in, checkout
//! - `catalog` - Cached product reads
//! - `notification` - Toasts shown for failed actions

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod notification;

pub use catalog::Catalog;
pub use notification::{Notification, NotificationLevel};
