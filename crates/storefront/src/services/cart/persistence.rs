//! The persistence seam shared by guest and user carts.

use std::future::Future;

use corner_shop_core::{CartItem, CartItemId};

use super::guest::GuestCart;
use super::rows::CartRows;
use super::storage::KeyValueStore;
use super::user::UserCart;
use super::CartServiceError;

/// Storage for one cart scope.
pub trait CartPersistence: Send + Sync {
    /// Every stored line of the scope.
    fn load(&self) -> impl Future<Output = Result<Vec<CartItem>, CartServiceError>> + Send;

    /// Insert `line`, or replace the stored line with the same ID.
    fn save_line(&self, line: &CartItem)
    -> impl Future<Output = Result<(), CartServiceError>> + Send;

    /// Delete one line. Deleting a missing line is not an error.
    fn remove_line(&self, id: CartItemId)
    -> impl Future<Output = Result<(), CartServiceError>> + Send;

    /// Delete every line of the scope.
    fn clear(&self) -> impl Future<Output = Result<(), CartServiceError>> + Send;
}

/// The adapter selected by authentication state.
pub enum ActiveCart<'a, K, R> {
    Guest(GuestCart<'a, K>),
    User(UserCart<'a, R>),
}

impl<K: KeyValueStore, R: CartRows> CartPersistence for ActiveCart<'_, K, R> {
    async fn load(&self) -> Result<Vec<CartItem>, CartServiceError> {
        match self {
            Self::Guest(cart) => cart.load().await,
            Self::User(cart) => cart.load().await,
        }
    }

    async fn save_line(&self, line: &CartItem) -> Result<(), CartServiceError> {
        match self {
            Self::Guest(cart) => cart.save_line(line).await,
            Self::User(cart) => cart.save_line(line).await,
        }
    }

    async fn remove_line(&self, id: CartItemId) -> Result<(), CartServiceError> {
        match self {
            Self::Guest(cart) => cart.remove_line(id).await,
            Self::User(cart) => cart.remove_line(id).await,
        }
    }

    async fn clear(&self) -> Result<(), CartServiceError> {
        match self {
            Self::Guest(cart) => cart.clear().await,
            Self::User(cart) => cart.clear().await,
        }
    }
}
