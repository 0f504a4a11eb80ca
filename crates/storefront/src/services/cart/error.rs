//! Cart service error types.

use thiserror::Error;

use corner_shop_core::CartError;

use super::storage::StorageError;
use crate::db::RepositoryError;
use crate::services::notification::Notification;

/// Errors raised by cart operations.
#[derive(Debug, Error)]
pub enum CartServiceError {
    /// The requested change is invalid for the current cart.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Guest storage failed.
    #[error("guest cart storage: {0}")]
    Storage(#[from] StorageError),

    /// Remote cart rows failed.
    #[error("cart rows: {0}")]
    Repository(#[from] RepositoryError),
}

impl CartServiceError {
    /// Whether the failure came from a storage backend rather than the
    /// request itself.
    #[must_use]
    pub const fn is_persistence(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Repository(_))
    }

    /// The toast shown to the shopper for this error.
    #[must_use]
    pub fn notification(&self) -> Notification {
        match self {
            Self::Cart(CartError::InvalidQuantity(_)) => {
                Notification::error("Quantity must be at least 1.")
            }
            Self::Cart(CartError::QuantityTooLarge { .. }) => {
                Notification::error("That quantity is too large.")
            }
            Self::Cart(CartError::ItemNotFound(_)) => {
                Notification::error("That item is no longer in your cart.")
            }
            Self::Cart(CartError::Empty) => Notification::error("Your cart is empty."),
            Self::Storage(_) | Self::Repository(_) => {
                Notification::error("We couldn't update your cart. Please try again.")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::notification::NotificationLevel;

    #[test]
    fn test_persistence_errors_hide_details() {
        let err = CartServiceError::from(StorageError::Unavailable("redis down".to_owned()));
        assert!(err.is_persistence());
        let toast = err.notification();
        assert_eq!(toast.level, NotificationLevel::Error);
        assert!(!toast.message.contains("redis"));
    }

    #[test]
    fn test_cart_errors_are_not_persistence() {
        let err = CartServiceError::from(CartError::Empty);
        assert!(!err.is_persistence());
        assert_eq!(err.notification().message, "Your cart is empty.");
    }
}
