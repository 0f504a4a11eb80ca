//! Guest cart adapter over a [`KeyValueStore`].
//!
//! Lines are stored as one JSON array under [`GUEST_CART_KEY`]; the guest's
//! scope token lives under [`GUEST_SCOPE_KEY`].

use tracing::{instrument, warn};

use corner_shop_core::{CartItem, CartItemId, SessionToken};

use super::storage::{KeyValueStore, StorageError};
use super::{CartPersistence, CartServiceError};

/// Storage key for the guest's cart lines.
pub const GUEST_CART_KEY: &str = "guest_cart";

/// Storage key for the guest's scope token.
pub const GUEST_SCOPE_KEY: &str = "guest_cart_session";

/// Guest-scoped cart persistence.
pub struct GuestCart<'a, K> {
    store: &'a K,
}

impl<'a, K: KeyValueStore> GuestCart<'a, K> {
    /// Wrap a key-value store.
    #[must_use]
    pub const fn new(store: &'a K) -> Self {
        Self { store }
    }

    /// The guest's scope token, generated and stored on first use.
    ///
    /// # Errors
    ///
    /// Returns a `StorageError` if the store cannot be read or written.
    pub async fn token(&self) -> Result<SessionToken, StorageError> {
        if let Some(token) = self.store.get(GUEST_SCOPE_KEY).await? {
            return Ok(SessionToken::from_stored(token));
        }

        let token = SessionToken::generate();
        self.store
            .set(GUEST_SCOPE_KEY, token.as_str().to_owned())
            .await?;
        Ok(token)
    }

    /// Delete the guest's lines and scope token.
    ///
    /// # Errors
    ///
    /// Returns a `StorageError` if the store cannot be written.
    pub async fn discard(&self) -> Result<(), StorageError> {
        self.store.remove(GUEST_CART_KEY).await?;
        self.store.remove(GUEST_SCOPE_KEY).await
    }

    /// Read stored lines. Malformed content reads as an empty cart and is
    /// replaced by the next write.
    async fn read_lines(&self) -> Result<Vec<CartItem>, StorageError> {
        let Some(raw) = self.store.get(GUEST_CART_KEY).await? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str::<Vec<CartItem>>(&raw) {
            Ok(lines) => Ok(lines.into_iter().filter(|l| l.quantity > 0).collect()),
            Err(e) => {
                warn!(error = %e, "discarding malformed guest cart");
                Ok(Vec::new())
            }
        }
    }

    async fn write_lines(&self, lines: &[CartItem]) -> Result<(), StorageError> {
        if lines.is_empty() {
            return self.store.remove(GUEST_CART_KEY).await;
        }
        let encoded = serde_json::to_string(lines)?;
        self.store.set(GUEST_CART_KEY, encoded).await
    }
}

impl<K: KeyValueStore> CartPersistence for GuestCart<'_, K> {
    #[instrument(skip(self))]
    async fn load(&self) -> Result<Vec<CartItem>, CartServiceError> {
        Ok(self.read_lines().await?)
    }

    #[instrument(skip(self, line), fields(line_id = %line.id))]
    async fn save_line(&self, line: &CartItem) -> Result<(), CartServiceError> {
        let mut lines = self.read_lines().await?;
        match lines.iter_mut().find(|l| l.id == line.id) {
            Some(slot) => *slot = line.clone(),
            None => lines.push(line.clone()),
        }
        Ok(self.write_lines(&lines).await?)
    }

    #[instrument(skip(self))]
    async fn remove_line(&self, id: CartItemId) -> Result<(), CartServiceError> {
        let mut lines = self.read_lines().await?;
        lines.retain(|l| l.id != id);
        Ok(self.write_lines(&lines).await?)
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<(), CartServiceError> {
        Ok(self.store.remove(GUEST_CART_KEY).await?)
    }
}
