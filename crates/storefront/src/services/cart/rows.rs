//! Remote row capability for signed-in carts.
//!
//! [`CartRows`] is the row-level CRUD the user cart needs: cart lines filtered
//! by user, plus a batch product lookup for the display join. Postgres
//! provides it through [`crate::db::cart_lines::CartLineRepository`];
//! [`MemoryCartRows`] backs tests and local tooling.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::Mutex;

use corner_shop_core::{CartItem, CartItemId, Product, ProductId, UserId, Variant};

use crate::db::RepositoryError;

/// A cart line as stored remotely.
///
/// Only the price is snapshotted on the row; name and image come from the
/// product lookup when the cart is loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLineRow {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub variant: Variant,
}

impl From<&CartItem> for CartLineRow {
    fn from(item: &CartItem) -> Self {
        Self {
            id: item.id,
            product_id: item.product_id,
            unit_price: item.unit_price,
            quantity: item.quantity,
            variant: item.variant.clone(),
        }
    }
}

/// Row-level access to remote cart lines and products.
pub trait CartRows: Send + Sync {
    /// All lines owned by `user_id`, oldest first.
    fn lines_for_user(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Vec<CartLineRow>, RepositoryError>> + Send;

    /// Insert `line` for `user_id`, or overwrite the row with the same ID.
    fn upsert_line(
        &self,
        user_id: UserId,
        line: &CartLineRow,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Delete one line. Returns whether a row was deleted.
    fn delete_line(
        &self,
        user_id: UserId,
        id: CartItemId,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// Delete every line owned by `user_id`. Returns the number deleted.
    fn delete_lines_for_user(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<u64, RepositoryError>> + Send;

    /// Fetch the products with the given IDs in one batch. Unknown IDs are
    /// absent from the result.
    fn products_by_ids(
        &self,
        ids: &[ProductId],
    ) -> impl Future<Output = Result<Vec<Product>, RepositoryError>> + Send;
}

/// In-process [`CartRows`].
///
/// Clones share state. [`MemoryCartRows::set_offline`] makes every call fail
/// the way an exhausted connection pool would.
#[derive(Debug, Clone, Default)]
pub struct MemoryCartRows {
    inner: Arc<Mutex<MemoryRowsInner>>,
}

#[derive(Debug, Default)]
struct MemoryRowsInner {
    lines: Vec<(UserId, CartLineRow)>,
    products: HashMap<ProductId, Product>,
    offline: bool,
}

impl MemoryRowsInner {
    fn check_online(&self) -> Result<(), RepositoryError> {
        if self.offline {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

impl MemoryCartRows {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a catalog product.
    pub async fn insert_product(&self, product: Product) {
        self.inner
            .lock()
            .await
            .products
            .insert(product.id, product);
    }

    /// Remove a catalog product (lines referencing it stay).
    pub async fn remove_product(&self, id: ProductId) {
        self.inner.lock().await.products.remove(&id);
    }

    /// Toggle simulated unavailability.
    pub async fn set_offline(&self, offline: bool) {
        self.inner.lock().await.offline = offline;
    }

    /// Lines stored for `user_id`, ignoring the offline flag.
    pub async fn stored_lines(&self, user_id: UserId) -> Vec<CartLineRow> {
        self.inner
            .lock()
            .await
            .lines
            .iter()
            .filter(|(owner, _)| *owner == user_id)
            .map(|(_, line)| line.clone())
            .collect()
    }
}

impl CartRows for MemoryCartRows {
    async fn lines_for_user(&self, user_id: UserId) -> Result<Vec<CartLineRow>, RepositoryError> {
        let inner = self.inner.lock().await;
        inner.check_online()?;
        Ok(inner
            .lines
            .iter()
            .filter(|(owner, _)| *owner == user_id)
            .map(|(_, line)| line.clone())
            .collect())
    }

    async fn upsert_line(&self, user_id: UserId, line: &CartLineRow) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock().await;
        inner.check_online()?;
        match inner.lines.iter_mut().find(|(_, row)| row.id == line.id) {
            Some(slot) => *slot = (user_id, line.clone()),
            None => inner.lines.push((user_id, line.clone())),
        }
        Ok(())
    }

    async fn delete_line(&self, user_id: UserId, id: CartItemId) -> Result<bool, RepositoryError> {
        let mut inner = self.inner.lock().await;
        inner.check_online()?;
        let before = inner.lines.len();
        inner
            .lines
            .retain(|(owner, row)| !(*owner == user_id && row.id == id));
        Ok(inner.lines.len() < before)
    }

    async fn delete_lines_for_user(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let mut inner = self.inner.lock().await;
        inner.check_online()?;
        let before = inner.lines.len();
        inner.lines.retain(|(owner, _)| *owner != user_id);
        Ok(u64::try_from(before - inner.lines.len()).unwrap_or(u64::MAX))
    }

    async fn products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let inner = self.inner.lock().await;
        inner.check_online()?;
        Ok(ids
            .iter()
            .filter_map(|id| inner.products.get(id).cloned())
            .collect())
    }
}
