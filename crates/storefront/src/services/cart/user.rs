//! Signed-in cart adapter over [`CartRows`].

use std::collections::{HashMap, HashSet};

use tracing::{debug, instrument, warn};

use corner_shop_core::{CartItem, CartItemId, ProductId, UserId};

use super::rows::{CartLineRow, CartRows};
use super::{CartPersistence, CartServiceError};

/// User-scoped cart persistence.
pub struct UserCart<'a, R> {
    rows: &'a R,
    user_id: UserId,
}

impl<'a, R: CartRows> UserCart<'a, R> {
    /// Scope `rows` to `user_id`.
    #[must_use]
    pub const fn new(rows: &'a R, user_id: UserId) -> Self {
        Self { rows, user_id }
    }

    /// The owning user.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user_id
    }
}

impl<R: CartRows> CartPersistence for UserCart<'_, R> {
    /// Load the user's lines and join product name/image with one batch
    /// lookup. Lines whose product no longer exists are skipped.
    #[instrument(skip(self), fields(user_id = %self.user_id))]
    async fn load(&self) -> Result<Vec<CartItem>, CartServiceError> {
        let lines = self.rows.lines_for_user(self.user_id).await?;
        if lines.is_empty() {
            return Ok(Vec::new());
        }

        let mut seen = HashSet::new();
        let ids: Vec<ProductId> = lines
            .iter()
            .map(|line| line.product_id)
            .filter(|id| seen.insert(*id))
            .collect();

        let products: HashMap<ProductId, _> = self
            .rows
            .products_by_ids(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let items = lines
            .into_iter()
            .filter_map(|line| {
                let Some(product) = products.get(&line.product_id) else {
                    warn!(
                        line_id = %line.id,
                        product_id = %line.product_id,
                        "skipping cart line for missing product"
                    );
                    return None;
                };
                Some(CartItem {
                    id: line.id,
                    product_id: line.product_id,
                    name: product.name.clone(),
                    image: product.image.clone(),
                    unit_price: line.unit_price,
                    quantity: line.quantity,
                    variant: line.variant,
                })
            })
            .collect();

        Ok(items)
    }

    #[instrument(skip(self, line), fields(user_id = %self.user_id, line_id = %line.id))]
    async fn save_line(&self, line: &CartItem) -> Result<(), CartServiceError> {
        self.rows
            .upsert_line(self.user_id, &CartLineRow::from(line))
            .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(user_id = %self.user_id))]
    async fn remove_line(&self, id: CartItemId) -> Result<(), CartServiceError> {
        if !self.rows.delete_line(self.user_id, id).await? {
            debug!("cart line already gone");
        }
        Ok(())
    }

    #[instrument(skip(self), fields(user_id = %self.user_id))]
    async fn clear(&self) -> Result<(), CartServiceError> {
        let deleted = self.rows.delete_lines_for_user(self.user_id).await?;
        debug!(deleted, "cleared user cart");
        Ok(())
    }
}
