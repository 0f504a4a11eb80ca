//! Cart line repository: the remote rows behind signed-in carts.

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use corner_shop_core::{CartItemId, Product, ProductId, UserId, Variant};

use super::{ProductRepository, RepositoryError};
use crate::services::cart::{CartLineRow, CartRows};

#[derive(Debug, sqlx::FromRow)]
struct LineRow {
    id: Uuid,
    product_id: i32,
    unit_price: Decimal,
    quantity: i32,
    size: Option<String>,
    color: Option<String>,
}

impl TryFrom<LineRow> for CartLineRow {
    type Error = RepositoryError;

    fn try_from(row: LineRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(row.quantity)
            .ok()
            .filter(|q| *q > 0)
            .ok_or_else(|| {
                RepositoryError::DataCorruption(format!(
                    "cart line {} has quantity {}",
                    row.id, row.quantity
                ))
            })?;

        Ok(Self {
            id: CartItemId::new(row.id),
            product_id: ProductId::new(row.product_id),
            unit_price: row.unit_price,
            quantity,
            variant: Variant::new(row.size, row.color),
        })
    }
}

/// Repository for `storefront.cart_line`.
pub struct CartLineRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartLineRepository<'a> {
    /// Create a new cart line repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

impl CartRows for CartLineRepository<'_> {
    async fn lines_for_user(&self, user_id: UserId) -> Result<Vec<CartLineRow>, RepositoryError> {
        let rows = sqlx::query_as::<_, LineRow>(
            r"
            SELECT id, product_id, unit_price, quantity, size, color
            FROM storefront.cart_line
            WHERE user_id = $1
            ORDER BY created_at ASC, id ASC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(CartLineRow::try_from).collect()
    }

    async fn upsert_line(&self, user_id: UserId, line: &CartLineRow) -> Result<(), RepositoryError> {
        let quantity = i32::try_from(line.quantity).map_err(|_| {
            RepositoryError::Conflict(format!("quantity {} exceeds column range", line.quantity))
        })?;

        sqlx::query(
            r"
            INSERT INTO storefront.cart_line
                (id, user_id, product_id, unit_price, quantity, size, color)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE
                SET user_id = EXCLUDED.user_id,
                    quantity = EXCLUDED.quantity,
                    updated_at = NOW()
            ",
        )
        .bind(line.id)
        .bind(user_id)
        .bind(line.product_id)
        .bind(line.unit_price)
        .bind(quantity)
        .bind(line.variant.size.as_deref())
        .bind(line.variant.color.as_deref())
        .execute(self.pool)
        .await?;

        Ok(())
    }

    async fn delete_line(&self, user_id: UserId, id: CartItemId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            DELETE FROM storefront.cart_line
            WHERE id = $1 AND user_id = $2
            ",
        )
        .bind(id)
        .bind(user_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_lines_for_user(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r"
            DELETE FROM storefront.cart_line
            WHERE user_id = $1
            ",
        )
        .bind(user_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        ProductRepository::new(self.pool).get_many(ids).await
    }
}
