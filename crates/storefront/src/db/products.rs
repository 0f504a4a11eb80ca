//! Product repository.
//!
//! Rows are converted into the validated [`Product`] projection here, so a
//! malformed catalog row surfaces as `DataCorruption` instead of reaching a
//! cart.

use rust_decimal::Decimal;
use sqlx::PgPool;

use corner_shop_core::{Product, ProductId};

use super::RepositoryError;

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i32,
    name: String,
    price: Decimal,
    image_url: Option<String>,
    active: bool,
}

impl ProductRow {
    /// The product, or `None` when it is hidden from sale.
    fn into_active(self) -> Option<Result<Product, RepositoryError>> {
        let active = self.active;
        active.then(|| Product::try_from(self))
    }
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Self::new(ProductId::new(row.id), row.name, row.price, row.image_url).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid product {}: {e}", row.id))
        })
    }
}

/// Repository for catalog products.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get one product that is for sale. Inactive products read as missing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the row fails validation.
    pub async fn get_active(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, name, price, image_url, active
            FROM storefront.product
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.and_then(ProductRow::into_active).transpose()
    }

    /// Get every product whose ID is in `ids` with a single query, including
    /// inactive ones so existing cart lines still resolve.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a row fails validation.
    pub async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let raw_ids: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();
        let rows = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, name, price, image_url, active
            FROM storefront.product
            WHERE id = ANY($1)
            ",
        )
        .bind(raw_ids)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    /// List active products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a row fails validation.
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, name, price, image_url, active
            FROM storefront.product
            WHERE active
            ORDER BY created_at DESC, id DESC
            LIMIT $1 OFFSET $2
            ",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    /// Insert a product, or update it when a product with the same `sku`
    /// exists. Returns the stored product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_by_sku(
        &self,
        sku: &str,
        name: &str,
        price: Decimal,
        image_url: Option<&str>,
    ) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            INSERT INTO storefront.product (sku, name, price, image_url)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (sku) DO UPDATE
                SET name = EXCLUDED.name,
                    price = EXCLUDED.price,
                    image_url = EXCLUDED.image_url,
                    updated_at = NOW()
            RETURNING id, name, price, image_url, active
            ",
        )
        .bind(sku)
        .bind(name)
        .bind(price)
        .bind(image_url)
        .fetch_one(self.pool)
        .await?;

        Product::try_from(row)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn row(active: bool) -> ProductRow {
        ProductRow {
            id: 7,
            name: "Field Notes".to_string(),
            price: Decimal::new(1295, 2),
            image_url: None,
            active,
        }
    }

    #[test]
    fn test_active_row_converts() {
        let product = row(true).into_active().unwrap().unwrap();
        assert_eq!(product.id, ProductId::new(7));
        assert_eq!(product.price, Decimal::new(1295, 2));
    }

    #[test]
    fn test_inactive_row_is_hidden() {
        assert!(row(false).into_active().is_none());
    }

    #[test]
    fn test_inactive_row_still_converts_for_existing_lines() {
        assert!(Product::try_from(row(false)).is_ok());
    }

    #[test]
    fn test_invalid_row_is_corruption() {
        let mut bad = row(true);
        bad.price = Decimal::new(-1, 0);
        assert!(matches!(
            bad.into_active(),
            Some(Err(RepositoryError::DataCorruption(_)))
        ));
    }
}
