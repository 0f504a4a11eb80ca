//! Product catalog with an in-process cache.
//!
//! Product lookups and listing pages are cached with `moka` (5-minute TTL).
//! A cache miss falls through to [`ProductRepository`].

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;
use tracing::{debug, instrument};

use corner_shop_core::{Product, ProductId};

use crate::db::{ProductRepository, RepositoryError};

/// Cache key for products and listing pages.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CacheKey {
    Product(ProductId),
    Page { limit: i64, offset: i64 },
}

/// Cached value types.
#[derive(Debug, Clone)]
enum CacheValue {
    Product(Product),
    Page(Arc<Vec<Product>>),
}

/// Cached read access to catalog products.
#[derive(Clone)]
pub struct Catalog {
    inner: Arc<CatalogInner>,
}

struct CatalogInner {
    pool: PgPool,
    cache: Cache<CacheKey, CacheValue>,
}

impl Catalog {
    /// Create a catalog over `pool`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Self {
            inner: Arc::new(CatalogInner { pool, cache }),
        }
    }

    /// Get a product that is for sale.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the lookup fails.
    #[instrument(skip(self))]
    pub async fn product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let key = CacheKey::Product(id);
        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for product");
            return Ok(Some(product));
        }

        let product = ProductRepository::new(&self.inner.pool)
            .get_active(id)
            .await?;
        if let Some(product) = &product {
            self.inner
                .cache
                .insert(key, CacheValue::Product(product.clone()))
                .await;
        }

        Ok(product)
    }

    /// List one page of active products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the query fails.
    #[instrument(skip(self))]
    pub async fn products(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Arc<Vec<Product>>, RepositoryError> {
        let key = CacheKey::Page { limit, offset };
        if let Some(CacheValue::Page(page)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for product page");
            return Ok(page);
        }

        let page = Arc::new(
            ProductRepository::new(&self.inner.pool)
                .list(limit, offset)
                .await?,
        );
        self.inner
            .cache
            .insert(key, CacheValue::Page(Arc::clone(&page)))
            .await;

        Ok(page)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use sqlx::postgres::PgPoolOptions;

    use super::*;

    /// Catalog whose pool points at a closed port, so every miss fails fast.
    fn unreachable_catalog() -> Catalog {
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(500))
            .connect_lazy("postgres://corner_shop@127.0.0.1:1/corner_shop")
            .unwrap();
        Catalog::new(pool)
    }

    fn product(id: i32) -> Product {
        Product::new(ProductId::new(id), "Tin Badge", Decimal::new(350, 2), None).unwrap()
    }

    #[tokio::test]
    async fn test_product_cache_hit_skips_database() {
        let catalog = unreachable_catalog();
        let badge = product(3);
        catalog
            .inner
            .cache
            .insert(CacheKey::Product(badge.id), CacheValue::Product(badge.clone()))
            .await;

        assert_eq!(catalog.product(badge.id).await.unwrap(), Some(badge));
    }

    #[tokio::test]
    async fn test_product_miss_reads_repository() {
        let catalog = unreachable_catalog();
        let id = ProductId::new(4);

        assert!(catalog.product(id).await.is_err());
        assert!(
            catalog
                .inner
                .cache
                .get(&CacheKey::Product(id))
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_page_cache_is_keyed_by_window() {
        let catalog = unreachable_catalog();
        let page = Arc::new(vec![product(1), product(2)]);
        catalog
            .inner
            .cache
            .insert(
                CacheKey::Page {
                    limit: 25,
                    offset: 0,
                },
                CacheValue::Page(Arc::clone(&page)),
            )
            .await;

        assert_eq!(catalog.products(25, 0).await.unwrap(), page);
        assert!(catalog.products(25, 24).await.is_err());
    }
}
