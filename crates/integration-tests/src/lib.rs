//! Integration tests for Corner Shop.
//!
//! The tests in `tests/` drive [`CartService`] end to end over the in-memory
//! backends (`MemoryStore` for guest storage, `MemoryCartRows` for the
//! signed-in rows), so they need no database.
//!
//! ```bash
//! cargo test -p corner-shop-integration-tests
//! ```
//!
//! This module holds the shared fixtures.

use rust_decimal::Decimal;

use corner_shop_core::{Product, ProductId, UserId};
use corner_shop_storefront::services::cart::{CartService, MemoryCartRows, MemoryStore};

/// Cart service over the in-memory backends.
pub type TestCart = CartService<MemoryStore, MemoryCartRows>;

/// A small catalog: `(id, name, price in cents)`.
pub const CATALOG: &[(i32, &str, i64)] = &[
    (1, "Enamel Mug", 1800),
    (2, "Canvas Tote", 1250),
    (3, "Sticker Pack", 499),
    (4, "Hoodie", 5400),
];

/// Build a product from a catalog entry.
///
/// # Panics
///
/// Panics if the entry has a blank name or negative price.
#[must_use]
pub fn product(id: i32, name: &str, cents: i64) -> Product {
    Product::new(ProductId::new(id), name, Decimal::new(cents, 2), None)
        .expect("catalog fixtures are valid")
}

/// Every product in [`CATALOG`].
#[must_use]
pub fn catalog() -> Vec<Product> {
    CATALOG
        .iter()
        .map(|&(id, name, cents)| product(id, name, cents))
        .collect()
}

/// Fresh in-memory backends with [`CATALOG`] loaded into the row store.
pub async fn backends() -> (MemoryStore, MemoryCartRows) {
    let rows = MemoryCartRows::new();
    for product in catalog() {
        rows.insert_product(product).await;
    }
    (MemoryStore::new(), rows)
}

/// Open a cart over clones of `store` and `rows`.
///
/// # Panics
///
/// Panics if the cart cannot be opened.
pub async fn open(store: &MemoryStore, rows: &MemoryCartRows, user: Option<UserId>) -> TestCart {
    CartService::open(store.clone(), rows.clone(), user)
        .await
        .expect("in-memory cart opens")
}
