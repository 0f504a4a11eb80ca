//! Product projection used by the cart.
//!
//! The catalog row carries more than the cart needs; this is the narrow,
//! validated view (id, name, price, image) that line items are snapshotted
//! from.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::ProductId;

/// Errors raised when a product projection fails validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProductError {
    /// The product name is empty or only whitespace.
    #[error("product name cannot be empty")]
    EmptyName,
    /// The product price is below zero.
    #[error("product price cannot be negative (got {0})")]
    NegativePrice(Decimal),
}

/// A product as seen by the cart.
///
/// Construction goes through [`Product::new`] (and deserialization is routed
/// through the same checks), so a `Product` always has a non-empty name and a
/// non-negative price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedProduct")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub image: Option<String>,
}

impl Product {
    /// Build a validated product projection.
    ///
    /// # Errors
    ///
    /// Returns [`ProductError::EmptyName`] for a blank name and
    /// [`ProductError::NegativePrice`] for a price below zero.
    pub fn new(
        id: ProductId,
        name: impl Into<String>,
        price: Decimal,
        image: Option<String>,
    ) -> Result<Self, ProductError> {
        let name = name.into().trim().to_owned();
        if name.is_empty() {
            return Err(ProductError::EmptyName);
        }
        if price.is_sign_negative() && !price.is_zero() {
            return Err(ProductError::NegativePrice(price));
        }

        Ok(Self {
            id,
            name,
            price,
            image: image.filter(|url| !url.trim().is_empty()),
        })
    }
}

#[derive(Deserialize)]
struct UncheckedProduct {
    id: ProductId,
    name: String,
    price: Decimal,
    #[serde(default)]
    image: Option<String>,
}

impl TryFrom<UncheckedProduct> for Product {
    type Error = ProductError;

    fn try_from(raw: UncheckedProduct) -> Result<Self, Self::Error> {
        Self::new(raw.id, raw.name, raw.price, raw.image)
    }
}
