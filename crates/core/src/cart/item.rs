//! Cart line items.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::product::Product;
use crate::types::{CartItemId, ProductId};

/// Optional size/color selection for a line.
///
/// Two lines for the same product are distinct when their variants differ.
/// Blank selections are normalized to `None` so a form that submits
/// `size=""` matches a line added without a size.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variant {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Variant {
    /// Create a variant, normalizing blank selections to `None`.
    #[must_use]
    pub fn new(size: Option<String>, color: Option<String>) -> Self {
        Self {
            size: normalize(size),
            color: normalize(color),
        }
    }

    /// Whether neither a size nor a color is selected.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.size.is_none() && self.color.is_none()
    }
}

fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// One line in a cart: a product (plus variant) and its quantity.
///
/// Name, image and unit price are snapshots taken when the line was created;
/// later catalog price changes do not reach existing lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub unit_price: Decimal,
    pub quantity: u32,
    #[serde(default)]
    pub variant: Variant,
}

impl CartItem {
    /// Create a new line snapshotting `product`.
    #[must_use]
    pub fn new(product: &Product, quantity: u32, variant: Variant) -> Self {
        Self {
            id: CartItemId::generate(),
            product_id: product.id,
            name: product.name.clone(),
            image: product.image.clone(),
            unit_price: product.price,
            quantity,
            variant,
        }
    }

    /// Whether this line holds `product_id` with exactly `variant`.
    #[must_use]
    pub fn is_same_line(&self, product_id: ProductId, variant: &Variant) -> bool {
        self.product_id == product_id && self.variant == *variant
    }

    /// `unit_price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }

    /// Copy of this line with a different quantity.
    #[must_use]
    pub fn with_quantity(&self, quantity: u32) -> Self {
        Self {
            quantity,
            ..self.clone()
        }
    }
}
