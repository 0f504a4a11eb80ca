//! The cart reducer.
//!
//! A [`Cart`] is a list of line items. Totals are never stored: every call to
//! [`Cart::totals`] folds the current items, so they cannot drift from the
//! lines they summarize.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::item::{CartItem, Variant};
use super::product::Product;
use crate::types::{CartItemId, CurrencyCode, Price};

/// Largest quantity a single line may hold. Stored lines use a signed 32-bit
/// column.
pub const MAX_LINE_QUANTITY: u32 = i32::MAX.unsigned_abs();

/// Errors raised when planning a cart mutation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    /// Quantity below 1 passed to an add.
    #[error("quantity must be at least 1 (got {0})")]
    InvalidQuantity(i64),

    /// Quantity does not fit in a line.
    #[error("quantity cannot exceed {max}")]
    QuantityTooLarge {
        /// Largest quantity a line can hold.
        max: u32,
    },

    /// No line with this ID in the cart.
    #[error("cart item {0} not found")]
    ItemNotFound(CartItemId),

    /// Operation requires at least one line.
    #[error("cart is empty")]
    Empty,
}

/// A committed change to the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartAction {
    /// Insert the line, or replace the line with the same ID.
    Upsert(CartItem),
    /// Delete the line with this ID.
    Remove(CartItemId),
    /// Delete every line.
    Clear,
    /// Replace all lines (after loading from storage).
    Replace(Vec<CartItem>),
}

/// Totals derived from a cart's lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartTotals {
    /// `Σ unit_price × quantity`.
    pub subtotal: Decimal,
    /// `Σ quantity`.
    pub item_count: u64,
}

impl CartTotals {
    /// The subtotal as a [`Price`] in `currency`.
    #[must_use]
    pub const fn subtotal_price(&self, currency: CurrencyCode) -> Price {
        Price::new(self.subtotal, currency)
    }
}

/// In-memory cart state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// A cart holding `items`. Zero-quantity lines are dropped.
    #[must_use]
    pub fn from_items(items: Vec<CartItem>) -> Self {
        let mut cart = Self::new();
        cart.apply(CartAction::Replace(items));
        cart
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up a line by ID.
    #[must_use]
    pub fn get(&self, id: CartItemId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Subtotal and item count folded over the current lines.
    #[must_use]
    pub fn totals(&self) -> CartTotals {
        self.items
            .iter()
            .fold(CartTotals::default(), |acc, item| CartTotals {
                subtotal: acc.subtotal + item.line_total(),
                item_count: acc.item_count + u64::from(item.quantity),
            })
    }

    /// Plan adding `quantity` of `product` with `variant`.
    ///
    /// If a line for the same product and variant exists, the plan increments
    /// it (keeping its original price snapshot); otherwise the plan creates a
    /// new line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] when `quantity` is 0 and
    /// [`CartError::QuantityTooLarge`] when the line would exceed
    /// [`MAX_LINE_QUANTITY`].
    pub fn plan_add(
        &self,
        product: &Product,
        quantity: u32,
        variant: Variant,
    ) -> Result<CartAction, CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity(0));
        }

        let line = match self
            .items
            .iter()
            .find(|item| item.is_same_line(product.id, &variant))
        {
            Some(existing) => {
                let quantity = existing
                    .quantity
                    .checked_add(quantity)
                    .filter(|total| *total <= MAX_LINE_QUANTITY)
                    .ok_or(CartError::QuantityTooLarge {
                        max: MAX_LINE_QUANTITY,
                    })?;
                existing.with_quantity(quantity)
            }
            None if quantity > MAX_LINE_QUANTITY => {
                return Err(CartError::QuantityTooLarge {
                    max: MAX_LINE_QUANTITY,
                });
            }
            None => CartItem::new(product, quantity, variant),
        };

        Ok(CartAction::Upsert(line))
    }

    /// Plan setting the quantity of line `id`.
    ///
    /// A quantity of zero or less plans a removal.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::ItemNotFound`] for an unknown line and
    /// [`CartError::QuantityTooLarge`] when `quantity` exceeds
    /// [`MAX_LINE_QUANTITY`].
    pub fn plan_update(&self, id: CartItemId, quantity: i64) -> Result<CartAction, CartError> {
        if quantity <= 0 {
            return self.plan_remove(id);
        }

        let existing = self.get(id).ok_or(CartError::ItemNotFound(id))?;
        let quantity = u32::try_from(quantity)
            .ok()
            .filter(|q| *q <= MAX_LINE_QUANTITY)
            .ok_or(CartError::QuantityTooLarge {
                max: MAX_LINE_QUANTITY,
            })?;

        Ok(CartAction::Upsert(existing.with_quantity(quantity)))
    }

    /// Plan removing line `id`.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::ItemNotFound`] for an unknown line.
    pub fn plan_remove(&self, id: CartItemId) -> Result<CartAction, CartError> {
        if self.get(id).is_none() {
            return Err(CartError::ItemNotFound(id));
        }
        Ok(CartAction::Remove(id))
    }

    /// Apply a committed action.
    pub fn apply(&mut self, action: CartAction) {
        match action {
            CartAction::Upsert(line) if line.quantity == 0 => {
                self.items.retain(|item| item.id != line.id);
            }
            CartAction::Upsert(line) => {
                match self.items.iter_mut().find(|item| item.id == line.id) {
                    Some(slot) => *slot = line,
                    None => self.items.push(line),
                }
            }
            CartAction::Remove(id) => self.items.retain(|item| item.id != id),
            CartAction::Clear => self.items.clear(),
            CartAction::Replace(items) => {
                self.items = items.into_iter().filter(|item| item.quantity > 0).collect();
            }
        }
    }
}
