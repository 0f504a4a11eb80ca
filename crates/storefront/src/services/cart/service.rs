//! Per-request cart operations.
//!
//! A [`CartService`] owns its storage backends and the in-memory [`Cart`] for
//! one scope. Every mutation is planned against the current cart, persisted
//! through the active adapter, and only then applied. A failed write leaves
//! the in-memory cart as it was.

use serde::Serialize;
use tracing::{error, info, instrument, warn};

use corner_shop_core::{
    Cart, CartAction, CartError, CartItem, CartItemId, CartScope, CartTotals, MAX_LINE_QUANTITY,
    Product, UserId, Variant,
};

use super::guest::GuestCart;
use super::merge::{MergeOutcome, merge_guest_cart};
use super::persistence::ActiveCart;
use super::rows::CartRows;
use super::storage::KeyValueStore;
use super::user::UserCart;
use super::{CartPersistence, CartServiceError};

/// Lines and totals captured at checkout, before the cart is cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutSummary {
    pub lines: Vec<CartItem>,
    pub totals: CartTotals,
}

/// Cart operations for one request.
pub struct CartService<K, R> {
    store: K,
    rows: R,
    scope: CartScope,
    cart: Cart,
}

impl<K: KeyValueStore, R: CartRows> CartService<K, R> {
    /// Open the cart for `user`, or the guest cart when signed out, and load
    /// its lines.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError` if the scope cannot be resolved or the lines
    /// cannot be loaded.
    pub async fn open(store: K, rows: R, user: Option<UserId>) -> Result<Self, CartServiceError> {
        let scope = match user {
            Some(user_id) => CartScope::User(user_id),
            None => CartScope::Guest(GuestCart::new(&store).token().await?),
        };

        let mut service = Self {
            store,
            rows,
            scope,
            cart: Cart::new(),
        };
        service.load().await?;
        Ok(service)
    }

    /// The active scope.
    #[must_use]
    pub const fn scope(&self) -> &CartScope {
        &self.scope
    }

    /// The in-memory cart.
    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    /// Totals of the in-memory cart.
    #[must_use]
    pub fn totals(&self) -> CartTotals {
        self.cart.totals()
    }

    fn adapter(&self) -> ActiveCart<'_, K, R> {
        self.adapter_for(&self.scope)
    }

    fn adapter_for(&self, scope: &CartScope) -> ActiveCart<'_, K, R> {
        match scope {
            CartScope::Guest(_) => ActiveCart::Guest(GuestCart::new(&self.store)),
            CartScope::User(user_id) => ActiveCart::User(UserCart::new(&self.rows, *user_id)),
        }
    }

    /// Load `scope`'s lines and make it the active scope. On failure the
    /// active scope and cart are kept.
    async fn switch_to(&mut self, scope: CartScope) -> Result<(), CartServiceError> {
        let lines = self.adapter_for(&scope).load().await.inspect_err(|e| {
            warn!(target_scope = %scope, error = %e, "failed to load cart for new scope");
        })?;
        self.scope = scope;
        self.cart = Cart::from_items(lines);
        Ok(())
    }

    /// Replace the in-memory lines with the active scope's stored lines.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError` if the lines cannot be read; the in-memory
    /// cart is unchanged.
    #[instrument(skip(self), fields(scope = %self.scope))]
    pub async fn load(&mut self) -> Result<&Cart, CartServiceError> {
        let lines = self.adapter().load().await.inspect_err(|e| {
            warn!(error = %e, "failed to load cart");
        })?;
        self.cart.apply(CartAction::Replace(lines));
        Ok(&self.cart)
    }

    /// Add `quantity` of `product`. An existing line for the same product and
    /// variant is incremented instead of adding a second line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` for `quantity < 1`, or a
    /// persistence error.
    #[instrument(skip(self, product), fields(scope = %self.scope, product_id = %product.id))]
    pub async fn add_item(
        &mut self,
        product: &Product,
        quantity: i64,
        variant: Variant,
    ) -> Result<(), CartServiceError> {
        let quantity = match u32::try_from(quantity) {
            Ok(q) => q,
            Err(_) if quantity < 1 => return Err(CartError::InvalidQuantity(quantity).into()),
            Err(_) => {
                return Err(CartError::QuantityTooLarge {
                    max: MAX_LINE_QUANTITY,
                }
                .into());
            }
        };

        let action = self.cart.plan_add(product, quantity, variant)?;
        self.commit(action).await
    }

    /// Set the quantity of line `id`. A quantity of zero or less removes it.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ItemNotFound` for an unknown line, or a
    /// persistence error.
    #[instrument(skip(self), fields(scope = %self.scope))]
    pub async fn update_quantity(
        &mut self,
        id: CartItemId,
        quantity: i64,
    ) -> Result<(), CartServiceError> {
        let action = self.cart.plan_update(id, quantity)?;
        self.commit(action).await
    }

    /// Remove line `id`.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ItemNotFound` for an unknown line, or a
    /// persistence error.
    #[instrument(skip(self), fields(scope = %self.scope))]
    pub async fn remove_item(&mut self, id: CartItemId) -> Result<(), CartServiceError> {
        let action = self.cart.plan_remove(id)?;
        self.commit(action).await
    }

    /// Remove every line of the active scope.
    ///
    /// # Errors
    ///
    /// Returns a persistence error.
    #[instrument(skip(self), fields(scope = %self.scope))]
    pub async fn clear(&mut self) -> Result<(), CartServiceError> {
        self.commit(CartAction::Clear).await
    }

    /// Snapshot the cart and clear it.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Empty` when there is nothing to check out, or a
    /// persistence error (the cart is then left intact).
    #[instrument(skip(self), fields(scope = %self.scope))]
    pub async fn checkout(&mut self) -> Result<CheckoutSummary, CartServiceError> {
        if self.cart.is_empty() {
            return Err(CartError::Empty.into());
        }

        let summary = CheckoutSummary {
            lines: self.cart.items().to_vec(),
            totals: self.cart.totals(),
        };
        self.commit(CartAction::Clear).await?;

        info!(
            lines = summary.lines.len(),
            item_count = summary.totals.item_count,
            subtotal = %summary.totals.subtotal,
            "checkout complete"
        );
        Ok(summary)
    }

    /// Switch to `user_id`'s cart, merging the guest cart into it first.
    ///
    /// A failed merge is logged and sign-in continues with the user's stored
    /// cart.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError` if the user's cart cannot be loaded. The
    /// guest scope stays active in that case.
    #[instrument(skip(self), fields(scope = %self.scope))]
    pub async fn sign_in(&mut self, user_id: UserId) -> Result<MergeOutcome, CartServiceError> {
        if self.scope.user_id() == Some(user_id) {
            return Ok(MergeOutcome::NothingToMerge);
        }

        let outcome = if self.scope.is_guest() {
            match merge_guest_cart(&self.store, &self.rows, user_id).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    let event_id = sentry::capture_error(&e);
                    error!(
                        error = %e,
                        sentry_event_id = %event_id,
                        "guest cart merge failed"
                    );
                    MergeOutcome::Skipped
                }
            }
        } else {
            MergeOutcome::NothingToMerge
        };

        self.switch_to(CartScope::User(user_id)).await?;
        Ok(outcome)
    }

    /// Switch back to a guest scope. The user's stored cart is untouched.
    ///
    /// # Errors
    ///
    /// Returns `CartServiceError` if the guest scope cannot be resolved or
    /// loaded. The user scope stays active in that case.
    #[instrument(skip(self), fields(scope = %self.scope))]
    pub async fn sign_out(&mut self) -> Result<(), CartServiceError> {
        let token = GuestCart::new(&self.store).token().await?;
        self.switch_to(CartScope::Guest(token)).await
    }

    /// Persist `action` through the active adapter, then apply it.
    async fn commit(&mut self, action: CartAction) -> Result<(), CartServiceError> {
        let adapter = self.adapter();
        let persisted = match &action {
            CartAction::Upsert(line) => adapter.save_line(line).await,
            CartAction::Remove(id) => adapter.remove_line(*id).await,
            CartAction::Clear => adapter.clear().await,
            CartAction::Replace(_) => Ok(()),
        };

        if let Err(e) = persisted {
            warn!(scope = %self.scope, error = %e, "cart write failed");
            return Err(e);
        }

        self.cart.apply(action);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use corner_shop_core::ProductId;

    use super::*;
    use crate::services::cart::guest::GUEST_CART_KEY;
    use crate::services::cart::rows::MemoryCartRows;
    use crate::services::cart::storage::MemoryStore;

    fn product(id: i32, cents: i64) -> Product {
        Product::new(
            ProductId::new(id),
            format!("Product {id}"),
            Decimal::new(cents, 2),
            None,
        )
        .unwrap()
    }

    async fn guest_service() -> CartService<MemoryStore, MemoryCartRows> {
        CartService::open(MemoryStore::new(), MemoryCartRows::new(), None)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_open_guest_creates_scope_token() {
        let service = guest_service().await;
        assert!(service.scope().is_guest());
        assert!(service.cart().is_empty());
    }

    #[tokio::test]
    async fn test_add_then_reopen_restores_lines() {
        let store = MemoryStore::new();
        let rows = MemoryCartRows::new();
        let mut service = CartService::open(store.clone(), rows.clone(), None)
            .await
            .unwrap();
        service
            .add_item(&product(1, 999), 2, Variant::default())
            .await
            .unwrap();

        let reopened = CartService::open(store, rows, None).await.unwrap();
        assert_eq!(reopened.cart(), service.cart());
        assert_eq!(reopened.totals().subtotal, Decimal::new(1998, 2));
    }

    #[tokio::test]
    async fn test_add_rejects_non_positive_quantity() {
        let mut service = guest_service().await;
        for quantity in [0, -3] {
            let err = service
                .add_item(&product(1, 100), quantity, Variant::default())
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                CartServiceError::Cart(CartError::InvalidQuantity(q)) if q == quantity
            ));
        }
        assert!(service.cart().is_empty());
    }

    #[tokio::test]
    async fn test_add_beyond_line_limit_is_a_client_error() {
        let rows = MemoryCartRows::new();
        let mut service = CartService::open(MemoryStore::new(), rows.clone(), Some(UserId::new(2)))
            .await
            .unwrap();

        for quantity in [3_000_000_000, i64::from(MAX_LINE_QUANTITY) + 1] {
            let err = service
                .add_item(&product(1, 100), quantity, Variant::default())
                .await
                .unwrap_err();
            assert!(!err.is_persistence());
            assert!(matches!(
                err,
                CartServiceError::Cart(CartError::QuantityTooLarge { max }) if max == MAX_LINE_QUANTITY
            ));
        }
        assert!(service.cart().is_empty());
        assert!(rows.stored_lines(UserId::new(2)).await.is_empty());
    }

    #[tokio::test]
    async fn test_update_to_zero_removes() {
        let mut service = guest_service().await;
        service
            .add_item(&product(1, 100), 1, Variant::default())
            .await
            .unwrap();
        let id = service.cart().items()[0].id;

        service.update_quantity(id, 0).await.unwrap();
        assert!(service.cart().is_empty());
    }

    #[tokio::test]
    async fn test_persistence_failure_leaves_memory_unchanged() {
        let store = MemoryStore::new();
        let mut service = CartService::open(store.clone(), MemoryCartRows::new(), None)
            .await
            .unwrap();
        service
            .add_item(&product(1, 100), 1, Variant::default())
            .await
            .unwrap();
        let id = service.cart().items()[0].id;
        let before = service.cart().clone();

        store.set_offline(true).await;
        let err = service
            .add_item(&product(2, 100), 1, Variant::default())
            .await
            .unwrap_err();
        assert!(err.is_persistence());
        assert!(service.update_quantity(id, 5).await.is_err());
        assert!(service.remove_item(id).await.is_err());
        assert!(service.clear().await.is_err());
        assert!(service.load().await.is_err());

        assert_eq!(service.cart(), &before);
    }

    #[tokio::test]
    async fn test_checkout_reports_totals_and_clears() {
        let mut service = guest_service().await;
        service
            .add_item(&product(1, 1000), 3, Variant::default())
            .await
            .unwrap();

        let summary = service.checkout().await.unwrap();
        assert_eq!(summary.totals.subtotal, Decimal::new(3000, 2));
        assert_eq!(summary.totals.item_count, 3);
        assert_eq!(summary.lines.len(), 1);
        assert!(service.cart().is_empty());
        assert!(service.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_checkout_empty_cart_fails() {
        let mut service = guest_service().await;
        assert!(matches!(
            service.checkout().await,
            Err(CartServiceError::Cart(CartError::Empty))
        ));
    }

    #[tokio::test]
    async fn test_sign_in_merges_and_sign_out_starts_fresh_guest() {
        let store = MemoryStore::new();
        let rows = MemoryCartRows::new();
        let tee = product(1, 2500);
        rows.insert_product(tee.clone()).await;

        let mut service = CartService::open(store.clone(), rows.clone(), None)
            .await
            .unwrap();
        let guest_scope = service.scope().clone();
        service
            .add_item(&tee, 2, Variant::default())
            .await
            .unwrap();

        let outcome = service.sign_in(UserId::new(4)).await.unwrap();
        assert_eq!(outcome, MergeOutcome::Merged { lines: 1 });
        assert_eq!(service.scope(), &CartScope::User(UserId::new(4)));
        assert_eq!(service.totals().item_count, 2);
        assert_eq!(store.peek(GUEST_CART_KEY).await, None);

        service.sign_out().await.unwrap();
        assert!(service.scope().is_guest());
        assert_ne!(service.scope(), &guest_scope);
        assert!(service.cart().is_empty());
        assert_eq!(rows.stored_lines(UserId::new(4)).await.len(), 1);
    }

    #[tokio::test]
    async fn test_sign_in_survives_failed_merge() {
        let store = MemoryStore::new();
        let rows = MemoryCartRows::new();
        let mut service = CartService::open(store.clone(), rows.clone(), None)
            .await
            .unwrap();
        service
            .add_item(&product(1, 100), 1, Variant::default())
            .await
            .unwrap();

        store.set_offline(true).await;
        let outcome = service.sign_in(UserId::new(9)).await.unwrap();
        assert_eq!(outcome, MergeOutcome::Skipped);
        assert_eq!(service.scope(), &CartScope::User(UserId::new(9)));
        assert!(service.cart().is_empty());
    }

    #[tokio::test]
    async fn test_failed_sign_in_keeps_guest_scope_and_cart() {
        let store = MemoryStore::new();
        let rows = MemoryCartRows::new();
        let mut service = CartService::open(store.clone(), rows.clone(), None)
            .await
            .unwrap();
        service
            .add_item(&product(1, 100), 1, Variant::default())
            .await
            .unwrap();
        let scope = service.scope().clone();
        let cart = service.cart().clone();

        rows.set_offline(true).await;
        assert!(service.sign_in(UserId::new(6)).await.is_err());

        assert_eq!(service.scope(), &scope);
        assert_eq!(service.cart(), &cart);
        assert!(store.peek(GUEST_CART_KEY).await.is_some());
    }

    #[tokio::test]
    async fn test_failed_sign_out_keeps_user_scope_and_cart() {
        let store = MemoryStore::new();
        let rows = MemoryCartRows::new();
        let mut service = CartService::open(store.clone(), rows, Some(UserId::new(3)))
            .await
            .unwrap();
        service
            .add_item(&product(1, 100), 2, Variant::default())
            .await
            .unwrap();
        let cart = service.cart().clone();

        store.set_offline(true).await;
        assert!(service.sign_out().await.is_err());

        assert_eq!(service.scope(), &CartScope::User(UserId::new(3)));
        assert_eq!(service.cart(), &cart);
    }
}
