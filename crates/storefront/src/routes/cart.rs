//! Cart route handlers.
//!
//! Every handler builds its own [`CartService`] from the request's session
//! (guest storage) and the cart line repository (signed-in storage).
//! Successful mutations answer with the updated cart and an
//! `HX-Trigger: cart-updated` header.

use axum::{
    Form, Json,
    extract::State,
    response::{AppendHeaders, IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use corner_shop_core::{
    Cart, CartItem, CartItemId, CartScope, CurrencyCode, Price, ProductId, Variant,
};

use crate::db::CartLineRepository;
use crate::error::{AppError, HX_TRIGGER, Result};
use crate::middleware::OptionalAuth;
use crate::models::CurrentUser;
use crate::services::Notification;
use crate::services::cart::{CartService, CheckoutSummary};
use crate::state::AppState;

/// Event fired on the client after any cart change.
pub const CART_UPDATED_EVENT: &str = "cart-updated";

/// Currency used for display.
const DISPLAY_CURRENCY: CurrencyCode = CurrencyCode::USD;

/// One cart line as returned to the client.
#[derive(Debug, Clone, Serialize)]
pub struct CartLineView {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub name: String,
    pub image: Option<String>,
    pub variant: Variant,
    pub quantity: u32,
    pub unit_price: String,
    pub line_total: String,
}

impl From<&CartItem> for CartLineView {
    fn from(item: &CartItem) -> Self {
        Self {
            id: item.id,
            product_id: item.product_id,
            name: item.name.clone(),
            image: item.image.clone(),
            variant: item.variant.clone(),
            quantity: item.quantity,
            unit_price: Price::new(item.unit_price, DISPLAY_CURRENCY).to_string(),
            line_total: Price::new(item.line_total(), DISPLAY_CURRENCY).to_string(),
        }
    }
}

/// The cart as returned to the client.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub scope: &'static str,
    pub items: Vec<CartLineView>,
    pub subtotal: String,
    pub subtotal_amount: Decimal,
    pub item_count: u64,
}

impl CartView {
    /// Build the view of `cart` in `scope`.
    #[must_use]
    pub fn new(cart: &Cart, scope: &CartScope) -> Self {
        let totals = cart.totals();
        Self {
            scope: if scope.is_guest() { "guest" } else { "user" },
            items: cart.items().iter().map(CartLineView::from).collect(),
            subtotal: totals.subtotal_price(DISPLAY_CURRENCY).to_string(),
            subtotal_amount: totals.subtotal,
            item_count: totals.item_count,
        }
    }

    fn of<K, R>(service: &CartService<K, R>) -> Self
    where
        K: crate::services::cart::KeyValueStore,
        R: crate::services::cart::CartRows,
    {
        Self::new(service.cart(), service.scope())
    }
}

/// Checkout result as returned to the client.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutView {
    pub toast: Notification,
    pub items: Vec<CartLineView>,
    pub subtotal: String,
    pub subtotal_amount: Decimal,
    pub item_count: u64,
}

impl From<&CheckoutSummary> for CheckoutView {
    fn from(summary: &CheckoutSummary) -> Self {
        Self {
            toast: Notification::success("Thanks! Your order has been placed."),
            items: summary.lines.iter().map(CartLineView::from).collect(),
            subtotal: summary
                .totals
                .subtotal_price(DISPLAY_CURRENCY)
                .to_string(),
            subtotal_amount: summary.totals.subtotal,
            item_count: summary.totals.item_count,
        }
    }
}

/// Cart count badge data.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CartCount {
    pub count: u64,
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: i32,
    pub quantity: Option<i64>,
    pub size: Option<String>,
    pub color: Option<String>,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub line_id: String,
    pub quantity: i64,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub line_id: String,
}

/// Attach the cart-updated trigger to a successful response.
pub fn cart_updated(body: impl IntoResponse) -> Response {
    (AppendHeaders([(HX_TRIGGER, CART_UPDATED_EVENT)]), body).into_response()
}

/// Parse a submitted cart line ID.
fn parse_line_id(raw: &str) -> Result<CartItemId> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid cart line".to_string()))
}

/// Open the requesting shopper's cart.
pub(crate) async fn open_cart<'a>(
    state: &'a AppState,
    session: Session,
    user: Option<&CurrentUser>,
) -> Result<CartService<Session, CartLineRepository<'a>>> {
    Ok(CartService::open(session, state.cart_rows(), user.map(|u| u.id)).await?)
}

/// Show the cart.
#[instrument(skip(state, session, user))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<CartView>> {
    let cart = open_cart(&state, session, user.as_ref()).await?;
    Ok(Json(CartView::of(&cart)))
}

/// Cart item count for the header badge.
#[instrument(skip(state, session, user))]
pub async fn count(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<CartCount>> {
    let cart = open_cart(&state, session, user.as_ref()).await?;
    Ok(Json(CartCount {
        count: cart.totals().item_count,
    }))
}

/// Add a product to the cart.
#[instrument(skip(state, session, user))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let product_id = ProductId::new(form.product_id);
    let product = state
        .catalog()
        .product(product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    let mut cart = open_cart(&state, session, user.as_ref()).await?;
    cart.add_item(
        &product,
        form.quantity.unwrap_or(1),
        Variant::new(form.size, form.color),
    )
    .await?;

    Ok(cart_updated(Json(CartView::of(&cart))))
}

/// Change a line's quantity. Zero or less removes the line.
#[instrument(skip(state, session, user))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response> {
    let line_id = parse_line_id(&form.line_id)?;
    let mut cart = open_cart(&state, session, user.as_ref()).await?;
    cart.update_quantity(line_id, form.quantity).await?;
    Ok(cart_updated(Json(CartView::of(&cart))))
}

/// Remove a line.
#[instrument(skip(state, session, user))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Response> {
    let line_id = parse_line_id(&form.line_id)?;
    let mut cart = open_cart(&state, session, user.as_ref()).await?;
    cart.remove_item(line_id).await?;
    Ok(cart_updated(Json(CartView::of(&cart))))
}

/// Empty the cart.
#[instrument(skip(state, session, user))]
pub async fn clear(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<Response> {
    let mut cart = open_cart(&state, session, user.as_ref()).await?;
    cart.clear().await?;
    Ok(cart_updated(Json(CartView::of(&cart))))
}

/// Check out: report the cart's contents and totals, then empty it.
#[instrument(skip(state, session, user))]
pub async fn checkout(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<Response> {
    let mut cart = open_cart(&state, session, user.as_ref()).await?;
    let summary = cart.checkout().await?;
    crate::error::add_breadcrumb("cart", "Checked out", None);
    Ok(cart_updated(Json(CheckoutView::from(&summary))))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use corner_shop_core::{CartAction, Product, UserId};

    use super::*;

    fn product(id: i32, cents: i64) -> Product {
        Product::new(
            ProductId::new(id),
            format!("Product {id}"),
            Decimal::new(cents, 2),
            Some(format!("/img/{id}.jpg")),
        )
        .unwrap()
    }

    #[test]
    fn test_cart_view_formats_prices() {
        let mut cart = Cart::new();
        let action = cart
            .plan_add(&product(1, 1250), 2, Variant::default())
            .unwrap();
        cart.apply(action);
        let action = cart
            .plan_add(&product(2, 99), 1, Variant::new(Some("S".into()), None))
            .unwrap();
        cart.apply(action);

        let view = CartView::new(&cart, &CartScope::User(UserId::new(1)));
        assert_eq!(view.scope, "user");
        assert_eq!(view.item_count, 3);
        assert_eq!(view.subtotal, "$25.99");
        assert_eq!(view.items[0].unit_price, "$12.50");
        assert_eq!(view.items[0].line_total, "$25.00");
        assert_eq!(view.items[1].variant.size.as_deref(), Some("S"));
    }

    #[test]
    fn test_empty_cart_view() {
        let view = CartView::new(
            &Cart::new(),
            &CartScope::Guest(corner_shop_core::SessionToken::generate()),
        );
        assert_eq!(view.scope, "guest");
        assert!(view.items.is_empty());
        assert_eq!(view.subtotal, "$0.00");
        assert_eq!(view.item_count, 0);
    }

    #[test]
    fn test_cart_updated_header() {
        let response = cart_updated(Json(CartCount { count: 1 }));
        assert_eq!(
            response.headers().get(HX_TRIGGER).unwrap(),
            CART_UPDATED_EVENT
        );
    }

    #[test]
    fn test_parse_line_id() {
        let id = CartItemId::generate();
        assert_eq!(parse_line_id(&format!(" {id} ")).unwrap(), id);
        assert!(matches!(
            parse_line_id("not-a-uuid"),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_checkout_view() {
        let mut cart = Cart::new();
        cart.apply(CartAction::Upsert(CartItem::new(
            &product(1, 500),
            3,
            Variant::default(),
        )));
        let summary = CheckoutSummary {
            lines: cart.items().to_vec(),
            totals: cart.totals(),
        };
        let view = CheckoutView::from(&summary);
        assert_eq!(view.subtotal, "$15.00");
        assert_eq!(view.item_count, 3);
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.toast.level, crate::services::NotificationLevel::Success);
    }
}
