//! Product route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use corner_shop_core::{CurrencyCode, Price, Product, ProductId};

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Products per listing page.
const PRODUCTS_PER_PAGE: u32 = 24;

/// Product display data.
#[derive(Debug, Clone, Serialize)]
pub struct ProductView {
    pub id: ProductId,
    pub name: String,
    pub price: String,
    pub price_amount: Decimal,
    pub image: Option<String>,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            price: Price::new(product.price, CurrencyCode::USD).to_string(),
            price_amount: product.price,
            image: product.image.clone(),
        }
    }
}

/// Pagination query parameters.
#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    pub page: Option<u32>,
}

/// One page of the product listing.
#[derive(Debug, Serialize)]
pub struct ProductPage {
    pub products: Vec<ProductView>,
    pub current_page: u32,
    pub has_more_pages: bool,
}

/// List active products.
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<ProductPage>> {
    let current_page = query.page.unwrap_or(1).max(1);
    let offset = i64::from(current_page - 1) * i64::from(PRODUCTS_PER_PAGE);

    // One extra row tells us whether another page exists.
    let products = state
        .catalog()
        .products(i64::from(PRODUCTS_PER_PAGE) + 1, offset)
        .await?;
    let has_more_pages = products.len() > PRODUCTS_PER_PAGE as usize;

    Ok(Json(ProductPage {
        products: products
            .iter()
            .take(PRODUCTS_PER_PAGE as usize)
            .map(ProductView::from)
            .collect(),
        current_page,
        has_more_pages,
    }))
}

/// Show one product.
pub async fn show(State(state): State<AppState>, Path(id): Path<i32>) -> Result<Json<ProductView>> {
    let product = state
        .catalog()
        .product(ProductId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    Ok(Json(ProductView::from(&product)))
}
