//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Health check
//! GET  /health/ready           - Readiness check (database)
//!
//! # Products
//! GET  /products               - Product listing (?page=N)
//! GET  /products/{id}          - Product detail
//!
//! # Cart (JSON, success fires HX-Trigger: cart-updated)
//! GET  /cart                   - Cart contents and totals
//! GET  /cart/count             - Cart count badge
//! POST /cart/add               - Add to cart
//! POST /cart/update            - Update quantity (<= 0 removes)
//! POST /cart/remove            - Remove line
//! POST /cart/clear             - Empty cart
//!
//! # Checkout
//! POST /checkout               - Summarize and empty the cart
//!
//! # Auth
//! POST /auth/register          - Register and sign in
//! POST /auth/login             - Sign in (merges the guest cart)
//! POST /auth/logout            - Sign out
//! GET  /auth/me                - Signed-in user
//! ```

pub mod auth;
pub mod cart;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::{auth_rate_limiter, cart_rate_limiter};
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .layer(auth_rate_limiter())
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/count", get(cart::count))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .layer(cart_rate_limiter())
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .route(
            "/checkout",
            post(cart::checkout).layer(cart_rate_limiter()),
        )
        .nest("/auth", auth_routes())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use super::*;
    use crate::config::{LogFormat, StorefrontConfig};
    use crate::error::HX_TRIGGER;

    /// State whose pool never connects; only routes that reject before
    /// touching the database can be exercised.
    pub(super) fn offline_state() -> AppState {
        let config = StorefrontConfig {
            database_url: "postgres://localhost/corner_shop_test".into(),
            host: [127, 0, 0, 1].into(),
            port: 3000,
            base_url: "http://localhost:3000".parse().unwrap(),
            session_secret: "test-secret".into(),
            log_format: LogFormat::Pretty,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        };
        let pool = PgPoolOptions::new()
            .acquire_timeout(std::time::Duration::from_millis(500))
            .connect_lazy("postgres://corner_shop@127.0.0.1:1/corner_shop_test")
            .unwrap();
        AppState::new(config, pool)
    }

    #[tokio::test]
    async fn test_me_requires_sign_in() {
        let app = routes().with_state(offline_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/auth/me")
                    .header("x-real-ip", "203.0.113.5")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(HX_TRIGGER));

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["toast"]["level"], "error");
        assert_eq!(body["toast"]["message"], "Please sign in to continue");
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let app = routes().with_state(offline_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/collections")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
