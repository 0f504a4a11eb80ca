//! Authentication route handlers.
//!
//! Signing in moves the session's guest cart into the user's cart. Signing
//! out leaves the user's cart in the database and starts a fresh guest cart.

use axum::{Form, Json, extract::State};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use crate::error::{Result, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequireAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::routes::cart::{CartView, open_cart};
use crate::services::auth::{AuthError, AuthService};
use crate::services::cart::MergeOutcome;
use crate::state::AppState;

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

/// Response to a successful sign-in.
#[derive(Debug, Serialize)]
pub struct SignedIn {
    pub user: CurrentUser,
    /// Number of guest lines moved into the user's cart.
    pub merged_lines: usize,
    /// Absent when the cart could not be loaded; the sign-in still stands.
    pub cart: Option<CartView>,
}

/// Response to a sign-out.
#[derive(Debug, Serialize)]
pub struct SignedOut {
    pub cart: CartView,
}

/// Register a new account and sign it in.
#[instrument(skip(state, session, form))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<Json<SignedIn>> {
    if form.password != form.password_confirm {
        return Err(AuthError::PasswordMismatch.into());
    }

    let user = AuthService::new(state.pool())
        .register_with_password(&form.email, &form.password)
        .await?;
    info!(user_id = %user.id, "user registered");

    sign_in(&state, session, &user).await.map(Json)
}

/// Sign in with email and password.
#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Json<SignedIn>> {
    let user = AuthService::new(state.pool())
        .login_with_password(&form.email, &form.password)
        .await?;

    sign_in(&state, session, &user).await.map(Json)
}

/// Sign out and continue with the session's guest cart.
///
/// The user's stored cart is left alone and never read here.
#[instrument(skip(state, session))]
pub async fn logout(State(state): State<AppState>, session: Session) -> Result<Json<SignedOut>> {
    clear_current_user(&session).await?;
    clear_sentry_user();

    let cart = open_cart(&state, session, None).await?;

    add_breadcrumb("auth", "Signed out", None);
    Ok(Json(SignedOut {
        cart: CartView::new(cart.cart(), cart.scope()),
    }))
}

/// The signed-in user, re-read from the database.
pub async fn me(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CurrentUser>> {
    let user = AuthService::new(state.pool()).get_user(user.id).await?;
    Ok(Json(CurrentUser::from(&user)))
}

/// Record `user` in the session, then merge the guest cart.
///
/// Cart failures are logged and never undo the sign-in.
async fn sign_in(state: &AppState, session: Session, user: &User) -> Result<SignedIn> {
    let current = CurrentUser::from(user);
    set_current_user(&session, &current).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    add_breadcrumb("auth", "Signed in", None);

    let (merged_lines, cart) = match open_cart(state, session, None).await {
        Ok(mut cart) => {
            let merged = match cart.sign_in(user.id).await {
                Ok(MergeOutcome::Merged { lines }) => lines,
                Ok(MergeOutcome::NothingToMerge | MergeOutcome::Skipped) => 0,
                Err(e) => {
                    warn!(user_id = %user.id, error = %e, "cart unavailable after sign-in");
                    return Ok(SignedIn {
                        user: current,
                        merged_lines: 0,
                        cart: None,
                    });
                }
            };
            (merged, Some(CartView::new(cart.cart(), cart.scope())))
        }
        Err(e) => {
            warn!(user_id = %user.id, error = %e, "guest cart unavailable at sign-in");
            (0, None)
        }
    };

    Ok(SignedIn {
        user: current,
        merged_lines,
        cart,
    })
}
