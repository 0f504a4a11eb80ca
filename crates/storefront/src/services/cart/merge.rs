//! Moving a guest cart into a user's cart on sign-in.
//!
//! Lines are copied as-is. A line for a product and variant the user already
//! has becomes a second line rather than being combined with the first.
//! Saves are upserts by line ID, so re-running a merge that failed half way
//! does not duplicate the lines it already copied.

use tracing::{info, instrument};

use corner_shop_core::UserId;

use super::guest::GuestCart;
use super::rows::CartRows;
use super::storage::KeyValueStore;
use super::user::UserCart;
use super::{CartPersistence, CartServiceError};

/// What a merge did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The guest cart was empty; nothing was touched.
    NothingToMerge,
    /// `lines` guest lines were copied and the guest scope discarded.
    Merged { lines: usize },
    /// The merge failed and was skipped; the guest cart is left in place.
    Skipped,
}

/// Copy every guest line into `user_id`'s cart, then discard the guest scope.
///
/// # Errors
///
/// Returns the first storage or row failure. Lines saved before the failure
/// stay in the user's cart and the guest scope is kept.
#[instrument(skip(store, rows))]
pub async fn merge_guest_cart<K: KeyValueStore, R: CartRows>(
    store: &K,
    rows: &R,
    user_id: UserId,
) -> Result<MergeOutcome, CartServiceError> {
    let guest = GuestCart::new(store);
    let lines = guest.load().await?;
    if lines.is_empty() {
        return Ok(MergeOutcome::NothingToMerge);
    }

    let user = UserCart::new(rows, user_id);
    for line in &lines {
        user.save_line(line).await?;
    }
    guest.discard().await?;

    info!(lines = lines.len(), "merged guest cart");
    Ok(MergeOutcome::Merged { lines: lines.len() })
}
