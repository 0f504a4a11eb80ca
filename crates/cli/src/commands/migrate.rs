//! Database migration command.
//!
//! Migration files live in `crates/storefront/migrations/` and are embedded
//! into the binary at compile time.

use tracing::info;

use corner_shop_storefront::db;

use super::{CommandError, database_url};

/// Run storefront database migrations.
///
/// # Errors
///
/// Returns an error if the database URL is missing, the connection fails,
/// or a migration fails.
pub async fn storefront() -> Result<(), CommandError> {
    let database_url = database_url()?;

    info!("Connecting to storefront database...");
    let pool = db::create_pool(&database_url).await?;

    info!("Running storefront migrations...");
    db::run_migrations(&pool).await?;

    info!("Storefront migrations complete");
    Ok(())
}
