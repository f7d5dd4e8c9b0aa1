//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! bazaar migrate
//! bazaar migrate --directory ../shop
//! ```
//!
//! Migrations live in `crates/seed/migrations/{postgres,sqlite}`; the set is
//! picked from the configured backend.

use std::path::Path;

use tracing::info;

use bazaar_seed::{SeedConfig, SeedError, db};

/// Apply the migrations for the configured backend.
///
/// # Errors
///
/// Returns `SeedError` if configuration is invalid, the database is
/// unreachable, or a migration fails.
pub async fn run(directory: &Path) -> Result<(), SeedError> {
    let config = SeedConfig::from_env(directory)?;

    info!(backend = %config.database_type, "Connecting to database...");
    let pool = db::create_pool(&config.database_url, config.max_connections).await?;

    info!("Running migrations...");
    db::migrate(&pool, config.database_type).await?;

    info!("Migrations complete!");
    pool.close().await;
    Ok(())
}
