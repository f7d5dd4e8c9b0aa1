//! Seed the database from a JSON document.
//!
//! # Usage
//!
//! ```bash
//! bazaar seed --seed-file data/seed.json
//! bazaar seed --directory ../shop --migrate --seed-file data/seed.json
//! ```
//!
//! # Environment Variables
//!
//! - `SEED_DATABASE_URL` / `DATABASE_URL` - Connection string
//! - `BOOTSTRAP_ADMIN_EMAIL`, `BOOTSTRAP_ADMIN_PASSWORD` - Bootstrap account
//!
//! See `bazaar_seed::config` for the full list.

use std::path::Path;

use tracing::{info, warn};

use bazaar_seed::{SeedConfig, SeedError, SeedImporter, db, ensure_defaults, resolve_seed_path};

/// Run the seed command.
///
/// The seed file is located before anything else, so a missing file fails
/// without touching the database.
///
/// # Errors
///
/// Returns `SeedError` if the file is missing, configuration is invalid, or
/// the import fails. A Ctrl-C before commit yields `SeedError::Interrupted`.
pub async fn run(directory: &Path, seed_file: &Path, migrate: bool) -> Result<(), SeedError> {
    let path = resolve_seed_path(directory, seed_file)?;
    let config = SeedConfig::from_env(directory)?;

    info!(backend = %config.database_type, "Connecting to database");
    let pool = db::create_pool(&config.database_url, config.max_connections).await?;

    if migrate {
        db::migrate(&pool, config.database_type).await?;
        info!("Migrations completed");
    }

    ensure_defaults(&pool, config.database_type).await?;

    let importer = SeedImporter::new(&pool, &config.options);
    let summary = tokio::select! {
        result = importer.run(&path) => result?,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, rolling back");
            return Err(SeedError::Interrupted);
        }
    };

    info!("Seeding complete!");
    info!("  Users: {}", summary.users);
    info!("  Regions: {}", summary.regions);
    info!("  Shipping options: {}", summary.shipping_options);
    info!("  Products: {} ({} variants)", summary.products, summary.variants);
    if summary.categories_skipped {
        info!("  Categories: skipped ({} backend)", config.database_type);
    } else {
        info!("  Categories: {}", summary.categories);
    }
    if summary.bootstrap_created {
        info!("  Bootstrap account created");
    }

    pool.close().await;
    Ok(())
}
