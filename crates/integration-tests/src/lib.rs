//! Integration tests for Bazaar.
//!
//! Every test runs against its own in-memory SQLite database, so no external
//! services are needed:
//!
//! ```bash
//! cargo test -p bazaar-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `seed_import` - Full documents imported end to end
//! - `seed_atomicity` - Failed runs leave nothing behind
//! - `bootstrap` - The bootstrap account is created once
//! - `categories` - Category tree shape and the backend gate
//! - `seed_file` - Seed file resolution and parsing

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use sqlx::AnyPool;

use bazaar_seed::db::{self, DatabaseType};
use bazaar_seed::{IdentifierGenerator, SeedError, ensure_defaults};

/// Tables written by a seeding run that start out empty.
///
/// `stores` and `store_currencies` already hold the default store, so tests
/// compare those against a snapshot instead.
pub const SEEDED_TABLES: &[&str] = &[
    "users",
    "user_stores",
    "regions",
    "region_countries",
    "shipping_options",
    "products",
    "product_options",
    "product_variants",
    "product_option_values",
    "money_amounts",
    "product_categories",
];

/// A migrated in-memory database.
///
/// # Errors
///
/// Returns error if the database cannot be created or migrated.
pub async fn empty_pool() -> Result<AnyPool, SeedError> {
    let pool = db::memory_pool().await?;
    db::migrate(&pool, DatabaseType::Sqlite).await?;
    Ok(pool)
}

/// A migrated in-memory database with the default entities in place.
///
/// # Errors
///
/// Returns error if setup fails.
pub async fn seeded_pool() -> Result<AnyPool, SeedError> {
    let pool = empty_pool().await?;
    ensure_defaults(&pool, DatabaseType::Sqlite).await?;
    Ok(pool)
}

/// Path of a file under `tests/fixtures`.
#[must_use]
pub fn fixture_path(name: &str) -> PathBuf {
    fixtures_dir().join(name)
}

/// The `tests/fixtures` directory.
#[must_use]
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

/// Row count of a table.
///
/// # Errors
///
/// Returns error if the query fails.
pub async fn count(pool: &AnyPool, table: &str) -> Result<i64, SeedError> {
    let mut conn = pool.acquire().await?;
    Ok(db::count_rows(&mut conn, table).await?)
}

/// Row counts of every table a seeding run writes.
///
/// # Errors
///
/// Returns error if a query fails.
pub async fn seeded_counts(pool: &AnyPool) -> Result<Vec<(&'static str, i64)>, SeedError> {
    let mut counts = Vec::with_capacity(SEEDED_TABLES.len());
    for table in SEEDED_TABLES {
        counts.push((*table, count(pool, table).await?));
    }
    Ok(counts)
}

/// Deterministic identifiers: `boot0`, `boot1`, ...
#[derive(Debug, Default)]
pub struct SequentialIds(AtomicUsize);

impl IdentifierGenerator for SequentialIds {
    fn next_id(&self) -> String {
        format!("boot{}", self.0.fetch_add(1, Ordering::SeqCst))
    }
}
