//! Database access for seeding.
//!
//! One code path serves both backends through the `sqlx` `Any` driver. Every
//! repository function takes `&mut AnyConnection`, so callers pass either a
//! pooled connection or an open transaction (`&mut *tx`).
//!
//! # Tables
//!
//! - `sales_channels`, `stores`, `store_currencies`, `users`, `user_stores`
//! - `regions` and its country/provider link tables
//! - `shipping_profiles`, `shipping_options`
//! - `products`, `product_images`, `product_sales_channels`, `product_options`,
//!   `product_variants`, `product_option_values`, `money_amounts`
//! - `product_categories`
//!
//! # Migrations
//!
//! Each backend has its own migration set under `crates/seed/migrations/`:
//! ```bash
//! bazaar migrate
//! ```

pub mod categories;
pub mod products;
pub mod regions;
pub mod sales_channels;
pub mod shipping;
pub mod stores;
pub mod users;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use sqlx::any::AnyPoolOptions;
use sqlx::{Any, AnyConnection, AnyPool, Transaction};
use thiserror::Error;
use tracing::{debug, instrument};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (unique or foreign key).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map a failed write to `Conflict` when a constraint rejected it.
pub(crate) fn write_error(entity: &str, err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return RepositoryError::Conflict(format!("duplicate {entity}: {}", db.message()));
        }
        if db.is_foreign_key_violation() {
            return RepositoryError::Conflict(format!(
                "{entity} references a missing row: {}",
                db.message()
            ));
        }
        if db.is_check_violation() {
            return RepositoryError::Conflict(format!("invalid {entity}: {}", db.message()));
        }
    }
    RepositoryError::Database(err)
}

/// Serialize optional metadata for a TEXT column.
pub(crate) fn json_text(
    value: Option<&serde_json::Map<String, serde_json::Value>>,
) -> Result<Option<String>, RepositoryError> {
    value
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| RepositoryError::DataCorruption(format!("unserializable metadata: {e}")))
}

/// Storage backend behind the connection URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseType {
    Postgres,
    /// Embedded, lightweight mode.
    Sqlite,
}

impl DatabaseType {
    /// Infer the backend from a connection URL scheme.
    #[must_use]
    pub fn from_url(url: &str) -> Option<Self> {
        let scheme = url.split(':').next()?;
        match scheme {
            "postgres" | "postgresql" => Some(Self::Postgres),
            "sqlite" => Some(Self::Sqlite),
            _ => None,
        }
    }

    /// Whether the backend stores the product category tree.
    #[must_use]
    pub const fn supports_category_tree(self) -> bool {
        matches!(self, Self::Postgres)
    }

    /// Name used in configuration and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatabaseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(format!("unsupported database type '{other}'")),
        }
    }
}

/// Create a connection pool for either backend.
///
/// # Arguments
///
/// * `database_url` - Connection string (wrapped in `SecretString`)
/// * `max_connections` - Upper bound on pooled connections
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(
    database_url: &SecretString,
    max_connections: u32,
) -> Result<AnyPool, sqlx::Error> {
    sqlx::any::install_default_drivers();

    AnyPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Open a single-connection in-memory SQLite pool.
///
/// The connection is never recycled, so the database lives as long as the pool.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn memory_pool() -> Result<AnyPool, sqlx::Error> {
    sqlx::any::install_default_drivers();

    AnyPoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
}

/// Apply the migration set for `database_type`.
///
/// # Errors
///
/// Returns `MigrateError` if a migration fails or the history is inconsistent.
#[instrument(skip(pool))]
pub async fn migrate(
    pool: &AnyPool,
    database_type: DatabaseType,
) -> Result<(), sqlx::migrate::MigrateError> {
    match database_type {
        DatabaseType::Postgres => sqlx::migrate!("./migrations/postgres").run(pool).await?,
        DatabaseType::Sqlite => sqlx::migrate!("./migrations/sqlite").run(pool).await?,
    }
    debug!("Migrations applied");
    Ok(())
}

/// Begin a transaction for a seeding run.
///
/// On `PostgreSQL` the transaction is raised to `SERIALIZABLE`, so existence
/// checks inside it cannot race a concurrent writer. SQLite transactions are
/// already serializable.
///
/// # Errors
///
/// Returns `sqlx::Error` if the transaction cannot be opened.
pub async fn begin_seed_transaction(
    pool: &AnyPool,
    database_type: DatabaseType,
) -> Result<Transaction<'static, Any>, sqlx::Error> {
    let mut tx = pool.begin().await?;
    if database_type == DatabaseType::Postgres {
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await?;
    }
    Ok(tx)
}

/// Count rows of `table`. Only for fixed table names.
///
/// # Errors
///
/// Returns error if the query fails.
pub async fn count_rows(conn: &mut AnyConnection, table: &str) -> Result<i64, RepositoryError> {
    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    /// Migrated in-memory SQLite pool for repository tests.
    pub(crate) async fn test_pool() -> AnyPool {
        let pool = memory_pool().await.unwrap();
        migrate(&pool, DatabaseType::Sqlite).await.unwrap();
        pool
    }

    #[test]
    fn test_database_type_from_url() {
        assert_eq!(
            DatabaseType::from_url("postgres://localhost/bazaar"),
            Some(DatabaseType::Postgres)
        );
        assert_eq!(
            DatabaseType::from_url("postgresql://u:p@h/db"),
            Some(DatabaseType::Postgres)
        );
        assert_eq!(
            DatabaseType::from_url("sqlite::memory:"),
            Some(DatabaseType::Sqlite)
        );
        assert_eq!(DatabaseType::from_url("mysql://localhost/db"), None);
    }

    #[test]
    fn test_category_tree_gate() {
        assert!(DatabaseType::Postgres.supports_category_tree());
        assert!(!DatabaseType::Sqlite.supports_category_tree());
    }

    #[test]
    fn test_database_type_parse() {
        assert_eq!("sqlite".parse::<DatabaseType>().unwrap(), DatabaseType::Sqlite);
        assert!("oracle".parse::<DatabaseType>().is_err());
    }

    #[tokio::test]
    async fn test_migrations_create_schema() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        for table in ["stores", "users", "regions", "products", "product_categories"] {
            assert_eq!(count_rows(&mut conn, table).await.unwrap(), 0, "{table}");
        }
    }

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let pool = test_pool().await;
        migrate(&pool, DatabaseType::Sqlite).await.unwrap();
    }
}
