//! Seeding error types.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use bazaar_core::ShippingProfileKind;

use crate::auth::AuthError;
use crate::config::ConfigError;
use crate::db::RepositoryError;

/// Errors that can end a seeding run.
///
/// Anything raised after the transaction opens rolls it back.
#[derive(Debug, Error)]
pub enum SeedError {
    /// The seed file exists neither as given nor under the project directory.
    #[error(
        "could not find a seed file at {} (resolved path: {})",
        .seed_file.display(),
        .resolved.display()
    )]
    FileNotFound { seed_file: PathBuf, resolved: PathBuf },

    /// Configuration is missing or invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The seed file could not be read.
    #[error("failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    /// The seed file is not valid JSON or does not match the document shape.
    #[error("malformed seed document: {0}")]
    Parse(#[from] serde_json::Error),

    /// The document parsed but failed validation.
    #[error("invalid seed document: {}", .0.join("; "))]
    InvalidDocument(Vec<String>),

    /// A built-in shipping profile does not exist.
    #[error("missing {0} shipping profile")]
    MissingShippingProfile(ShippingProfileKind),

    /// There is no default store to update.
    #[error("default store not found")]
    StoreNotFound,

    /// The sales channel the bootstrap stores link to does not exist.
    #[error("sales channel not found: {0}")]
    SalesChannelNotFound(String),

    /// A write was rejected by a unique or foreign-key constraint.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// A variant selects a value for an option axis its product lacks.
    #[error("product '{product}': variant {index} has an option value with no matching option")]
    UnmatchedVariantOption { product: String, index: usize },

    /// Stored data could not be interpreted.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// User creation failed for a reason other than a constraint.
    #[error("user creation failed: {0}")]
    Auth(AuthError),

    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migrations failed.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The transaction did not finish in time.
    #[error("seed transaction timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The run was cancelled before commit.
    #[error("seeding interrupted")]
    Interrupted,
}

impl From<RepositoryError> for SeedError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Database(e) => Self::Database(e),
            RepositoryError::Conflict(msg) => Self::ConstraintViolation(msg),
            RepositoryError::NotFound => Self::ConstraintViolation("referenced row not found".to_owned()),
            RepositoryError::DataCorruption(msg) => Self::DataCorruption(msg),
        }
    }
}

impl From<AuthError> for SeedError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::UserAlreadyExists(msg) => Self::ConstraintViolation(msg),
            AuthError::Repository(e) => e.into(),
            other => Self::Auth(other),
        }
    }
}
