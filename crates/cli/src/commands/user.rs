//! User management commands.
//!
//! # Usage
//!
//! ```bash
//! bazaar user create -e admin@example.com -p 'correct horse' -r admin
//! ```

use std::path::Path;

use secrecy::SecretString;
use thiserror::Error;
use tracing::{info, warn};

use bazaar_core::{UserId, UserRole};
use bazaar_seed::auth::{self, AuthError, NewUser};
use bazaar_seed::db::{self, RepositoryError};
use bazaar_seed::{ConfigError, SeedConfig};

/// Errors that can occur during user operations.
#[derive(Debug, Error)]
pub enum UserCommandError {
    /// Configuration is missing or invalid.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Invalid role.
    #[error("Invalid role: {0}. Valid roles: admin, member, developer")]
    InvalidRole(String),

    /// User creation failed.
    #[error("{0}")]
    Auth(#[from] AuthError),
}

/// Arguments of `user create`.
pub struct CreateArgs {
    pub email: String,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: String,
}

/// Create a new user.
///
/// # Returns
///
/// The ID of the created user.
///
/// # Errors
///
/// Returns `UserCommandError` if the role is unknown, the email or password
/// is invalid, or the email is already taken.
pub async fn create(directory: &Path, args: CreateArgs) -> Result<UserId, UserCommandError> {
    let role: UserRole = args
        .role
        .parse()
        .map_err(|_| UserCommandError::InvalidRole(args.role.clone()))?;

    let config = SeedConfig::from_env(directory)?;

    info!("Connecting to database...");
    let pool = db::create_pool(&config.database_url, config.max_connections)
        .await
        .map_err(RepositoryError::from)?;
    let mut conn = pool.acquire().await.map_err(RepositoryError::from)?;

    let has_password = args.password.is_some();
    let user = auth::create_user(
        &mut conn,
        NewUser {
            id: None,
            email: args.email,
            password: args.password.map(SecretString::from),
            first_name: args.first_name,
            last_name: args.last_name,
            role,
            metadata: None,
        },
    )
    .await?;

    info!(
        "User created successfully! ID: {}, Email: {}, Role: {}",
        user.id, user.email, user.role
    );
    if !has_password {
        warn!("Note: User has no password and cannot log in until one is set.");
    }

    drop(conn);
    pool.close().await;
    Ok(user.id)
}
