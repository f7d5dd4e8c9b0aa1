//! Canonical user creation.
//!
//! Every user, including the bootstrap account, is created through
//! [`create_user`], which validates the email and hashes the password with
//! Argon2id. Plaintext passwords never reach the repository.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use secrecy::{ExposeSecret, SecretString};
use sqlx::AnyConnection;
use thiserror::Error;
use tracing::{info, instrument};

pub use bazaar_core::document::MIN_PASSWORD_LENGTH;
use bazaar_core::{Email, EmailError, UserId, UserRole};

use crate::db::RepositoryError;
use crate::db::users::{self, CreateUser, User};

/// Errors that can occur while creating a user.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// User already exists.
    #[error("user already exists: {0}")]
    UserAlreadyExists(String),

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

/// A user to create.
#[derive(Debug)]
pub struct NewUser {
    /// Fresh id when `None`.
    pub id: Option<UserId>,
    pub email: String,
    /// Account cannot log in until a password is set when `None`.
    pub password: Option<SecretString>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: UserRole,
    /// JSON object text.
    pub metadata: Option<String>,
}

/// Create a user, hashing the password if one is given.
///
/// # Errors
///
/// Returns `AuthError::InvalidEmail` or `AuthError::WeakPassword` for bad
/// input, `AuthError::UserAlreadyExists` if the email is taken.
#[instrument(skip(conn, new_user), fields(role = %new_user.role))]
pub async fn create_user(conn: &mut AnyConnection, new_user: NewUser) -> Result<User, AuthError> {
    let email = Email::parse(&new_user.email)?;

    let password_hash = match &new_user.password {
        Some(password) => {
            validate_password(password.expose_secret())?;
            Some(hash_password(password.expose_secret())?)
        }
        None => None,
    };

    let params = CreateUser {
        id: new_user.id.unwrap_or_else(UserId::generate),
        email,
        first_name: new_user.first_name,
        last_name: new_user.last_name,
        password_hash,
        role: new_user.role,
        metadata: new_user.metadata,
    };

    let user = users::insert(conn, params).await.map_err(|e| match e {
        RepositoryError::Conflict(msg) => AuthError::UserAlreadyExists(msg),
        other => AuthError::Repository(other),
    })?;

    info!(user_id = %user.id, "User created");
    Ok(user)
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Check a password against a stored PHC hash.
#[must_use]
pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::tests::test_pool;

    fn new_user(email: &str, password: Option<&str>) -> NewUser {
        NewUser {
            id: None,
            email: email.to_owned(),
            password: password.map(SecretString::from),
            first_name: None,
            last_name: None,
            role: UserRole::Member,
            metadata: None,
        }
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        assert!(!verify_password("correct horse", "not-a-hash"));
    }

    #[test]
    fn test_short_password_rejected() {
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("long enough").is_ok());
    }

    #[tokio::test]
    async fn test_create_user_hashes_password() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let user = create_user(&mut conn, new_user("Ada@Example.com", Some("supersecret")))
            .await
            .unwrap();
        assert_eq!(user.email.as_str(), "ada@example.com");

        let stored = users::password_hash(&mut conn, &user.email)
            .await
            .unwrap()
            .unwrap();
        assert_ne!(stored, "supersecret");
        assert!(verify_password("supersecret", &stored));
    }

    #[tokio::test]
    async fn test_create_user_without_password() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let user = create_user(&mut conn, new_user("ada@example.com", None))
            .await
            .unwrap();
        assert!(
            users::password_hash(&mut conn, &user.email)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_create_user_errors() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        assert!(matches!(
            create_user(&mut conn, new_user("nope", None)).await,
            Err(AuthError::InvalidEmail(_))
        ));
        assert!(matches!(
            create_user(&mut conn, new_user("ada@example.com", Some("short"))).await,
            Err(AuthError::WeakPassword(_))
        ));

        create_user(&mut conn, new_user("ada@example.com", None))
            .await
            .unwrap();
        assert!(matches!(
            create_user(&mut conn, new_user("ada@example.com", None)).await,
            Err(AuthError::UserAlreadyExists(_))
        ));
    }
}
