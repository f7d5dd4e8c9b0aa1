//! User repository.
//!
//! Inserts take an already-hashed password. Hashing lives in
//! [`crate::auth::create_user`], which is the only caller that should build a
//! [`CreateUser`].

use sqlx::AnyConnection;
use tracing::{debug, instrument};

use bazaar_core::{Email, UserId, UserRole};

use super::{RepositoryError, write_error};

/// A user row, without its password hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: UserRole,
}

/// Parameters for inserting a user.
#[derive(Debug)]
pub struct CreateUser {
    pub id: UserId,
    pub email: Email,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Argon2 PHC string, or `None` for accounts that cannot log in yet.
    pub password_hash: Option<String>,
    pub role: UserRole,
    /// JSON object text.
    pub metadata: Option<String>,
}

type UserRow = (String, String, Option<String>, Option<String>, String);

/// Insert a user.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the email already exists.
#[instrument(skip(conn, params), fields(id = %params.id))]
pub async fn insert(conn: &mut AnyConnection, params: CreateUser) -> Result<User, RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO users (id, email, first_name, last_name, password_hash, role, metadata)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ",
    )
    .bind(params.id.as_str())
    .bind(params.email.as_str())
    .bind(params.first_name.as_deref())
    .bind(params.last_name.as_deref())
    .bind(params.password_hash.as_deref())
    .bind(params.role.as_str())
    .bind(params.metadata.as_deref())
    .execute(&mut *conn)
    .await
    .map_err(|e| write_error("user", e))?;

    debug!("Inserted user");
    Ok(User {
        id: params.id,
        email: params.email,
        first_name: params.first_name,
        last_name: params.last_name,
        role: params.role,
    })
}

/// Get a user by email address.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
/// Returns `RepositoryError::DataCorruption` if a stored value is invalid.
pub async fn get_by_email(
    conn: &mut AnyConnection,
    email: &Email,
) -> Result<Option<User>, RepositoryError> {
    let row: Option<UserRow> = sqlx::query_as(
        r"
        SELECT id, email, first_name, last_name, role
        FROM users
        WHERE email = $1
        ",
    )
    .bind(email.as_str())
    .fetch_optional(&mut *conn)
    .await?;

    let Some((id, email, first_name, last_name, role)) = row else {
        return Ok(None);
    };

    let email = Email::parse(&email)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid email in database: {e}")))?;
    let role = role
        .parse::<UserRole>()
        .map_err(RepositoryError::DataCorruption)?;

    Ok(Some(User {
        id: UserId::from_raw(id),
        email,
        first_name,
        last_name,
        role,
    }))
}

/// Whether a user with this email exists.
///
/// # Errors
///
/// Returns error if the query fails.
pub async fn exists_by_email(
    conn: &mut AnyConnection,
    email: &Email,
) -> Result<bool, RepositoryError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = $1")
        .bind(email.as_str())
        .fetch_one(&mut *conn)
        .await?;
    Ok(count > 0)
}

/// Stored password hash for a user, if any.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if no user has this email.
pub async fn password_hash(
    conn: &mut AnyConnection,
    email: &Email,
) -> Result<Option<String>, RepositoryError> {
    let row: Option<(Option<String>,)> =
        sqlx::query_as("SELECT password_hash FROM users WHERE email = $1")
            .bind(email.as_str())
            .fetch_optional(&mut *conn)
            .await?;
    row.map(|(hash,)| hash).ok_or(RepositoryError::NotFound)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::tests::test_pool;

    fn params(email: &str) -> CreateUser {
        CreateUser {
            id: UserId::generate(),
            email: Email::parse(email).unwrap(),
            first_name: Some("Ada".to_owned()),
            last_name: None,
            password_hash: None,
            role: UserRole::Admin,
            metadata: None,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let created = insert(&mut conn, params("ada@example.com")).await.unwrap();
        let email = Email::parse("ada@example.com").unwrap();

        assert!(exists_by_email(&mut conn, &email).await.unwrap());
        let found = get_by_email(&mut conn, &email).await.unwrap().unwrap();
        assert_eq!(found, created);
        assert_eq!(found.role, UserRole::Admin);
        assert!(password_hash(&mut conn, &email).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_a_conflict() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        insert(&mut conn, params("ada@example.com")).await.unwrap();
        let result = insert(&mut conn, params("ada@example.com")).await;
        assert!(matches!(result, Err(RepositoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_missing_user() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let email = Email::parse("nobody@example.com").unwrap();

        assert!(!exists_by_email(&mut conn, &email).await.unwrap());
        assert!(get_by_email(&mut conn, &email).await.unwrap().is_none());
        assert!(matches!(
            password_hash(&mut conn, &email).await,
            Err(RepositoryError::NotFound)
        ));
    }
}
