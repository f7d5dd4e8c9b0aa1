//! Product category repository.

use sqlx::AnyConnection;
use tracing::{debug, instrument};

use bazaar_core::CategoryId;

use super::{RepositoryError, write_error};

/// Parameters for inserting a category.
#[derive(Debug)]
pub struct CreateCategory {
    pub id: CategoryId,
    pub name: String,
    pub handle: String,
    pub description: Option<String>,
    pub parent_category_id: Option<CategoryId>,
    pub is_active: bool,
    pub is_internal: bool,
    /// Position among siblings.
    pub rank: i64,
    /// JSON object text.
    pub metadata: Option<String>,
}

/// A category row, as read back for verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub handle: String,
    pub parent_category_id: Option<CategoryId>,
    pub rank: i64,
}

/// Insert a category.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the handle is taken or the parent
/// does not exist.
#[instrument(skip(conn, params), fields(handle = %params.handle))]
pub async fn create(conn: &mut AnyConnection, params: CreateCategory) -> Result<CategoryId, RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO product_categories
            (id, name, handle, description, parent_category_id, is_active, is_internal, rank, metadata)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ",
    )
    .bind(params.id.as_str())
    .bind(&params.name)
    .bind(&params.handle)
    .bind(params.description.as_deref())
    .bind(params.parent_category_id.as_ref().map(CategoryId::as_str))
    .bind(params.is_active)
    .bind(params.is_internal)
    .bind(params.rank)
    .bind(params.metadata.as_deref())
    .execute(&mut *conn)
    .await
    .map_err(|e| write_error("product category", e))?;

    debug!(id = %params.id, "Created category");
    Ok(params.id)
}

/// All categories, parents before children within each level.
///
/// # Errors
///
/// Returns error if the query fails.
pub async fn list(conn: &mut AnyConnection) -> Result<Vec<Category>, RepositoryError> {
    let rows: Vec<(String, String, String, Option<String>, i64)> = sqlx::query_as(
        r"
        SELECT id, name, handle, parent_category_id, rank
        FROM product_categories
        ORDER BY rank, id
        ",
    )
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, name, handle, parent, rank)| Category {
            id: CategoryId::from_raw(id),
            name,
            handle,
            parent_category_id: parent.map(CategoryId::from_raw),
            rank,
        })
        .collect())
}

/// Number of categories matching both visibility flags.
///
/// # Errors
///
/// Returns error if the query fails.
pub async fn count_with_flags(
    conn: &mut AnyConnection,
    is_active: bool,
    is_internal: bool,
) -> Result<i64, RepositoryError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM product_categories WHERE is_active = $1 AND is_internal = $2",
    )
    .bind(is_active)
    .bind(is_internal)
    .fetch_one(&mut *conn)
    .await?;
    Ok(count)
}
