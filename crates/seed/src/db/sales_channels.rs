//! Sales channel queries.

use sqlx::AnyConnection;
use tracing::{debug, instrument};

use bazaar_core::SalesChannelId;

use super::{RepositoryError, write_error};

/// Find the id of the sales channel called `name`.
///
/// Channels are not unique by name; the oldest one wins.
///
/// # Errors
///
/// Returns error if the query fails.
pub async fn find_id_by_name(
    conn: &mut AnyConnection,
    name: &str,
) -> Result<Option<SalesChannelId>, RepositoryError> {
    let id: Option<String> = sqlx::query_scalar(
        r"
        SELECT id FROM sales_channels
        WHERE name = $1
        ORDER BY created_at, id
        LIMIT 1
        ",
    )
    .bind(name)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(id.map(SalesChannelId::from_raw))
}

/// Insert a sales channel.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the id is taken.
#[instrument(skip(conn))]
pub async fn create(
    conn: &mut AnyConnection,
    name: &str,
    description: Option<&str>,
) -> Result<SalesChannelId, RepositoryError> {
    let id = SalesChannelId::generate();

    sqlx::query(
        r"
        INSERT INTO sales_channels (id, name, description)
        VALUES ($1, $2, $3)
        ",
    )
    .bind(id.as_str())
    .bind(name)
    .bind(description)
    .execute(&mut *conn)
    .await
    .map_err(|e| write_error("sales channel", e))?;

    debug!(id = %id, "Created sales channel");
    Ok(id)
}
