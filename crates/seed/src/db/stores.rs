//! Store queries.
//!
//! The store flagged `is_default` is the singleton the application runs
//! against. Other rows are created by the bootstrap block and linked to their
//! owner through `user_stores`.

use sqlx::AnyConnection;
use tracing::{debug, instrument};

use bazaar_core::document::StoreAttrs;
use bazaar_core::{SalesChannelId, StoreId, UserId};

use super::{RepositoryError, json_text, write_error};

/// A store row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Store {
    pub id: StoreId,
    pub name: String,
    pub default_currency_code: String,
    pub default_sales_channel_id: Option<SalesChannelId>,
}

/// Parameters for inserting a store.
#[derive(Debug)]
pub struct CreateStore {
    pub id: StoreId,
    pub name: String,
    pub default_currency_code: String,
    pub default_sales_channel_id: Option<SalesChannelId>,
    /// Marks the singleton store.
    pub is_default: bool,
}

type StoreRow = (String, String, String, Option<String>);

fn from_row((id, name, default_currency_code, channel): StoreRow) -> Store {
    Store {
        id: StoreId::from_raw(id),
        name,
        default_currency_code,
        default_sales_channel_id: channel.map(SalesChannelId::from_raw),
    }
}

/// Retrieve the singleton store.
///
/// # Errors
///
/// Returns error if the query fails.
pub async fn find_default(conn: &mut AnyConnection) -> Result<Option<Store>, RepositoryError> {
    let row: Option<StoreRow> = sqlx::query_as(
        r"
        SELECT id, name, default_currency_code, default_sales_channel_id
        FROM stores
        WHERE is_default = $1
        ",
    )
    .bind(true)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(from_row))
}

/// Get a store by id.
///
/// # Errors
///
/// Returns error if the query fails.
pub async fn get(conn: &mut AnyConnection, id: &StoreId) -> Result<Option<Store>, RepositoryError> {
    let row: Option<StoreRow> = sqlx::query_as(
        r"
        SELECT id, name, default_currency_code, default_sales_channel_id
        FROM stores
        WHERE id = $1
        ",
    )
    .bind(id.as_str())
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(from_row))
}

/// Insert a store and record its default currency.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the id is taken or the sales
/// channel does not exist.
#[instrument(skip(conn, params), fields(name = %params.name))]
pub async fn create(conn: &mut AnyConnection, params: CreateStore) -> Result<Store, RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO stores (id, name, default_currency_code, default_sales_channel_id, is_default)
        VALUES ($1, $2, $3, $4, $5)
        ",
    )
    .bind(params.id.as_str())
    .bind(&params.name)
    .bind(&params.default_currency_code)
    .bind(params.default_sales_channel_id.as_ref().map(SalesChannelId::as_str))
    .bind(params.is_default)
    .execute(&mut *conn)
    .await
    .map_err(|e| write_error("store", e))?;

    add_currency(conn, &params.id, &params.default_currency_code).await?;

    debug!(id = %params.id, "Created store");
    Ok(Store {
        id: params.id,
        name: params.name,
        default_currency_code: params.default_currency_code,
        default_sales_channel_id: params.default_sales_channel_id,
    })
}

/// Apply the provided attributes to a store, leaving the rest untouched.
///
/// `currencies`, when present, replaces the store's currency set. The default
/// currency is always kept in that set.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if no store has this id.
#[instrument(skip(conn, attrs))]
pub async fn update(
    conn: &mut AnyConnection,
    id: &StoreId,
    attrs: &StoreAttrs,
) -> Result<(), RepositoryError> {
    let metadata = json_text(attrs.metadata.as_ref())?;

    let result = sqlx::query(
        r"
        UPDATE stores SET
            name = COALESCE($2, name),
            default_currency_code = COALESCE($3, default_currency_code),
            swap_link_template = COALESCE($4, swap_link_template),
            payment_link_template = COALESCE($5, payment_link_template),
            invite_link_template = COALESCE($6, invite_link_template),
            metadata = COALESCE($7, metadata)
        WHERE id = $1
        ",
    )
    .bind(id.as_str())
    .bind(attrs.name.as_deref())
    .bind(attrs.default_currency_code.as_deref().map(str::to_lowercase))
    .bind(attrs.swap_link_template.as_deref())
    .bind(attrs.payment_link_template.as_deref())
    .bind(attrs.invite_link_template.as_deref())
    .bind(metadata)
    .execute(&mut *conn)
    .await
    .map_err(|e| write_error("store", e))?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }

    if let Some(currencies) = &attrs.currencies {
        sqlx::query("DELETE FROM store_currencies WHERE store_id = $1")
            .bind(id.as_str())
            .execute(&mut *conn)
            .await?;
        for code in currencies {
            add_currency(conn, id, code).await?;
        }
    }

    if attrs.currencies.is_some() || attrs.default_currency_code.is_some() {
        let default: String =
            sqlx::query_scalar("SELECT default_currency_code FROM stores WHERE id = $1")
                .bind(id.as_str())
                .fetch_one(&mut *conn)
                .await?;
        add_currency(conn, id, &default).await?;
    }

    debug!("Updated store");
    Ok(())
}

async fn add_currency(
    conn: &mut AnyConnection,
    id: &StoreId,
    code: &str,
) -> Result<(), RepositoryError> {
    let code = code.to_lowercase();
    let exists: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM store_currencies WHERE store_id = $1 AND currency_code = $2",
    )
    .bind(id.as_str())
    .bind(&code)
    .fetch_one(&mut *conn)
    .await?;

    if exists == 0 {
        sqlx::query("INSERT INTO store_currencies (store_id, currency_code) VALUES ($1, $2)")
            .bind(id.as_str())
            .bind(&code)
            .execute(&mut *conn)
            .await
            .map_err(|e| write_error("store currency", e))?;
    }
    Ok(())
}

/// Currency codes of a store, sorted.
///
/// # Errors
///
/// Returns error if the query fails.
pub async fn currencies(
    conn: &mut AnyConnection,
    id: &StoreId,
) -> Result<Vec<String>, RepositoryError> {
    let codes: Vec<String> = sqlx::query_scalar(
        "SELECT currency_code FROM store_currencies WHERE store_id = $1 ORDER BY currency_code",
    )
    .bind(id.as_str())
    .fetch_all(&mut *conn)
    .await?;
    Ok(codes)
}

/// Link a user to a store.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if either side does not exist.
#[instrument(skip(conn))]
pub async fn link_user(
    conn: &mut AnyConnection,
    user_id: &UserId,
    store_id: &StoreId,
) -> Result<(), RepositoryError> {
    sqlx::query("INSERT INTO user_stores (user_id, store_id) VALUES ($1, $2)")
        .bind(user_id.as_str())
        .bind(store_id.as_str())
        .execute(&mut *conn)
        .await
        .map_err(|e| write_error("user store link", e))?;
    Ok(())
}

/// Ids of the stores linked to a user, in link order.
///
/// # Errors
///
/// Returns error if the query fails.
pub async fn ids_for_user(
    conn: &mut AnyConnection,
    user_id: &UserId,
) -> Result<Vec<StoreId>, RepositoryError> {
    let ids: Vec<String> =
        sqlx::query_scalar("SELECT store_id FROM user_stores WHERE user_id = $1 ORDER BY id")
            .bind(user_id.as_str())
            .fetch_all(&mut *conn)
            .await?;
    Ok(ids.into_iter().map(StoreId::from_raw).collect())
}
