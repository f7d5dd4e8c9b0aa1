//! Default entities every database needs before it can be seeded.
//!
//! The default sales channel, the singleton store and the two built-in
//! shipping profiles. Creating them is idempotent: existing rows are left as
//! they are.

use sqlx::{AnyConnection, AnyPool};
use tracing::{info, instrument};

use bazaar_core::{SalesChannelId, ShippingProfileKind, StoreId};

use crate::db::{self, DatabaseType, RepositoryError, sales_channels, shipping, stores};
use crate::error::SeedError;

/// Name of the sales channel products are listed in by default.
pub const DEFAULT_SALES_CHANNEL_NAME: &str = "Default Sales Channel";

const DEFAULT_STORE_NAME: &str = "Bazaar Store";
const DEFAULT_CURRENCY_CODE: &str = "usd";

/// What [`ensure_defaults`] had to create.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefaultsReport {
    pub sales_channel_created: bool,
    pub store_created: bool,
    pub profiles_created: usize,
}

/// Create any missing default entities in their own transaction.
///
/// # Errors
///
/// Returns `SeedError::Database` if the transaction fails.
#[instrument(skip(pool))]
pub async fn ensure_defaults(
    pool: &AnyPool,
    database_type: DatabaseType,
) -> Result<DefaultsReport, SeedError> {
    let mut tx = db::begin_seed_transaction(pool, database_type).await?;

    match ensure_defaults_in(&mut tx).await {
        Ok(report) => {
            tx.commit().await?;
            info!(
                sales_channel_created = report.sales_channel_created,
                store_created = report.store_created,
                profiles_created = report.profiles_created,
                "Default entities ready"
            );
            Ok(report)
        }
        Err(e) => {
            tx.rollback().await?;
            Err(e.into())
        }
    }
}

/// Create any missing default entities on an open connection or transaction.
///
/// # Errors
///
/// Returns `RepositoryError` if a query fails.
pub async fn ensure_defaults_in(conn: &mut AnyConnection) -> Result<DefaultsReport, RepositoryError> {
    let mut report = DefaultsReport::default();

    let channel = ensure_sales_channel(conn, &mut report).await?;

    match stores::find_default(conn).await? {
        Some(store) if store.default_sales_channel_id.is_none() => {
            link_store_channel(conn, &store.id, &channel).await?;
        }
        Some(_) => {}
        None => {
            stores::create(
                conn,
                stores::CreateStore {
                    id: StoreId::generate(),
                    name: DEFAULT_STORE_NAME.to_owned(),
                    default_currency_code: DEFAULT_CURRENCY_CODE.to_owned(),
                    default_sales_channel_id: Some(channel),
                    is_default: true,
                },
            )
            .await?;
            report.store_created = true;
        }
    }

    for (kind, name) in [
        (ShippingProfileKind::Default, "Default Shipping Profile"),
        (ShippingProfileKind::GiftCard, "Gift Card Profile"),
    ] {
        if shipping::find_profile(conn, kind).await?.is_none() {
            shipping::create_profile(conn, name, kind).await?;
            report.profiles_created += 1;
        }
    }

    Ok(report)
}

async fn ensure_sales_channel(
    conn: &mut AnyConnection,
    report: &mut DefaultsReport,
) -> Result<SalesChannelId, RepositoryError> {
    if let Some(id) = sales_channels::find_id_by_name(conn, DEFAULT_SALES_CHANNEL_NAME).await? {
        return Ok(id);
    }
    report.sales_channel_created = true;
    sales_channels::create(
        conn,
        DEFAULT_SALES_CHANNEL_NAME,
        Some("Created by Bazaar"),
    )
    .await
}

async fn link_store_channel(
    conn: &mut AnyConnection,
    store_id: &StoreId,
    channel: &SalesChannelId,
) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE stores SET default_sales_channel_id = $2 WHERE id = $1")
        .bind(store_id.as_str())
        .bind(channel.as_str())
        .execute(&mut *conn)
        .await?;
    Ok(())
}
