//! Shipping profiles and shipping options.

use sqlx::AnyConnection;
use tracing::{debug, instrument};

use bazaar_core::{
    RegionId, ShippingOptionId, ShippingPriceType, ShippingProfileId, ShippingProfileKind,
};

use super::{RepositoryError, write_error};

/// Id of the profile of the given kind.
///
/// For `Custom` the oldest custom profile is returned.
///
/// # Errors
///
/// Returns error if the query fails.
pub async fn find_profile(
    conn: &mut AnyConnection,
    kind: ShippingProfileKind,
) -> Result<Option<ShippingProfileId>, RepositoryError> {
    let id: Option<String> = sqlx::query_scalar(
        r"
        SELECT id FROM shipping_profiles
        WHERE type = $1
        ORDER BY created_at, id
        LIMIT 1
        ",
    )
    .bind(kind.as_str())
    .fetch_optional(&mut *conn)
    .await?;

    Ok(id.map(ShippingProfileId::from_raw))
}

/// Insert a shipping profile.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if a `Default` or `GiftCard` profile
/// already exists.
#[instrument(skip(conn))]
pub async fn create_profile(
    conn: &mut AnyConnection,
    name: &str,
    kind: ShippingProfileKind,
) -> Result<ShippingProfileId, RepositoryError> {
    let id = ShippingProfileId::generate();

    sqlx::query("INSERT INTO shipping_profiles (id, name, type) VALUES ($1, $2, $3)")
        .bind(id.as_str())
        .bind(name)
        .bind(kind.as_str())
        .execute(&mut *conn)
        .await
        .map_err(|e| write_error("shipping profile", e))?;

    debug!(id = %id, "Created shipping profile");
    Ok(id)
}

/// Parameters for inserting a shipping option.
#[derive(Debug)]
pub struct CreateShippingOption {
    pub name: String,
    pub region_id: RegionId,
    pub profile_id: ShippingProfileId,
    pub provider_id: String,
    pub price_type: ShippingPriceType,
    pub amount: Option<i64>,
    pub is_return: bool,
    pub admin_only: bool,
    /// Provider payload as JSON object text.
    pub data: String,
    /// JSON object text.
    pub metadata: Option<String>,
}

/// A persisted shipping option, as read back for verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShippingOption {
    pub id: ShippingOptionId,
    pub name: String,
    pub region_id: RegionId,
    pub profile_id: ShippingProfileId,
    pub amount: Option<i64>,
}

/// Insert a shipping option.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the region or profile does not exist.
#[instrument(skip(conn, params), fields(name = %params.name, region = %params.region_id))]
pub async fn create_option(
    conn: &mut AnyConnection,
    params: CreateShippingOption,
) -> Result<ShippingOptionId, RepositoryError> {
    let id = ShippingOptionId::generate();

    sqlx::query(
        r"
        INSERT INTO shipping_options
            (id, name, region_id, profile_id, provider_id, price_type, amount,
             is_return, admin_only, data, metadata)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ",
    )
    .bind(id.as_str())
    .bind(&params.name)
    .bind(params.region_id.as_str())
    .bind(params.profile_id.as_str())
    .bind(&params.provider_id)
    .bind(params.price_type.as_str())
    .bind(params.amount)
    .bind(params.is_return)
    .bind(params.admin_only)
    .bind(&params.data)
    .bind(params.metadata.as_deref())
    .execute(&mut *conn)
    .await
    .map_err(|e| write_error("shipping option", e))?;

    debug!(id = %id, "Created shipping option");
    Ok(id)
}

/// All shipping options, oldest first.
///
/// # Errors
///
/// Returns error if the query fails.
pub async fn list_options(conn: &mut AnyConnection) -> Result<Vec<ShippingOption>, RepositoryError> {
    let rows: Vec<(String, String, String, String, Option<i64>)> = sqlx::query_as(
        r"
        SELECT id, name, region_id, profile_id, amount
        FROM shipping_options
        ORDER BY id
        ",
    )
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, name, region_id, profile_id, amount)| ShippingOption {
            id: ShippingOptionId::from_raw(id),
            name,
            region_id: RegionId::from_raw(region_id),
            profile_id: ShippingProfileId::from_raw(profile_id),
            amount,
        })
        .collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::regions::{self, CreateRegion};
    use crate::db::tests::test_pool;

    #[tokio::test]
    async fn test_profiles_by_kind() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        assert!(
            find_profile(&mut conn, ShippingProfileKind::Default)
                .await
                .unwrap()
                .is_none()
        );

        let default = create_profile(&mut conn, "Default", ShippingProfileKind::Default)
            .await
            .unwrap();
        let gift = create_profile(&mut conn, "Gift Card", ShippingProfileKind::GiftCard)
            .await
            .unwrap();

        assert_eq!(
            find_profile(&mut conn, ShippingProfileKind::Default).await.unwrap(),
            Some(default)
        );
        assert_eq!(
            find_profile(&mut conn, ShippingProfileKind::GiftCard).await.unwrap(),
            Some(gift)
        );

        let second = create_profile(&mut conn, "Again", ShippingProfileKind::Default).await;
        assert!(matches!(second, Err(RepositoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_option_requires_existing_region() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let profile = create_profile(&mut conn, "Default", ShippingProfileKind::Default)
            .await
            .unwrap();

        let params = |region_id: RegionId| CreateShippingOption {
            name: "Standard".to_owned(),
            region_id,
            profile_id: profile.clone(),
            provider_id: "manual".to_owned(),
            price_type: ShippingPriceType::FlatRate,
            amount: Some(1000),
            is_return: false,
            admin_only: false,
            data: "{}".to_owned(),
            metadata: None,
        };

        let missing = create_option(&mut conn, params(RegionId::from_raw("test-region"))).await;
        assert!(matches!(missing, Err(RepositoryError::Conflict(_))));

        let region = regions::create(
            &mut conn,
            CreateRegion {
                id: RegionId::generate(),
                name: "EU".to_owned(),
                currency_code: "eur".to_owned(),
                tax_rate: 0.0,
                tax_code: None,
                countries: vec![],
                payment_providers: vec![],
                fulfillment_providers: vec![],
                metadata: None,
            },
        )
        .await
        .unwrap();

        let id = create_option(&mut conn, params(region.clone())).await.unwrap();
        let options = list_options(&mut conn).await.unwrap();
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].id, id);
        assert_eq!(options[0].region_id, region);
        assert_eq!(options[0].amount, Some(1000));
    }
}
