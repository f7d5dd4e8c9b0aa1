//! Region repository.
//!
//! A region owns a currency, a tax rate, a set of countries and the payment
//! and fulfillment providers available in it.

use sqlx::AnyConnection;
use tracing::{debug, instrument};

use bazaar_core::RegionId;

use super::{RepositoryError, write_error};

/// Parameters for inserting a region.
#[derive(Debug)]
pub struct CreateRegion {
    pub id: RegionId,
    pub name: String,
    pub currency_code: String,
    pub tax_rate: f64,
    pub tax_code: Option<String>,
    /// ISO 3166-1 alpha-2 codes, stored lowercase.
    pub countries: Vec<String>,
    pub payment_providers: Vec<String>,
    pub fulfillment_providers: Vec<String>,
    /// JSON object text.
    pub metadata: Option<String>,
}

/// Insert a region with its countries and providers.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the id is taken or a country already
/// belongs to another region.
#[instrument(skip(conn, params), fields(id = %params.id, name = %params.name))]
pub async fn create(conn: &mut AnyConnection, params: CreateRegion) -> Result<RegionId, RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO regions (id, name, currency_code, tax_rate, tax_code, metadata)
        VALUES ($1, $2, $3, $4, $5, $6)
        ",
    )
    .bind(params.id.as_str())
    .bind(&params.name)
    .bind(params.currency_code.to_lowercase())
    .bind(params.tax_rate)
    .bind(params.tax_code.as_deref())
    .bind(params.metadata.as_deref())
    .execute(&mut *conn)
    .await
    .map_err(|e| write_error("region", e))?;

    for country in &params.countries {
        sqlx::query("INSERT INTO region_countries (region_id, iso_2) VALUES ($1, $2)")
            .bind(params.id.as_str())
            .bind(country.to_lowercase())
            .execute(&mut *conn)
            .await
            .map_err(|e| write_error("region country", e))?;
    }

    for provider in &params.payment_providers {
        sqlx::query("INSERT INTO region_payment_providers (region_id, provider_id) VALUES ($1, $2)")
            .bind(params.id.as_str())
            .bind(provider)
            .execute(&mut *conn)
            .await
            .map_err(|e| write_error("region payment provider", e))?;
    }

    for provider in &params.fulfillment_providers {
        sqlx::query(
            "INSERT INTO region_fulfillment_providers (region_id, provider_id) VALUES ($1, $2)",
        )
        .bind(params.id.as_str())
        .bind(provider)
        .execute(&mut *conn)
        .await
        .map_err(|e| write_error("region fulfillment provider", e))?;
    }

    debug!(countries = params.countries.len(), "Created region");
    Ok(params.id)
}

/// Ids of all regions with the given name.
///
/// # Errors
///
/// Returns error if the query fails.
pub async fn ids_by_name(
    conn: &mut AnyConnection,
    name: &str,
) -> Result<Vec<RegionId>, RepositoryError> {
    let ids: Vec<String> = sqlx::query_scalar("SELECT id FROM regions WHERE name = $1 ORDER BY id")
        .bind(name)
        .fetch_all(&mut *conn)
        .await?;
    Ok(ids.into_iter().map(RegionId::from_raw).collect())
}

/// Country codes of a region, sorted.
///
/// # Errors
///
/// Returns error if the query fails.
pub async fn countries(
    conn: &mut AnyConnection,
    id: &RegionId,
) -> Result<Vec<String>, RepositoryError> {
    let codes: Vec<String> =
        sqlx::query_scalar("SELECT iso_2 FROM region_countries WHERE region_id = $1 ORDER BY iso_2")
            .bind(id.as_str())
            .fetch_all(&mut *conn)
            .await?;
    Ok(codes)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::tests::test_pool;

    fn params(name: &str, countries: &[&str]) -> CreateRegion {
        CreateRegion {
            id: RegionId::generate(),
            name: name.to_owned(),
            currency_code: "EUR".to_owned(),
            tax_rate: 19.0,
            tax_code: None,
            countries: countries.iter().map(|c| (*c).to_owned()).collect(),
            payment_providers: vec!["manual".to_owned()],
            fulfillment_providers: vec!["manual".to_owned()],
            metadata: None,
        }
    }

    #[tokio::test]
    async fn test_create_region() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let id = create(&mut conn, params("EU", &["DE", "fr"])).await.unwrap();

        assert_eq!(ids_by_name(&mut conn, "EU").await.unwrap(), vec![id.clone()]);
        assert_eq!(countries(&mut conn, &id).await.unwrap(), vec!["de", "fr"]);
    }

    #[tokio::test]
    async fn test_country_in_two_regions_is_a_conflict() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        create(&mut conn, params("EU", &["de"])).await.unwrap();
        let result = create(&mut conn, params("DACH", &["de"])).await;
        assert!(matches!(result, Err(RepositoryError::Conflict(_))));
    }
}
