//! Product catalog repository: products, option axes, variants and prices.
//!
//! A product is written in three stages because each stage needs ids from the
//! one before: the product row, then its option axes, then variants whose
//! option values point at those axes.

use sqlx::AnyConnection;
use tracing::{debug, instrument};

use bazaar_core::{
    ImageId, MoneyAmountId, OptionValueId, ProductId, ProductOptionId, ProductStatus, RegionId,
    SalesChannelId, ShippingProfileId, VariantId,
};

use super::{RepositoryError, write_error};

/// Parameters for inserting a product.
#[derive(Debug)]
pub struct CreateProduct {
    pub id: ProductId,
    pub title: String,
    pub subtitle: Option<String>,
    pub description: Option<String>,
    pub description_1: Option<String>,
    pub description_2: Option<String>,
    pub handle: String,
    pub is_giftcard: bool,
    pub discountable: bool,
    pub status: ProductStatus,
    pub thumbnail: Option<String>,
    pub profile_id: ShippingProfileId,
    pub weight: Option<i64>,
    pub length: Option<i64>,
    pub height: Option<i64>,
    pub width: Option<i64>,
    pub material: Option<String>,
    /// JSON object text.
    pub metadata: Option<String>,
    /// Image URLs, ranked in order.
    pub images: Vec<String>,
    /// Channel the product is listed in.
    pub sales_channel_id: Option<SalesChannelId>,
}

/// A product row, as read back for verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub handle: String,
    pub status: String,
    pub profile_id: ShippingProfileId,
}

/// Parameters for inserting a variant.
#[derive(Debug)]
pub struct CreateVariant {
    pub product_id: ProductId,
    pub title: String,
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub ean: Option<String>,
    pub upc: Option<String>,
    pub inventory_quantity: i64,
    pub allow_backorder: bool,
    pub manage_inventory: bool,
    pub weight: Option<i64>,
    pub length: Option<i64>,
    pub height: Option<i64>,
    pub width: Option<i64>,
    pub variant_rank: i64,
    /// JSON object text.
    pub metadata: Option<String>,
    /// One value per option axis of the product.
    pub options: Vec<(ProductOptionId, String)>,
    pub prices: Vec<CreatePrice>,
}

/// A price to attach to a variant.
#[derive(Debug)]
pub struct CreatePrice {
    /// Taken from the region when absent.
    pub currency_code: Option<String>,
    pub amount: i64,
    pub region_id: Option<RegionId>,
}

/// A variant row, as read back for verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub id: VariantId,
    pub title: String,
    pub sku: Option<String>,
    pub variant_rank: i64,
}

/// A price row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Price {
    pub currency_code: String,
    pub amount: i64,
    pub region_id: Option<RegionId>,
}

/// Insert a product with its images and sales channel link.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the handle is taken or the profile
/// or sales channel does not exist.
#[instrument(skip(conn, params), fields(handle = %params.handle))]
pub async fn create(conn: &mut AnyConnection, params: CreateProduct) -> Result<ProductId, RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO products
            (id, title, subtitle, description, description_1, description_2, handle,
             is_giftcard, discountable, status, thumbnail, profile_id,
             weight, length, height, width, material, metadata)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
        ",
    )
    .bind(params.id.as_str())
    .bind(&params.title)
    .bind(params.subtitle.as_deref())
    .bind(params.description.as_deref())
    .bind(params.description_1.as_deref())
    .bind(params.description_2.as_deref())
    .bind(&params.handle)
    .bind(params.is_giftcard)
    .bind(params.discountable)
    .bind(params.status.as_str())
    .bind(params.thumbnail.as_deref())
    .bind(params.profile_id.as_str())
    .bind(params.weight)
    .bind(params.length)
    .bind(params.height)
    .bind(params.width)
    .bind(params.material.as_deref())
    .bind(params.metadata.as_deref())
    .execute(&mut *conn)
    .await
    .map_err(|e| write_error("product", e))?;

    for (rank, url) in (0_i64..).zip(&params.images) {
        sqlx::query("INSERT INTO product_images (id, product_id, url, rank) VALUES ($1, $2, $3, $4)")
            .bind(ImageId::generate().as_str())
            .bind(params.id.as_str())
            .bind(url)
            .bind(rank)
            .execute(&mut *conn)
            .await
            .map_err(|e| write_error("product image", e))?;
    }

    if let Some(channel) = &params.sales_channel_id {
        sqlx::query(
            "INSERT INTO product_sales_channels (product_id, sales_channel_id) VALUES ($1, $2)",
        )
        .bind(params.id.as_str())
        .bind(channel.as_str())
        .execute(&mut *conn)
        .await
        .map_err(|e| write_error("product sales channel", e))?;
    }

    debug!(id = %params.id, images = params.images.len(), "Created product");
    Ok(params.id)
}

/// Insert an option axis for a product.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the product already has an option
/// with this title.
pub async fn create_option(
    conn: &mut AnyConnection,
    product_id: &ProductId,
    title: &str,
) -> Result<ProductOptionId, RepositoryError> {
    let id = ProductOptionId::generate();

    sqlx::query("INSERT INTO product_options (id, product_id, title) VALUES ($1, $2, $3)")
        .bind(id.as_str())
        .bind(product_id.as_str())
        .bind(title)
        .execute(&mut *conn)
        .await
        .map_err(|e| write_error("product option", e))?;

    Ok(id)
}

/// Insert a variant with its option values and prices.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the SKU (or another unique code) is
/// taken, an option or region does not exist, or a region-only price names a
/// region that does not exist.
#[instrument(skip(conn, params), fields(product = %params.product_id, title = %params.title))]
pub async fn create_variant(
    conn: &mut AnyConnection,
    params: CreateVariant,
) -> Result<VariantId, RepositoryError> {
    let id = VariantId::generate();

    sqlx::query(
        r"
        INSERT INTO product_variants
            (id, product_id, title, sku, barcode, ean, upc, inventory_quantity,
             allow_backorder, manage_inventory, weight, length, height, width,
             variant_rank, metadata)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
        ",
    )
    .bind(id.as_str())
    .bind(params.product_id.as_str())
    .bind(&params.title)
    .bind(params.sku.as_deref())
    .bind(params.barcode.as_deref())
    .bind(params.ean.as_deref())
    .bind(params.upc.as_deref())
    .bind(params.inventory_quantity)
    .bind(params.allow_backorder)
    .bind(params.manage_inventory)
    .bind(params.weight)
    .bind(params.length)
    .bind(params.height)
    .bind(params.width)
    .bind(params.variant_rank)
    .bind(params.metadata.as_deref())
    .execute(&mut *conn)
    .await
    .map_err(|e| write_error("product variant", e))?;

    for (option_id, value) in &params.options {
        sqlx::query(
            r"
            INSERT INTO product_option_values (id, option_id, variant_id, value)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(OptionValueId::generate().as_str())
        .bind(option_id.as_str())
        .bind(id.as_str())
        .bind(value)
        .execute(&mut *conn)
        .await
        .map_err(|e| write_error("product option value", e))?;
    }

    for price in &params.prices {
        let currency_code = match (&price.currency_code, &price.region_id) {
            (Some(code), _) => code.to_lowercase(),
            (None, Some(region)) => region_currency(conn, region).await?,
            (None, None) => {
                return Err(RepositoryError::Conflict(
                    "price needs a currency code or a region".to_owned(),
                ));
            }
        };

        sqlx::query(
            r"
            INSERT INTO money_amounts (id, variant_id, currency_code, amount, region_id)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(MoneyAmountId::generate().as_str())
        .bind(id.as_str())
        .bind(&currency_code)
        .bind(price.amount)
        .bind(price.region_id.as_ref().map(RegionId::as_str))
        .execute(&mut *conn)
        .await
        .map_err(|e| write_error("price", e))?;
    }

    debug!(id = %id, options = params.options.len(), prices = params.prices.len(), "Created variant");
    Ok(id)
}

async fn region_currency(
    conn: &mut AnyConnection,
    region_id: &RegionId,
) -> Result<String, RepositoryError> {
    let code: Option<String> = sqlx::query_scalar("SELECT currency_code FROM regions WHERE id = $1")
        .bind(region_id.as_str())
        .fetch_optional(&mut *conn)
        .await?;
    code.ok_or_else(|| RepositoryError::Conflict(format!("price references unknown region {region_id}")))
}

/// Get a product by handle.
///
/// # Errors
///
/// Returns error if the query fails.
pub async fn get_by_handle(
    conn: &mut AnyConnection,
    handle: &str,
) -> Result<Option<Product>, RepositoryError> {
    let row: Option<(String, String, String, String, String)> = sqlx::query_as(
        "SELECT id, title, handle, status, profile_id FROM products WHERE handle = $1",
    )
    .bind(handle)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(|(id, title, handle, status, profile_id)| Product {
        id: ProductId::from_raw(id),
        title,
        handle,
        status,
        profile_id: ShippingProfileId::from_raw(profile_id),
    }))
}

/// Sales channels a product is listed in.
///
/// # Errors
///
/// Returns error if the query fails.
pub async fn sales_channels(
    conn: &mut AnyConnection,
    product_id: &ProductId,
) -> Result<Vec<SalesChannelId>, RepositoryError> {
    let ids: Vec<String> = sqlx::query_scalar(
        "SELECT sales_channel_id FROM product_sales_channels WHERE product_id = $1",
    )
    .bind(product_id.as_str())
    .fetch_all(&mut *conn)
    .await?;
    Ok(ids.into_iter().map(SalesChannelId::from_raw).collect())
}

/// Option axes of a product as `(id, title)`.
///
/// # Errors
///
/// Returns error if the query fails.
pub async fn options(
    conn: &mut AnyConnection,
    product_id: &ProductId,
) -> Result<Vec<(ProductOptionId, String)>, RepositoryError> {
    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT id, title FROM product_options WHERE product_id = $1 ORDER BY id",
    )
    .bind(product_id.as_str())
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows
        .into_iter()
        .map(|(id, title)| (ProductOptionId::from_raw(id), title))
        .collect())
}

/// Variants of a product in rank order.
///
/// # Errors
///
/// Returns error if the query fails.
pub async fn variants(
    conn: &mut AnyConnection,
    product_id: &ProductId,
) -> Result<Vec<Variant>, RepositoryError> {
    let rows: Vec<(String, String, Option<String>, i64)> = sqlx::query_as(
        r"
        SELECT id, title, sku, variant_rank
        FROM product_variants
        WHERE product_id = $1
        ORDER BY variant_rank
        ",
    )
    .bind(product_id.as_str())
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows
        .into_iter()
        .map(|(id, title, sku, variant_rank)| Variant {
            id: VariantId::from_raw(id),
            title,
            sku,
            variant_rank,
        })
        .collect())
}

/// Option values of a variant as `(option id, value)`.
///
/// # Errors
///
/// Returns error if the query fails.
pub async fn option_values(
    conn: &mut AnyConnection,
    variant_id: &VariantId,
) -> Result<Vec<(ProductOptionId, String)>, RepositoryError> {
    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT option_id, value FROM product_option_values WHERE variant_id = $1 ORDER BY option_id",
    )
    .bind(variant_id.as_str())
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows
        .into_iter()
        .map(|(id, value)| (ProductOptionId::from_raw(id), value))
        .collect())
}

/// Prices of a variant.
///
/// # Errors
///
/// Returns error if the query fails.
pub async fn prices(
    conn: &mut AnyConnection,
    variant_id: &VariantId,
) -> Result<Vec<Price>, RepositoryError> {
    let rows: Vec<(String, i64, Option<String>)> = sqlx::query_as(
        r"
        SELECT currency_code, amount, region_id
        FROM money_amounts
        WHERE variant_id = $1
        ORDER BY currency_code, amount
        ",
    )
    .bind(variant_id.as_str())
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows
        .into_iter()
        .map(|(currency_code, amount, region_id)| Price {
            currency_code,
            amount,
            region_id: region_id.map(RegionId::from_raw),
        })
        .collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bazaar_core::ShippingProfileKind;

    use super::*;
    use crate::db::shipping;
    use crate::db::tests::test_pool;

    fn product(profile_id: ShippingProfileId, handle: &str) -> CreateProduct {
        CreateProduct {
            id: ProductId::generate(),
            title: "Shirt".to_owned(),
            subtitle: None,
            description: None,
            description_1: Some("Soft".to_owned()),
            description_2: None,
            handle: handle.to_owned(),
            is_giftcard: false,
            discountable: true,
            status: ProductStatus::Published,
            thumbnail: None,
            profile_id,
            weight: None,
            length: None,
            height: None,
            width: None,
            material: None,
            metadata: None,
            images: vec!["https://img/1.png".to_owned(), "https://img/2.png".to_owned()],
            sales_channel_id: None,
        }
    }

    fn variant(product_id: &ProductId, sku: &str, options: Vec<(ProductOptionId, String)>) -> CreateVariant {
        CreateVariant {
            product_id: product_id.clone(),
            title: sku.to_owned(),
            sku: Some(sku.to_owned()),
            barcode: None,
            ean: None,
            upc: None,
            inventory_quantity: 10,
            allow_backorder: false,
            manage_inventory: true,
            weight: None,
            length: None,
            height: None,
            width: None,
            variant_rank: 0,
            metadata: None,
            options,
            prices: vec![CreatePrice {
                currency_code: Some("EUR".to_owned()),
                amount: 1950,
                region_id: None,
            }],
        }
    }

    #[tokio::test]
    async fn test_product_with_options_and_variant() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let profile = shipping::create_profile(&mut conn, "Default", ShippingProfileKind::Default)
            .await
            .unwrap();

        let id = create(&mut conn, product(profile.clone(), "shirt")).await.unwrap();
        let size = create_option(&mut conn, &id, "Size").await.unwrap();

        let variant_id = create_variant(&mut conn, variant(&id, "SHIRT-S", vec![(size.clone(), "S".to_owned())]))
            .await
            .unwrap();

        let found = get_by_handle(&mut conn, "shirt").await.unwrap().unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.status, "published");
        assert_eq!(found.profile_id, profile);

        assert_eq!(options(&mut conn, &id).await.unwrap(), vec![(size.clone(), "Size".to_owned())]);
        let vs = variants(&mut conn, &id).await.unwrap();
        assert_eq!(vs.len(), 1);
        assert_eq!(vs[0].id, variant_id);
        assert_eq!(
            option_values(&mut conn, &variant_id).await.unwrap(),
            vec![(size, "S".to_owned())]
        );
        assert_eq!(
            prices(&mut conn, &variant_id).await.unwrap(),
            vec![Price {
                currency_code: "eur".to_owned(),
                amount: 1950,
                region_id: None
            }]
        );
    }

    #[tokio::test]
    async fn test_duplicate_handle_and_sku() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let profile = shipping::create_profile(&mut conn, "Default", ShippingProfileKind::Default)
            .await
            .unwrap();

        let id = create(&mut conn, product(profile.clone(), "shirt")).await.unwrap();
        let again = create(&mut conn, product(profile, "shirt")).await;
        assert!(matches!(again, Err(RepositoryError::Conflict(_))));

        create_variant(&mut conn, variant(&id, "SKU-1", vec![])).await.unwrap();
        let dup = create_variant(&mut conn, variant(&id, "SKU-1", vec![])).await;
        assert!(matches!(dup, Err(RepositoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_region_only_price_needs_known_region() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let profile = shipping::create_profile(&mut conn, "Default", ShippingProfileKind::Default)
            .await
            .unwrap();
        let id = create(&mut conn, product(profile, "shirt")).await.unwrap();

        let mut params = variant(&id, "SKU-1", vec![]);
        params.prices = vec![CreatePrice {
            currency_code: None,
            amount: 100,
            region_id: Some(RegionId::generate()),
        }];
        let result = create_variant(&mut conn, params).await;
        assert!(matches!(result, Err(RepositoryError::Conflict(_))));
    }
}
