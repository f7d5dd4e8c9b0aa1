//! The seed importer.
//!
//! Loads a [`SeedDocument`] and writes it in one transaction:
//!
//! 1. resolve the default and gift-card shipping profiles
//! 2. apply store attributes to the default store
//! 3. create users (passwords hashed on the way in)
//! 4. create regions, remembering placeholder ids
//! 5. create shipping options against the resolved regions
//! 6. create products, their option axes and variants
//! 7. create the category tree (skipped on backends without one)
//! 8. create the bootstrap account if it does not exist
//!
//! Any failure rolls the whole transaction back.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use sqlx::{AnyConnection, AnyPool};
use tracing::{debug, info, instrument, warn};

use bazaar_core::document::{CategorySpec, ProductSpec, ShippingOptionSpec};
use bazaar_core::{
    CategoryId, ProductId, ProductOptionId, ProductStatus, RegionId, SalesChannelId, SeedDocument,
    ShippingProfileId, ShippingProfileKind,
};

use crate::auth::{self, NewUser};
use crate::bootstrap::{self, IdentifierGenerator, RandomIdentifiers};
use crate::config::SeedOptions;
use crate::db::categories::{self, CreateCategory};
use crate::db::products::{self, CreatePrice, CreateProduct, CreateVariant};
use crate::db::regions::{self, CreateRegion};
use crate::db::shipping::{self, CreateShippingOption};
use crate::db::{self, json_text, stores};
use crate::error::SeedError;

/// What a seeding run wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub users: usize,
    pub regions: usize,
    pub shipping_options: usize,
    pub products: usize,
    pub variants: usize,
    pub categories: usize,
    /// Whether the bootstrap account was created by this run.
    pub bootstrap_created: bool,
    /// Whether the document's categories were left out because the backend
    /// has no category tree.
    pub categories_skipped: bool,
    /// Real region id assigned to each placeholder id in the document.
    pub region_placeholders: BTreeMap<String, RegionId>,
}

/// Find the seed file: as given, or relative to `directory`.
///
/// # Errors
///
/// Returns `SeedError::FileNotFound` with both paths if neither exists.
pub fn resolve_seed_path(directory: &Path, seed_file: &Path) -> Result<PathBuf, SeedError> {
    if seed_file.is_file() {
        return Ok(seed_file.to_path_buf());
    }

    let joined = directory.join(seed_file);
    let resolved = std::path::absolute(&joined).unwrap_or(joined);
    if resolved.is_file() {
        Ok(resolved)
    } else {
        Err(SeedError::FileNotFound {
            seed_file: seed_file.to_path_buf(),
            resolved,
        })
    }
}

/// Read and parse a seed document.
///
/// # Errors
///
/// Returns `SeedError::Io` if the file cannot be read and `SeedError::Parse`
/// if it is not a well-formed document.
pub async fn read_document(path: &Path) -> Result<SeedDocument, SeedError> {
    let content = tokio::fs::read_to_string(path).await?;
    let document = SeedDocument::from_json(&content)?;
    debug!(
        users = document.users.len(),
        regions = document.regions.len(),
        products = document.products.len(),
        categories = document.categories.len(),
        "Parsed seed document"
    );
    Ok(document)
}

/// Runs seed documents against a pool.
pub struct SeedImporter<'a> {
    pool: &'a AnyPool,
    options: &'a SeedOptions,
    identifiers: Box<dyn IdentifierGenerator + 'a>,
}

impl<'a> SeedImporter<'a> {
    /// Create an importer with random bootstrap identifiers.
    #[must_use]
    pub fn new(pool: &'a AnyPool, options: &'a SeedOptions) -> Self {
        Self {
            pool,
            options,
            identifiers: Box::new(RandomIdentifiers::default()),
        }
    }

    /// Use `identifiers` for the bootstrap user and stores.
    #[must_use]
    pub fn with_identifiers(mut self, identifiers: impl IdentifierGenerator + 'a) -> Self {
        self.identifiers = Box::new(identifiers);
        self
    }

    /// Read, validate and import the document at `path`.
    ///
    /// # Errors
    ///
    /// See [`read_document`] and [`SeedImporter::run_document`].
    pub async fn run(&self, path: &Path) -> Result<SeedSummary, SeedError> {
        info!(path = %path.display(), "Loading seed document");
        let document = read_document(path).await?;
        self.run_document(document).await
    }

    /// Validate and import a document in a single transaction.
    ///
    /// The transaction commits only if every step succeeds within the
    /// configured timeout; otherwise it is rolled back.
    ///
    /// # Errors
    ///
    /// Returns `SeedError::InvalidDocument` before touching the database if
    /// validation fails, `SeedError::Timeout` if the timeout expires, or the
    /// first error raised by a step.
    #[instrument(skip(self, document), fields(backend = %self.options.database_type))]
    pub async fn run_document(&self, document: SeedDocument) -> Result<SeedSummary, SeedError> {
        let problems = document.validate();
        if !problems.is_empty() {
            return Err(SeedError::InvalidDocument(problems));
        }

        let mut tx = db::begin_seed_transaction(self.pool, self.options.database_type).await?;
        let timeout = self.options.transaction_timeout;

        let outcome = tokio::time::timeout(
            timeout,
            seed_document(&mut tx, document, self.options, self.identifiers.as_ref()),
        )
        .await;

        let error = match outcome {
            Ok(Ok(summary)) => {
                tx.commit().await?;
                info!(
                    users = summary.users,
                    regions = summary.regions,
                    shipping_options = summary.shipping_options,
                    products = summary.products,
                    variants = summary.variants,
                    categories = summary.categories,
                    bootstrap_created = summary.bootstrap_created,
                    "Seeding committed"
                );
                return Ok(summary);
            }
            Ok(Err(e)) => e,
            Err(_) => SeedError::Timeout(timeout),
        };

        warn!(error = %error, "Seeding failed, rolling back");
        if let Err(e) = tx.rollback().await {
            warn!(error = %e, "Rollback failed");
        }
        Err(error)
    }
}

/// Shipping profiles every product and shipping option is assigned to.
struct Profiles {
    default: ShippingProfileId,
    gift_card: ShippingProfileId,
}

impl Profiles {
    async fn resolve(conn: &mut AnyConnection) -> Result<Self, SeedError> {
        let gift_card = shipping::find_profile(conn, ShippingProfileKind::GiftCard)
            .await?
            .ok_or(SeedError::MissingShippingProfile(ShippingProfileKind::GiftCard))?;
        let default = shipping::find_profile(conn, ShippingProfileKind::Default)
            .await?
            .ok_or(SeedError::MissingShippingProfile(ShippingProfileKind::Default))?;
        Ok(Self { default, gift_card })
    }

    fn for_giftcard(&self, is_giftcard: bool) -> &ShippingProfileId {
        match ShippingProfileKind::for_giftcard(is_giftcard) {
            ShippingProfileKind::GiftCard => &self.gift_card,
            _ => &self.default,
        }
    }
}

/// Rewrite a region reference through the placeholder map. Unknown ids pass
/// through unchanged.
fn resolve_region(placeholders: &BTreeMap<String, RegionId>, raw: &str) -> RegionId {
    placeholders
        .get(raw)
        .cloned()
        .unwrap_or_else(|| RegionId::from_raw(raw))
}

/// Import a document on an open transaction.
///
/// Does not validate the document and does not commit; callers that own the
/// transaction decide what happens to it.
///
/// # Errors
///
/// Returns the first error raised by a step.
pub async fn seed_document(
    conn: &mut AnyConnection,
    document: SeedDocument,
    options: &SeedOptions,
    identifiers: &dyn IdentifierGenerator,
) -> Result<SeedSummary, SeedError> {
    let mut summary = SeedSummary::default();

    let profiles = Profiles::resolve(conn).await?;

    if let Some(attrs) = &document.store {
        let store = stores::find_default(conn).await?.ok_or(SeedError::StoreNotFound)?;
        stores::update(conn, &store.id, attrs).await?;
    }
    let store = stores::find_default(conn).await?.ok_or(SeedError::StoreNotFound)?;

    for user in document.users {
        auth::create_user(
            conn,
            NewUser {
                id: None,
                email: user.email,
                password: user.password,
                first_name: user.first_name,
                last_name: user.last_name,
                role: user.role,
                metadata: json_text(user.metadata.as_ref())?,
            },
        )
        .await?;
        summary.users += 1;
    }

    for region in document.regions {
        let (id, placeholder) = match region.id {
            Some(id) if RegionId::follows_convention(&id) => (RegionId::from_raw(id), None),
            placeholder => (RegionId::generate(), placeholder),
        };

        let id = regions::create(
            conn,
            CreateRegion {
                id,
                name: region.name,
                currency_code: region.currency_code,
                tax_rate: region.tax_rate,
                tax_code: region.tax_code,
                countries: region.countries,
                payment_providers: region.payment_providers,
                fulfillment_providers: region.fulfillment_providers,
                metadata: json_text(region.metadata.as_ref())?,
            },
        )
        .await?;

        if let Some(placeholder) = placeholder {
            debug!(placeholder = %placeholder, id = %id, "Mapped region placeholder");
            summary.region_placeholders.insert(placeholder, id);
        }
        summary.regions += 1;
    }

    for option in document.shipping_options {
        seed_shipping_option(conn, option, &profiles, &summary.region_placeholders).await?;
        summary.shipping_options += 1;
    }

    for product in document.products {
        summary.variants += seed_product(
            conn,
            product,
            &profiles,
            store.default_sales_channel_id.as_ref(),
            &summary.region_placeholders,
        )
        .await?;
        summary.products += 1;
    }

    if options.database_type.supports_category_tree() {
        summary.categories = create_category_tree(conn, &document.categories, None).await?;
    } else if !document.categories.is_empty() {
        info!(
            backend = %options.database_type,
            roots = document.categories.len(),
            "Backend has no category tree, skipping categories"
        );
        summary.categories_skipped = true;
    }

    summary.bootstrap_created =
        bootstrap::ensure_bootstrap_account(conn, &options.bootstrap, identifiers).await?;

    Ok(summary)
}

async fn seed_shipping_option(
    conn: &mut AnyConnection,
    option: ShippingOptionSpec,
    profiles: &Profiles,
    placeholders: &BTreeMap<String, RegionId>,
) -> Result<(), SeedError> {
    let region_id = resolve_region(placeholders, &option.region_id);

    shipping::create_option(
        conn,
        CreateShippingOption {
            name: option.name,
            region_id,
            profile_id: profiles.for_giftcard(option.is_giftcard).clone(),
            provider_id: option.provider_id,
            price_type: option.price_type,
            amount: option.amount,
            is_return: option.is_return,
            admin_only: option.admin_only,
            data: serde_json::Value::Object(option.data).to_string(),
            metadata: json_text(option.metadata.as_ref())?,
        },
    )
    .await?;
    Ok(())
}

/// Create a product with its options and variants. Returns the variant count.
async fn seed_product(
    conn: &mut AnyConnection,
    product: ProductSpec,
    profiles: &Profiles,
    sales_channel: Option<&SalesChannelId>,
    placeholders: &BTreeMap<String, RegionId>,
) -> Result<usize, SeedError> {
    let handle = product.handle_or_default();
    let ProductSpec {
        title,
        options,
        variants,
        ..
    } = &product;

    let product_id = products::create(
        conn,
        CreateProduct {
            id: ProductId::generate(),
            title: title.clone(),
            subtitle: product.subtitle.clone(),
            description: product.description.clone(),
            description_1: product.description_1.clone(),
            description_2: product.description_2.clone(),
            handle,
            is_giftcard: product.is_giftcard,
            discountable: product.discountable,
            status: product.status.unwrap_or(ProductStatus::Published),
            thumbnail: product.thumbnail.clone(),
            profile_id: profiles.for_giftcard(product.is_giftcard).clone(),
            weight: product.weight,
            length: product.length,
            height: product.height,
            width: product.width,
            material: product.material.clone(),
            metadata: json_text(product.metadata.as_ref())?,
            images: product.images.clone(),
            sales_channel_id: sales_channel.cloned(),
        },
    )
    .await?;

    let mut created: Vec<(String, ProductOptionId)> = Vec::with_capacity(options.len());
    for option in options {
        let id = products::create_option(conn, &product_id, &option.title).await?;
        created.push((option.title.clone(), id));
    }

    // Position i of a variant's selections refers to the product's i-th option.
    let option_ids: Vec<Option<ProductOptionId>> = options
        .iter()
        .map(|option| {
            created
                .iter()
                .find(|(title, _)| *title == option.title)
                .map(|(_, id)| id.clone())
        })
        .collect();

    for ((index, variant), rank) in variants.iter().enumerate().zip(0_i64..) {
        let selections = variant
            .options
            .iter()
            .enumerate()
            .map(|(position, selection)| {
                option_ids
                    .get(position)
                    .cloned()
                    .flatten()
                    .map(|id| (id, selection.value.clone()))
                    .ok_or_else(|| SeedError::UnmatchedVariantOption {
                        product: title.clone(),
                        index,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let prices = variant
            .prices
            .iter()
            .map(|price| CreatePrice {
                currency_code: price.currency_code.clone(),
                amount: price.amount,
                region_id: price
                    .region_id
                    .as_deref()
                    .map(|raw| resolve_region(placeholders, raw)),
            })
            .collect();

        products::create_variant(
            conn,
            CreateVariant {
                product_id: product_id.clone(),
                title: variant.title.clone(),
                sku: variant.sku.clone(),
                barcode: variant.barcode.clone(),
                ean: variant.ean.clone(),
                upc: variant.upc.clone(),
                inventory_quantity: variant.inventory_quantity,
                allow_backorder: variant.allow_backorder,
                manage_inventory: variant.manage_inventory,
                weight: variant.weight,
                length: variant.length,
                height: variant.height,
                width: variant.width,
                variant_rank: rank,
                metadata: json_text(variant.metadata.as_ref())?,
                options: selections,
                prices,
            },
        )
        .await?;
    }

    Ok(variants.len())
}

/// Create a category forest under `parent`. Returns the number of categories
/// created.
///
/// Parents are always written before their children; siblings are ranked by
/// their position in `nodes`.
///
/// # Errors
///
/// Returns `SeedError::ConstraintViolation` if a handle is already taken.
pub async fn create_category_tree(
    conn: &mut AnyConnection,
    nodes: &[CategorySpec],
    parent: Option<&CategoryId>,
) -> Result<usize, SeedError> {
    let mut stack: Vec<(&CategorySpec, Option<CategoryId>, i64)> = nodes
        .iter()
        .zip(0_i64..)
        .map(|(node, rank)| (node, parent.cloned(), rank))
        .collect();
    // Popped from the end, so the first sibling must sit on top.
    stack.reverse();
    let mut created = 0;

    while let Some((node, parent_id, rank)) = stack.pop() {
        let id = categories::create(
            conn,
            CreateCategory {
                id: CategoryId::generate(),
                name: node.name.clone(),
                handle: node.handle_or_default(),
                description: node.description.clone(),
                parent_category_id: parent_id,
                is_active: node.is_active.unwrap_or(true),
                is_internal: node.is_internal.unwrap_or(false),
                rank,
                metadata: json_text(node.metadata.as_ref())?,
            },
        )
        .await?;
        created += 1;

        let siblings = stack.len();
        stack.extend(
            node.category_children
                .iter()
                .zip(0_i64..)
                .map(|(child, rank)| (child, Some(id.clone()), rank)),
        );
        stack[siblings..].reverse();
    }

    Ok(created)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::DatabaseType;
    use crate::db::tests::test_pool;
    use crate::defaults::ensure_defaults;

    #[test]
    fn test_resolve_region() {
        let real = RegionId::generate();
        let mut map = BTreeMap::new();
        map.insert("reg_dummy".to_owned(), real.clone());

        assert_eq!(resolve_region(&map, "reg_dummy"), real);
        assert_eq!(resolve_region(&map, "elsewhere").as_str(), "elsewhere");
    }

    #[test]
    fn test_resolve_seed_path() {
        let dir = std::env::temp_dir().join(format!("bazaar-seed-{}", RegionId::generate()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("data.json"), "{}").unwrap();

        let found = resolve_seed_path(&dir, Path::new("data.json")).unwrap();
        assert!(found.ends_with("data.json"));
        assert!(found.is_file());

        let missing = resolve_seed_path(&dir, Path::new("missing.json"));
        assert!(matches!(
            missing,
            Err(SeedError::FileNotFound { ref seed_file, ref resolved })
                if seed_file == Path::new("missing.json") && resolved.ends_with("missing.json")
        ));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_invalid_document_writes_nothing() {
        let pool = test_pool().await;
        let options = SeedOptions::new(DatabaseType::Sqlite);
        let document = SeedDocument::from_json(r#"{ "users": [{ "email": "broken" }] }"#).unwrap();

        let result = SeedImporter::new(&pool, &options).run_document(document).await;
        assert!(matches!(result, Err(SeedError::InvalidDocument(ref p)) if p.len() == 1));

        let mut conn = pool.acquire().await.unwrap();
        assert_eq!(db::count_rows(&mut conn, "users").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_short_document_password_fails_validation() {
        let pool = test_pool().await;
        let options = SeedOptions::new(DatabaseType::Sqlite);
        let document = SeedDocument::from_json(
            r#"{ "users": [{ "email": "a@b.co", "password": "short" }] }"#,
        )
        .unwrap();

        let result = SeedImporter::new(&pool, &options).run_document(document).await;
        assert!(matches!(
            result,
            Err(SeedError::InvalidDocument(ref p)) if p[0].contains("at least 8 characters")
        ));

        let mut conn = pool.acquire().await.unwrap();
        assert_eq!(db::count_rows(&mut conn, "users").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_category_tree_ranks_siblings_in_document_order() {
        let pool = test_pool().await;
        let document = SeedDocument::from_json(
            r#"{ "categories": [
                    { "name": "A", "category_children": [{ "name": "A1" }, { "name": "A2" }, { "name": "A3" }] },
                    { "name": "B" }
                 ] }"#,
        )
        .unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let created = create_category_tree(&mut conn, &document.categories, None)
            .await
            .unwrap();
        assert_eq!(created, 5);

        let all = categories::list(&mut conn).await.unwrap();
        let rank = |handle: &str| all.iter().find(|c| c.handle == handle).unwrap().rank;
        assert_eq!(rank("a"), 0);
        assert_eq!(rank("b"), 1);
        assert_eq!(rank("a1"), 0);
        assert_eq!(rank("a2"), 1);
        assert_eq!(rank("a3"), 2);

        let a = all.iter().find(|c| c.handle == "a").unwrap();
        for handle in ["a1", "a2", "a3"] {
            let child = all.iter().find(|c| c.handle == handle).unwrap();
            assert_eq!(child.parent_category_id.as_ref(), Some(&a.id));
        }
    }

    #[tokio::test]
    async fn test_empty_document_creates_only_bootstrap() {
        let pool = test_pool().await;
        ensure_defaults(&pool, DatabaseType::Sqlite).await.unwrap();
        let options = SeedOptions::new(DatabaseType::Sqlite);

        let summary = SeedImporter::new(&pool, &options)
            .run_document(SeedDocument::default())
            .await
            .unwrap();

        assert_eq!(
            summary,
            SeedSummary {
                bootstrap_created: true,
                ..SeedSummary::default()
            }
        );
    }

    #[tokio::test]
    async fn test_missing_profiles_fail_before_writes() {
        let pool = test_pool().await;
        let options = SeedOptions::new(DatabaseType::Sqlite);

        let result = SeedImporter::new(&pool, &options)
            .run_document(SeedDocument::default())
            .await;
        assert!(matches!(
            result,
            Err(SeedError::MissingShippingProfile(ShippingProfileKind::GiftCard))
        ));
    }
}
