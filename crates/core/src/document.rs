//! The seed document: initial data for a fresh store, as read from JSON.
//!
//! ```json
//! {
//!   "store": { "currencies": ["eur", "usd"] },
//!   "users": [{ "email": "admin@example.com", "password": "supersecret" }],
//!   "regions": [{ "id": "test-region-eu", "name": "EU", "currency_code": "eur",
//!                 "countries": ["de", "fr"], "payment_providers": ["manual"],
//!                 "fulfillment_providers": ["manual"] }],
//!   "shipping_options": [{ "name": "Standard", "region_id": "test-region-eu",
//!                          "provider_id": "manual", "price_type": "flat_rate",
//!                          "amount": 1000 }],
//!   "products": [{ "title": "T-Shirt", "options": [{ "title": "Size" }],
//!                  "variants": [{ "title": "S", "options": [{ "value": "S" }],
//!                                 "prices": [{ "currency_code": "eur", "amount": 1950 }] }] }],
//!   "categories": [{ "name": "Apparel", "category_children": [{ "name": "Shirts" }] }]
//! }
//! ```
//!
//! Every collection may be omitted. Unknown keys are ignored so documents
//! written for richer schemas still load.

use std::collections::HashSet;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::types::{Email, ProductStatus, ShippingPriceType, UserRole};

/// Minimum password length for any user account.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Free-form JSON object attached to most entities.
pub type Metadata = Map<String, Value>;

/// Parsed seed document.
///
/// Read once, consumed by the importer, then discarded.
#[derive(Debug, Default, Deserialize)]
pub struct SeedDocument {
    /// Attributes applied to the existing singleton store.
    #[serde(default)]
    pub store: Option<StoreAttrs>,
    #[serde(default)]
    pub users: Vec<UserSpec>,
    #[serde(default)]
    pub regions: Vec<RegionSpec>,
    #[serde(default)]
    pub shipping_options: Vec<ShippingOptionSpec>,
    #[serde(default)]
    pub products: Vec<ProductSpec>,
    /// Category forest; children nest under `category_children`.
    #[serde(default)]
    pub categories: Vec<CategorySpec>,
}

/// Partial update for the singleton store.
#[derive(Debug, Default, Deserialize)]
pub struct StoreAttrs {
    pub name: Option<String>,
    pub default_currency_code: Option<String>,
    /// Replaces the store's currency set when present.
    pub currencies: Option<Vec<String>>,
    pub swap_link_template: Option<String>,
    pub payment_link_template: Option<String>,
    pub invite_link_template: Option<String>,
    pub metadata: Option<Metadata>,
}

/// A back-office user to create.
#[derive(Debug, Deserialize)]
pub struct UserSpec {
    pub email: String,
    /// Plaintext password. Hashed by the user-creation routine, never stored.
    #[serde(default, deserialize_with = "deserialize_secret")]
    pub password: Option<SecretString>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(default)]
    pub role: UserRole,
    pub metadata: Option<Metadata>,
}

/// A region to create.
#[derive(Debug, Clone, Deserialize)]
pub struct RegionSpec {
    /// Either a real `reg_<suffix>` id or a placeholder that shipping options
    /// and prices reference within this document.
    pub id: Option<String>,
    pub name: String,
    pub currency_code: String,
    #[serde(default)]
    pub tax_rate: f64,
    pub tax_code: Option<String>,
    /// ISO 3166-1 alpha-2 country codes.
    #[serde(default)]
    pub countries: Vec<String>,
    #[serde(default)]
    pub payment_providers: Vec<String>,
    #[serde(default)]
    pub fulfillment_providers: Vec<String>,
    pub metadata: Option<Metadata>,
}

/// A shipping option to create.
#[derive(Debug, Clone, Deserialize)]
pub struct ShippingOptionSpec {
    pub name: String,
    /// Real region id or a region placeholder from this document.
    pub region_id: String,
    pub provider_id: String,
    pub price_type: ShippingPriceType,
    pub amount: Option<i64>,
    #[serde(default)]
    pub is_return: bool,
    #[serde(default)]
    pub admin_only: bool,
    /// Selects the gift-card shipping profile. Not persisted.
    #[serde(default)]
    pub is_giftcard: bool,
    /// Provider-specific payload.
    #[serde(default)]
    pub data: Metadata,
    pub metadata: Option<Metadata>,
}

/// A product with its option axes and variants.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductSpec {
    pub title: String,
    pub subtitle: Option<String>,
    pub description: Option<String>,
    pub description_1: Option<String>,
    pub description_2: Option<String>,
    /// URL handle; derived from the title when absent.
    pub handle: Option<String>,
    #[serde(default)]
    pub is_giftcard: bool,
    #[serde(default = "default_true")]
    pub discountable: bool,
    /// Defaults to published when absent.
    pub status: Option<ProductStatus>,
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    pub weight: Option<i64>,
    pub length: Option<i64>,
    pub height: Option<i64>,
    pub width: Option<i64>,
    pub material: Option<String>,
    #[serde(default)]
    pub options: Vec<ProductOptionSpec>,
    #[serde(default)]
    pub variants: Vec<VariantSpec>,
    pub metadata: Option<Metadata>,
}

impl ProductSpec {
    /// The handle to persist: the explicit one, or a slug of the title.
    #[must_use]
    pub fn handle_or_default(&self) -> String {
        self.handle
            .clone()
            .unwrap_or_else(|| slugify(&self.title))
    }
}

/// A named option axis, e.g. "Size".
#[derive(Debug, Clone, Deserialize)]
pub struct ProductOptionSpec {
    pub title: String,
    /// Allowed values. Empty means any value is accepted.
    #[serde(default)]
    pub values: Vec<String>,
}

/// A purchasable variant of a product.
#[derive(Debug, Clone, Deserialize)]
pub struct VariantSpec {
    pub title: String,
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub ean: Option<String>,
    pub upc: Option<String>,
    #[serde(default)]
    pub inventory_quantity: i64,
    #[serde(default)]
    pub allow_backorder: bool,
    #[serde(default = "default_true")]
    pub manage_inventory: bool,
    pub weight: Option<i64>,
    pub length: Option<i64>,
    pub height: Option<i64>,
    pub width: Option<i64>,
    #[serde(default)]
    pub prices: Vec<PriceSpec>,
    /// One selection per product option, matched by position.
    #[serde(default)]
    pub options: Vec<VariantOptionSpec>,
    pub metadata: Option<Metadata>,
}

/// A price for a variant, in the currency's minor unit.
#[derive(Debug, Clone, Deserialize)]
pub struct PriceSpec {
    pub currency_code: Option<String>,
    pub amount: i64,
    /// Real region id or a region placeholder from this document.
    pub region_id: Option<String>,
}

/// A variant's value for one option axis.
#[derive(Debug, Clone, Deserialize)]
pub struct VariantOptionSpec {
    pub value: String,
}

/// A node of the category tree.
#[derive(Debug, Clone, Deserialize)]
pub struct CategorySpec {
    pub name: String,
    /// URL handle; derived from the name when absent.
    pub handle: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
    pub is_internal: Option<bool>,
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub category_children: Vec<CategorySpec>,
}

impl CategorySpec {
    /// The handle to persist: the explicit one, or a slug of the name.
    #[must_use]
    pub fn handle_or_default(&self) -> String {
        self.handle.clone().unwrap_or_else(|| slugify(&self.name))
    }

    /// Depth of the subtree rooted at this node (a leaf has depth 1).
    #[must_use]
    pub fn depth(&self) -> usize {
        1 + self
            .category_children
            .iter()
            .map(Self::depth)
            .max()
            .unwrap_or(0)
    }

    /// Number of nodes in the subtree rooted at this node.
    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + self
            .category_children
            .iter()
            .map(Self::node_count)
            .sum::<usize>()
    }
}

impl SeedDocument {
    /// Parse a document from JSON text.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the text is not a well-formed document.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Check the document shape before anything is written.
    ///
    /// Collects every problem rather than stopping at the first, so one run
    /// reports all of them.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for (i, user) in self.users.iter().enumerate() {
            if let Err(e) = Email::parse(&user.email) {
                errors.push(format!("users[{i}]: invalid email '{}': {e}", user.email));
            }
            if user
                .password
                .as_ref()
                .is_some_and(|p| p.expose_secret().len() < MIN_PASSWORD_LENGTH)
            {
                errors.push(format!(
                    "users[{i}]: password must be at least {MIN_PASSWORD_LENGTH} characters"
                ));
            }
        }

        let mut region_ids = HashSet::new();
        for (i, region) in self.regions.iter().enumerate() {
            if region.name.trim().is_empty() {
                errors.push(format!("regions[{i}]: name is required"));
            }
            if region.currency_code.trim().is_empty() {
                errors.push(format!("regions[{i}]: currency_code is required"));
            }
            if region.id.as_deref().is_some_and(|id| id.trim().is_empty()) {
                errors.push(format!("regions[{i}]: id cannot be blank"));
            }
            if let Some(id) = region.id.as_deref()
                && !region_ids.insert(id)
            {
                errors.push(format!("regions[{i}]: duplicate id '{id}'"));
            }
        }

        for (i, option) in self.shipping_options.iter().enumerate() {
            if option.name.trim().is_empty() {
                errors.push(format!("shipping_options[{i}]: name is required"));
            }
            if option.region_id.trim().is_empty() {
                errors.push(format!("shipping_options[{i}]: region_id is required"));
            }
            if option.price_type == ShippingPriceType::FlatRate && option.amount.is_none() {
                errors.push(format!(
                    "shipping_options[{i}]: flat_rate options require an amount"
                ));
            }
        }

        for (i, product) in self.products.iter().enumerate() {
            validate_product(i, product, &mut errors);
        }

        for (i, category) in self.categories.iter().enumerate() {
            validate_category(&format!("categories[{i}]"), category, &mut errors);
        }

        errors
    }
}

fn validate_product(index: usize, product: &ProductSpec, errors: &mut Vec<String>) {
    let at = format!("products[{index}]");

    if product.title.trim().is_empty() {
        errors.push(format!("{at}: title is required"));
    } else if product.handle_or_default().is_empty() {
        errors.push(format!("{at}: handle is empty; set one explicitly"));
    }

    let mut titles = HashSet::new();
    for option in &product.options {
        if option.title.trim().is_empty() {
            errors.push(format!("{at}: option title is required"));
        } else if !titles.insert(option.title.as_str()) {
            errors.push(format!("{at}: duplicate option title '{}'", option.title));
        }
    }

    for (v, variant) in product.variants.iter().enumerate() {
        let at = format!("{at}.variants[{v}]");

        if variant.options.len() != product.options.len() {
            errors.push(format!(
                "{at}: has {} option values but the product defines {} options",
                variant.options.len(),
                product.options.len()
            ));
        }

        for (selection, option) in variant.options.iter().zip(&product.options) {
            if !option.values.is_empty() && !option.values.contains(&selection.value) {
                errors.push(format!(
                    "{at}: '{}' is not a value of option '{}'",
                    selection.value, option.title
                ));
            }
        }

        for (p, price) in variant.prices.iter().enumerate() {
            let has_currency = price
                .currency_code
                .as_deref()
                .is_some_and(|c| !c.trim().is_empty());
            if !has_currency && price.region_id.is_none() {
                errors.push(format!(
                    "{at}.prices[{p}]: either currency_code or region_id is required"
                ));
            }
        }
    }
}

fn validate_category(at: &str, category: &CategorySpec, errors: &mut Vec<String>) {
    if category.name.trim().is_empty() {
        errors.push(format!("{at}: name is required"));
    } else if category.handle_or_default().is_empty() {
        errors.push(format!("{at}: handle is empty; set one explicitly"));
    }
    for (i, child) in category.category_children.iter().enumerate() {
        validate_category(&format!("{at}.category_children[{i}]"), child, errors);
    }
}

/// Lowercase, ASCII-alphanumeric, dash-separated form of `s`.
#[must_use]
pub fn slugify(s: &str) -> String {
    let mut slug = String::with_capacity(s.len());
    for c in s.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

const fn default_true() -> bool {
    true
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.map(SecretString::from))
}
