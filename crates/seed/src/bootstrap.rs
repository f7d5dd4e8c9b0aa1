//! The bootstrap account: one user and the stores they own, created once per
//! database.
//!
//! The account is keyed by email. If a user with that email exists the block
//! does nothing, so re-running a seed never duplicates it.

use sqlx::AnyConnection;
use tracing::{debug, info, instrument};

use bazaar_core::{Email, RANDOM_IDENTIFIER_LENGTH, StoreId, UserId, random_identifier};

use crate::auth::{self, AuthError, NewUser};
use crate::config::BootstrapConfig;
use crate::db::stores::{self, CreateStore};
use crate::db::{sales_channels, users};
use crate::error::SeedError;

/// Source of ids for the bootstrap user and stores.
pub trait IdentifierGenerator: Send + Sync {
    /// Produce a fresh identifier.
    fn next_id(&self) -> String;
}

/// Random lowercase hex identifiers of a fixed length.
#[derive(Debug, Clone, Copy)]
pub struct RandomIdentifiers {
    length: usize,
}

impl RandomIdentifiers {
    #[must_use]
    pub const fn new(length: usize) -> Self {
        Self { length }
    }
}

impl Default for RandomIdentifiers {
    fn default() -> Self {
        Self::new(RANDOM_IDENTIFIER_LENGTH)
    }
}

impl IdentifierGenerator for RandomIdentifiers {
    fn next_id(&self) -> String {
        random_identifier(self.length)
    }
}

/// Create the bootstrap account unless its email is already taken.
///
/// Returns whether anything was created.
///
/// # Errors
///
/// Returns `SeedError::SalesChannelNotFound` if the configured channel does
/// not exist, or any error from user or store creation.
#[instrument(skip(conn, config, identifiers), fields(stores = config.store_names.len()))]
pub async fn ensure_bootstrap_account(
    conn: &mut AnyConnection,
    config: &BootstrapConfig,
    identifiers: &dyn IdentifierGenerator,
) -> Result<bool, SeedError> {
    let email = Email::parse(&config.email).map_err(AuthError::from)?;

    if users::exists_by_email(conn, &email).await? {
        debug!("Bootstrap account already exists");
        return Ok(false);
    }

    let user = auth::create_user(
        conn,
        NewUser {
            id: Some(UserId::from_raw(identifiers.next_id())),
            email: config.email.clone(),
            password: config.password.clone(),
            first_name: Some(config.first_name.clone()),
            last_name: Some(config.last_name.clone()),
            role: config.role,
            metadata: None,
        },
    )
    .await?;

    let channel = sales_channels::find_id_by_name(conn, &config.sales_channel_name)
        .await?
        .ok_or_else(|| SeedError::SalesChannelNotFound(config.sales_channel_name.clone()))?;

    for name in &config.store_names {
        let store = stores::create(
            conn,
            CreateStore {
                id: StoreId::from_raw(identifiers.next_id()),
                name: name.clone(),
                default_currency_code: config.currency_code.clone(),
                default_sales_channel_id: Some(channel.clone()),
                is_default: false,
            },
        )
        .await?;
        stores::link_user(conn, &user.id, &store.id).await?;
    }

    info!(user_id = %user.id, "Bootstrap account created");
    Ok(true)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::db::{self, tests::test_pool};
    use crate::defaults::ensure_defaults_in;

    struct Counter(AtomicUsize);

    impl IdentifierGenerator for Counter {
        fn next_id(&self) -> String {
            format!("id{:08}", self.0.fetch_add(1, Ordering::SeqCst))
        }
    }

    #[test]
    fn test_random_identifiers() {
        let ids = RandomIdentifiers::default();
        let a = ids.next_id();
        assert_eq!(a.len(), 10);
        assert_ne!(a, ids.next_id());
    }

    #[tokio::test]
    async fn test_bootstrap_runs_once() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        ensure_defaults_in(&mut conn).await.unwrap();
        let config = BootstrapConfig::default();
        let ids = Counter(AtomicUsize::new(0));

        assert!(ensure_bootstrap_account(&mut conn, &config, &ids).await.unwrap());
        assert!(!ensure_bootstrap_account(&mut conn, &config, &ids).await.unwrap());

        // default store + two bootstrap stores
        assert_eq!(db::count_rows(&mut conn, "stores").await.unwrap(), 3);
        assert_eq!(db::count_rows(&mut conn, "user_stores").await.unwrap(), 2);

        let user_id = UserId::from_raw("id00000000");
        let linked = stores::ids_for_user(&mut conn, &user_id).await.unwrap();
        assert_eq!(
            linked,
            vec![StoreId::from_raw("id00000001"), StoreId::from_raw("id00000002")]
        );
        let first = stores::get(&mut conn, &linked[0]).await.unwrap().unwrap();
        assert_eq!(first.name, "T-Shirts");
        assert_eq!(first.default_currency_code, "usd");
        assert!(first.default_sales_channel_id.is_some());
    }

    #[tokio::test]
    async fn test_missing_sales_channel() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let config = BootstrapConfig {
            sales_channel_name: "Nowhere".to_owned(),
            ..BootstrapConfig::default()
        };

        let result = ensure_bootstrap_account(&mut conn, &config, &RandomIdentifiers::default()).await;
        assert!(matches!(result, Err(SeedError::SalesChannelNotFound(name)) if name == "Nowhere"));
    }
}
