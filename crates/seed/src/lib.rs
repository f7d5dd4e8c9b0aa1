//! Bazaar Seed - populate a fresh store database from a JSON document.
//!
//! # Architecture
//!
//! - [`config`] - Environment configuration (`SeedConfig`, `SeedOptions`)
//! - [`db`] - Pools, transactions, migrations and per-table repositories
//! - [`auth`] - The single user-creation path, with Argon2 password hashing
//! - [`defaults`] - Sales channel, store and shipping profiles a database needs
//! - [`importer`] - The transactional seed pipeline
//! - [`bootstrap`] - The once-per-database bootstrap account
//!
//! # Example
//!
//! ```rust,ignore
//! let config = SeedConfig::from_env(Path::new("."))?;
//! let pool = db::create_pool(&config.database_url, config.max_connections).await?;
//! db::migrate(&pool, config.database_type).await?;
//! ensure_defaults(&pool, config.database_type).await?;
//!
//! let path = resolve_seed_path(Path::new("."), Path::new("data/seed.json"))?;
//! let summary = SeedImporter::new(&pool, &config.options).run(&path).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod db;
pub mod defaults;
pub mod error;
pub mod importer;

pub use bootstrap::{IdentifierGenerator, RandomIdentifiers, ensure_bootstrap_account};
pub use config::{BootstrapConfig, ConfigError, SeedConfig, SeedOptions};
pub use db::DatabaseType;
pub use defaults::{DefaultsReport, ensure_defaults};
pub use error::SeedError;
pub use importer::{
    SeedImporter, SeedSummary, create_category_tree, read_document, resolve_seed_path,
    seed_document,
};
