//! Bazaar Core - Shared types library.
//!
//! This crate provides the types used across all Bazaar components:
//! - `seed` - Database access and the seed importer
//! - `cli` - Command-line tools for seeding, migrations and user management
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no database
//! access. Parsing a seed document from a string lives here; reading the file
//! and writing rows does not.
//!
//! # Modules
//!
//! - [`types`] - Prefixed entity ids, emails and status enums
//! - [`document`] - The seed document model and its upfront validation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod document;
pub mod types;

pub use document::SeedDocument;
pub use types::*;
