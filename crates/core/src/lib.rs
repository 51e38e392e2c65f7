//! Emporium Core - catalog domain types and business rules.
//!
//! This crate is shared by every Emporium component:
//! - `api` - REST and GraphQL server for the catalog, tax, and media
//! - `cli` - Migrations, fixtures, diagnostics, and smoke tests
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Every catalog invariant that can be decided without
//! storage lives here so it can be tested in isolation.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices and currencies, statuses, roles
//! - [`catalog`] - Variant batches, category placement, tax rates, ordering
//! - [`locale`] - Language negotiation and translation fallback
//! - [`money`] - Locale-aware currency formatting
//! - [`richtext`] - JSON rich-text documents rendered to sanitized HTML
//! - [`slug`] - URL slug derivation
//! - [`validation`] - Field-level validation errors

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod locale;
pub mod money;
pub mod richtext;
pub mod slug;
pub mod types;
pub mod validation;

pub use types::*;
pub use validation::ValidationErrors;
