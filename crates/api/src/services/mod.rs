//! Services behind the route handlers.
//!
//! # Services
//!
//! - `auth` - Bearer token issue and verification
//! - `bundle` - Admin bundle installation
//! - `currency` - Exchange rates and price conversion
//! - `page_cache` - Cached public GET responses
//! - `storage` - Media storage backends

pub mod auth;
pub mod bundle;
pub mod currency;
pub mod page_cache;
pub mod storage;
