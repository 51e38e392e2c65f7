//! HTTP middleware stack for the API.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. CORS
//! 5. Page cache (anonymous catalog reads under `/api`)
//!
//! Authentication and request context are extractors rather than layers.

pub mod auth;
pub mod context;
pub mod page_cache;
pub mod request_id;

pub use auth::{OptionalPrincipal, PermissionMarker, RequirePermission};
pub use context::RequestContext;
pub use page_cache::page_cache_middleware;
pub use request_id::request_id_middleware;
