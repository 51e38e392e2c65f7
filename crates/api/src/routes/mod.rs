//! HTTP route handlers for the REST API.
//!
//! # Route Structure
//!
//! ```text
//! # Products
//! GET    /api/products                          - Filtered, paginated listing
//! POST   /api/products                          - Create with variants
//! GET    /api/products/{id}                     - Detail
//! PATCH  /api/products/{id}                     - Partial update
//! DELETE /api/products/{id}                     - Delete (and its image files)
//! GET    /api/products/slug/{slug}              - Detail by slug
//! GET    /api/products/{id}/recommendations     - Related products
//! POST   /api/products/{id}/variants            - Add variants
//! PUT    /api/products/{id}/translations/{lang} - Upsert a translation
//! POST   /api/products/{id}/images              - Upload an image (multipart)
//! DELETE /api/products/{id}/images/{image_id}   - Remove an image
//! POST   /api/products/bulk/status              - Bulk status change
//! POST   /api/products/bulk/delete              - Bulk delete
//! PATCH  /api/variants/{id}                     - Update a variant
//! DELETE /api/variants/{id}                     - Delete a variant
//!
//! # Taxonomy
//! GET/POST           /api/categories
//! GET                /api/categories/tree
//! GET/PATCH/DELETE   /api/categories/{id}
//! PUT                /api/categories/{id}/translations/{lang}
//! GET/POST           /api/{collections,suppliers,tags,product-types}
//! GET/PATCH/DELETE   /api/{collections,suppliers,tags,product-types}/{id}
//!
//! # Tax
//! GET/POST           /api/tax-classes
//! GET/PATCH/DELETE   /api/tax-classes/{id}
//! GET/POST           /api/tax-classes/{id}/rates
//! GET                /api/tax-classes/{id}/lookup
//! GET/PATCH/DELETE   /api/tax-rates/{id}
//!
//! # Currency
//! GET    /api/currencies                        - Supported currencies and rates
//! GET    /api/currencies/convert                - Convert an amount
//!
//! # Admin
//! POST   /api/admin/bundle                      - Replace the admin UI bundle
//! ```

pub mod admin;
pub mod bulk;
pub mod categories;
pub mod collections;
pub mod currency;
pub mod images;
pub mod product_types;
pub mod products;
pub mod suppliers;
pub mod tags;
pub mod tax;
pub mod variants;

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    routing::{delete, get, patch, post, put},
};

use crate::middleware::page_cache_middleware;
use crate::state::AppState;

/// Create the product and variant routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::index).post(products::create))
        .route("/products/slug/{slug}", get(products::show_by_slug))
        .route("/products/bulk/status", post(bulk::set_status))
        .route("/products/bulk/delete", post(bulk::delete))
        .route(
            "/products/{id}",
            get(products::show)
                .patch(products::update)
                .delete(products::delete),
        )
        .route(
            "/products/{id}/recommendations",
            get(products::recommendations),
        )
        .route("/products/{id}/variants", post(products::add_variants))
        .route(
            "/products/{id}/translations/{lang}",
            put(products::put_translation),
        )
        .route(
            "/products/{id}/images",
            post(images::upload).layer(DefaultBodyLimit::max(images::MAX_IMAGE_BYTES)),
        )
        .route("/products/{id}/images/{image_id}", delete(images::delete))
        .route(
            "/variants/{id}",
            patch(variants::update).delete(variants::delete),
        )
}

/// Create the category, collection, tag, supplier and product type routes router.
pub fn taxonomy_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(categories::index).post(categories::create))
        .route("/categories/tree", get(categories::tree))
        .route(
            "/categories/{id}",
            get(categories::show)
                .patch(categories::update)
                .delete(categories::delete),
        )
        .route(
            "/categories/{id}/translations/{lang}",
            put(categories::put_translation),
        )
        .route(
            "/collections",
            get(collections::index).post(collections::create),
        )
        .route(
            "/collections/{id}",
            get(collections::show)
                .patch(collections::update)
                .delete(collections::delete),
        )
        .route("/suppliers", get(suppliers::index).post(suppliers::create))
        .route(
            "/suppliers/{id}",
            get(suppliers::show)
                .patch(suppliers::update)
                .delete(suppliers::delete),
        )
        .route("/tags", get(tags::index).post(tags::create))
        .route(
            "/tags/{id}",
            get(tags::show).patch(tags::update).delete(tags::delete),
        )
        .route(
            "/product-types",
            get(product_types::index).post(product_types::create),
        )
        .route(
            "/product-types/{id}",
            get(product_types::show)
                .patch(product_types::update)
                .delete(product_types::delete),
        )
}

/// Create the tax routes router.
pub fn tax_routes() -> Router<AppState> {
    Router::new()
        .route("/tax-classes", get(tax::index).post(tax::create))
        .route(
            "/tax-classes/{id}",
            get(tax::show).patch(tax::update).delete(tax::delete),
        )
        .route(
            "/tax-classes/{id}/rates",
            get(tax::rates).post(tax::create_rate),
        )
        .route("/tax-classes/{id}/lookup", get(tax::lookup))
        .route(
            "/tax-rates/{id}",
            get(tax::show_rate)
                .patch(tax::update_rate)
                .delete(tax::delete_rate),
        )
}

/// Create the currency and admin routes router.
pub fn misc_routes() -> Router<AppState> {
    Router::new()
        .route("/currencies", get(currency::index))
        .route("/currencies/convert", get(currency::convert))
        .route(
            "/admin/bundle",
            post(admin::upload_bundle).layer(DefaultBodyLimit::max(admin::MAX_UPLOAD_BYTES)),
        )
}

/// Create all REST routes, nested under `/api` behind the page cache.
pub fn routes(state: &AppState) -> Router<AppState> {
    let api = Router::new()
        .merge(product_routes())
        .merge(taxonomy_routes())
        .merge(tax_routes())
        .merge(misc_routes())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            page_cache_middleware,
        ));
    Router::new().nest("/api", api)
}
