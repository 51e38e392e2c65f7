//! Product route handlers.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use emporium_core::catalog::{Page, PageRequest, ProductOrdering, VariantDraft};
use emporium_core::locale::LanguageCode;
use emporium_core::richtext::render_html;
use emporium_core::{CategoryId, CollectionId, ProductId, ProductStatus, SupplierId, TagId};
use serde::Deserialize;
use tracing::instrument;

use crate::db::{ImageRepository, ProductFilter, ProductRepository, RepositoryError, TranslationRepository, VariantRepository};
use crate::error::{ApiJson, ApiPath, ApiQuery, AppError, Result};
use crate::middleware::auth::CatalogWrite;
use crate::middleware::{OptionalPrincipal, RequestContext, RequirePermission};
use crate::models::{
    ProductDetail, ProductInput, ProductPatch, ProductRecord, ProductTranslationInput, Variant,
    VariantView,
};
use crate::services::auth::Principal;
use crate::state::AppState;

/// Query parameters for `GET /api/products`.
#[derive(Debug, Default, Deserialize)]
pub struct ProductListQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    /// Honored for authenticated callers only.
    pub status: Option<ProductStatus>,
    pub category: Option<CategoryId>,
    pub collection: Option<CollectionId>,
    pub tag: Option<TagId>,
    pub supplier: Option<SupplierId>,
    pub brand: Option<String>,
    pub search: Option<String>,
    pub ordering: Option<String>,
}

impl ProductListQuery {
    /// Build the repository filter; anonymous callers only see published
    /// products.
    #[must_use]
    pub fn filter(&self, principal: Option<&Principal>) -> ProductFilter {
        let non_blank = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
        };
        ProductFilter {
            published_only: principal.is_none(),
            status: principal.and(self.status),
            category: self.category,
            collection: self.collection,
            tag: self.tag,
            supplier: self.supplier,
            brand: non_blank(&self.brand),
            search: non_blank(&self.search),
            ordering: self
                .ordering
                .as_deref()
                .and_then(ProductOrdering::parse)
                .unwrap_or_default(),
        }
    }

    #[must_use]
    pub const fn page_request(&self) -> PageRequest {
        PageRequest {
            page: self.page,
            page_size: self.page_size,
        }
    }
}

/// Payload for `POST /api/products/{id}/variants`.
#[derive(Debug, Deserialize)]
pub struct VariantBatch {
    pub variants: Vec<VariantDraft>,
}

/// Render a variant with prices in the request currency.
pub(crate) async fn present_variant(
    state: &AppState,
    ctx: &RequestContext,
    variant: Variant,
) -> VariantView {
    let currency = state.currency();
    let display_price = currency
        .price_view(variant.price(), ctx.currency, &ctx.language)
        .await;
    let display_compare_at_price = match variant.compare_at() {
        Some(price) => Some(currency.price_view(price, ctx.currency, &ctx.language).await),
        None => None,
    };
    VariantView {
        variant,
        display_price,
        display_compare_at_price,
    }
}

/// Turn a loaded record into its REST representation.
pub(crate) async fn present(
    state: &AppState,
    ctx: &RequestContext,
    record: ProductRecord,
) -> ProductDetail {
    let ProductRecord {
        product,
        variants,
        mut images,
        collection_ids,
        tag_ids,
        related_ids,
    } = record;

    let description_html = product
        .description
        .as_ref()
        .map(render_html)
        .unwrap_or_default();

    let mut views = Vec::with_capacity(variants.len());
    for variant in variants {
        views.push(present_variant(state, ctx, variant).await);
    }
    let price = views
        .iter()
        .find(|v| v.variant.is_default)
        .map(|v| v.display_price.clone());

    for image in &mut images {
        image.url = state.storage().url(&image.path);
    }

    ProductDetail {
        product,
        description_html,
        price,
        variants: views,
        images,
        collections: collection_ids,
        tags: tag_ids,
        related: related_ids,
    }
}

async fn present_all(
    state: &AppState,
    ctx: &RequestContext,
    records: Vec<ProductRecord>,
) -> Vec<ProductDetail> {
    let mut details = Vec::with_capacity(records.len());
    for record in records {
        details.push(present(state, ctx, record).await);
    }
    details
}

/// Load a product the caller may see.
async fn load_visible(
    state: &AppState,
    ctx: &RequestContext,
    principal: Option<&Principal>,
    id: ProductId,
) -> Result<ProductRecord> {
    let record = ProductRepository::new(state.pool())
        .get(id, ctx.translation())
        .await?
        .filter(|r| principal.is_some() || r.product.status.is_public())
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;
    Ok(record)
}

async fn load_detail(state: &AppState, ctx: &RequestContext, id: ProductId) -> Result<ProductDetail> {
    let record = ProductRepository::new(state.pool())
        .get(id, ctx.translation())
        .await?
        .ok_or(RepositoryError::NotFound)?;
    Ok(present(state, ctx, record).await)
}

/// Remove stored image files after their rows are gone.
pub(crate) async fn delete_files(state: &AppState, paths: &[String]) {
    for path in paths {
        if let Err(e) = state.storage().delete(path).await {
            tracing::warn!(error = %e, path = %path, "Could not delete media file");
        }
    }
}

/// `GET /api/products`
#[instrument(skip(state, principal, query))]
pub async fn index(
    State(state): State<AppState>,
    OptionalPrincipal(principal): OptionalPrincipal,
    ctx: RequestContext,
    ApiQuery(query): ApiQuery<ProductListQuery>,
) -> Result<Json<Page<ProductDetail>>> {
    let filter = query.filter(principal.as_ref());
    let page = query.page_request();
    let repo = ProductRepository::new(state.pool());
    let (ids, count) = repo.list(&filter, page).await?;
    let records = repo.load(&ids, ctx.translation()).await?;
    let results = present_all(&state, &ctx, records).await;
    Ok(Json(Page::new(results, count, page)))
}

/// `POST /api/products`
#[instrument(skip(state, input), fields(name = %input.name))]
pub async fn create(
    _: RequirePermission<CatalogWrite>,
    State(state): State<AppState>,
    ctx: RequestContext,
    ApiJson(input): ApiJson<ProductInput>,
) -> Result<(StatusCode, Json<ProductDetail>)> {
    input.validate().into_result()?;
    let id = ProductRepository::new(state.pool())
        .create(&input, state.config().locale.base_currency)
        .await?;
    tracing::info!(product_id = %id, "Product created");
    Ok((StatusCode::CREATED, Json(load_detail(&state, &ctx, id).await?)))
}

/// `GET /api/products/{id}`
#[instrument(skip(state, principal))]
pub async fn show(
    State(state): State<AppState>,
    OptionalPrincipal(principal): OptionalPrincipal,
    ctx: RequestContext,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<Json<ProductDetail>> {
    let record = load_visible(&state, &ctx, principal.as_ref(), id).await?;
    Ok(Json(present(&state, &ctx, record).await))
}

/// `GET /api/products/slug/{slug}`
#[instrument(skip(state, principal))]
pub async fn show_by_slug(
    State(state): State<AppState>,
    OptionalPrincipal(principal): OptionalPrincipal,
    ctx: RequestContext,
    ApiPath(slug): ApiPath<String>,
) -> Result<Json<ProductDetail>> {
    let id = ProductRepository::new(state.pool())
        .id_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {slug}")))?;
    let record = load_visible(&state, &ctx, principal.as_ref(), id).await?;
    Ok(Json(present(&state, &ctx, record).await))
}

/// `PATCH /api/products/{id}`
#[instrument(skip(state, patch))]
pub async fn update(
    _: RequirePermission<CatalogWrite>,
    State(state): State<AppState>,
    ctx: RequestContext,
    ApiPath(id): ApiPath<ProductId>,
    ApiJson(patch): ApiJson<ProductPatch>,
) -> Result<Json<ProductDetail>> {
    patch.validate().into_result()?;
    ProductRepository::new(state.pool())
        .update(id, &patch, state.config().locale.base_currency)
        .await?;
    tracing::info!(product_id = %id, "Product updated");
    Ok(Json(load_detail(&state, &ctx, id).await?))
}

/// `DELETE /api/products/{id}`
#[instrument(skip(state))]
pub async fn delete(
    _: RequirePermission<CatalogWrite>,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<StatusCode> {
    let paths = ImageRepository::new(state.pool())
        .paths_for_products(&[id.as_i32()])
        .await?;
    ProductRepository::new(state.pool()).delete(id).await?;
    delete_files(&state, &paths).await;
    tracing::info!(product_id = %id, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/products/{id}/recommendations`
#[instrument(skip(state, principal))]
pub async fn recommendations(
    State(state): State<AppState>,
    OptionalPrincipal(principal): OptionalPrincipal,
    ctx: RequestContext,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<Json<Vec<ProductDetail>>> {
    load_visible(&state, &ctx, principal.as_ref(), id).await?;
    let repo = ProductRepository::new(state.pool());
    let ids = repo.recommendations(id).await?;
    let records = repo.load(&ids, ctx.translation()).await?;
    Ok(Json(present_all(&state, &ctx, records).await))
}

/// `POST /api/products/{id}/variants`
#[instrument(skip(state, batch), fields(count = batch.variants.len()))]
pub async fn add_variants(
    _: RequirePermission<CatalogWrite>,
    State(state): State<AppState>,
    ctx: RequestContext,
    ApiPath(id): ApiPath<ProductId>,
    ApiJson(batch): ApiJson<VariantBatch>,
) -> Result<(StatusCode, Json<ProductDetail>)> {
    VariantRepository::new(state.pool())
        .add(id, &batch.variants, state.config().locale.base_currency)
        .await?;
    Ok((StatusCode::CREATED, Json(load_detail(&state, &ctx, id).await?)))
}

/// Parse a translation language and check it is a configured, non-default one.
pub(crate) fn translation_language(state: &AppState, raw: &str) -> Result<LanguageCode> {
    let locale = &state.config().locale;
    let language = LanguageCode::parse(raw).map_err(|e| AppError::field("language", &e.to_string()))?;
    if language == locale.default_language {
        return Err(AppError::field(
            "language",
            "the default language is edited on the record itself",
        ));
    }
    if !locale.languages.contains(&language) {
        return Err(AppError::field("language", "language is not supported"));
    }
    Ok(language)
}

/// `PUT /api/products/{id}/translations/{lang}`
#[instrument(skip(state, input))]
pub async fn put_translation(
    _: RequirePermission<CatalogWrite>,
    State(state): State<AppState>,
    ctx: RequestContext,
    ApiPath((id, lang)): ApiPath<(ProductId, String)>,
    ApiJson(input): ApiJson<ProductTranslationInput>,
) -> Result<Json<ProductDetail>> {
    let language = translation_language(&state, &lang)?;
    input.validate().into_result()?;
    TranslationRepository::new(state.pool())
        .upsert_product(id, &language, &input)
        .await
        .map_err(|e| match e {
            RepositoryError::Invalid(errors) if errors.contains("product_id") => {
                AppError::NotFound(format!("product {id}"))
            }
            other => other.into(),
        })?;
    tracing::info!(product_id = %id, language = %language, "Product translation saved");

    let record = ProductRepository::new(state.pool())
        .get(id, Some(&language))
        .await?
        .ok_or(RepositoryError::NotFound)?;
    let ctx = ctx.with_language(language, &state.config().locale);
    Ok(Json(present(&state, &ctx, record).await))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use emporium_core::Role;

    use super::*;

    fn principal() -> Principal {
        Principal {
            role: Role::Viewer,
            expires_at: Utc::now(),
        }
    }

    #[test]
    fn test_anonymous_filter_is_published_only() {
        let query = ProductListQuery {
            status: Some(ProductStatus::Draft),
            ..ProductListQuery::default()
        };
        let filter = query.filter(None);
        assert!(filter.published_only);
        assert_eq!(filter.status, None);
    }

    #[test]
    fn test_authenticated_filter_honors_status() {
        let query = ProductListQuery {
            status: Some(ProductStatus::Draft),
            brand: Some("  ".to_string()),
            search: Some(" shirt ".to_string()),
            ordering: Some("-price".to_string()),
            ..ProductListQuery::default()
        };
        let filter = query.filter(Some(&principal()));
        assert!(!filter.published_only);
        assert_eq!(filter.status, Some(ProductStatus::Draft));
        assert_eq!(filter.brand, None);
        assert_eq!(filter.search.as_deref(), Some("shirt"));
        assert_eq!(filter.ordering, ProductOrdering::Price { descending: true });
    }

    #[test]
    fn test_unknown_ordering_falls_back() {
        let query = ProductListQuery {
            ordering: Some("popularity".to_string()),
            ..ProductListQuery::default()
        };
        assert_eq!(query.filter(None).ordering, ProductOrdering::default());
    }
}
