//! Product image upload and removal.

use axum::extract::{Multipart, State};
use axum::{Json, http::StatusCode};
use bytes::Bytes;
use emporium_core::{ImageId, ProductId};
use tracing::instrument;

use crate::db::{ImageRepository, ProductRepository, RepositoryError};
use crate::error::{ApiPath, AppError, Result};
use crate::middleware::RequirePermission;
use crate::middleware::auth::CatalogWrite;
use crate::models::ProductImage;
use crate::services::storage::clean_name;
use crate::state::AppState;

/// Request body limit for image uploads.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "avif"];

/// Longest alt text kept.
const MAX_ALT_LEN: usize = 255;

struct Upload {
    file_name: String,
    content: Bytes,
    alt: String,
}

/// Lowercased extension if it is an accepted image type.
fn image_extension(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    (!stem.is_empty() && ALLOWED_EXTENSIONS.contains(&ext.as_str())).then_some(ext)
}

/// Storage name for an upload: `products/{id}/{file}` with the file name
/// reduced to its last path segment.
fn storage_name(product_id: ProductId, file_name: &str) -> std::result::Result<String, AppError> {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or_default();
    Ok(clean_name(&format!("products/{product_id}/{base}"))?)
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload> {
    let mut file: Option<(String, Bytes)> = None;
    let mut alt = String::new();

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("image") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let is_image = field
                    .content_type()
                    .is_some_and(|ct| ct.starts_with("image/"));
                if !is_image {
                    return Err(AppError::field("image", "upload must be an image"));
                }
                file = Some((file_name, field.bytes().await?));
            }
            Some("alt") => {
                alt = field.text().await?.trim().chars().take(MAX_ALT_LEN).collect();
            }
            _ => {}
        }
    }

    let (file_name, content) = file.ok_or_else(|| AppError::field("image", "this field is required"))?;
    if content.is_empty() {
        return Err(AppError::field("image", "the uploaded file is empty"));
    }
    if image_extension(&file_name).is_none() {
        return Err(AppError::field(
            "image",
            "unsupported file type; use jpg, png, gif, webp or avif",
        ));
    }
    Ok(Upload {
        file_name,
        content,
        alt,
    })
}

/// `POST /api/products/{id}/images` (multipart: `image`, optional `alt`)
#[instrument(skip(state, multipart))]
pub async fn upload(
    _: RequirePermission<CatalogWrite>,
    State(state): State<AppState>,
    ApiPath(product_id): ApiPath<ProductId>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ProductImage>)> {
    ProductRepository::new(state.pool())
        .get(product_id, None)
        .await?
        .ok_or(RepositoryError::NotFound)?;

    let upload = read_upload(multipart).await?;
    let name = storage_name(product_id, &upload.file_name)?;
    let size = upload.content.len();
    let stored = state.storage().save(&name, upload.content).await?;

    let mut image = match ImageRepository::new(state.pool())
        .insert(product_id, &stored, &upload.alt)
        .await
    {
        Ok(image) => image,
        Err(e) => {
            if let Err(cleanup) = state.storage().delete(&stored).await {
                tracing::warn!(error = %cleanup, path = %stored, "Could not remove orphaned upload");
            }
            return Err(e.into());
        }
    };
    image.url = state.storage().url(&image.path);
    tracing::info!(image_id = %image.id, path = %image.path, size, "Image uploaded");
    Ok((StatusCode::CREATED, Json(image)))
}

/// `DELETE /api/products/{id}/images/{image_id}`
#[instrument(skip(state))]
pub async fn delete(
    _: RequirePermission<CatalogWrite>,
    State(state): State<AppState>,
    ApiPath((product_id, image_id)): ApiPath<(ProductId, ImageId)>,
) -> Result<StatusCode> {
    let repo = ImageRepository::new(state.pool());
    let image = repo
        .get(product_id, image_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("image {image_id}")))?;
    repo.delete(product_id, image_id).await?;
    super::products::delete_files(&state, std::slice::from_ref(&image.path)).await;
    tracing::info!(image_id = %image_id, "Image deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_image_extension() {
        assert_eq!(image_extension("shirt.JPG").as_deref(), Some("jpg"));
        assert_eq!(image_extension("a.b.webp").as_deref(), Some("webp"));
        assert!(image_extension("notes.txt").is_none());
        assert!(image_extension(".png").is_none());
        assert!(image_extension("png").is_none());
    }

    #[test]
    fn test_storage_name_strips_client_paths() {
        let id = ProductId::new(7);
        assert_eq!(storage_name(id, "shirt.jpg").unwrap(), "products/7/shirt.jpg");
        assert_eq!(
            storage_name(id, "C:\\Users\\me\\shirt.jpg").unwrap(),
            "products/7/shirt.jpg"
        );
        assert_eq!(storage_name(id, "../../etc/x.png").unwrap(), "products/7/x.png");
    }
}
