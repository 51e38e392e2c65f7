//! Admin bundle upload.

use axum::Json;
use axum::extract::{Multipart, State};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::RequirePermission;
use crate::middleware::auth::Staff;
use crate::services::bundle::{self, BundleSummary};
use crate::state::AppState;

/// Request body limit for bundle uploads.
pub const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// `POST /api/admin/bundle` (multipart: `bundle`)
///
/// Replaces the admin UI served under `/admin`.
#[instrument(skip(state, multipart))]
pub async fn upload_bundle(
    _: RequirePermission<Staff>,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<BundleSummary>> {
    let mut archive = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("bundle") {
            archive = Some(field.bytes().await?);
        }
    }
    let archive = archive.ok_or_else(|| AppError::field("bundle", "this field is required"))?;

    let summary = bundle::install(state.config().admin_bundle_dir.clone(), archive).await?;
    state.page_cache().clear();
    tracing::info!(files = summary.files, bytes = summary.bytes, "Admin bundle installed");
    Ok(Json(summary))
}
