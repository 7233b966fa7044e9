use axum::extract::{Multipart, Path, State};
use axum::Json;
use chrono::Utc;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use ember_shared::clients::storage::extension_for;
use ember_shared::errors::{AppError, AppResult, ErrorCode};
use ember_shared::types::auth::AuthUser;
use ember_shared::types::ApiResponse;

use crate::models::Profile;
use crate::schema::profiles;
use crate::services::profile_service;
use crate::AppState;

const ACCEPTED_IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/jpg", "image/png", "image/webp"];

#[derive(Debug, Serialize)]
pub struct PhotosResponse {
    pub photos: Vec<String>,
}

fn save_photos(conn: &mut PgConnection, profile_id: Uuid, photos: &[String]) -> AppResult<Profile> {
    Ok(diesel::update(profiles::table.filter(profiles::id.eq(profile_id)))
        .set((
            profiles::photos.eq(serde_json::json!(photos)),
            profiles::updated_at.eq(Utc::now()),
        ))
        .get_result::<Profile>(conn)?)
}

// --- POST /photos ---

pub async fn upload_photo(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> AppResult<Json<ApiResponse<PhotosResponse>>> {
    let profile = {
        let mut conn = state.db.get()?;
        profile_service::get_or_create(&mut conn, user.id)?
    };

    if profile.photo_list().len() >= state.config.max_photos {
        return Err(AppError::new(
            ErrorCode::PhotoLimitReached,
            format!("a profile can have at most {} photos", state.config.max_photos),
        ));
    }

    let field = multipart
        .next_field()
        .await
        .map_err(|e| AppError::new(ErrorCode::PhotoUploadFailed, format!("failed to read multipart: {e}")))?
        .ok_or_else(|| AppError::new(ErrorCode::PhotoUploadFailed, "no file provided"))?;

    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();

    let ext = extension_for(&content_type)
        .filter(|_| ACCEPTED_IMAGE_TYPES.contains(&content_type.as_str()))
        .ok_or_else(|| {
            AppError::new(
                ErrorCode::PhotoUploadFailed,
                "unsupported image format, accepted: jpeg, png, webp",
            )
        })?;

    let data = field
        .bytes()
        .await
        .map_err(|e| AppError::new(ErrorCode::PhotoUploadFailed, format!("failed to read file data: {e}")))?;

    if data.is_empty() {
        return Err(AppError::new(ErrorCode::PhotoUploadFailed, "uploaded file is empty"));
    }
    if data.len() > state.config.max_photo_bytes {
        return Err(AppError::new(ErrorCode::PayloadTooLarge, "photo exceeds the 10 MiB limit"));
    }

    let key = format!("profiles/{}/{}.{}", user.id, Uuid::now_v7(), ext);
    let photo_url = state
        .storage
        .upload(&key, data.to_vec(), &content_type)
        .await
        .map_err(|e| AppError::new(ErrorCode::PhotoUploadFailed, e))?;

    let mut conn = state.db.get()?;
    // Re-read so a concurrent upload is not overwritten.
    let mut photos = profile_service::require_profile(&mut conn, user.id)?.photo_list();
    if photos.len() >= state.config.max_photos {
        drop(conn);
        if let Err(e) = state.storage.delete_by_url(&photo_url).await {
            tracing::warn!(error = %e, url = %photo_url, "failed to remove rejected photo");
        }
        return Err(AppError::new(ErrorCode::PhotoLimitReached, "photo limit reached"));
    }
    photos.push(photo_url.clone());
    let updated = save_photos(&mut conn, profile.id, &photos)?;
    metrics::counter!("photos_uploaded_total").increment(1);

    tracing::info!(
        user_id = %user.id,
        photo_url = %photo_url,
        count = photos.len(),
        "profile photo uploaded"
    );

    Ok(Json(ApiResponse::ok(PhotosResponse { photos: updated.photo_list() })))
}

// --- DELETE /photos/:index ---

pub async fn delete_photo(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
) -> AppResult<Json<ApiResponse<PhotosResponse>>> {
    let mut conn = state.db.get()?;
    let profile = profile_service::require_profile(&mut conn, user.id)?;

    let mut photos = profile.photo_list();
    if index >= photos.len() {
        return Err(AppError::new(ErrorCode::PhotoNotFound, "photo not found"));
    }
    let removed = photos.remove(index);
    let updated = save_photos(&mut conn, profile.id, &photos)?;
    drop(conn);

    if let Err(e) = state.storage.delete_by_url(&removed).await {
        tracing::warn!(error = %e, url = %removed, "failed to delete stored photo");
    }

    Ok(Json(ApiResponse::ok(PhotosResponse { photos: updated.photo_list() })))
}

// --- PUT /photos/order ---

#[derive(Debug, Deserialize)]
pub struct ReorderPhotosRequest {
    pub photos: Vec<String>,
}

pub async fn reorder_photos(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<ReorderPhotosRequest>,
) -> AppResult<Json<ApiResponse<PhotosResponse>>> {
    let mut conn = state.db.get()?;
    let profile = profile_service::require_profile(&mut conn, user.id)?;

    if !profile_service::is_permutation(&profile.photo_list(), &req.photos) {
        return Err(AppError::new(
            ErrorCode::ValidationError,
            "photo order must contain exactly the current photos",
        ));
    }

    let updated = save_photos(&mut conn, profile.id, &req.photos)?;
    Ok(Json(ApiResponse::ok(PhotosResponse { photos: updated.photo_list() })))
}
