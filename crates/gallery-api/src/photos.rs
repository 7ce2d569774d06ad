use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
    response::IntoResponse,
};
use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use gallery_db::models::PhotoRow;
use gallery_types::api::{Claims, MessageResponse, PhotoListResponse, PhotoView, UploadResponse};

use crate::auth::AppState;
use crate::error::ApiError;

/// POST /api/photos — multipart upload: blob first, record second, so
/// a storage failure never leaves a record pointing at nothing.
pub async fn upload_photo(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    // Surface a dead database before shipping bytes to the blob store.
    state.db()?;

    let (filename, bytes) = read_photo_field(&mut multipart).await?;

    // Per-user namespace so storage-side layout mirrors ownership.
    let folder = format!("gallery_user_{}", claims.sub);
    debug!(
        "Uploading {} ({} bytes) for user {} to folder {}",
        filename,
        bytes.len(),
        claims.username,
        folder
    );

    let stored = state
        .storage
        .upload(&folder, &filename, bytes)
        .await
        .map_err(|e| {
            error!("Blob upload failed for user {}: {}", claims.username, e);
            ApiError::Storage(format!("Cloud Upload Failed: {e}"))
        })?;

    let now = Utc::now();
    let photo_id = Uuid::new_v4();
    let row = PhotoRow {
        id: photo_id.to_string(),
        owner_id: claims.sub.to_string(),
        title: filename,
        src: stored.src,
        public_id: stored.public_id,
        date: now.format("%Y-%m-%d").to_string(),
        uploaded_at: now.to_rfc3339_opts(SecondsFormat::Micros, true),
    };

    let view = PhotoView {
        id: photo_id,
        title: row.title.clone(),
        src: row.src.clone(),
        date: row.date.clone(),
    };

    let db_state = state.clone();
    tokio::task::spawn_blocking(move || {
        db_state.db()?.insert_photo(&row).map_err(|e| {
            error!("DB insert_photo error: {}", e);
            ApiError::Database
        })
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal
    })??;

    info!("User {} uploaded photo {}", claims.username, photo_id);

    Ok(Json(UploadResponse {
        success: true,
        message: "Photo uploaded successfully.".into(),
        photo: view,
    }))
}

/// GET /api/photos — the caller's photos only, newest upload first.
pub async fn list_photos(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db_state = state.clone();
    let owner = claims.sub.to_string();
    let rows = tokio::task::spawn_blocking(move || {
        db_state.db()?.photos_by_owner(&owner).map_err(|e| {
            error!("DB photos_by_owner error: {}", e);
            ApiError::Database
        })
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal
    })??;

    let photos: Vec<PhotoView> = rows
        .into_iter()
        .map(|row| PhotoView {
            id: row.id.parse().unwrap_or_else(|e| {
                warn!("Corrupt photo id '{}': {}", row.id, e);
                Uuid::default()
            }),
            title: row.title,
            src: row.src,
            date: row.date,
        })
        .collect();

    Ok(Json(PhotoListResponse {
        success: true,
        photos,
    }))
}

/// DELETE /api/photos/{id} — id and owner matched in one predicate;
/// someone else's photo is indistinguishable from a missing one.
pub async fn delete_photo(
    State(state): State<AppState>,
    Path(photo_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db_state = state.clone();
    let pid = photo_id.clone();
    let owner = claims.sub.to_string();
    let photo = tokio::task::spawn_blocking(move || {
        db_state.db()?.get_photo_owned(&pid, &owner).map_err(|e| {
            error!("DB get_photo_owned error: {}", e);
            ApiError::Database
        })
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal
    })??
    .ok_or_else(|| ApiError::NotFound("Photo not found or unauthorized to delete.".into()))?;

    // Blob first. If the provider fails the record is kept, so the
    // photo stays listed and deletable instead of pointing at nothing.
    state.storage.delete(&photo.public_id).await.map_err(|e| {
        error!("Blob destroy failed for photo {}: {}", photo_id, e);
        ApiError::Storage(format!("Deletion failed: {e}"))
    })?;

    let db_state = state.clone();
    let pid = photo_id.clone();
    let owner = claims.sub.to_string();
    tokio::task::spawn_blocking(move || {
        db_state.db()?.delete_photo(&pid, &owner).map_err(|e| {
            error!("DB delete_photo error: {}", e);
            ApiError::Database
        })
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal
    })??;

    info!("User {} deleted photo {}", claims.username, photo_id);

    Ok(Json(MessageResponse {
        success: true,
        message: "Photo deleted successfully.".into(),
    }))
}

async fn read_photo_field(multipart: &mut Multipart) -> Result<(String, Bytes), ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        ApiError::Validation(format!("Malformed upload body: {e}"))
    })? {
        if field.name() != Some("photo") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        if filename.is_empty() {
            return Err(ApiError::Validation("No selected file.".into()));
        }

        let bytes = field.bytes().await.map_err(|e| {
            ApiError::Validation(format!("Failed to read photo field: {e}"))
        })?;
        if bytes.is_empty() {
            return Err(ApiError::Validation("No selected file.".into()));
        }

        return Ok((filename, bytes));
    }

    Err(ApiError::Validation("No photo file provided.".into()))
}
