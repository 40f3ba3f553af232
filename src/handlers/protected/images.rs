use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use tracing::debug;

use crate::auth::SessionContext;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{ImageRef, UploadedFile};
use crate::state::AppState;

const FILE_FIELD: &str = "file";

#[derive(Debug, Deserialize)]
pub struct AttachUrlRequest {
    pub url: String,
}

/// POST /api/images - Upload one image as the multipart field `file`
///
/// Stores the bytes under a content-derived key scoped to the caller, then
/// attaches the download URL to `users/{email}/images`.
///
/// Expected Output (Success, 201):
/// ```json
/// {
///   "success": true,
///   "data": {
///     "id": "5f0c...",
///     "url": "http://localhost:3000/media/images/ab12.../9f86....png",
///     "key": "images/ab12.../9f86....png",
///     "size": 5120,
///     "content_type": "image/png",
///     "file_name": "cat.png",
///     "created_at": "2024-01-01T00:00:00Z"
///   }
/// }
/// ```
pub async fn images_post(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    mut multipart: Multipart,
) -> ApiResult<ImageRef> {
    let mut upload = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) || upload.is_some() {
            debug!("Skipping multipart field {:?}", field.name());
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(str::to_string);
        let body = field.bytes().await.map_err(multipart_error)?;

        upload = Some(UploadedFile {
            file_name,
            content_type,
            body,
        });
    }

    let file = upload.ok_or_else(|| ApiError::bad_request("Multipart field 'file' is required"))?;
    let image = state.images().upload(&session, file).await?;

    Ok(ApiResponse::created(image))
}

/// POST /api/images/url - Attach an externally hosted image by URL
pub async fn images_url_post(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Json(payload): Json<AttachUrlRequest>,
) -> ApiResult<ImageRef> {
    let image = state.images().attach_url(&session, &payload.url).await?;
    Ok(ApiResponse::created(image))
}

/// GET /api/images - The caller's image references in upload order
pub async fn images_get(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> ApiResult<Vec<ImageRef>> {
    let images = state.images().list(&session).await?;
    Ok(ApiResponse::success(images))
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::bad_request(format!("Invalid multipart body: {}", err.body_text()))
    }
}
