use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;
use crate::state::AppState;
use crate::storage::ObjectKey;

const MEDIA_CSP: &str = "default-src 'none'; sandbox";

/// GET /media/*key - Stream a stored object back with its content type
pub async fn media_get(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response, ApiError> {
    let key = ObjectKey::parse(&key)?;

    let blob = state
        .storage
        .get(&key)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("object {} not found", key)))?;

    // Keys embed the content hash, so a key never changes meaning.
    // Served same-origin, so the body must never run as a document.
    Ok((
        [
            (header::CONTENT_TYPE, blob.content_type),
            (header::CACHE_CONTROL, "public, max-age=31536000, immutable".to_string()),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff".to_string()),
            (header::CONTENT_SECURITY_POLICY, MEDIA_CSP.to_string()),
        ],
        blob.body,
    )
        .into_response())
}
