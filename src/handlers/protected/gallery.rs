use axum::{extract::State, response::Html, Extension};

use crate::api::render_gallery;
use crate::auth::SessionContext;
use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/gallery - The caller's images as an HTML column grid
pub async fn gallery_get(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> Result<Html<String>, ApiError> {
    let images = state.images().list(&session).await?;
    Ok(Html(render_gallery(&images, state.config.gallery.columns)))
}
