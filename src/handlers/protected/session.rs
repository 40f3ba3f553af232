use axum::{extract::State, Extension};
use serde::Serialize;

use crate::auth::SessionContext;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::UserRecord;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct WhoAmIResponse {
    #[serde(flatten)]
    pub session: SessionContext,
    pub user: Option<UserRecord>,
}

/// GET /api/auth/whoami - The signed-in user and their stored record
pub async fn whoami(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> ApiResult<WhoAmIResponse> {
    let user = state.users().profile(&session).await?;
    Ok(ApiResponse::success(WhoAmIResponse { session, user }))
}
