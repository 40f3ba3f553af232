use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::SessionContext;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::Registration;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub id_token: String,
}

#[derive(Debug, Serialize)]
pub struct SignInResponse {
    pub token: String,
    pub expires_in: i64,
    pub user: SessionContext,
    pub registered: Registration,
}

/// POST /auth/sign-in - Exchange a provider ID token for a session token
///
/// Verifies the assertion with the configured identity provider, makes sure
/// the user record exists, then issues a session token for `/api/*`.
///
/// Expected Input:
/// ```json
/// { "id_token": "eyJhbGciOi..." }
/// ```
///
/// Expected Output (Success):
/// ```json
/// {
///   "success": true,
///   "data": {
///     "token": "eyJhbGciOiJIUzI1NiI...",
///     "expires_in": 604800,
///     "user": { "email": "a@x.com", "display_name": "A" },
///     "registered": "created"
///   }
/// }
/// ```
pub async fn sign_in(
    State(state): State<AppState>,
    Json(payload): Json<SignInRequest>,
) -> ApiResult<SignInResponse> {
    let identity = state.identity.sign_in(&payload.id_token).await.map_err(|e| {
        warn!(
            provider = state.identity.name(),
            code = %e.code,
            email = ?e.email,
            "Sign-in rejected: {}",
            e.message
        );
        e
    })?;

    let registered = state.users().ensure_registered(&identity).await?;

    let session = SessionContext::from(&identity);
    let issued = state.sessions.issue(&session)?;

    info!("Signed in {} ({:?})", session.email, registered);

    Ok(ApiResponse::success(SignInResponse {
        token: issued.token,
        expires_in: issued.expires_in,
        user: session,
        registered,
    }))
}
