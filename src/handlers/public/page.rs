use axum::{extract::State, response::Html};

use crate::api::gallery::escape_html;
use crate::config::IdentityProviderKind;
use crate::state::AppState;

const INDEX_TEMPLATE: &str = include_str!("../../../static/index.html");

/// GET / - The upload and gallery page
pub async fn index(State(state): State<AppState>) -> Html<String> {
    let provider = match state.config.identity.provider {
        IdentityProviderKind::Google => "google",
        IdentityProviderKind::SharedSecret => "shared-secret",
    };

    Html(
        INDEX_TEMPLATE
            .replace("{{IDENTITY_PROVIDER}}", provider)
            .replace("{{GOOGLE_CLIENT_ID}}", &escape_html(&state.config.identity.google_client_id)),
    )
}
