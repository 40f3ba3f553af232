use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::SecurityConfig;
use crate::handlers::{protected, public};
use crate::middleware::session_auth_middleware;
use crate::state::AppState;

// Room for multipart boundaries and part headers on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Builds the full router: public routes, session-protected `/api/*` and
/// the global layers
pub fn app(state: AppState) -> Router {
    let body_limit = state.config.gallery.max_upload_bytes + MULTIPART_OVERHEAD;
    let cors = cors_layer(&state.config.security);

    Router::new()
        .merge(public_routes())
        .merge(api_routes(state.clone()))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(public::index))
        .route("/health", get(public::health))
        .route("/auth/sign-in", post(public::sign_in))
        .route("/media/*key", get(public::media_get))
}

fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/auth/whoami", get(protected::whoami))
        .route(
            "/api/images",
            get(protected::images_get).post(protected::images_post),
        )
        .route("/api/images/url", post(protected::images_url_post))
        .route("/api/gallery", get(protected::gallery_get))
        .route_layer(from_fn_with_state(state, session_auth_middleware))
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if !security.enable_cors {
        return CorsLayer::new();
    }
    if security.cors_origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use axum::http::{header, StatusCode};

    #[test]
    fn cors_layer_accepts_wildcard_and_lists() {
        let mut security = test_config().security;
        security.cors_origins = vec!["*".to_string()];
        let _ = cors_layer(&security);

        security.cors_origins = vec!["https://a.example.com".to_string(), "bad\norigin".to_string()];
        let _ = cors_layer(&security);

        security.enable_cors = false;
        let _ = cors_layer(&security);
    }

    #[tokio::test]
    async fn protected_routes_reject_missing_token() {
        use crate::auth::SharedSecretIdentityProvider;
        use crate::documents::MemoryDocumentStore;
        use crate::storage::{MediaUrls, MemoryObjectStore};
        use std::sync::Arc;

        let config = test_config();
        let state = AppState::new(
            config.clone(),
            Arc::new(SharedSecretIdentityProvider::new(
                config.identity.shared_secret.clone(),
                config.identity.issuer.clone(),
                config.identity.audience.clone(),
            )),
            Arc::new(MemoryDocumentStore::new()),
            Arc::new(MemoryObjectStore::new(MediaUrls::new(&config.server.public_base_url))),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app(state)).await.unwrap();
        });

        let client = reqwest::Client::new();
        let response = client
            .get(format!("http://{}/api/images", addr))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), StatusCode::UNAUTHORIZED.as_u16());

        let page = client.get(format!("http://{}/", addr)).send().await.unwrap();
        assert!(page
            .headers()
            .get(header::CONTENT_TYPE.as_str())
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .starts_with("text/html"));
        let body = page.text().await.unwrap();
        assert!(body.contains("data-provider=\"shared-secret\""));
        assert!(body.contains("id=\"galleryBtn\""));
    }
}
