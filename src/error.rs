// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::auth::{SessionError, SignInError};
use crate::documents::DocumentError;
use crate::services::{ImageError, UserError};
use crate::storage::StorageError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    Unauthorized(String),
    SignInFailed { code: String, message: String },

    // 404 Not Found
    NotFound(String),

    // 413 Payload Too Large
    PayloadTooLarge(String),

    // 415 Unsupported Media Type
    UnsupportedMediaType(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 502 Bad Gateway (external service issues)
    BadGateway(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::SignInFailed { .. } => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::SignInFailed { message, .. } => message,
            ApiError::NotFound(msg) => msg,
            ApiError::PayloadTooLarge(msg) => msg,
            ApiError::UnsupportedMediaType(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::BadGateway(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::SignInFailed { code, .. } => code,
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ApiError::UnsupportedMediaType(_) => "UNSUPPORTED_MEDIA_TYPE",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::BadGateway(_) => "BAD_GATEWAY",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        json!({
            "success": false,
            "error": self.message(),
            "code": self.error_code()
        })
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        ApiError::BadGateway(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

// Convert other error types to ApiError
impl From<SignInError> for ApiError {
    fn from(err: SignInError) -> Self {
        if err.code == "auth/provider-unavailable" {
            tracing::error!("Identity provider unavailable: {}", err.message);
            return ApiError::service_unavailable("Identity provider temporarily unavailable");
        }
        ApiError::SignInFailed {
            code: err.code,
            message: err.message,
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::InvalidToken(msg) => ApiError::unauthorized(msg),
            SessionError::InvalidSecret | SessionError::TokenGeneration(_) => {
                tracing::error!("Session token error: {}", err);
                ApiError::internal_server_error("Unable to process session token")
            }
        }
    }
}

impl From<DocumentError> for ApiError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::InvalidSegment(segment) => {
                ApiError::bad_request(format!("Invalid document path segment: {}", segment))
            }
            DocumentError::NotAnObject => ApiError::bad_request("Document data must be a JSON object"),
            DocumentError::ConnectionError(msg) => {
                tracing::error!("Document store connection error: {}", msg);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            DocumentError::QueryError(msg) => {
                // Don't expose internal SQL errors to clients
                tracing::error!("Document store query error: {}", msg);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            DocumentError::Sqlx(sqlx_err) => {
                // Log the real error but return generic message
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::internal_server_error("Database error occurred")
            }
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidKey(key) => ApiError::bad_request(format!("Invalid object key: {}", key)),
            other => {
                tracing::error!("Object storage error: {}", other);
                ApiError::bad_gateway("Object storage request failed")
            }
        }
    }
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::InvalidEmail(email) => ApiError::bad_request(format!("Invalid email address: {}", email)),
            UserError::Documents(e) => e.into(),
        }
    }
}

impl From<ImageError> for ApiError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::EmptyFile => ApiError::bad_request("No file was provided"),
            ImageError::TooLarge { limit } => {
                ApiError::PayloadTooLarge(format!("File exceeds the maximum upload size of {} bytes", limit))
            }
            ImageError::UnsupportedMediaType(media_type) => {
                ApiError::UnsupportedMediaType(format!("Only images can be uploaded, got {}", media_type))
            }
            ImageError::InvalidUrl(msg) => ApiError::bad_request(format!("Invalid image URL: {}", msg)),
            ImageError::Storage(e) => e.into(),
            ImageError::Documents(e) => e.into(),
            ImageError::User(e) => e.into(),
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_in_errors_keep_provider_code() {
        let err: ApiError = SignInError::invalid_credential("bad token").into();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.to_json()["code"], "auth/invalid-credential");
        assert_eq!(err.to_json()["success"], false);
    }

    #[test]
    fn unavailable_provider_is_503() {
        let err: ApiError = SignInError::provider_unavailable("timeout").into();
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn image_errors_map_to_client_statuses() {
        let too_large: ApiError = ImageError::TooLarge { limit: 10 }.into();
        assert_eq!(too_large.status_code(), StatusCode::PAYLOAD_TOO_LARGE);

        let media: ApiError = ImageError::UnsupportedMediaType("text/plain".into()).into();
        assert_eq!(media.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let storage: ApiError = ImageError::Storage(StorageError::Backend("boom".into())).into();
        assert_eq!(storage.status_code(), StatusCode::BAD_GATEWAY);
        assert!(!storage.message().contains("boom"));
    }
}
