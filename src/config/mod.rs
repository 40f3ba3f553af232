use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub security: SecurityConfig,
    pub identity: IdentityConfig,
    pub storage: StorageConfig,
    pub documents: DocumentConfig,
    pub gallery: GalleryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Externally visible origin used to build `/media/*` download URLs
    pub public_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdentityProviderKind {
    Google,
    SharedSecret,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub provider: IdentityProviderKind,
    pub google_client_id: String,
    pub google_tokeninfo_url: String,
    #[serde(skip_serializing)]
    pub shared_secret: String,
    pub issuer: String,
    pub audience: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Local,
    S3,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub local_root: String,
    pub s3_bucket: String,
    pub s3_region: String,
    pub s3_endpoint: Option<String>,
    #[serde(skip_serializing)]
    pub s3_access_key_id: Option<String>,
    #[serde(skip_serializing)]
    pub s3_secret_access_key: Option<String>,
    /// When set, S3 download URLs point straight at the bucket instead of `/media/*`
    pub s3_public_base_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentConfig {
    pub backend: DocumentBackend,
    #[serde(skip_serializing)]
    pub database_url: String,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GalleryConfig {
    pub columns: usize,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("HOST") {
            self.server.host = v;
        }
        if let Some(v) = env::var("GALLERY_PORT").ok().or_else(|| env::var("PORT").ok()) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("PUBLIC_BASE_URL") {
            self.server.public_base_url = v.trim_end_matches('/').to_string();
        } else if matches!(self.environment, Environment::Development) {
            self.server.public_base_url = format!("http://localhost:{}", self.server.port);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v
                .parse::<u64>()
                .map(|hours| hours.clamp(1, crate::auth::MAX_SESSION_HOURS))
                .unwrap_or(self.security.jwt_expiry_hours);
        }

        // Identity overrides
        match env::var("IDENTITY_PROVIDER").as_deref() {
            Ok("google") => self.identity.provider = IdentityProviderKind::Google,
            Ok("shared-secret") | Ok("shared_secret") => {
                self.identity.provider = IdentityProviderKind::SharedSecret
            }
            _ => {}
        }
        if let Ok(v) = env::var("GOOGLE_CLIENT_ID") {
            self.identity.google_client_id = v;
        }
        if let Ok(v) = env::var("GOOGLE_TOKENINFO_URL") {
            self.identity.google_tokeninfo_url = v;
        }
        if let Ok(v) = env::var("IDENTITY_SHARED_SECRET") {
            self.identity.shared_secret = v;
        }
        if let Ok(v) = env::var("IDENTITY_ISSUER") {
            self.identity.issuer = v;
        }
        if let Ok(v) = env::var("IDENTITY_AUDIENCE") {
            self.identity.audience = v;
        }
        if let Ok(v) = env::var("IDENTITY_TIMEOUT_SECS") {
            self.identity.timeout_secs = v.parse().unwrap_or(self.identity.timeout_secs);
        }

        // Storage overrides
        match env::var("STORAGE_BACKEND").as_deref() {
            Ok("memory") => self.storage.backend = StorageBackend::Memory,
            Ok("local") => self.storage.backend = StorageBackend::Local,
            Ok("s3") => self.storage.backend = StorageBackend::S3,
            _ => {}
        }
        if let Ok(v) = env::var("STORAGE_LOCAL_ROOT") {
            self.storage.local_root = v;
        }
        if let Ok(v) = env::var("S3_BUCKET") {
            self.storage.s3_bucket = v;
        }
        if let Ok(v) = env::var("S3_REGION") {
            self.storage.s3_region = v;
        }
        self.storage.s3_endpoint = env::var("S3_ENDPOINT").ok().or(self.storage.s3_endpoint);
        self.storage.s3_access_key_id = env::var("S3_ACCESS_KEY_ID")
            .or_else(|_| env::var("AWS_ACCESS_KEY_ID"))
            .ok()
            .or(self.storage.s3_access_key_id);
        self.storage.s3_secret_access_key = env::var("S3_SECRET_ACCESS_KEY")
            .or_else(|_| env::var("AWS_SECRET_ACCESS_KEY"))
            .ok()
            .or(self.storage.s3_secret_access_key);
        self.storage.s3_public_base_url = env::var("S3_PUBLIC_BASE_URL")
            .ok()
            .map(|v| v.trim_end_matches('/').to_string())
            .or(self.storage.s3_public_base_url);

        // Document store overrides
        match env::var("DOCUMENT_BACKEND").as_deref() {
            Ok("memory") => self.documents.backend = DocumentBackend::Memory,
            Ok("postgres") => self.documents.backend = DocumentBackend::Postgres,
            _ => {}
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            self.documents.database_url = v;
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.documents.max_connections = v.parse().unwrap_or(self.documents.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.documents.connection_timeout = v.parse().unwrap_or(self.documents.connection_timeout);
        }

        // Gallery overrides
        if let Ok(v) = env::var("GALLERY_COLUMNS") {
            self.gallery.columns = v
                .parse()
                .ok()
                .filter(|columns| *columns > 0)
                .unwrap_or(self.gallery.columns);
        }
        if let Ok(v) = env::var("GALLERY_MAX_UPLOAD_BYTES") {
            self.gallery.max_upload_bytes = v.parse().unwrap_or(self.gallery.max_upload_bytes);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                public_base_url: "http://localhost:3000".to_string(),
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                jwt_secret: String::new(),
                jwt_expiry_hours: 24 * 7, // 1 week
            },
            identity: IdentityConfig {
                provider: IdentityProviderKind::SharedSecret,
                google_client_id: String::new(),
                google_tokeninfo_url: "https://oauth2.googleapis.com/tokeninfo".to_string(),
                shared_secret: String::new(),
                issuer: "image-gallery-dev".to_string(),
                audience: "image-gallery".to_string(),
                timeout_secs: 10,
            },
            storage: StorageConfig {
                backend: StorageBackend::Memory,
                local_root: "./data/objects".to_string(),
                s3_bucket: String::new(),
                s3_region: "us-east-1".to_string(),
                s3_endpoint: None,
                s3_access_key_id: None,
                s3_secret_access_key: None,
                s3_public_base_url: None,
            },
            documents: DocumentConfig {
                backend: DocumentBackend::Memory,
                database_url: String::new(),
                max_connections: 10,
                connection_timeout: 30,
            },
            gallery: GalleryConfig {
                columns: 4,
                max_upload_bytes: 20 * 1024 * 1024, // 20MB
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                public_base_url: "https://staging.example.com".to_string(),
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
            },
            identity: IdentityConfig {
                provider: IdentityProviderKind::Google,
                google_client_id: String::new(),
                google_tokeninfo_url: "https://oauth2.googleapis.com/tokeninfo".to_string(),
                shared_secret: String::new(),
                issuer: "accounts.google.com".to_string(),
                audience: String::new(),
                timeout_secs: 10,
            },
            storage: StorageConfig {
                backend: StorageBackend::S3,
                local_root: "./data/objects".to_string(),
                s3_bucket: String::new(),
                s3_region: "us-east-1".to_string(),
                s3_endpoint: None,
                s3_access_key_id: None,
                s3_secret_access_key: None,
                s3_public_base_url: None,
            },
            documents: DocumentConfig {
                backend: DocumentBackend::Postgres,
                database_url: String::new(),
                max_connections: 20,
                connection_timeout: 10,
            },
            gallery: GalleryConfig {
                columns: 4,
                max_upload_bytes: 10 * 1024 * 1024, // 10MB
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                public_base_url: "https://app.example.com".to_string(),
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
                jwt_secret: String::new(),
                jwt_expiry_hours: 4,
            },
            identity: IdentityConfig {
                provider: IdentityProviderKind::Google,
                google_client_id: String::new(),
                google_tokeninfo_url: "https://oauth2.googleapis.com/tokeninfo".to_string(),
                shared_secret: String::new(),
                issuer: "accounts.google.com".to_string(),
                audience: String::new(),
                timeout_secs: 5,
            },
            storage: StorageConfig {
                backend: StorageBackend::S3,
                local_root: "./data/objects".to_string(),
                s3_bucket: String::new(),
                s3_region: "us-east-1".to_string(),
                s3_endpoint: None,
                s3_access_key_id: None,
                s3_secret_access_key: None,
                s3_public_base_url: None,
            },
            documents: DocumentConfig {
                backend: DocumentBackend::Postgres,
                database_url: String::new(),
                max_connections: 50,
                connection_timeout: 5,
            },
            gallery: GalleryConfig {
                columns: 4,
                max_upload_bytes: 10 * 1024 * 1024, // 10MB
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
pub(crate) fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.security.jwt_secret = "test-session-secret".to_string();
    config.identity.shared_secret = "test-identity-secret".to_string();
    config.server.public_base_url = "http://gallery.test".to_string();
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.identity.provider, IdentityProviderKind::SharedSecret);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.documents.backend, DocumentBackend::Memory);
        assert_eq!(config.gallery.columns, 4);
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert_eq!(config.identity.provider, IdentityProviderKind::Google);
        assert_eq!(config.storage.backend, StorageBackend::S3);
        assert_eq!(config.documents.backend, DocumentBackend::Postgres);
        assert!(config.security.jwt_expiry_hours < AppConfig::development().security.jwt_expiry_hours);
    }

    #[test]
    fn secrets_are_not_serialized() {
        let value = serde_json::to_value(test_config()).unwrap();
        assert!(value["security"].get("jwt_secret").is_none());
        assert!(value["identity"].get("shared_secret").is_none());
    }
}
