use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::info;

use crate::auth::{GoogleIdentityProvider, IdentityProvider, SessionKeys, SharedSecretIdentityProvider};
use crate::config::{AppConfig, DocumentBackend, IdentityProviderKind, StorageBackend};
use crate::documents::{DocumentStore, MemoryDocumentStore, PostgresDocumentStore};
use crate::services::{ImageService, UserService};
use crate::storage::{LocalObjectStore, MediaUrls, MemoryObjectStore, ObjectStore, S3ObjectStore};

/// Shared handles for every request; cheap to clone
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sessions: SessionKeys,
    pub identity: Arc<dyn IdentityProvider>,
    pub documents: Arc<dyn DocumentStore>,
    pub storage: Arc<dyn ObjectStore>,
}

impl AppState {
    /// Connects the backends selected by configuration
    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        if config.security.jwt_secret.is_empty() {
            anyhow::bail!("JWT_SECRET must be set");
        }

        let identity: Arc<dyn IdentityProvider> = match config.identity.provider {
            IdentityProviderKind::Google => {
                if config.identity.google_client_id.is_empty() {
                    anyhow::bail!("GOOGLE_CLIENT_ID must be set for the google identity provider");
                }
                if config.identity.issuer.is_empty() {
                    anyhow::bail!("IDENTITY_ISSUER must be set for the google identity provider");
                }
                Arc::new(GoogleIdentityProvider::new(
                    config.identity.google_client_id.clone(),
                    config.identity.issuer.clone(),
                    config.identity.google_tokeninfo_url.clone(),
                    Duration::from_secs(config.identity.timeout_secs),
                )?)
            }
            IdentityProviderKind::SharedSecret => {
                if config.identity.shared_secret.is_empty() {
                    anyhow::bail!("IDENTITY_SHARED_SECRET must be set for the shared-secret identity provider");
                }
                Arc::new(SharedSecretIdentityProvider::new(
                    config.identity.shared_secret.clone(),
                    config.identity.issuer.clone(),
                    config.identity.audience.clone(),
                ))
            }
        };

        let documents: Arc<dyn DocumentStore> = match config.documents.backend {
            DocumentBackend::Memory => Arc::new(MemoryDocumentStore::new()),
            DocumentBackend::Postgres => Arc::new(
                PostgresDocumentStore::connect(
                    &config.documents.database_url,
                    config.documents.max_connections,
                    config.documents.connection_timeout,
                )
                .await
                .context("failed to connect document store")?,
            ),
        };

        let urls = MediaUrls::new(&config.server.public_base_url);
        let storage: Arc<dyn ObjectStore> = match config.storage.backend {
            StorageBackend::Memory => Arc::new(MemoryObjectStore::new(urls)),
            StorageBackend::Local => Arc::new(
                LocalObjectStore::open(&config.storage.local_root, urls)
                    .await
                    .context("failed to open local object store")?,
            ),
            StorageBackend::S3 => Arc::new(S3ObjectStore::from_config(&config.storage, urls)?),
        };

        info!(
            "Backends ready: identity={}, documents={:?}, storage={}",
            identity.name(),
            config.documents.backend,
            storage.name()
        );

        Ok(Self::new(config, identity, documents, storage))
    }

    pub fn new(
        config: AppConfig,
        identity: Arc<dyn IdentityProvider>,
        documents: Arc<dyn DocumentStore>,
        storage: Arc<dyn ObjectStore>,
    ) -> Self {
        let sessions = SessionKeys::new(config.security.jwt_secret.clone(), config.security.jwt_expiry_hours);
        Self {
            config: Arc::new(config),
            sessions,
            identity,
            documents,
            storage,
        }
    }

    pub fn users(&self) -> UserService {
        UserService::new(self.documents.clone())
    }

    pub fn images(&self) -> ImageService {
        ImageService::new(
            self.documents.clone(),
            self.storage.clone(),
            self.config.gallery.max_upload_bytes,
        )
    }
}
