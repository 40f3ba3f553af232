use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use s3::creds::Credentials;
use s3::{Bucket, Region};
use tracing::info;

use super::{guess_content_type, MediaUrls, ObjectKey, ObjectStore, StorageError, StoredBlob, StoredObject};
use crate::config::StorageConfig;

/// S3-compatible bucket (AWS, MinIO, R2, ...)
pub struct S3ObjectStore {
    bucket: Box<Bucket>,
    public_base_url: Option<String>,
    urls: MediaUrls,
}

impl S3ObjectStore {
    pub fn from_config(config: &StorageConfig, urls: MediaUrls) -> Result<Self, StorageError> {
        if config.s3_bucket.is_empty() {
            return Err(StorageError::Config("S3_BUCKET is not set".to_string()));
        }

        let region = match &config.s3_endpoint {
            Some(endpoint) => Region::Custom {
                region: config.s3_region.clone(),
                endpoint: endpoint.clone(),
            },
            None => config
                .s3_region
                .parse()
                .map_err(|e| StorageError::Config(format!("invalid S3 region {:?}: {}", config.s3_region, e)))?,
        };

        let credentials = Credentials::new(
            config.s3_access_key_id.as_deref(),
            config.s3_secret_access_key.as_deref(),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::Config(format!("S3 credentials: {}", e)))?;

        let mut bucket = Bucket::new(&config.s3_bucket, region, credentials)
            .map_err(|e| StorageError::Config(format!("S3 bucket: {}", e)))?;

        // Custom endpoints (MinIO and friends) generally want path-style addressing
        if config.s3_endpoint.is_some() {
            bucket = bucket.with_path_style();
        }

        info!("Using S3 bucket {}", config.s3_bucket);

        Ok(Self {
            bucket,
            public_base_url: config.s3_public_base_url.clone(),
            urls,
        })
    }

    fn download_url(&self, key: &ObjectKey) -> String {
        match &self.public_base_url {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), key),
            None => self.urls.url_for(key),
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn name(&self) -> &'static str {
        "s3"
    }

    async fn put(&self, key: &ObjectKey, body: Bytes, content_type: &str) -> Result<StoredObject, StorageError> {
        let response = self
            .bucket
            .put_object_with_content_type(key.as_str(), &body, content_type)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let status = response.status_code();
        if !(200..300).contains(&status) {
            return Err(StorageError::Backend(format!("PUT {} returned {}", key, status)));
        }

        Ok(StoredObject {
            key: key.clone(),
            total_bytes: body.len() as u64,
            download_url: self.download_url(key),
        })
    }

    async fn get(&self, key: &ObjectKey) -> Result<Option<StoredBlob>, StorageError> {
        let response = self
            .bucket
            .get_object(key.as_str())
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        match response.status_code() {
            200..=299 => Ok(Some(StoredBlob {
                content_type: stored_content_type(&response.headers(), key),
                body: response.bytes().clone(),
            })),
            404 => Ok(None),
            status => Err(StorageError::Backend(format!("GET {} returned {}", key, status))),
        }
    }
}

/// Content type recorded on `put`, or a guess from the key for objects written elsewhere
fn stored_content_type(headers: &HashMap<String, String>, key: &ObjectKey) -> String {
    headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty() && *value != "binary/octet-stream")
        .map(str::to_string)
        .unwrap_or_else(|| guess_content_type(key))
}
