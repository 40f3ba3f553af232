//! Object storage for uploaded image bytes.
//!
//! Keys are derived from the owner and the content so that two uploads never
//! overwrite each other unless they carry identical bytes for the same user.

pub mod local;
pub mod memory;
pub mod s3;

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

pub use local::LocalObjectStore;
pub use memory::MemoryObjectStore;
pub use s3::S3ObjectStore;

const KEY_PREFIX: &str = "images";
const OWNER_HASH_LEN: usize = 16;
const MAX_EXTENSION_LEN: usize = 8;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid object key: {0:?}")]
    InvalidKey(String),

    #[error("Storage backend misconfigured: {0}")]
    Config(String),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Validated, slash-separated object key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Parses a key received from the outside (e.g. a `/media/*` path)
    pub fn parse(raw: &str) -> Result<Self, StorageError> {
        let valid = !raw.is_empty()
            && raw.split('/').all(|segment| {
                !segment.is_empty()
                    && segment != "."
                    && segment != ".."
                    && segment
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
            });

        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(StorageError::InvalidKey(raw.to_string()))
        }
    }

    /// `images/{owner}/{sha256(content)}{.ext}`
    ///
    /// The extension follows the media type when it has a known one, so
    /// backends that only keep bytes can serve the right type back.
    pub fn for_upload(owner_email: &str, file_name: &str, content_type: &str, content: &[u8]) -> Self {
        let owner = hex::encode(Sha256::digest(owner_email.as_bytes()));
        let content_hash = hex::encode(Sha256::digest(content));
        let extension = media_type_extension(content_type)
            .or_else(|| file_extension(file_name))
            .map(|ext| format!(".{}", ext))
            .unwrap_or_default();

        Self(format!(
            "{}/{}/{}{}",
            KEY_PREFIX,
            &owner[..OWNER_HASH_LEN],
            content_hash,
            extension
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lower-cased alphanumeric extension of a file name, if it has a usable one
fn file_extension(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }
    usable_extension(ext)
}

/// Conventional extension for a media type such as `image/png`
fn media_type_extension(content_type: &str) -> Option<String> {
    let essence = content_type.split(';').next()?.trim().to_ascii_lowercase();
    let ext = match essence.as_str() {
        "image/jpeg" => "jpg",
        other => *mime_guess::get_mime_extensions_str(other)?.first()?,
    };
    usable_extension(ext)
}

fn usable_extension(ext: &str) -> Option<String> {
    if ext.is_empty() || ext.len() > MAX_EXTENSION_LEN || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Result of a successful write
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredObject {
    pub key: ObjectKey,
    pub total_bytes: u64,
    pub download_url: String,
}

/// Object bytes read back from storage
#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub body: Bytes,
    pub content_type: String,
}

/// Builds download URLs served by this service under `/media/*`
#[derive(Debug, Clone)]
pub struct MediaUrls {
    base: String,
}

impl MediaUrls {
    pub fn new(public_base_url: &str) -> Self {
        Self {
            base: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn url_for(&self, key: &ObjectKey) -> String {
        format!("{}/media/{}", self.base, key)
    }
}

pub(crate) fn guess_content_type(key: &ObjectKey) -> String {
    mime_guess::from_path(key.as_str())
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    fn name(&self) -> &'static str;

    /// Writes the object, replacing any previous bytes under the same key
    async fn put(&self, key: &ObjectKey, body: Bytes, content_type: &str) -> Result<StoredObject, StorageError>;

    async fn get(&self, key: &ObjectKey) -> Result<Option<StoredBlob>, StorageError>;
}
