use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use uuid::Uuid;

use super::{guess_content_type, MediaUrls, ObjectKey, ObjectStore, StorageError, StoredBlob, StoredObject};

/// Stores objects as files below a root directory
pub struct LocalObjectStore {
    root: PathBuf,
    urls: MediaUrls,
}

impl LocalObjectStore {
    pub async fn open(root: impl Into<PathBuf>, urls: MediaUrls) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Self { root, urls })
    }

    fn path_for(&self, key: &ObjectKey) -> PathBuf {
        // ObjectKey segments are already restricted to safe characters
        key.as_str().split('/').fold(self.root.clone(), |path, segment| path.join(segment))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn put(&self, key: &ObjectKey, body: Bytes, _content_type: &str) -> Result<StoredObject, StorageError> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write to a sibling temp file and rename so readers never see partial objects
        let tmp = path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
        fs::write(&tmp, &body).await?;
        fs::rename(&tmp, &path).await?;

        Ok(StoredObject {
            key: key.clone(),
            total_bytes: body.len() as u64,
            download_url: self.urls.url_for(key),
        })
    }

    async fn get(&self, key: &ObjectKey) -> Result<Option<StoredBlob>, StorageError> {
        match fs::read(self.path_for(key)).await {
            Ok(body) => Ok(Some(StoredBlob {
                body: Bytes::from(body),
                content_type: guess_content_type(key),
            })),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
