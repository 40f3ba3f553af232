use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use super::{MediaUrls, ObjectKey, ObjectStore, StorageError, StoredBlob, StoredObject};

/// Keeps objects in process memory; download URLs point at `/media/*`
#[derive(Clone)]
pub struct MemoryObjectStore {
    objects: Arc<RwLock<HashMap<ObjectKey, StoredBlob>>>,
    urls: MediaUrls,
}

impl MemoryObjectStore {
    pub fn new(urls: MediaUrls) -> Self {
        Self {
            objects: Arc::new(RwLock::new(HashMap::new())),
            urls,
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn put(&self, key: &ObjectKey, body: Bytes, content_type: &str) -> Result<StoredObject, StorageError> {
        let total_bytes = body.len() as u64;
        self.objects.write().await.insert(
            key.clone(),
            StoredBlob {
                body,
                content_type: content_type.to_string(),
            },
        );

        Ok(StoredObject {
            key: key.clone(),
            total_bytes,
            download_url: self.urls.url_for(key),
        })
    }

    async fn get(&self, key: &ObjectKey) -> Result<Option<StoredBlob>, StorageError> {
        Ok(self.objects.read().await.get(key).cloned())
    }
}
