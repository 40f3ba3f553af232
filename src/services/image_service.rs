use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{error, info, warn};

use super::user_service::{user_images, UserError};
use crate::auth::SessionContext;
use crate::documents::{Document, DocumentError, DocumentStore};
use crate::storage::{ObjectKey, ObjectStore, StorageError};

const OCTET_STREAM: &str = "application/octet-stream";

/// Raster formats only. Scriptable formats such as SVG are never stored.
const ACCEPTED_TYPES: &[&str] = &["image/png", "image/jpeg", "image/gif", "image/webp"];

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("No file was provided")]
    EmptyFile,
    #[error("File exceeds the maximum upload size of {limit} bytes")]
    TooLarge { limit: usize },
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),
    #[error("Invalid image URL: {0}")]
    InvalidUrl(String),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Document store error: {0}")]
    Documents(#[from] DocumentError),
    #[error(transparent)]
    User(#[from] UserError),
}

/// File part received from an upload form
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl UploadedFile {
    /// Declared media type, or a guess from the file name when the client sent none
    pub fn effective_content_type(&self) -> String {
        let declared = self
            .content_type
            .as_deref()
            .and_then(|declared| declared.split(';').next())
            .map(|essence| essence.trim().to_ascii_lowercase());

        match declared {
            Some(declared) if !declared.is_empty() && declared != OCTET_STREAM => declared,
            _ => mime_guess::from_path(&self.file_name)
                .first_or_octet_stream()
                .essence_str()
                .to_string(),
        }
    }
}

/// What gets attached to a user's image collection
#[derive(Debug, Clone, Default)]
pub struct NewImage {
    pub url: String,
    pub key: Option<ObjectKey>,
    pub size: Option<u64>,
    pub content_type: Option<String>,
    pub file_name: Option<String>,
}

/// Image reference document as returned to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageRef {
    pub id: String,
    pub url: String,
    pub key: Option<String>,
    pub size: Option<u64>,
    pub content_type: Option<String>,
    pub file_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ImageRef {
    fn from_document(doc: Document) -> Option<Self> {
        let url = doc.get_str("image")?.to_string();
        Some(Self {
            url,
            key: doc.get_str("key").map(str::to_string),
            size: doc.data.get("size").and_then(Value::as_u64),
            content_type: doc.get_str("content_type").map(str::to_string),
            file_name: doc.get_str("file_name").map(str::to_string),
            id: doc.id,
            created_at: doc.created_at,
        })
    }
}

pub struct ImageService {
    documents: Arc<dyn DocumentStore>,
    storage: Arc<dyn ObjectStore>,
    max_upload_bytes: usize,
}

impl ImageService {
    pub fn new(documents: Arc<dyn DocumentStore>, storage: Arc<dyn ObjectStore>, max_upload_bytes: usize) -> Self {
        Self {
            documents,
            storage,
            max_upload_bytes,
        }
    }

    /// Stores the file bytes and attaches the resulting download URL to the user
    pub async fn upload(&self, session: &SessionContext, file: UploadedFile) -> Result<ImageRef, ImageError> {
        if file.body.is_empty() {
            return Err(ImageError::EmptyFile);
        }
        if file.body.len() > self.max_upload_bytes {
            return Err(ImageError::TooLarge {
                limit: self.max_upload_bytes,
            });
        }

        let content_type = file.effective_content_type();
        if !ACCEPTED_TYPES.contains(&content_type.as_str()) {
            return Err(ImageError::UnsupportedMediaType(content_type));
        }

        let key = ObjectKey::for_upload(&session.email, &file.file_name, &content_type, &file.body);
        let stored = self
            .storage
            .put(&key, file.body, &content_type)
            .await
            .map_err(|e| {
                error!("Upload of {} to {} storage failed: {}", key, self.storage.name(), e);
                e
            })?;

        info!("Uploaded {} bytes to {}", stored.total_bytes, stored.key);

        self.attach(
            session,
            NewImage {
                url: stored.download_url,
                key: Some(stored.key),
                size: Some(stored.total_bytes),
                content_type: Some(content_type),
                file_name: Some(file.file_name).filter(|name| !name.is_empty()),
            },
        )
        .await
    }

    /// Attaches an externally hosted image by URL
    pub async fn attach_url(&self, session: &SessionContext, raw_url: &str) -> Result<ImageRef, ImageError> {
        let parsed = url::Url::parse(raw_url.trim()).map_err(|e| ImageError::InvalidUrl(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ImageError::InvalidUrl(format!("unsupported scheme {:?}", parsed.scheme())));
        }

        self.attach(
            session,
            NewImage {
                url: parsed.to_string(),
                ..Default::default()
            },
        )
        .await
    }

    /// Appends one reference document under `users/{email}/images`
    pub async fn attach(&self, session: &SessionContext, image: NewImage) -> Result<ImageRef, ImageError> {
        let collection = user_images(&session.email)?;

        let mut data = Map::new();
        data.insert("image".to_string(), json!(image.url));
        if let Some(key) = &image.key {
            data.insert("key".to_string(), json!(key));
        }
        if let Some(size) = image.size {
            data.insert("size".to_string(), json!(size));
        }
        if let Some(content_type) = &image.content_type {
            data.insert("content_type".to_string(), json!(content_type));
        }
        if let Some(file_name) = &image.file_name {
            data.insert("file_name".to_string(), json!(file_name));
        }

        let doc = self
            .documents
            .add(&collection, Value::Object(data))
            .await
            .map_err(|e| {
                error!("Attaching image to {} failed: {}", session.email, e);
                e
            })?;

        info!("Image reference {} written for {}", doc.id, session.email);

        ImageRef::from_document(doc)
            .ok_or_else(|| ImageError::Documents(DocumentError::QueryError("stored reference lost its URL".to_string())))
    }

    /// Every image reference the user owns, in store order
    pub async fn list(&self, session: &SessionContext) -> Result<Vec<ImageRef>, ImageError> {
        let collection = user_images(&session.email)?;
        let docs = self.documents.list(&collection).await?;

        Ok(docs
            .into_iter()
            .filter_map(|doc| {
                let id = doc.id.clone();
                let image = ImageRef::from_document(doc);
                if image.is_none() {
                    warn!("Skipping image reference {} of {} without a URL", id, session.email);
                }
                image
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::MemoryDocumentStore;
    use crate::storage::{MediaUrls, MemoryObjectStore};

    struct Fixture {
        service: ImageService,
        storage: Arc<MemoryObjectStore>,
    }

    fn fixture() -> Fixture {
        let storage = Arc::new(MemoryObjectStore::new(MediaUrls::new("http://gallery.test")));
        let service = ImageService::new(Arc::new(MemoryDocumentStore::new()), storage.clone(), 1024);
        Fixture { service, storage }
    }

    fn session(email: &str) -> SessionContext {
        SessionContext {
            email: email.to_string(),
            display_name: "User".to_string(),
        }
    }

    fn png(name: &str, body: &'static [u8]) -> UploadedFile {
        UploadedFile {
            file_name: name.to_string(),
            content_type: Some("image/png".to_string()),
            body: Bytes::from_static(body),
        }
    }

    #[tokio::test]
    async fn upload_creates_one_reference_pointing_at_storage_url() {
        let f = fixture();
        let alice = session("a@x.com");

        let image = f.service.upload(&alice, png("cat.png", b"cat")).await.unwrap();
        let key = ObjectKey::parse(image.key.as_deref().unwrap()).unwrap();
        assert_eq!(image.url, format!("http://gallery.test/media/{}", key));
        assert_eq!(image.size, Some(3));
        assert_eq!(image.file_name.as_deref(), Some("cat.png"));

        let listed = f.service.list(&alice).await.unwrap();
        assert_eq!(listed, vec![image]);

        let blob = f.storage.get(&key).await.unwrap().unwrap();
        assert_eq!(&blob.body[..], b"cat");
    }

    #[tokio::test]
    async fn same_file_name_with_new_bytes_does_not_overwrite() {
        let f = fixture();
        let alice = session("a@x.com");

        let first = f.service.upload(&alice, png("cat.png", b"first")).await.unwrap();
        let second = f.service.upload(&alice, png("cat.png", b"second")).await.unwrap();
        assert_ne!(first.url, second.url);

        let first_key = ObjectKey::parse(first.key.as_deref().unwrap()).unwrap();
        let blob = f.storage.get(&first_key).await.unwrap().unwrap();
        assert_eq!(&blob.body[..], b"first");
    }

    #[tokio::test]
    async fn sessions_only_see_their_own_images() {
        let f = fixture();
        f.service.upload(&session("a@x.com"), png("cat.png", b"cat")).await.unwrap();
        f.service.upload(&session("b@x.com"), png("cat.png", b"cat")).await.unwrap();
        f.service.upload(&session("b@x.com"), png("dog.png", b"dog")).await.unwrap();

        assert_eq!(f.service.list(&session("a@x.com")).await.unwrap().len(), 1);
        assert_eq!(f.service.list(&session("b@x.com")).await.unwrap().len(), 2);
        assert!(f.service.list(&session("c@x.com")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_empty_oversized_and_non_image_files() {
        let f = fixture();
        let alice = session("a@x.com");

        let err = f.service.upload(&alice, png("cat.png", b"")).await.unwrap_err();
        assert!(matches!(err, ImageError::EmptyFile));

        let big = UploadedFile {
            file_name: "big.png".to_string(),
            content_type: Some("image/png".to_string()),
            body: Bytes::from(vec![0u8; 2048]),
        };
        let err = f.service.upload(&alice, big).await.unwrap_err();
        assert!(matches!(err, ImageError::TooLarge { limit: 1024 }));

        let text = UploadedFile {
            file_name: "notes.txt".to_string(),
            content_type: None,
            body: Bytes::from_static(b"hello"),
        };
        let err = f.service.upload(&alice, text).await.unwrap_err();
        assert!(matches!(err, ImageError::UnsupportedMediaType(ref t) if t == "text/plain"));

        assert!(f.service.list(&alice).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn svg_and_other_scriptable_images_are_rejected() {
        let f = fixture();
        let alice = session("a@x.com");

        let svg = UploadedFile {
            file_name: "evil.svg".to_string(),
            content_type: Some("image/svg+xml".to_string()),
            body: Bytes::from_static(b"<svg xmlns=\"http://www.w3.org/2000/svg\"><script>alert(1)</script></svg>"),
        };
        let err = f.service.upload(&alice, svg).await.unwrap_err();
        assert!(matches!(err, ImageError::UnsupportedMediaType(ref t) if t == "image/svg+xml"));

        // No declared type: the .svg name must not sneak through the guess either
        let guessed = UploadedFile {
            file_name: "evil.svg".to_string(),
            content_type: None,
            body: Bytes::from_static(b"<svg/>"),
        };
        assert!(matches!(
            f.service.upload(&alice, guessed).await.unwrap_err(),
            ImageError::UnsupportedMediaType(_)
        ));

        assert!(f.service.list(&alice).await.unwrap().is_empty());
    }

    #[test]
    fn declared_type_parameters_are_ignored() {
        let file = UploadedFile {
            file_name: "cat".to_string(),
            content_type: Some("Image/PNG; charset=binary".to_string()),
            body: Bytes::from_static(b"x"),
        };
        assert_eq!(file.effective_content_type(), "image/png");
    }

    #[test]
    fn octet_stream_falls_back_to_file_name_guess() {
        let file = UploadedFile {
            file_name: "cat.JPG".to_string(),
            content_type: Some("application/octet-stream".to_string()),
            body: Bytes::from_static(b"x"),
        };
        assert_eq!(file.effective_content_type(), "image/jpeg");
    }

    #[tokio::test]
    async fn attach_url_validates_and_stores_url() {
        let f = fixture();
        let alice = session("a@x.com");

        let image = f
            .service
            .attach_url(&alice, "https://cdn.example.com/cat.png")
            .await
            .unwrap();
        assert_eq!(image.url, "https://cdn.example.com/cat.png");
        assert!(image.key.is_none());

        for bad in ["not a url", "ftp://example.com/cat.png", "javascript:alert(1)"] {
            let err = f.service.attach_url(&alice, bad).await.unwrap_err();
            assert!(matches!(err, ImageError::InvalidUrl(_)), "{bad}");
        }
        assert_eq!(f.service.list(&alice).await.unwrap().len(), 1);
    }
}
