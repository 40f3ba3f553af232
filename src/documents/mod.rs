//! Hierarchical document store.
//!
//! Documents live in collections addressed by slash-separated paths that
//! alternate collection and document ids, e.g. `users/a@x.com/images`.
//! Backends only need point reads, atomic create-if-absent, appends with a
//! generated id and full collection listings.

pub mod memory;
pub mod postgres;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

pub use memory::MemoryDocumentStore;
pub use postgres::PostgresDocumentStore;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Invalid path segment: {0:?}")]
    InvalidSegment(String),

    #[error("Document data must be a JSON object")]
    NotAnObject,

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

fn validate_segment(segment: &str) -> Result<(), DocumentError> {
    if segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains('/')
        || segment.len() > 1500
    {
        return Err(DocumentError::InvalidSegment(segment.to_string()));
    }
    Ok(())
}

/// Path of a collection: `name` or `name/doc/name/...`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath {
    segments: Vec<String>,
}

impl CollectionPath {
    pub fn root(name: impl Into<String>) -> Result<Self, DocumentError> {
        let name = name.into();
        validate_segment(&name)?;
        Ok(Self { segments: vec![name] })
    }

    pub fn doc(&self, id: impl Into<String>) -> Result<DocumentRef, DocumentError> {
        let id = id.into();
        validate_segment(&id)?;
        Ok(DocumentRef {
            collection: self.clone(),
            id,
        })
    }

    pub fn as_path(&self) -> String {
        self.segments.join("/")
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_path())
    }
}

/// A single document address inside a collection
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentRef {
    pub collection: CollectionPath,
    pub id: String,
}

impl DocumentRef {
    /// Subcollection nested under this document
    pub fn collection(&self, name: impl Into<String>) -> Result<CollectionPath, DocumentError> {
        let name = name.into();
        validate_segment(&name)?;
        let mut segments = self.collection.segments.clone();
        segments.push(self.id.clone());
        segments.push(name);
        Ok(CollectionPath { segments })
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// Stored document snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub id: String,
    pub data: Map<String, Value>,
    pub created_at: DateTime<Utc>,
}

impl Document {
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.data.get(field).and_then(Value::as_str)
    }
}

pub(crate) fn into_object(data: Value) -> Result<Map<String, Value>, DocumentError> {
    match data {
        Value::Object(map) => Ok(map),
        _ => Err(DocumentError::NotAnObject),
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Point read
    async fn get(&self, doc: &DocumentRef) -> Result<Option<Document>, DocumentError>;

    /// Writes `data` only when no document exists at `doc`.
    /// Returns `true` when this call created it. Must be atomic.
    async fn create_if_absent(&self, doc: &DocumentRef, data: Value) -> Result<bool, DocumentError>;

    /// Appends a document with a generated id
    async fn add(&self, collection: &CollectionPath, data: Value) -> Result<Document, DocumentError>;

    /// Every document of the collection, in backend order
    async fn list(&self, collection: &CollectionPath) -> Result<Vec<Document>, DocumentError>;

    async fn health_check(&self) -> Result<(), DocumentError>;
}
