use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{into_object, CollectionPath, Document, DocumentError, DocumentRef, DocumentStore};

/// Process-local document store; collections keep insertion order
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    collections: Arc<RwLock<HashMap<CollectionPath, Vec<Document>>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, doc: &DocumentRef) -> Result<Option<Document>, DocumentError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&doc.collection)
            .and_then(|docs| docs.iter().find(|d| d.id == doc.id))
            .cloned())
    }

    async fn create_if_absent(&self, doc: &DocumentRef, data: Value) -> Result<bool, DocumentError> {
        let data = into_object(data)?;

        // Check and insert under one write lock
        let mut collections = self.collections.write().await;
        let docs = collections.entry(doc.collection.clone()).or_default();
        if docs.iter().any(|d| d.id == doc.id) {
            return Ok(false);
        }

        docs.push(Document {
            id: doc.id.clone(),
            data,
            created_at: Utc::now(),
        });
        Ok(true)
    }

    async fn add(&self, collection: &CollectionPath, data: Value) -> Result<Document, DocumentError> {
        let document = Document {
            id: Uuid::new_v4().to_string(),
            data: into_object(data)?,
            created_at: Utc::now(),
        };

        let mut collections = self.collections.write().await;
        collections
            .entry(collection.clone())
            .or_default()
            .push(document.clone());
        Ok(document)
    }

    async fn list(&self, collection: &CollectionPath) -> Result<Vec<Document>, DocumentError> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection).cloned().unwrap_or_default())
    }

    async fn health_check(&self) -> Result<(), DocumentError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn users() -> CollectionPath {
        CollectionPath::root("users").unwrap()
    }

    #[tokio::test]
    async fn create_if_absent_writes_once() {
        let store = MemoryDocumentStore::new();
        let doc = users().doc("a@x.com").unwrap();

        assert!(store.create_if_absent(&doc, json!({"name": "A"})).await.unwrap());
        assert!(!store.create_if_absent(&doc, json!({"name": "Other"})).await.unwrap());

        let stored = store.get(&doc).await.unwrap().unwrap();
        assert_eq!(stored.get_str("name"), Some("A"));
    }

    #[tokio::test]
    async fn concurrent_creates_produce_one_document() {
        let store = MemoryDocumentStore::new();
        let doc = users().doc("race@x.com").unwrap();

        let attempts = (0..16).map(|i| {
            let store = store.clone();
            let doc = doc.clone();
            tokio::spawn(async move { store.create_if_absent(&doc, json!({"name": i})).await })
        });
        let created = futures::future::join_all(attempts)
            .await
            .into_iter()
            .filter(|r| matches!(r, Ok(Ok(true))))
            .count();

        assert_eq!(created, 1);
        assert_eq!(store.list(&users()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn add_appends_in_insertion_order() {
        let store = MemoryDocumentStore::new();
        let images = users().doc("a@x.com").unwrap().collection("images").unwrap();

        let first = store.add(&images, json!({"image": "1"})).await.unwrap();
        let second = store.add(&images, json!({"image": "2"})).await.unwrap();
        assert_ne!(first.id, second.id);

        let listed: Vec<_> = store
            .list(&images)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(listed, vec![first.id, second.id]);
    }

    #[tokio::test]
    async fn subcollections_are_isolated_per_parent() {
        let store = MemoryDocumentStore::new();
        let a = users().doc("a@x.com").unwrap().collection("images").unwrap();
        let b = users().doc("b@x.com").unwrap().collection("images").unwrap();

        store.add(&a, json!({"image": "1"})).await.unwrap();
        assert!(store.list(&b).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_non_object_data() {
        let store = MemoryDocumentStore::new();
        let err = store.add(&users(), json!("scalar")).await.unwrap_err();
        assert!(matches!(err, DocumentError::NotAnObject));
    }
}
