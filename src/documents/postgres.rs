use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use tracing::info;
use uuid::Uuid;

use super::{into_object, CollectionPath, Document, DocumentError, DocumentRef, DocumentStore};

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS documents (
        collection TEXT NOT NULL,
        id TEXT NOT NULL,
        data JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp(),
        PRIMARY KEY (collection, id)
    )
"#;

/// Document store on a single Postgres `documents` table keyed by (collection, id)
#[derive(Clone)]
pub struct PostgresDocumentStore {
    pool: PgPool,
}

impl PostgresDocumentStore {
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        connection_timeout_secs: u64,
    ) -> Result<Self, DocumentError> {
        if database_url.is_empty() {
            return Err(DocumentError::ConnectionError("DATABASE_URL is not set".to_string()));
        }

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(connection_timeout_secs))
            .connect(database_url)
            .await
            .map_err(|e| DocumentError::ConnectionError(e.to_string()))?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> Result<(), DocumentError> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        info!("Document table ready");
        Ok(())
    }

    fn row_to_document(row: &sqlx::postgres::PgRow) -> Result<Document, DocumentError> {
        let id: String = row.try_get("id")?;
        let data: Value = row.try_get("data")?;
        let created_at: DateTime<Utc> = row.try_get("created_at")?;
        let data = into_object(data).map_err(|_| {
            DocumentError::QueryError(format!("document {} holds a non-object value", id))
        })?;
        Ok(Document { id, data, created_at })
    }
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    async fn get(&self, doc: &DocumentRef) -> Result<Option<Document>, DocumentError> {
        let row = sqlx::query("SELECT id, data, created_at FROM documents WHERE collection = $1 AND id = $2")
            .bind(doc.collection.as_path())
            .bind(&doc.id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_document).transpose()
    }

    async fn create_if_absent(&self, doc: &DocumentRef, data: Value) -> Result<bool, DocumentError> {
        let data = Value::Object(into_object(data)?);

        let result = sqlx::query(
            r#"
            INSERT INTO documents (collection, id, data)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, id) DO NOTHING
            "#,
        )
        .bind(doc.collection.as_path())
        .bind(&doc.id)
        .bind(data)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn add(&self, collection: &CollectionPath, data: Value) -> Result<Document, DocumentError> {
        let data = Value::Object(into_object(data)?);
        let id = Uuid::new_v4().to_string();

        let row = sqlx::query(
            r#"
            INSERT INTO documents (collection, id, data)
            VALUES ($1, $2, $3)
            RETURNING id, data, created_at
            "#,
        )
        .bind(collection.as_path())
        .bind(&id)
        .bind(data)
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_document(&row)
    }

    async fn list(&self, collection: &CollectionPath) -> Result<Vec<Document>, DocumentError> {
        let rows = sqlx::query(
            "SELECT id, data, created_at FROM documents WHERE collection = $1 ORDER BY created_at, id",
        )
        .bind(collection.as_path())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_document).collect()
    }

    async fn health_check(&self) -> Result<(), DocumentError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
