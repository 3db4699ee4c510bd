//! Document Store
//!
//! Keyed JSON document store holding the catalog entities (organizations,
//! workspaces, scenarios, solutions, datasets and connectors).

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::Result;

/// Kind of a stored document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DocumentKind {
    Organization,
    Workspace,
    Scenario,
    Solution,
    Dataset,
    Connector,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Organization => "organization",
            DocumentKind::Workspace => "workspace",
            DocumentKind::Scenario => "scenario",
            DocumentKind::Solution => "solution",
            DocumentKind::Dataset => "dataset",
            DocumentKind::Connector => "connector",
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, kind: DocumentKind, id: &str) -> Result<Option<Value>>;

    async fn list(&self, kind: DocumentKind) -> Result<Vec<Value>>;

    /// Inserts or replaces a document
    async fn upsert(&self, kind: DocumentKind, id: &str, document: Value) -> Result<()>;

    /// Replaces an existing document, returning false when it does not exist
    async fn update(&self, kind: DocumentKind, id: &str, document: Value) -> Result<bool>;

    /// Deletes a document, returning whether it existed
    async fn delete(&self, kind: DocumentKind, id: &str) -> Result<bool>;
}

/// Postgres implementation of DocumentStore
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get(&self, kind: DocumentKind, id: &str) -> Result<Option<Value>> {
        let body = sqlx::query_scalar::<_, Value>(
            "SELECT body FROM documents WHERE kind = $1 AND id = $2",
        )
        .bind(kind.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(body)
    }

    async fn list(&self, kind: DocumentKind) -> Result<Vec<Value>> {
        let bodies =
            sqlx::query_scalar::<_, Value>("SELECT body FROM documents WHERE kind = $1 ORDER BY id")
                .bind(kind.as_str())
                .fetch_all(&self.pool)
                .await?;

        Ok(bodies)
    }

    async fn upsert(&self, kind: DocumentKind, id: &str, document: Value) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO documents (kind, id, body, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (kind, id) DO UPDATE SET body = EXCLUDED.body, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(kind.as_str())
        .bind(id)
        .bind(document)
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(&self, kind: DocumentKind, id: &str, document: Value) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE documents SET body = $3, updated_at = $4 WHERE kind = $1 AND id = $2",
        )
        .bind(kind.as_str())
        .bind(id)
        .bind(document)
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, kind: DocumentKind, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE kind = $1 AND id = $2")
            .bind(kind.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// In-memory implementation of DocumentStore
#[derive(Default)]
pub struct InMemoryDocumentStore {
    documents: RwLock<BTreeMap<(DocumentKind, String), Value>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, kind: DocumentKind, id: &str) -> Result<Option<Value>> {
        Ok(self
            .documents
            .read()
            .await
            .get(&(kind, id.to_string()))
            .cloned())
    }

    async fn list(&self, kind: DocumentKind) -> Result<Vec<Value>> {
        Ok(self
            .documents
            .read()
            .await
            .iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|(_, v)| v.clone())
            .collect())
    }

    async fn upsert(&self, kind: DocumentKind, id: &str, document: Value) -> Result<()> {
        self.documents
            .write()
            .await
            .insert((kind, id.to_string()), document);
        Ok(())
    }

    async fn update(&self, kind: DocumentKind, id: &str, document: Value) -> Result<bool> {
        match self.documents.write().await.get_mut(&(kind, id.to_string())) {
            Some(existing) => {
                *existing = document;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, kind: DocumentKind, id: &str) -> Result<bool> {
        Ok(self
            .documents
            .write()
            .await
            .remove(&(kind, id.to_string()))
            .is_some())
    }
}
