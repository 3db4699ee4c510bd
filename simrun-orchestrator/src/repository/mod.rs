//! Repository Module
//!
//! Data access layer for the orchestrator. Every store is a trait with a
//! Postgres implementation and an in-memory one used when no database is
//! configured.

pub mod catalog;
pub mod document;
pub mod run;

pub use catalog::{Catalog, CatalogSeed, Document};
pub use document::{DocumentKind, DocumentStore, InMemoryDocumentStore, PgDocumentStore};
pub use run::{InMemoryRunRepository, PgRunRepository, RunRepository};

/// Storage error shared by every repository
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("malformed stored document: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RepositoryError>;
