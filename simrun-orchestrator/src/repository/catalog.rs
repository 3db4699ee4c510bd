//! Typed access to catalog documents

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use simrun_core::domain::dataset::{Connector, Dataset};
use simrun_core::domain::scenario::Scenario;
use simrun_core::domain::solution::Solution;
use simrun_core::domain::workspace::{Organization, Workspace};
use std::sync::Arc;

use super::{DocumentKind, DocumentStore, Result};

/// Entity stored as a catalog document
pub trait Document: Serialize + DeserializeOwned + Send + Sync {
    const KIND: DocumentKind;

    fn id(&self) -> &str;
}

macro_rules! document {
    ($ty:ty, $kind:expr) => {
        impl Document for $ty {
            const KIND: DocumentKind = $kind;

            fn id(&self) -> &str {
                &self.id
            }
        }
    };
}

document!(Organization, DocumentKind::Organization);
document!(Workspace, DocumentKind::Workspace);
document!(Scenario, DocumentKind::Scenario);
document!(Solution, DocumentKind::Solution);
document!(Dataset, DocumentKind::Dataset);
document!(Connector, DocumentKind::Connector);

/// Catalog of entities backed by a document store
#[derive(Clone)]
pub struct Catalog {
    store: Arc<dyn DocumentStore>,
}

impl Catalog {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn get<T: Document>(&self, id: &str) -> Result<Option<T>> {
        match self.store.get(T::KIND, id).await? {
            Some(body) => Ok(Some(serde_json::from_value(body)?)),
            None => Ok(None),
        }
    }

    pub async fn list<T: Document>(&self) -> Result<Vec<T>> {
        self.store
            .list(T::KIND)
            .await?
            .into_iter()
            .map(|body| serde_json::from_value(body).map_err(Into::into))
            .collect()
    }

    pub async fn put<T: Document>(&self, document: &T) -> Result<()> {
        self.store
            .upsert(T::KIND, document.id(), serde_json::to_value(document)?)
            .await
    }

    /// Replaces a document only if it is still stored
    pub async fn update<T: Document>(&self, document: &T) -> Result<bool> {
        self.store
            .update(T::KIND, document.id(), serde_json::to_value(document)?)
            .await
    }

    pub async fn delete<T: Document>(&self, id: &str) -> Result<bool> {
        self.store.delete(T::KIND, id).await
    }

    /// Documents found for the given ids; unknown ids are skipped
    pub async fn get_many<T: Document>(&self, ids: &[&str]) -> Result<Vec<T>> {
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(document) = self.get::<T>(id).await? {
                found.push(document);
            }
        }
        Ok(found)
    }

    /// Loads every entity of a seed
    pub async fn import(&self, seed: &CatalogSeed) -> Result<()> {
        for o in &seed.organizations {
            self.put(o).await?;
        }
        for w in &seed.workspaces {
            self.put(w).await?;
        }
        for s in &seed.solutions {
            self.put(s).await?;
        }
        for c in &seed.connectors {
            self.put(c).await?;
        }
        for d in &seed.datasets {
            self.put(d).await?;
        }
        for s in &seed.scenarios {
            self.put(s).await?;
        }

        tracing::info!(
            "Imported catalog seed: {} organization(s), {} workspace(s), {} scenario(s)",
            seed.organizations.len(),
            seed.workspaces.len(),
            seed.scenarios.len()
        );
        Ok(())
    }
}

/// Catalog content loaded at startup
#[derive(Debug, Default, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub organizations: Vec<Organization>,
    #[serde(default)]
    pub workspaces: Vec<Workspace>,
    #[serde(default)]
    pub solutions: Vec<Solution>,
    #[serde(default)]
    pub connectors: Vec<Connector>,
    #[serde(default)]
    pub datasets: Vec<Dataset>,
    #[serde(default)]
    pub scenarios: Vec<Scenario>,
}
