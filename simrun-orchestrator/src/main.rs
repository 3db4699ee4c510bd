//! Simrun Orchestrator
//!
//! HTTP service turning scenarios into executor workflows and reconciling
//! their state with the ingestion backend.
//!
//! Architecture:
//! - Configuration: settings loaded from the environment
//! - Repositories: run records and catalog documents (Postgres or in-memory)
//! - Services: pipeline building, runs, status reconciliation, events
//! - Executor / ingestion: HTTP adapters to the external collaborators

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;
pub mod config;
pub mod db;
pub mod executor;
pub mod ingestion;
pub mod repository;
pub mod service;

#[cfg(test)]
mod test_support;

use crate::config::Config;
use crate::executor::ArgoExecutor;
use crate::ingestion::HttpIngestionBackend;
use crate::repository::{
    Catalog, CatalogSeed, DocumentStore, InMemoryDocumentStore, InMemoryRunRepository,
    PgDocumentStore, PgRunRepository, RunRepository,
};
use crate::service::pipeline::PipelineBuilder;
use crate::service::{
    EntityService, EventBus, RunService, RunTeardown, StatusReconciler, listeners,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "simrun_orchestrator=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Simrun Orchestrator...");

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    let (runs, documents) = open_storage(&config).await?;
    let catalog = Catalog::new(documents);

    if let Some(path) = &config.catalog_seed {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read catalog seed {}", path.display()))?;
        let seed: CatalogSeed = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse catalog seed {}", path.display()))?;
        catalog.import(&seed).await?;
    }

    let ingestion = Arc::new(HttpIngestionBackend::new(config.ingestion.url.clone()));
    let executor = Arc::new(ArgoExecutor::new(config.executor.clone()));
    tracing::info!(
        "Executor at {} (namespace {}), ingestion backend at {}",
        config.executor.url,
        config.executor.namespace,
        config.ingestion.url
    );

    let teardown = RunTeardown::new(runs.clone(), ingestion.clone());
    let events = listeners::register(EventBus::builder(), &catalog, runs.clone(), teardown.clone())
        .build();

    let run_service = RunService::new(
        catalog.clone(),
        runs,
        executor,
        PipelineBuilder::new(config.platform.clone()),
        StatusReconciler::new(
            ingestion,
            config.ingestion.timeout,
            config.min_ingestion_sdk_version,
            config.ingestion.observation_window,
        ),
        teardown,
        events.clone(),
    )
    .with_executor_timeout(config.executor.timeout);

    let state = api::AppState {
        runs: Arc::new(run_service),
        entities: Arc::new(EntityService::new(catalog, events)),
    };

    // Build router with all API endpoints
    let app = api::create_router(state);

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;

    Ok(())
}

/// Opens the run and document stores
///
/// Uses Postgres when a database URL is configured, memory otherwise.
async fn open_storage(
    config: &Config,
) -> Result<(Arc<dyn RunRepository>, Arc<dyn DocumentStore>)> {
    let Some(database_url) = &config.database_url else {
        tracing::warn!("DATABASE_URL not set, runs and documents are kept in memory");
        return Ok((
            Arc::new(InMemoryRunRepository::new()),
            Arc::new(InMemoryDocumentStore::new()),
        ));
    };

    tracing::info!("Connecting to database...");

    let pool = db::create_pool(database_url)
        .await
        .context("Failed to create database pool")?;

    tracing::info!("Database connection pool created");

    db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    Ok((
        Arc::new(PgRunRepository::new(pool.clone())),
        Arc::new(PgDocumentStore::new(pool)),
    ))
}
