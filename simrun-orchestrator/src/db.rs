use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Create scenario runs table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS scenario_runs (
            id UUID PRIMARY KEY,
            owner_id VARCHAR(255) NOT NULL,
            csm_simulation_run UUID NOT NULL,
            organization_id VARCHAR(255) NOT NULL,
            workspace_id VARCHAR(255) NOT NULL,
            workspace_key VARCHAR(255) NOT NULL,
            scenario_id VARCHAR(255) NOT NULL,
            solution_id VARCHAR(255) NOT NULL,
            run_template_id VARCHAR(255) NOT NULL,
            solution_sdk_version VARCHAR(50),
            no_data_ingestion_state BOOLEAN NOT NULL DEFAULT FALSE,
            workflow_id VARCHAR(255) NOT NULL,
            workflow_name VARCHAR(255) NOT NULL,
            node_label VARCHAR(255) NOT NULL,
            containers JSONB NOT NULL DEFAULT '[]',
            state VARCHAR(50),
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create catalog documents table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            kind VARCHAR(50) NOT NULL,
            id VARCHAR(255) NOT NULL,
            body JSONB NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL,
            PRIMARY KEY (kind, id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for run searches
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_scenario_runs_scope ON scenario_runs(organization_id, workspace_id, scenario_id)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_scenario_runs_created_at ON scenario_runs(created_at DESC)",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_scenario_runs_owner ON scenario_runs(owner_id)")
        .execute(pool)
        .await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
