//! API Module
//!
//! HTTP API layer for the orchestrator.
//! Each submodule handles endpoints for a specific domain.

pub mod entity;
pub mod error;
pub mod health;
pub mod run;

use axum::{
    Router,
    extract::FromRequestParts,
    http::{HeaderName, Method, header, request::Parts},
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::error::ApiError;
use crate::service::{EntityService, RunService};

/// Header carrying the identity of the caller
pub const CALLER_HEADER: &str = "x-user-id";

/// Shared state of every handler
#[derive(Clone)]
pub struct AppState {
    pub runs: Arc<RunService>,
    pub entities: Arc<EntityService>,
}

/// Identity of the caller, taken from the `x-user-id` header
#[derive(Debug, Clone)]
pub struct Caller(pub String);

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(CALLER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| Caller(v.to_string()))
            .ok_or_else(|| ApiError::Unauthorized(format!("missing {} header", CALLER_HEADER)))
    }
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Scenario scoped endpoints
        .route(
            "/organizations/{organization_id}/workspaces/{workspace_id}/scenarios/{scenario_id}/run",
            post(run::start_run),
        )
        .route(
            "/organizations/{organization_id}/workspaces/{workspace_id}/scenarios/{scenario_id}/runs",
            get(run::list_runs_by_scenario),
        )
        .route(
            "/organizations/{organization_id}/workspaces/{workspace_id}/scenarios/{scenario_id}",
            delete(entity::delete_scenario),
        )
        // Workspace and organization endpoints
        .route(
            "/organizations/{organization_id}/workspaces/{workspace_id}/runs",
            get(run::list_runs_by_workspace),
        )
        .route(
            "/organizations/{organization_id}/workspaces/{workspace_id}",
            delete(entity::delete_workspace),
        )
        .route(
            "/organizations/{organization_id}",
            delete(entity::unregister_organization),
        )
        .route("/connectors/{connector_id}", delete(entity::remove_connector))
        // Run endpoints
        .route(
            "/organizations/{organization_id}/runs/search",
            post(run::search_runs),
        )
        .route(
            "/organizations/{organization_id}/runs/{run_id}",
            get(run::get_run).delete(run::delete_run),
        )
        .route(
            "/organizations/{organization_id}/runs/{run_id}/status",
            get(run::get_run_status),
        )
        .route(
            "/organizations/{organization_id}/runs/{run_id}/logs",
            get(run::get_run_logs),
        )
        .route(
            "/organizations/{organization_id}/runs/{run_id}/stop",
            post(run::stop_run),
        )
        // Add state and middleware
        .with_state(state)
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
}

/// CORS policy letting browser clients call the API with a caller header
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(CALLER_HEADER),
        ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::time::Duration;
    use tower::ServiceExt;

    use crate::repository::{Catalog, InMemoryDocumentStore, InMemoryRunRepository};
    use crate::service::events::EventBus;
    use crate::service::pipeline::PipelineBuilder;
    use crate::service::status::StatusReconciler;
    use crate::service::teardown::RunTeardown;
    use crate::test_support::{FakeExecutor, FakeIngestion, platform_settings};
    use simrun_core::domain::solution::SdkVersion;

    fn router() -> Router {
        let catalog = Catalog::new(Arc::new(InMemoryDocumentStore::new()));
        let runs = Arc::new(InMemoryRunRepository::new());
        let ingestion = Arc::new(FakeIngestion::default());
        let events = EventBus::default();

        let run_service = RunService::new(
            catalog.clone(),
            runs.clone(),
            Arc::new(FakeExecutor::default()),
            PipelineBuilder::new(platform_settings()),
            StatusReconciler::new(
                ingestion.clone(),
                Duration::from_millis(200),
                SdkVersion::new(8, 5),
                Duration::from_secs(3600),
            ),
            RunTeardown::new(runs, ingestion),
            events.clone(),
        );

        create_router(AppState {
            runs: Arc::new(run_service),
            entities: Arc::new(EntityService::new(catalog, events)),
        })
    }

    #[tokio::test]
    async fn test_cors_preflight_allows_caller_header() {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/organizations/o-1/runs/search")
            .header(header::ORIGIN, "http://console.simrun.local")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, CALLER_HEADER)
            .body(Body::empty())
            .unwrap();

        let response = router().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
        let allowed = response.headers()[header::ACCESS_CONTROL_ALLOW_HEADERS]
            .to_str()
            .unwrap();
        assert!(allowed.contains(CALLER_HEADER));
    }

    #[tokio::test]
    async fn test_missing_caller_header_is_unauthorized() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/organizations/o-1/workspaces/w-1/scenarios/s-1/run")
            .body(Body::empty())
            .unwrap();

        let response = router().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
