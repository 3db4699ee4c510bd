//! Simrun HTTP Client
//!
//! A type-safe HTTP client for the simrun orchestrator API, used by the
//! `simrun` command line tool.
//!
//! # Example
//!
//! ```no_run
//! use simrun_client::OrchestratorClient;
//!
//! #[tokio::main]
//! async fn main() -> simrun_client::Result<()> {
//!     let client = OrchestratorClient::new("http://localhost:8080").as_user("alice");
//!
//!     let run = client.start_run("o-1", "w-1", "s-1").await?;
//!     let status = client.get_run_status("o-1", run.id).await?;
//!
//!     println!("Run {} is {}", run.id, status.state);
//!     Ok(())
//! }
//! ```

pub mod error;
mod entities;
mod runs;

// Re-export commonly used types
pub use error::{ClientError, Result};

use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;

/// Header carrying the identity of the caller
pub const CALLER_HEADER: &str = "x-user-id";

/// HTTP client for the simrun orchestrator API
///
/// Endpoints are grouped into run operations (start, query, status, logs,
/// stop, delete, search) and entity deletions.
#[derive(Debug, Clone)]
pub struct OrchestratorClient {
    /// Base URL of the orchestrator (e.g., "http://localhost:8080")
    base_url: String,
    /// Identity sent with every request
    user_id: Option<String>,
    client: Client,
}

impl OrchestratorClient {
    /// Create a new orchestrator client
    ///
    /// # Example
    /// ```
    /// use simrun_client::OrchestratorClient;
    ///
    /// let client = OrchestratorClient::new("http://localhost:8080");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new orchestrator client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            user_id: None,
            client,
        }
    }

    /// Sends every request on behalf of the given user
    pub fn as_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Get the base URL of the orchestrator
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("{} {}", method, url);
        let builder = self.client.request(method, url);

        match &self.user_id {
            Some(user) => builder.header(CALLER_HEADER, user),
            None => builder,
        }
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let response = self.check_status(response).await?;

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Handle an API response that returns no content (e.g., DELETE operations)
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        self.check_status(response).await.map(|_| ())
    }

    async fn check_status(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_message(body)));
        }

        Ok(response)
    }
}

/// Message of an orchestrator error body `{"error": "..."}`, or the raw body
fn error_message(body: String) -> String {
    serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or(body)
}
