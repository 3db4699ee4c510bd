//! Configuration module
//!
//! Handles CLI configuration including orchestrator URL and caller identity.

use simrun_client::OrchestratorClient;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the orchestrator service
    pub orchestrator_url: String,
    /// Organization every command is scoped to
    pub organization: String,
    /// User sent in the caller header, if any
    pub user: Option<String>,
}

impl Config {
    /// Client for the configured orchestrator, acting as the configured user
    pub fn client(&self) -> OrchestratorClient {
        let client = OrchestratorClient::new(&self.orchestrator_url);
        match &self.user {
            Some(user) => client.as_user(user),
            None => client,
        }
    }
}
