//! Dataset and connector domain types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Dataset fetched into a run through a connector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub id: String,
    pub name: String,
    pub organization_id: String,
    /// Cleared when the connector is removed
    #[serde(default)]
    pub connector: Option<DatasetConnector>,
    #[serde(default)]
    pub compatibility: Vec<String>,
}

/// Connector binding of a dataset with its parameter values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConnector {
    pub id: String,
    #[serde(default)]
    pub parameters_values: HashMap<String, String>,
}

/// Image able to fetch a dataset into the run volume
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connector {
    pub id: String,
    pub name: String,
    pub repository: String,
    pub version: String,
    #[serde(default)]
    pub parameter_groups: Vec<ConnectorParameterGroup>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorParameterGroup {
    pub id: String,
    #[serde(default)]
    pub parameters: Vec<ConnectorParameter>,
}

/// Connector parameter
///
/// Parameters without `env_var` are passed as positional arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorParameter {
    pub id: String,
    #[serde(default)]
    pub env_var: Option<String>,
}

impl Connector {
    /// All parameters in group declaration order
    pub fn parameters(&self) -> impl Iterator<Item = &ConnectorParameter> {
        self.parameter_groups.iter().flat_map(|g| g.parameters.iter())
    }
}
