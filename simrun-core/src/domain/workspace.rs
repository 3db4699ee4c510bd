//! Workspace and organization domain types

use serde::{Deserialize, Serialize};

/// Workspace in which scenarios of a solution are run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    pub id: String,
    pub name: String,
    pub organization_id: String,
    /// Also the name of the ingestion database
    pub key: String,
    pub solution_id: String,
    #[serde(default = "default_send_input")]
    pub send_input_to_data_warehouse: bool,
}

fn default_send_input() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    pub name: String,
}
