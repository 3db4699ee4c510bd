//! Core domain types
//!
//! This module contains the domain structures shared by the orchestrator
//! (which builds, persists and reconciles runs) and its clients.
//! Catalog entities (organizations, workspaces, solutions, scenarios,
//! datasets, connectors) are owned by other services and only read here.

pub mod dataset;
pub mod run;
pub mod scenario;
pub mod solution;
pub mod workspace;
