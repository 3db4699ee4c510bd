//! Data Transfer Objects for the orchestrator API
//!
//! This module contains the request and response payloads exchanged between
//! the orchestrator and its clients (CLI, other services).

pub mod run;
