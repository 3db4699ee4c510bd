//! Simrun Core
//!
//! Core types shared by the simrun services.
//!
//! This crate contains:
//! - Domain types: solutions, run templates, scenarios, datasets, runs
//! - DTOs: request and response payloads of the orchestrator API

pub mod domain;
pub mod dto;
