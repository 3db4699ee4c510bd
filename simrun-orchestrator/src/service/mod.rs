//! Service Module
//!
//! Business logic layer for the orchestrator.
//! Services orchestrate between repositories, the workflow executor and the
//! ingestion backend, and contain the domain logic.

pub mod entity;
pub mod events;
pub mod listeners;
pub mod pipeline;
pub mod run;
pub mod status;
pub mod teardown;

pub use entity::EntityService;
pub use events::{DomainEvent, EventBus, EventKind};
pub use run::{RunError, RunService};
pub use status::StatusReconciler;
pub use teardown::RunTeardown;
