//! Domain logic for the screenplan backend.
//!
//! This crate has no internal dependencies so the database layer, the API
//! server and any future tooling can share the same rules: plan status
//! transitions, the three-step workflow controller, project listing,
//! upload validation and plan generation.

pub mod error;
pub mod listing;
pub mod plan;
pub mod plan_status;
pub mod types;
pub mod upload;
pub mod validation;
pub mod workflow;
