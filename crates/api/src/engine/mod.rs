//! Plan generation engine.
//!
//! Contains the runner that executes a [`PlanGenerator`] for a screen in a
//! background task and records the outcome on the screen row.
//!
//! [`PlanGenerator`]: screenplan_core::plan::PlanGenerator

pub mod plan_runner;
