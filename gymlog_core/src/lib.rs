#![forbid(unsafe_code)]

//! Core domain model and business logic for gymlog.
//!
//! This crate provides:
//! - Domain types (workouts, exercises, sets, sessions, cardio metrics)
//! - Unit conversion between display and storage units
//! - The store collaborator and its JSON file persistence
//! - Reconciliation of edited workouts against stored ones
//! - Aggregation of session history into chart series
//! - CSV export

pub mod types;
pub mod error;
pub mod units;
pub mod config;
pub mod logging;
pub mod store;
pub mod persist;
pub mod reconcile;
pub mod aggregate;
pub mod export;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use units::{DistanceUnit, WeightUnit};
pub use config::Config;
pub use store::{Database, WorkoutStore};
pub use reconcile::{
    create_cardio_workout, create_gym_workout, delete_workout, diff_cardio, diff_workout,
    reconcile_cardio_workout, reconcile_gym_workout, validate_edited, ChangeSummary,
    ReconcileOutcome, WriteSet,
};
pub use aggregate::{
    aggregate_cardio, aggregate_gym, cardio_history, gym_history, CardioHistory,
    ExerciseHistory,
};
pub use export::{export_cardio_history, export_gym_history};
