//! Core domain types for gymlog.
//!
//! This module defines:
//! - Persisted rows (workouts, exercises, sets, sessions, cardio metrics)
//! - Edited in-memory values the UI/CLI hands to the reconciler
//! - Read-side bundles returned by the store

use crate::units::{DistanceUnit, WeightUnit};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Persisted Rows
// ============================================================================

/// Kind of workout
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WorkoutKind {
    Gym,
    Cardio,
}

/// A named workout (gym split or cardio routine)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Workout {
    pub id: i64,
    pub name: String,
    pub kind: WorkoutKind,
}

/// An exercise belonging to a gym workout
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Exercise {
    pub id: i64,
    pub uuid: Uuid,
    pub workout_id: i64,
    pub name: String,
    pub description: Option<String>,
}

/// A set belonging to an exercise; weight is always kilograms
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExerciseSet {
    pub id: i64,
    pub uuid: Uuid,
    pub exercise_id: i64,
    pub weight_kg: f64,
    pub reps: u32,
}

/// A completed gym session
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GymSession {
    pub id: i64,
    pub workout_id: i64,
    pub performed_at: DateTime<Utc>,
}

/// Immutable snapshot of a set as performed in a session
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SetSession {
    pub id: i64,
    pub session_id: i64,
    pub set_id: i64,
    pub weight_kg: f64,
    pub reps: u32,
}

/// Current cardio values of a workout, with the time each was last set
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CardioMetrics {
    pub workout_id: i64,
    pub steps: Option<u32>,
    pub steps_updated_at: Option<DateTime<Utc>>,
    pub distance_km: Option<f64>,
    pub distance_updated_at: Option<DateTime<Utc>>,
    pub duration_secs: Option<u64>,
    pub duration_updated_at: Option<DateTime<Utc>>,
}

impl CardioMetrics {
    /// Metrics with nothing recorded yet
    pub fn empty(workout_id: i64) -> Self {
        Self {
            workout_id,
            steps: None,
            steps_updated_at: None,
            distance_km: None,
            distance_updated_at: None,
            duration_secs: None,
            duration_updated_at: None,
        }
    }
}

/// A cardio history entry; only metrics changed in that edit are present
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CardioSession {
    pub id: i64,
    pub workout_id: i64,
    pub performed_at: DateTime<Utc>,
    pub steps: Option<u32>,
    pub distance_km: Option<f64>,
    pub duration_secs: Option<u64>,
}

/// Values of a cardio session about to be inserted
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CardioEntry {
    pub performed_at: DateTime<Utc>,
    pub steps: Option<u32>,
    pub distance_km: Option<f64>,
    pub duration_secs: Option<u64>,
}

impl CardioEntry {
    pub fn is_empty(&self) -> bool {
        self.steps.is_none() && self.distance_km.is_none() && self.duration_secs.is_none()
    }
}

// ============================================================================
// Read-side Bundles
// ============================================================================

/// An exercise together with its sets, in storage order
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PersistedExercise {
    pub exercise: Exercise,
    pub sets: Vec<ExerciseSet>,
}

/// A gym session together with its set snapshots
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GymSessionRecord {
    pub session: GymSession,
    pub snapshots: Vec<SetSession>,
}

/// Inclusive time window for history reads; `None` bounds are open
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TimeRange {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl TimeRange {
    /// Unbounded range
    pub fn all() -> Self {
        Self::default()
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.since.map_or(true, |since| at >= since) && self.until.map_or(true, |until| at <= until)
    }
}

// ============================================================================
// Edited (in-memory) Values
// ============================================================================

/// A set as edited by the user, weight in the preferred display unit
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EditedSet {
    pub uuid: Uuid,
    pub weight: f64,
    pub reps: u32,
    /// Performed in this session; never persisted on the set itself
    #[serde(default)]
    pub checked: bool,
}

impl EditedSet {
    /// A new set with a freshly generated identity
    pub fn new(weight: f64, reps: u32) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            weight,
            reps,
            checked: false,
        }
    }

    pub fn with_weight(self, weight: f64) -> Self {
        Self { weight, ..self }
    }

    pub fn with_reps(self, reps: u32) -> Self {
        Self { reps, ..self }
    }

    pub fn checked(self, checked: bool) -> Self {
        Self { checked, ..self }
    }
}

/// An exercise as edited by the user
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EditedExercise {
    pub uuid: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sets: Vec<EditedSet>,
}

impl EditedExercise {
    /// A new exercise with a freshly generated identity and no sets
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            description: None,
            sets: Vec::new(),
        }
    }

    pub fn with_name(self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self
        }
    }

    pub fn with_description(self, description: Option<String>) -> Self {
        Self {
            description,
            ..self
        }
    }

    pub fn with_set(mut self, set: EditedSet) -> Self {
        self.sets.push(set);
        self
    }

    pub fn with_sets(self, sets: Vec<EditedSet>) -> Self {
        Self { sets, ..self }
    }

    /// Replace the set carrying `uuid`, leaving the others untouched
    pub fn map_set(mut self, uuid: Uuid, f: impl FnOnce(EditedSet) -> EditedSet) -> Self {
        if let Some(pos) = self.sets.iter().position(|s| s.uuid == uuid) {
            let set = self.sets.remove(pos);
            self.sets.insert(pos, f(set));
        }
        self
    }

    pub fn without_set(mut self, uuid: Uuid) -> Self {
        self.sets.retain(|s| s.uuid != uuid);
        self
    }
}

/// A gym workout as edited by the user
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct EditedWorkout {
    pub name: String,
    #[serde(default)]
    pub exercises: Vec<EditedExercise>,
}

impl EditedWorkout {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            exercises: Vec::new(),
        }
    }

    /// Build an editable copy of persisted state, converting to `unit`
    ///
    /// All `checked` flags start cleared.
    pub fn from_persisted(
        workout: &Workout,
        exercises: &[PersistedExercise],
        unit: WeightUnit,
    ) -> Self {
        let exercises = exercises
            .iter()
            .map(|p| EditedExercise {
                uuid: p.exercise.uuid,
                name: p.exercise.name.clone(),
                description: p.exercise.description.clone(),
                sets: p
                    .sets
                    .iter()
                    .map(|s| EditedSet {
                        uuid: s.uuid,
                        weight: unit.from_kg(s.weight_kg),
                        reps: s.reps,
                        checked: false,
                    })
                    .collect(),
            })
            .collect();

        Self {
            name: workout.name.clone(),
            exercises,
        }
    }

    pub fn with_name(self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self
        }
    }

    pub fn with_exercise(mut self, exercise: EditedExercise) -> Self {
        self.exercises.push(exercise);
        self
    }

    /// Replace the exercise carrying `uuid`, leaving the others untouched
    pub fn map_exercise(
        mut self,
        uuid: Uuid,
        f: impl FnOnce(EditedExercise) -> EditedExercise,
    ) -> Self {
        if let Some(pos) = self.exercises.iter().position(|e| e.uuid == uuid) {
            let exercise = self.exercises.remove(pos);
            self.exercises.insert(pos, f(exercise));
        }
        self
    }

    pub fn without_exercise(mut self, uuid: Uuid) -> Self {
        self.exercises.retain(|e| e.uuid != uuid);
        self
    }

    /// Whether any set is marked as performed
    pub fn has_checked_sets(&self) -> bool {
        self.exercises
            .iter()
            .flat_map(|e| e.sets.iter())
            .any(|s| s.checked)
    }
}

/// Cardio values entered by the user, distance in the preferred unit
///
/// `None` means the metric was not touched in this edit.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct CardioEdit {
    pub steps: Option<u32>,
    pub distance: Option<f64>,
    pub duration_secs: Option<u64>,
}

impl CardioEdit {
    pub fn with_steps(self, steps: u32) -> Self {
        Self {
            steps: Some(steps),
            ..self
        }
    }

    pub fn with_distance(self, distance: f64) -> Self {
        Self {
            distance: Some(distance),
            ..self
        }
    }

    pub fn with_duration_secs(self, duration_secs: u64) -> Self {
        Self {
            duration_secs: Some(duration_secs),
            ..self
        }
    }
}

/// Per-call options for reconciliation, usually built from `Config`
#[derive(Clone, Copy, Debug, Default)]
pub struct ReconcileOptions {
    pub weight_unit: WeightUnit,
    pub distance_unit: DistanceUnit,
    /// Back-dated session timestamp; defaults to now
    pub performed_at: Option<DateTime<Utc>>,
}

impl ReconcileOptions {
    pub fn with_performed_at(self, performed_at: DateTime<Utc>) -> Self {
        Self {
            performed_at: Some(performed_at),
            ..self
        }
    }

    /// The session timestamp to use for this call
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.performed_at.unwrap_or_else(Utc::now)
    }
}
