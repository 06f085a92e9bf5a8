//! Workout reconciliation.
//!
//! Merges an edited in-memory workout into its persisted version. Items are
//! correlated by their client-generated UUIDs only, never by position or
//! storage id, so reordering, renaming and partial edits cannot be
//! attributed to the wrong row.
//!
//! The work is split in two:
//! - [`diff_workout`] / [`diff_cardio`] are pure and produce a write-set
//! - [`apply_write_set`] resolves UUIDs to storage ids and performs it
//!
//! [`reconcile_gym_workout`] and [`reconcile_cardio_workout`] run both
//! halves inside a single store transaction.

use crate::units::canonical_eq;
use crate::{
    CardioEdit, CardioEntry, CardioMetrics, EditedWorkout, Error, ExerciseSet, PersistedExercise,
    ReconcileOptions, Result, WorkoutKind, WorkoutStore,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

// ============================================================================
// Write-set
// ============================================================================

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ExerciseInsert {
    pub uuid: Uuid,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ExerciseUpdate {
    pub uuid: Uuid,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct SetInsert {
    pub exercise_uuid: Uuid,
    pub uuid: Uuid,
    pub weight_kg: f64,
    pub reps: u32,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct SetUpdate {
    pub uuid: Uuid,
    pub weight_kg: f64,
    pub reps: u32,
}

/// Snapshot of a checked set, taken from the edited values
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct SnapshotInsert {
    pub set_uuid: Uuid,
    pub weight_kg: f64,
    pub reps: u32,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct SessionInsert {
    pub performed_at: DateTime<Utc>,
    pub snapshots: Vec<SnapshotInsert>,
}

/// Everything needed to bring storage in line with an edited gym workout
#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct WriteSet {
    pub rename: Option<String>,
    pub exercise_inserts: Vec<ExerciseInsert>,
    pub exercise_updates: Vec<ExerciseUpdate>,
    pub exercise_deletes: Vec<Uuid>,
    pub set_inserts: Vec<SetInsert>,
    pub set_updates: Vec<SetUpdate>,
    pub set_deletes: Vec<Uuid>,
    pub session: Option<SessionInsert>,
}

impl WriteSet {
    pub fn is_empty(&self) -> bool {
        self.rename.is_none()
            && self.exercise_inserts.is_empty()
            && self.exercise_updates.is_empty()
            && self.exercise_deletes.is_empty()
            && self.set_inserts.is_empty()
            && self.set_updates.is_empty()
            && self.set_deletes.is_empty()
            && self.session.is_none()
    }

    pub fn summary(&self) -> ChangeSummary {
        ChangeSummary {
            renamed: self.rename.is_some(),
            exercises_inserted: self.exercise_inserts.len(),
            exercises_updated: self.exercise_updates.len(),
            exercises_deleted: self.exercise_deletes.len(),
            sets_inserted: self.set_inserts.len(),
            sets_updated: self.set_updates.len(),
            sets_deleted: self.set_deletes.len(),
            session_id: None,
            snapshots_inserted: self
                .session
                .as_ref()
                .map_or(0, |s| s.snapshots.len()),
        }
    }
}

/// Counts of what a reconciliation wrote
#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub struct ChangeSummary {
    pub renamed: bool,
    pub exercises_inserted: usize,
    pub exercises_updated: usize,
    pub exercises_deleted: usize,
    pub sets_inserted: usize,
    pub sets_updated: usize,
    pub sets_deleted: usize,
    /// Id of the session row, if one was created
    pub session_id: Option<i64>,
    pub snapshots_inserted: usize,
}

impl ChangeSummary {
    pub fn is_empty(&self) -> bool {
        *self == ChangeSummary::default()
    }
}

/// Result of reconciling against a workout id
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The workout is gone (e.g. deleted concurrently); nothing was written
    WorkoutMissing,
    Applied(ChangeSummary),
}

// ============================================================================
// Gym Reconciliation
// ============================================================================

fn normalize_description(description: Option<&str>) -> Option<String> {
    description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}

/// Reject edits where two exercises, or two sets anywhere in the workout,
/// share a UUID
pub fn validate_edited(edited: &EditedWorkout) -> Result<()> {
    let mut exercises = HashSet::new();
    let mut sets = HashSet::new();
    for exercise in &edited.exercises {
        if !exercises.insert(exercise.uuid) {
            return Err(Error::Validation(format!(
                "duplicate exercise uuid {}",
                exercise.uuid
            )));
        }
        for set in &exercise.sets {
            if !sets.insert(set.uuid) {
                return Err(Error::Validation(format!("duplicate set uuid {}", set.uuid)));
            }
        }
    }
    Ok(())
}

/// Compute the write-set that makes `persisted` match `edited`
///
/// `edited` must pass [`validate_edited`].
/// Exercises and sets are visited in edited order. Weights are converted to
/// kilograms with `opts.weight_unit` before comparison. A session is
/// scheduled only when at least one set is checked.
pub fn diff_workout(
    persisted_name: &str,
    persisted: &[PersistedExercise],
    edited: &EditedWorkout,
    opts: &ReconcileOptions,
) -> WriteSet {
    let mut plan = WriteSet::default();

    let new_name = edited.name.trim();
    if !new_name.is_empty() && new_name != persisted_name {
        plan.rename = Some(new_name.to_string());
    }

    // Guards against wiping a workout whose exercises were never loaded
    if edited.exercises.is_empty() {
        tracing::debug!("Edited workout has no exercises, skipping exercise diff");
        return plan;
    }

    let current: HashMap<Uuid, &PersistedExercise> =
        persisted.iter().map(|p| (p.exercise.uuid, p)).collect();

    let edited_uuids: HashSet<Uuid> = edited.exercises.iter().map(|e| e.uuid).collect();
    plan.exercise_deletes = persisted
        .iter()
        .map(|p| p.exercise.uuid)
        .filter(|uuid| !edited_uuids.contains(uuid))
        .collect();

    let mut session = edited.has_checked_sets().then(|| SessionInsert {
        performed_at: opts.timestamp(),
        snapshots: Vec::new(),
    });

    for exercise in &edited.exercises {
        let name = exercise.name.trim().to_string();
        let description = normalize_description(exercise.description.as_deref());

        let current_sets: HashMap<Uuid, &ExerciseSet> = match current.get(&exercise.uuid) {
            None => {
                plan.exercise_inserts.push(ExerciseInsert {
                    uuid: exercise.uuid,
                    name,
                    description,
                });
                HashMap::new()
            }
            Some(existing) => {
                let stored_description =
                    normalize_description(existing.exercise.description.as_deref());
                if existing.exercise.name.trim() != name || stored_description != description {
                    plan.exercise_updates.push(ExerciseUpdate {
                        uuid: exercise.uuid,
                        name,
                        description,
                    });
                }

                let set_uuids: HashSet<Uuid> = exercise.sets.iter().map(|s| s.uuid).collect();
                plan.set_deletes.extend(
                    existing
                        .sets
                        .iter()
                        .map(|s| s.uuid)
                        .filter(|uuid| !set_uuids.contains(uuid)),
                );

                existing.sets.iter().map(|s| (s.uuid, s)).collect()
            }
        };

        for set in &exercise.sets {
            let weight_kg = opts.weight_unit.to_kg(set.weight);

            match current_sets.get(&set.uuid) {
                None => plan.set_inserts.push(SetInsert {
                    exercise_uuid: exercise.uuid,
                    uuid: set.uuid,
                    weight_kg,
                    reps: set.reps,
                }),
                Some(stored) => {
                    if !canonical_eq(stored.weight_kg, weight_kg) || stored.reps != set.reps {
                        plan.set_updates.push(SetUpdate {
                            uuid: set.uuid,
                            weight_kg,
                            reps: set.reps,
                        });
                    }
                }
            }

            if set.checked {
                if let Some(session) = session.as_mut() {
                    session.snapshots.push(SnapshotInsert {
                        set_uuid: set.uuid,
                        weight_kg,
                        reps: set.reps,
                    });
                }
            }
        }
    }

    plan.session = session;
    plan
}

/// Perform a write-set against `store`
///
/// `persisted` must be the state the write-set was computed from; it
/// supplies the storage ids of existing rows. Should be called inside a
/// transaction.
pub fn apply_write_set<S: WorkoutStore>(
    store: &mut S,
    workout_id: i64,
    persisted: &[PersistedExercise],
    plan: &WriteSet,
) -> Result<ChangeSummary> {
    let mut exercise_ids: HashMap<Uuid, i64> = HashMap::new();
    let mut set_ids: HashMap<Uuid, i64> = HashMap::new();
    for p in persisted {
        exercise_ids.insert(p.exercise.uuid, p.exercise.id);
        for s in &p.sets {
            set_ids.insert(s.uuid, s.id);
        }
    }

    if let Some(name) = &plan.rename {
        store.rename_workout(workout_id, name)?;
    }

    for uuid in &plan.exercise_deletes {
        if let Some(id) = exercise_ids.remove(uuid) {
            store.delete_exercise(id)?;
        }
    }
    for uuid in &plan.set_deletes {
        if let Some(id) = set_ids.remove(uuid) {
            store.delete_set(id)?;
        }
    }

    for insert in &plan.exercise_inserts {
        let id = store.insert_exercise(
            workout_id,
            insert.uuid,
            &insert.name,
            insert.description.as_deref(),
        )?;
        exercise_ids.insert(insert.uuid, id);
    }
    for update in &plan.exercise_updates {
        let id = resolve(&exercise_ids, update.uuid, "exercise")?;
        store.update_exercise(id, &update.name, update.description.as_deref())?;
    }

    for insert in &plan.set_inserts {
        let exercise_id = resolve(&exercise_ids, insert.exercise_uuid, "exercise")?;
        let id = store.insert_set(exercise_id, insert.uuid, insert.weight_kg, insert.reps)?;
        set_ids.insert(insert.uuid, id);
    }
    for update in &plan.set_updates {
        let id = resolve(&set_ids, update.uuid, "set")?;
        store.update_set(id, update.weight_kg, update.reps)?;
    }

    let mut summary = plan.summary();
    if let Some(session) = &plan.session {
        let session_id = store.insert_gym_session(workout_id, session.performed_at)?;
        for snapshot in &session.snapshots {
            let set_id = resolve(&set_ids, snapshot.set_uuid, "set")?;
            store.insert_set_session(session_id, set_id, snapshot.weight_kg, snapshot.reps)?;
        }
        summary.session_id = Some(session_id);
    }

    Ok(summary)
}

fn resolve(ids: &HashMap<Uuid, i64>, uuid: Uuid, what: &str) -> Result<i64> {
    ids.get(&uuid)
        .copied()
        .ok_or_else(|| Error::Other(format!("{} {} has no storage id", what, uuid)))
}

/// Reconcile an edited gym workout against the stored workout `workout_id`
pub fn reconcile_gym_workout<S: WorkoutStore>(
    store: &mut S,
    workout_id: i64,
    edited: &EditedWorkout,
    opts: &ReconcileOptions,
) -> Result<ReconcileOutcome> {
    validate_edited(edited)?;

    store.transaction(|tx| {
        let Some(workout) = tx.workout(workout_id)? else {
            tracing::warn!("Workout {} not found, nothing to reconcile", workout_id);
            return Ok(ReconcileOutcome::WorkoutMissing);
        };
        if workout.kind != WorkoutKind::Gym {
            return Err(Error::Validation(format!(
                "workout {} is not a gym workout",
                workout_id
            )));
        }

        let persisted = tx.exercises(workout_id)?;
        let plan = diff_workout(&workout.name, &persisted, edited, opts);
        if plan.is_empty() {
            tracing::info!("Workout {} unchanged", workout_id);
            return Ok(ReconcileOutcome::Applied(ChangeSummary::default()));
        }

        let summary = apply_write_set(tx, workout_id, &persisted, &plan)?;
        tracing::info!(
            "Reconciled workout {}: +{}/~{}/-{} exercises, +{}/~{}/-{} sets, {} snapshots",
            workout_id,
            summary.exercises_inserted,
            summary.exercises_updated,
            summary.exercises_deleted,
            summary.sets_inserted,
            summary.sets_updated,
            summary.sets_deleted,
            summary.snapshots_inserted
        );
        Ok(ReconcileOutcome::Applied(summary))
    })
}

/// First save of a gym workout: insert it, then reconcile its contents
pub fn create_gym_workout<S: WorkoutStore>(
    store: &mut S,
    edited: &EditedWorkout,
    opts: &ReconcileOptions,
) -> Result<(i64, ChangeSummary)> {
    let name = edited.name.trim();
    if name.is_empty() {
        return Err(Error::Validation("workout name must not be empty".into()));
    }
    validate_edited(edited)?;

    store.transaction(|tx| {
        let workout_id = tx.insert_workout(name, WorkoutKind::Gym)?;
        let plan = diff_workout(name, &[], edited, opts);
        let summary = apply_write_set(tx, workout_id, &[], &plan)?;
        tracing::info!(
            "Created workout {} with {} exercises",
            workout_id,
            summary.exercises_inserted
        );
        Ok((workout_id, summary))
    })
}

/// Delete a workout and everything attached to it
///
/// Returns `false` if the workout did not exist.
pub fn delete_workout<S: WorkoutStore>(store: &mut S, workout_id: i64) -> Result<bool> {
    store.transaction(|tx| {
        if tx.workout(workout_id)?.is_none() {
            tracing::warn!("Workout {} not found, nothing to delete", workout_id);
            return Ok(false);
        }
        tx.delete_workout(workout_id)?;
        tracing::info!("Deleted workout {}", workout_id);
        Ok(true)
    })
}

// ============================================================================
// Cardio Reconciliation
// ============================================================================

/// New metrics plus the history entry to record, if anything changed
#[derive(Clone, Debug, PartialEq)]
pub struct CardioWriteSet {
    pub metrics: CardioMetrics,
    pub session: Option<CardioEntry>,
}

/// Compare an edit against the current metrics of `workout_id`
///
/// Only metrics that are present in `edit` and differ from the stored value
/// count as changed; they update the metrics (with `opts.timestamp()`) and
/// are the only fields recorded in the session entry.
pub fn diff_cardio(
    workout_id: i64,
    current: Option<&CardioMetrics>,
    edit: &CardioEdit,
    opts: &ReconcileOptions,
) -> CardioWriteSet {
    let at = opts.timestamp();
    let mut metrics = current
        .cloned()
        .unwrap_or_else(|| CardioMetrics::empty(workout_id));
    let mut entry = CardioEntry {
        performed_at: at,
        steps: None,
        distance_km: None,
        duration_secs: None,
    };

    if let Some(steps) = edit.steps {
        if metrics.steps != Some(steps) {
            metrics.steps = Some(steps);
            metrics.steps_updated_at = Some(at);
            entry.steps = Some(steps);
        }
    }

    if let Some(distance) = edit.distance {
        let distance_km = opts.distance_unit.to_km(distance);
        let unchanged = metrics
            .distance_km
            .map_or(false, |stored| canonical_eq(stored, distance_km));
        if !unchanged {
            metrics.distance_km = Some(distance_km);
            metrics.distance_updated_at = Some(at);
            entry.distance_km = Some(distance_km);
        }
    }

    if let Some(duration) = edit.duration_secs {
        if metrics.duration_secs != Some(duration) {
            metrics.duration_secs = Some(duration);
            metrics.duration_updated_at = Some(at);
            entry.duration_secs = Some(duration);
        }
    }

    CardioWriteSet {
        metrics,
        session: (!entry.is_empty()).then_some(entry),
    }
}

/// Reconcile a cardio edit against the stored workout `workout_id`
pub fn reconcile_cardio_workout<S: WorkoutStore>(
    store: &mut S,
    workout_id: i64,
    edit: &CardioEdit,
    opts: &ReconcileOptions,
) -> Result<ReconcileOutcome> {
    store.transaction(|tx| {
        let Some(workout) = tx.workout(workout_id)? else {
            tracing::warn!("Workout {} not found, nothing to reconcile", workout_id);
            return Ok(ReconcileOutcome::WorkoutMissing);
        };
        if workout.kind != WorkoutKind::Cardio {
            return Err(Error::Validation(format!(
                "workout {} is not a cardio workout",
                workout_id
            )));
        }

        let current = tx.cardio_metrics(workout_id)?;
        let plan = diff_cardio(workout_id, current.as_ref(), edit, opts);

        let mut summary = ChangeSummary::default();
        if let Some(entry) = &plan.session {
            tx.put_cardio_metrics(&plan.metrics)?;
            summary.session_id = Some(tx.insert_cardio_session(workout_id, entry)?);
            tracing::info!("Recorded cardio session for workout {}", workout_id);
        } else {
            tracing::info!("Cardio workout {} unchanged", workout_id);
        }
        Ok(ReconcileOutcome::Applied(summary))
    })
}

/// First save of a cardio workout
pub fn create_cardio_workout<S: WorkoutStore>(store: &mut S, name: &str) -> Result<i64> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation("workout name must not be empty".into()));
    }
    let id = store.insert_workout(name, WorkoutKind::Cardio)?;
    tracing::info!("Created cardio workout {}", id);
    Ok(id)
}
