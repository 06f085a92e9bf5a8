//! Persisted-store collaborator.
//!
//! The reconciler and aggregator only talk to storage through
//! [`WorkoutStore`]. [`Database`] is the in-memory implementation; see
//! `persist` for loading and saving it as a single JSON document.
//!
//! Updates and deletes aimed at rows that no longer exist are no-ops.
//! Inserts require their parent row and fail with [`Error::Store`]
//! otherwise, so the store never holds orphans.

use crate::{
    CardioEntry, CardioMetrics, CardioSession, Error, Exercise, ExerciseSet, GymSession,
    GymSessionRecord, PersistedExercise, Result, SetSession, TimeRange, Workout, WorkoutKind,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// CRUD access to persisted workouts
pub trait WorkoutStore {
    fn workout(&self, id: i64) -> Result<Option<Workout>>;
    fn workouts(&self) -> Result<Vec<Workout>>;
    /// Exercises of a workout with their sets, in insertion order
    fn exercises(&self, workout_id: i64) -> Result<Vec<PersistedExercise>>;
    /// Gym sessions inside `range`, ascending by timestamp
    fn gym_sessions(&self, workout_id: i64, range: &TimeRange) -> Result<Vec<GymSessionRecord>>;
    fn cardio_metrics(&self, workout_id: i64) -> Result<Option<CardioMetrics>>;
    /// Cardio sessions inside `range`, ascending by timestamp
    fn cardio_sessions(&self, workout_id: i64, range: &TimeRange) -> Result<Vec<CardioSession>>;

    fn insert_workout(&mut self, name: &str, kind: WorkoutKind) -> Result<i64>;
    fn rename_workout(&mut self, id: i64, name: &str) -> Result<()>;
    /// Deletes the workout and everything hanging off it
    fn delete_workout(&mut self, id: i64) -> Result<()>;

    fn insert_exercise(
        &mut self,
        workout_id: i64,
        uuid: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> Result<i64>;
    fn update_exercise(&mut self, id: i64, name: &str, description: Option<&str>) -> Result<()>;
    /// Deletes the exercise, its sets and their snapshots
    fn delete_exercise(&mut self, id: i64) -> Result<()>;

    fn insert_set(&mut self, exercise_id: i64, uuid: Uuid, weight_kg: f64, reps: u32)
        -> Result<i64>;
    fn update_set(&mut self, id: i64, weight_kg: f64, reps: u32) -> Result<()>;
    /// Deletes the set and its snapshots
    fn delete_set(&mut self, id: i64) -> Result<()>;

    fn insert_gym_session(&mut self, workout_id: i64, performed_at: DateTime<Utc>) -> Result<i64>;
    fn insert_set_session(
        &mut self,
        session_id: i64,
        set_id: i64,
        weight_kg: f64,
        reps: u32,
    ) -> Result<i64>;

    fn put_cardio_metrics(&mut self, metrics: &CardioMetrics) -> Result<()>;
    fn insert_cardio_session(&mut self, workout_id: i64, entry: &CardioEntry) -> Result<i64>;

    /// Run `f` as one atomic unit; any error rolls back all of its writes
    fn transaction<T, F>(&mut self, f: F) -> Result<T>
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> Result<T>;
}

/// In-memory tables with a shared id sequence
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Database {
    #[serde(default)]
    next_id: i64,
    #[serde(default)]
    workouts: Vec<Workout>,
    #[serde(default)]
    exercises: Vec<Exercise>,
    #[serde(default)]
    sets: Vec<ExerciseSet>,
    #[serde(default)]
    gym_sessions: Vec<GymSession>,
    #[serde(default)]
    set_sessions: Vec<SetSession>,
    #[serde(default)]
    cardio_metrics: Vec<CardioMetrics>,
    #[serde(default)]
    cardio_sessions: Vec<CardioSession>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn has_workout(&self, id: i64) -> bool {
        self.workouts.iter().any(|w| w.id == id)
    }

    fn remove_sets(&mut self, set_ids: &[i64]) {
        self.set_sessions.retain(|ss| !set_ids.contains(&ss.set_id));
        self.sets.retain(|s| !set_ids.contains(&s.id));
    }

    fn remove_exercises(&mut self, exercise_ids: &[i64]) {
        let set_ids: Vec<i64> = self
            .sets
            .iter()
            .filter(|s| exercise_ids.contains(&s.exercise_id))
            .map(|s| s.id)
            .collect();
        self.remove_sets(&set_ids);
        self.exercises.retain(|e| !exercise_ids.contains(&e.id));
    }

    /// Total number of set snapshots, across all sessions
    pub fn snapshot_count(&self) -> usize {
        self.set_sessions.len()
    }
}

impl WorkoutStore for Database {
    fn workout(&self, id: i64) -> Result<Option<Workout>> {
        Ok(self.workouts.iter().find(|w| w.id == id).cloned())
    }

    fn workouts(&self) -> Result<Vec<Workout>> {
        Ok(self.workouts.clone())
    }

    fn exercises(&self, workout_id: i64) -> Result<Vec<PersistedExercise>> {
        Ok(self
            .exercises
            .iter()
            .filter(|e| e.workout_id == workout_id)
            .map(|e| PersistedExercise {
                exercise: e.clone(),
                sets: self
                    .sets
                    .iter()
                    .filter(|s| s.exercise_id == e.id)
                    .cloned()
                    .collect(),
            })
            .collect())
    }

    fn gym_sessions(&self, workout_id: i64, range: &TimeRange) -> Result<Vec<GymSessionRecord>> {
        let mut records: Vec<GymSessionRecord> = self
            .gym_sessions
            .iter()
            .filter(|s| s.workout_id == workout_id && range.contains(s.performed_at))
            .map(|s| GymSessionRecord {
                session: s.clone(),
                snapshots: self
                    .set_sessions
                    .iter()
                    .filter(|ss| ss.session_id == s.id)
                    .cloned()
                    .collect(),
            })
            .collect();
        records.sort_by_key(|r| r.session.performed_at);
        Ok(records)
    }

    fn cardio_metrics(&self, workout_id: i64) -> Result<Option<CardioMetrics>> {
        Ok(self
            .cardio_metrics
            .iter()
            .find(|m| m.workout_id == workout_id)
            .cloned())
    }

    fn cardio_sessions(&self, workout_id: i64, range: &TimeRange) -> Result<Vec<CardioSession>> {
        let mut sessions: Vec<CardioSession> = self
            .cardio_sessions
            .iter()
            .filter(|s| s.workout_id == workout_id && range.contains(s.performed_at))
            .cloned()
            .collect();
        sessions.sort_by_key(|s| s.performed_at);
        Ok(sessions)
    }

    fn insert_workout(&mut self, name: &str, kind: WorkoutKind) -> Result<i64> {
        let id = self.allocate_id();
        self.workouts.push(Workout {
            id,
            name: name.to_string(),
            kind,
        });
        tracing::debug!("Inserted workout {} ({:?})", id, kind);
        Ok(id)
    }

    fn rename_workout(&mut self, id: i64, name: &str) -> Result<()> {
        match self.workouts.iter_mut().find(|w| w.id == id) {
            Some(workout) => workout.name = name.to_string(),
            None => tracing::debug!("Rename of missing workout {} ignored", id),
        }
        Ok(())
    }

    fn delete_workout(&mut self, id: i64) -> Result<()> {
        let exercise_ids: Vec<i64> = self
            .exercises
            .iter()
            .filter(|e| e.workout_id == id)
            .map(|e| e.id)
            .collect();
        self.remove_exercises(&exercise_ids);

        let session_ids: Vec<i64> = self
            .gym_sessions
            .iter()
            .filter(|s| s.workout_id == id)
            .map(|s| s.id)
            .collect();
        self.set_sessions
            .retain(|ss| !session_ids.contains(&ss.session_id));
        self.gym_sessions.retain(|s| s.workout_id != id);
        self.cardio_metrics.retain(|m| m.workout_id != id);
        self.cardio_sessions.retain(|s| s.workout_id != id);
        self.workouts.retain(|w| w.id != id);

        tracing::debug!(
            "Deleted workout {} with {} exercises and {} sessions",
            id,
            exercise_ids.len(),
            session_ids.len()
        );
        Ok(())
    }

    fn insert_exercise(
        &mut self,
        workout_id: i64,
        uuid: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> Result<i64> {
        if !self.has_workout(workout_id) {
            return Err(Error::Store(format!(
                "cannot insert exercise: workout {} does not exist",
                workout_id
            )));
        }
        let id = self.allocate_id();
        self.exercises.push(Exercise {
            id,
            uuid,
            workout_id,
            name: name.to_string(),
            description: description.map(str::to_string),
        });
        tracing::debug!("Inserted exercise {} ({})", id, uuid);
        Ok(id)
    }

    fn update_exercise(&mut self, id: i64, name: &str, description: Option<&str>) -> Result<()> {
        match self.exercises.iter_mut().find(|e| e.id == id) {
            Some(exercise) => {
                exercise.name = name.to_string();
                exercise.description = description.map(str::to_string);
            }
            None => tracing::debug!("Update of missing exercise {} ignored", id),
        }
        Ok(())
    }

    fn delete_exercise(&mut self, id: i64) -> Result<()> {
        self.remove_exercises(&[id]);
        tracing::debug!("Deleted exercise {}", id);
        Ok(())
    }

    fn insert_set(
        &mut self,
        exercise_id: i64,
        uuid: Uuid,
        weight_kg: f64,
        reps: u32,
    ) -> Result<i64> {
        if !self.exercises.iter().any(|e| e.id == exercise_id) {
            return Err(Error::Store(format!(
                "cannot insert set: exercise {} does not exist",
                exercise_id
            )));
        }
        let id = self.allocate_id();
        self.sets.push(ExerciseSet {
            id,
            uuid,
            exercise_id,
            weight_kg,
            reps,
        });
        tracing::debug!("Inserted set {} ({})", id, uuid);
        Ok(id)
    }

    fn update_set(&mut self, id: i64, weight_kg: f64, reps: u32) -> Result<()> {
        match self.sets.iter_mut().find(|s| s.id == id) {
            Some(set) => {
                set.weight_kg = weight_kg;
                set.reps = reps;
            }
            None => tracing::debug!("Update of missing set {} ignored", id),
        }
        Ok(())
    }

    fn delete_set(&mut self, id: i64) -> Result<()> {
        self.remove_sets(&[id]);
        tracing::debug!("Deleted set {}", id);
        Ok(())
    }

    fn insert_gym_session(&mut self, workout_id: i64, performed_at: DateTime<Utc>) -> Result<i64> {
        if !self.has_workout(workout_id) {
            return Err(Error::Store(format!(
                "cannot insert session: workout {} does not exist",
                workout_id
            )));
        }
        let id = self.allocate_id();
        self.gym_sessions.push(GymSession {
            id,
            workout_id,
            performed_at,
        });
        tracing::debug!("Inserted gym session {} at {}", id, performed_at);
        Ok(id)
    }

    fn insert_set_session(
        &mut self,
        session_id: i64,
        set_id: i64,
        weight_kg: f64,
        reps: u32,
    ) -> Result<i64> {
        if !self.gym_sessions.iter().any(|s| s.id == session_id) {
            return Err(Error::Store(format!(
                "cannot insert snapshot: session {} does not exist",
                session_id
            )));
        }
        if !self.sets.iter().any(|s| s.id == set_id) {
            return Err(Error::Store(format!(
                "cannot insert snapshot: set {} does not exist",
                set_id
            )));
        }
        let id = self.allocate_id();
        self.set_sessions.push(SetSession {
            id,
            session_id,
            set_id,
            weight_kg,
            reps,
        });
        Ok(id)
    }

    fn put_cardio_metrics(&mut self, metrics: &CardioMetrics) -> Result<()> {
        if !self.has_workout(metrics.workout_id) {
            return Err(Error::Store(format!(
                "cannot store metrics: workout {} does not exist",
                metrics.workout_id
            )));
        }
        match self
            .cardio_metrics
            .iter_mut()
            .find(|m| m.workout_id == metrics.workout_id)
        {
            Some(existing) => *existing = metrics.clone(),
            None => self.cardio_metrics.push(metrics.clone()),
        }
        Ok(())
    }

    fn insert_cardio_session(&mut self, workout_id: i64, entry: &CardioEntry) -> Result<i64> {
        if !self.has_workout(workout_id) {
            return Err(Error::Store(format!(
                "cannot insert cardio session: workout {} does not exist",
                workout_id
            )));
        }
        let id = self.allocate_id();
        self.cardio_sessions.push(CardioSession {
            id,
            workout_id,
            performed_at: entry.performed_at,
            steps: entry.steps,
            distance_km: entry.distance_km,
            duration_secs: entry.duration_secs,
        });
        tracing::debug!("Inserted cardio session {} at {}", id, entry.performed_at);
        Ok(id)
    }

    fn transaction<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let snapshot = self.clone();
        match f(self) {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::warn!("Transaction rolled back: {}", e);
                *self = snapshot;
                Err(e)
            }
        }
    }
}
