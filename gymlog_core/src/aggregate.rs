//! Session history aggregation.
//!
//! Gym series carry the last known min/max forward through sessions in
//! which an exercise had no checked sets, giving one point per session.
//! Cardio series are sparse: a metric only gets a point in sessions that
//! recorded it.

use crate::units::{round_display, DistanceUnit, WeightUnit};
use crate::{CardioSession, GymSessionRecord, PersistedExercise, Result, TimeRange, WorkoutStore};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use uuid::Uuid;

/// Min/max weight of an exercise in one session
#[derive(Clone, Copy, Debug, Serialize, PartialEq)]
pub struct WeightPoint {
    pub min: f64,
    pub max: f64,
    pub performed_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ExerciseHistory {
    pub exercise_uuid: Uuid,
    pub name: String,
    pub points: Vec<WeightPoint>,
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq)]
pub struct MetricPoint<T> {
    pub value: T,
    pub performed_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct CardioHistory {
    pub steps: Vec<MetricPoint<u32>>,
    pub distance: Vec<MetricPoint<f64>>,
    pub duration_secs: Vec<MetricPoint<u64>>,
}

/// Build per-exercise min/max series, in kilograms
///
/// Sessions are processed by ascending timestamp. A snapshot belongs to an
/// exercise when its set id is one of the exercise's current sets.
pub fn aggregate_gym(
    sessions: &[GymSessionRecord],
    exercises: &[PersistedExercise],
) -> Vec<ExerciseHistory> {
    let mut ordered: Vec<&GymSessionRecord> = sessions.iter().collect();
    ordered.sort_by_key(|r| r.session.performed_at);

    exercises
        .iter()
        .map(|p| {
            let set_ids: HashSet<i64> = p.sets.iter().map(|s| s.id).collect();
            let mut last = (0.0_f64, 0.0_f64);

            let points = ordered
                .iter()
                .map(|record| {
                    let weights = record
                        .snapshots
                        .iter()
                        .filter(|ss| set_ids.contains(&ss.set_id))
                        .map(|ss| ss.weight_kg);

                    let bounds = weights.fold(None, |acc: Option<(f64, f64)>, w| match acc {
                        None => Some((w, w)),
                        Some((lo, hi)) => Some((lo.min(w), hi.max(w))),
                    });
                    if let Some(bounds) = bounds {
                        last = bounds;
                    }

                    WeightPoint {
                        min: last.0,
                        max: last.1,
                        performed_at: record.session.performed_at,
                    }
                })
                .collect();

            ExerciseHistory {
                exercise_uuid: p.exercise.uuid,
                name: p.exercise.name.clone(),
                points,
            }
        })
        .collect()
}

/// Build sparse steps/distance/duration series, distance in kilometers
pub fn aggregate_cardio(sessions: &[CardioSession]) -> CardioHistory {
    let mut ordered: Vec<&CardioSession> = sessions.iter().collect();
    ordered.sort_by_key(|s| s.performed_at);

    fn series<T>(
        sessions: &[&CardioSession],
        field: impl Fn(&CardioSession) -> Option<T>,
    ) -> Vec<MetricPoint<T>> {
        sessions
            .iter()
            .filter_map(|s| {
                field(*s).map(|value| MetricPoint {
                    value,
                    performed_at: s.performed_at,
                })
            })
            .collect()
    }

    CardioHistory {
        steps: series(&ordered, |s| s.steps),
        distance: series(&ordered, |s| s.distance_km),
        duration_secs: series(&ordered, |s| s.duration_secs),
    }
}

/// Gym history of `workout_id` in the display unit
///
/// Returns `None` if the workout doesn't exist.
pub fn gym_history<S: WorkoutStore>(
    store: &S,
    workout_id: i64,
    range: &TimeRange,
    unit: WeightUnit,
) -> Result<Option<Vec<ExerciseHistory>>> {
    if store.workout(workout_id)?.is_none() {
        tracing::warn!("Workout {} not found, no history", workout_id);
        return Ok(None);
    }

    let sessions = store.gym_sessions(workout_id, range)?;
    let exercises = store.exercises(workout_id)?;
    tracing::debug!(
        "Aggregating {} sessions over {} exercises",
        sessions.len(),
        exercises.len()
    );

    let mut history = aggregate_gym(&sessions, &exercises);
    for point in history.iter_mut().flat_map(|h| h.points.iter_mut()) {
        point.min = round_display(unit.from_kg(point.min));
        point.max = round_display(unit.from_kg(point.max));
    }
    Ok(Some(history))
}

/// Cardio history of `workout_id` in the display unit
///
/// Returns `None` if the workout doesn't exist.
pub fn cardio_history<S: WorkoutStore>(
    store: &S,
    workout_id: i64,
    range: &TimeRange,
    unit: DistanceUnit,
) -> Result<Option<CardioHistory>> {
    if store.workout(workout_id)?.is_none() {
        tracing::warn!("Workout {} not found, no history", workout_id);
        return Ok(None);
    }

    let mut history = aggregate_cardio(&store.cardio_sessions(workout_id, range)?);
    for point in &mut history.distance {
        point.value = round_display(unit.from_km(point.value));
    }
    Ok(Some(history))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Exercise, ExerciseSet, GymSession, SetSession};
    use chrono::{Duration, TimeZone};

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 7, 30, 0).unwrap() + Duration::days(n)
    }

    fn exercise(id: i64, name: &str, set_ids: &[i64]) -> PersistedExercise {
        PersistedExercise {
            exercise: Exercise {
                id,
                uuid: Uuid::new_v4(),
                workout_id: 1,
                name: name.into(),
                description: None,
            },
            sets: set_ids
                .iter()
                .map(|&sid| ExerciseSet {
                    id: sid,
                    uuid: Uuid::new_v4(),
                    exercise_id: id,
                    weight_kg: 0.0,
                    reps: 5,
                })
                .collect(),
        }
    }

    fn session(id: i64, at: DateTime<Utc>, snapshots: &[(i64, f64)]) -> GymSessionRecord {
        GymSessionRecord {
            session: GymSession {
                id,
                workout_id: 1,
                performed_at: at,
            },
            snapshots: snapshots
                .iter()
                .enumerate()
                .map(|(i, &(set_id, weight_kg))| SetSession {
                    id: id * 100 + i as i64,
                    session_id: id,
                    set_id,
                    weight_kg,
                    reps: 5,
                })
                .collect(),
        }
    }

    #[test]
    fn test_gym_series_carries_forward() {
        let exercises = vec![exercise(10, "Squat", &[11, 12])];
        let sessions = vec![
            session(1, day(0), &[(11, 100.0), (12, 110.0)]),
            session(2, day(2), &[]),
            session(3, day(4), &[(12, 115.0)]),
        ];

        let history = aggregate_gym(&sessions, &exercises);
        let points = &history[0].points;
        assert_eq!(points.len(), 3);
        assert_eq!((points[0].min, points[0].max), (100.0, 110.0));
        assert_eq!((points[1].min, points[1].max), (100.0, 110.0));
        assert_eq!(points[1].performed_at, day(2));
        assert_eq!((points[2].min, points[2].max), (115.0, 115.0));
    }

    #[test]
    fn test_gym_series_starts_at_zero() {
        let exercises = vec![exercise(10, "Squat", &[11]), exercise(20, "Press", &[21])];
        let sessions = vec![
            session(1, day(0), &[(21, 40.0)]),
            session(2, day(1), &[(11, 90.0), (21, 42.5)]),
        ];

        let history = aggregate_gym(&sessions, &exercises);
        assert_eq!(history[0].name, "Squat");
        assert_eq!((history[0].points[0].min, history[0].points[0].max), (0.0, 0.0));
        assert_eq!(history[0].points[1].max, 90.0);
        assert_eq!(history[1].points[1].min, 42.5);
    }

    #[test]
    fn test_gym_series_ignores_sets_no_longer_in_exercise() {
        let exercises = vec![exercise(10, "Squat", &[11])];
        let sessions = vec![session(1, day(0), &[(11, 100.0), (99, 500.0)])];

        let history = aggregate_gym(&sessions, &exercises);
        assert_eq!(history[0].points[0].max, 100.0);
    }

    #[test]
    fn test_gym_series_sorts_sessions() {
        let exercises = vec![exercise(10, "Squat", &[11])];
        let sessions = vec![
            session(2, day(3), &[]),
            session(1, day(0), &[(11, 60.0)]),
        ];

        let points = &aggregate_gym(&sessions, &exercises)[0].points;
        assert_eq!(points[0].performed_at, day(0));
        assert_eq!(points[1].max, 60.0);
    }

    #[test]
    fn test_cardio_series_are_sparse() {
        let sessions: Vec<CardioSession> = (0..5)
            .map(|i| CardioSession {
                id: i,
                workout_id: 1,
                performed_at: day(i),
                steps: Some(1000 * i as u32),
                distance_km: if i == 1 || i == 3 { Some(i as f64 * 2.5) } else { None },
                duration_secs: None,
            })
            .collect();

        let history = aggregate_cardio(&sessions);
        assert_eq!(history.steps.len(), 5);
        assert_eq!(history.distance.len(), 2);
        assert_eq!(history.distance[0].performed_at, day(1));
        assert_eq!(history.distance[1].performed_at, day(3));
        assert_eq!(history.distance[1].value, 7.5);
        assert!(history.duration_secs.is_empty());
    }

    #[test]
    fn test_history_missing_workout_is_none() {
        let db = crate::Database::new();
        assert!(gym_history(&db, 7, &TimeRange::all(), WeightUnit::Kilograms)
            .unwrap()
            .is_none());
        assert!(cardio_history(&db, 7, &TimeRange::all(), DistanceUnit::Miles)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_gym_history_converts_and_rounds_at_the_boundary() {
        use crate::reconcile::{create_gym_workout, reconcile_gym_workout};
        use crate::{EditedExercise, EditedSet, EditedWorkout, ReconcileOptions};

        let mut db = crate::Database::new();
        let set = EditedSet::new(100.0, 5);
        let set_uuid = set.uuid;
        let bench = EditedExercise::new("Bench").with_set(set);
        let bench_uuid = bench.uuid;
        let edited = EditedWorkout::new("Push").with_exercise(bench);
        let opts = ReconcileOptions::default().with_performed_at(day(0));
        let (workout_id, _) = create_gym_workout(&mut db, &edited, &opts).unwrap();

        let done = edited.map_exercise(bench_uuid, |e| e.map_set(set_uuid, |s| s.checked(true)));
        reconcile_gym_workout(&mut db, workout_id, &done, &opts).unwrap();

        let history = gym_history(&db, workout_id, &TimeRange::all(), WeightUnit::Pounds)
            .unwrap()
            .unwrap();
        assert_eq!(history[0].points.len(), 1);
        assert_eq!(history[0].points[0].max, 220.46);
    }
}
