//! CSV export of session history.
//!
//! One row per set snapshot (gym) or per session (cardio), in the display
//! unit. The file is replaced, flushed and synced to disk.

use crate::units::{round_display, DistanceUnit, WeightUnit};
use crate::{Result, TimeRange, WorkoutStore};
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

/// A row in the gym CSV output
#[derive(Debug, serde::Serialize)]
struct GymCsvRow {
    session_id: i64,
    performed_at: String,
    exercise: String,
    set_uuid: String,
    weight: f64,
    unit: &'static str,
    reps: u32,
}

/// A row in the cardio CSV output
#[derive(Debug, serde::Serialize)]
struct CardioCsvRow {
    session_id: i64,
    performed_at: String,
    steps: Option<u32>,
    distance: Option<f64>,
    distance_unit: &'static str,
    duration_secs: Option<u64>,
}

const GYM_HEADER: [&str; 7] = [
    "session_id",
    "performed_at",
    "exercise",
    "set_uuid",
    "weight",
    "unit",
    "reps",
];

const CARDIO_HEADER: [&str; 6] = [
    "session_id",
    "performed_at",
    "steps",
    "distance",
    "distance_unit",
    "duration_secs",
];

/// Write `header` then `rows`; the header is present even with no rows
fn write_rows<T: serde::Serialize>(path: &Path, header: &[&str], rows: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(File::create(path)?);
    writer.write_record(header)?;
    for row in rows {
        writer.serialize(row)?;
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    file.sync_all()?;
    Ok(())
}

/// Export every gym snapshot of `workout_id` to `path`
///
/// Snapshots whose set has been deleted since are exported with an empty
/// exercise name. Returns `None` if the workout doesn't exist, otherwise
/// the number of rows written.
pub fn export_gym_history<S: WorkoutStore>(
    store: &S,
    workout_id: i64,
    path: &Path,
    unit: WeightUnit,
) -> Result<Option<usize>> {
    if store.workout(workout_id)?.is_none() {
        return Ok(None);
    }

    let mut set_owner: HashMap<i64, (String, String)> = HashMap::new();
    for p in store.exercises(workout_id)? {
        for s in &p.sets {
            set_owner.insert(s.id, (p.exercise.name.clone(), s.uuid.to_string()));
        }
    }

    let mut rows = Vec::new();
    for record in store.gym_sessions(workout_id, &TimeRange::all())? {
        for snapshot in &record.snapshots {
            let (exercise, set_uuid) = set_owner
                .get(&snapshot.set_id)
                .cloned()
                .unwrap_or_default();
            rows.push(GymCsvRow {
                session_id: record.session.id,
                performed_at: record.session.performed_at.to_rfc3339(),
                exercise,
                set_uuid,
                weight: round_display(unit.from_kg(snapshot.weight_kg)),
                unit: unit.label(),
                reps: snapshot.reps,
            });
        }
    }

    write_rows(path, &GYM_HEADER, &rows)?;
    tracing::info!("Exported {} gym rows to {:?}", rows.len(), path);
    Ok(Some(rows.len()))
}

/// Export every cardio session of `workout_id` to `path`
///
/// Returns `None` if the workout doesn't exist, otherwise the number of
/// rows written.
pub fn export_cardio_history<S: WorkoutStore>(
    store: &S,
    workout_id: i64,
    path: &Path,
    unit: DistanceUnit,
) -> Result<Option<usize>> {
    if store.workout(workout_id)?.is_none() {
        return Ok(None);
    }

    let rows: Vec<CardioCsvRow> = store
        .cardio_sessions(workout_id, &TimeRange::all())?
        .into_iter()
        .map(|s| CardioCsvRow {
            session_id: s.id,
            performed_at: s.performed_at.to_rfc3339(),
            steps: s.steps,
            distance: s.distance_km.map(|km| round_display(unit.from_km(km))),
            distance_unit: unit.label(),
            duration_secs: s.duration_secs,
        })
        .collect();

    write_rows(path, &CARDIO_HEADER, &rows)?;
    tracing::info!("Exported {} cardio rows to {:?}", rows.len(), path);
    Ok(Some(rows.len()))
}
