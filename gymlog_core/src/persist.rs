//! Database persistence with file locking.
//!
//! The whole database lives in one JSON document. Reads take a shared lock,
//! writes go to a locked temp file in the same directory which is synced
//! and renamed over the original, so a crash never leaves a torn file.

use crate::{Database, Error, Result, WorkoutStore};
use fs2::FileExt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;

impl Database {
    /// Load the database from a file with shared locking
    ///
    /// Returns an empty database if the file doesn't exist. A file that
    /// exists but cannot be parsed is an error: silently starting over
    /// would wipe the user's history on the next save.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No database found at {:?}, starting empty", path);
            return Ok(Self::default());
        }

        let file = File::open(path)?;
        file.lock_shared()?;

        let mut contents = String::new();
        let mut reader = std::io::BufReader::new(&file);
        let read = reader.read_to_string(&mut contents);
        file.unlock()?;
        read?;

        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        let db = serde_json::from_str::<Database>(&contents)
            .map_err(|e| Error::Store(format!("failed to parse {:?}: {}", path, e)))?;
        tracing::debug!("Loaded database from {:?}", path);
        Ok(db)
    }

    /// Save the database to a file with exclusive locking
    ///
    /// Atomically writes by:
    /// 1. Writing to a temp file
    /// 2. Syncing to disk
    /// 3. Renaming over the original
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| Error::Store(format!("database path {:?} has no parent", path)))?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;

        // Guards the temp file only; the rename makes the last writer win
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(self)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved database to {:?}", path);
        Ok(())
    }

    /// Load, run `f` in a transaction, and save only if it succeeded
    pub fn update<T, F>(path: &Path, f: F) -> Result<T>
    where
        F: FnOnce(&mut Database) -> Result<T>,
    {
        let mut db = Self::load(path)?;
        let value = db.transaction(f)?;
        db.save(path)?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WorkoutKind;

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("gymlog.json");

        let mut db = Database::new();
        let id = db.insert_workout("Pull", WorkoutKind::Gym).unwrap();
        db.save(&db_path).unwrap();

        let loaded = Database::load(&db_path).unwrap();
        assert_eq!(loaded, db);
        assert_eq!(loaded.workout(id).unwrap().unwrap().name, "Pull");
    }

    #[test]
    fn test_load_nonexistent_returns_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db = Database::load(&temp_dir.path().join("missing.json")).unwrap();
        assert!(db.workouts().unwrap().is_empty());
    }

    #[test]
    fn test_corrupted_database_is_an_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("gymlog.json");
        std::fs::write(&db_path, "{ invalid json }").unwrap();

        let result = Database::load(&db_path);
        assert!(matches!(result, Err(Error::Store(_))));
    }

    #[test]
    fn test_ids_keep_increasing_across_saves() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("gymlog.json");

        let first = Database::update(&db_path, |db| db.insert_workout("A", WorkoutKind::Gym))
            .unwrap();
        Database::update(&db_path, |db| db.delete_workout(first)).unwrap();
        let second = Database::update(&db_path, |db| db.insert_workout("B", WorkoutKind::Gym))
            .unwrap();
        assert!(second > first);
    }

    #[test]
    fn test_failed_update_leaves_file_untouched() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("gymlog.json");

        Database::update(&db_path, |db| db.insert_workout("Legs", WorkoutKind::Gym)).unwrap();
        let before = std::fs::read_to_string(&db_path).unwrap();

        let result: Result<()> = Database::update(&db_path, |db| {
            db.insert_workout("Ghost", WorkoutKind::Gym)?;
            Err(Error::Other("boom".into()))
        });
        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(&db_path).unwrap(), before);
    }

    #[test]
    fn test_atomic_save() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("gymlog.json");

        Database::new().save(&db_path).unwrap();

        assert!(db_path.exists());
        let extras: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != "gymlog.json")
            .collect();
        assert!(
            extras.is_empty(),
            "Expected only gymlog.json, found extras: {:?}",
            extras
        );
    }
}
