//! Integration tests for the gymlog binary.
//!
//! These tests verify end-to-end behavior including:
//! - Creating, listing, renaming and deleting workouts
//! - Finishing a gym workout from edited JSON
//! - Cardio logging, stats and CSV export
//! - Confirmation prompts driven by the config file

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const BENCH: &str = "67e55044-10b1-426f-9247-bb680e5fe0c8";
const SET_X: &str = "67e55044-10b1-426f-9247-bb680e5fe0c9";
const SET_Y: &str = "67e55044-10b1-426f-9247-bb680e5fe0ca";

struct Env {
    _temp: TempDir,
    data_dir: PathBuf,
    config: PathBuf,
}

/// Helper to create a data directory and a config file without prompts
fn setup(extra_config: &str) -> Env {
    let temp = tempfile::tempdir().expect("Failed to create temp dir");
    let data_dir = temp.path().join("data");
    let config = temp.path().join("config.toml");
    fs::write(
        &config,
        format!(
            "[prompts]\nconfirm_finish = false\nconfirm_discard = false\n{}",
            extra_config
        ),
    )
    .expect("Failed to write config");
    Env {
        _temp: temp,
        data_dir,
        config,
    }
}

/// Helper to get the CLI pointed at the test environment
fn cli(env: &Env) -> Command {
    let mut cmd = Command::cargo_bin("gymlog").expect("Failed to find gymlog binary");
    cmd.arg("--data-dir")
        .arg(&env.data_dir)
        .arg("--config")
        .arg(&env.config);
    cmd
}

fn write_json(dir: &Path, name: &str, value: &Value) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, serde_json::to_string(value).unwrap()).unwrap();
    path
}

fn show(env: &Env, id: &str) -> Value {
    let output = cli(env).arg("show").arg(id).output().unwrap();
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).expect("show prints JSON")
}

#[test]
fn test_cli_help() {
    Command::cargo_bin("gymlog")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Gym and cardio workout log"));
}

#[test]
fn test_new_and_list_workouts() {
    let env = setup("");

    cli(&env)
        .arg("workouts")
        .assert()
        .success()
        .stdout(predicate::str::contains("No workouts yet"));

    cli(&env)
        .args(["new", "Push"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created workout 1"));
    cli(&env)
        .args(["new", "Evening walk", "--cardio"])
        .assert()
        .success();

    cli(&env)
        .arg("workouts")
        .assert()
        .success()
        .stdout(predicate::str::contains("gym     Push"))
        .stdout(predicate::str::contains("cardio  Evening walk"));

    assert!(env.data_dir.join("gymlog.json").exists());
}

#[test]
fn test_finish_gym_workout_end_to_end() {
    let env = setup("");
    cli(&env).args(["new", "Push"]).assert().success();

    let first = json!({
        "name": "Push",
        "exercises": [{
            "uuid": BENCH,
            "name": "Bench press",
            "sets": [{ "uuid": SET_X, "weight": 100.0, "reps": 5 }]
        }]
    });
    let file = write_json(&env.data_dir, "first.json", &first);
    cli(&env)
        .args(["finish", "1", "--file"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exercises: +1 ~0 -0"))
        .stdout(predicate::str::contains("Session").not());

    // Edit what `show` prints: rename, heavier and checked set, new unchecked set
    let mut edited = show(&env, "1");
    assert_eq!(edited["exercises"][0]["uuid"], BENCH);
    edited["exercises"][0]["name"] = json!("Bench");
    edited["exercises"][0]["sets"][0]["weight"] = json!(102.5);
    edited["exercises"][0]["sets"][0]["checked"] = json!(true);
    edited["exercises"][0]["sets"]
        .as_array_mut()
        .unwrap()
        .push(json!({ "uuid": SET_Y, "weight": 80.0, "reps": 8, "checked": false }));
    let file = write_json(&env.data_dir, "second.json", &edited);

    cli(&env)
        .args(["finish", "1", "--at", "2024-05-01T18:00:00Z", "--file"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exercises: +0 ~1 -0"))
        .stdout(predicate::str::contains("Sets: +1 ~1 -0"))
        .stdout(predicate::str::contains("(1 sets)"));

    // Same state again changes nothing
    let mut again = show(&env, "1");
    again["exercises"][0]["sets"][0]["checked"] = json!(false);
    let file = write_json(&env.data_dir, "third.json", &again);
    cli(&env)
        .args(["finish", "1", "--file"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to change"));

    cli(&env)
        .args(["stats", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Bench"))
        .stdout(predicate::str::contains("2024-05-01 18:00"))
        .stdout(predicate::str::contains("max 102.5 kg"));

    let csv_path = env.data_dir.join("push.csv");
    cli(&env)
        .args(["export", "1", "--out"])
        .arg(&csv_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 1 rows"));
    let csv = fs::read_to_string(&csv_path).unwrap();
    assert!(csv.contains(SET_X));
    assert!(!csv.contains(SET_Y));
}

#[test]
fn test_show_uses_configured_weight_unit() {
    let env = setup("[units]\nweight = \"lb\"\n");
    cli(&env).args(["new", "Legs"]).assert().success();

    let edited = json!({
        "name": "Legs",
        "exercises": [{
            "uuid": BENCH,
            "name": "Squat",
            "sets": [{ "uuid": SET_X, "weight": 225.0, "reps": 5 }]
        }]
    });
    let file = write_json(&env.data_dir, "legs.json", &edited);
    cli(&env)
        .args(["finish", "1", "--file"])
        .arg(&file)
        .assert()
        .success();

    let shown = show(&env, "1");
    let weight = shown["exercises"][0]["sets"][0]["weight"].as_f64().unwrap();
    assert!((weight - 225.0).abs() < 1e-6);

    // Stored canonically in kilograms
    let db: Value =
        serde_json::from_str(&fs::read_to_string(env.data_dir.join("gymlog.json")).unwrap())
            .unwrap();
    let kg = db["sets"][0]["weight_kg"].as_f64().unwrap();
    assert!((kg - 102.058_283_25).abs() < 1e-6);
}

#[test]
fn test_missing_workout_is_not_an_error() {
    let env = setup("");
    let file = write_json(
        &env._temp.path().to_path_buf(),
        "edit.json",
        &json!({ "name": "Ghost", "exercises": [] }),
    );

    cli(&env)
        .args(["finish", "42", "--file"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Workout 42 not found"));
    cli(&env)
        .args(["stats", "42"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not found"));
    cli(&env)
        .args(["delete", "42"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not found"));
}

#[test]
fn test_cardio_logging_and_stats() {
    let env = setup("[units]\ndistance = \"mi\"\n");
    cli(&env).args(["new", "Run", "--cardio"]).assert().success();

    cli(&env)
        .args([
            "cardio",
            "1",
            "--steps",
            "6000",
            "--distance",
            "3.1",
            "--at",
            "2024-06-01T07:00:00Z",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Session"));

    // Unchanged values record nothing
    cli(&env)
        .args(["cardio", "1", "--steps", "6000"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to change"));

    cli(&env)
        .args(["cardio", "1", "--duration", "1500", "--at", "2024-06-02T07:00:00Z"])
        .assert()
        .success();

    cli(&env)
        .args(["stats", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3.1 mi"))
        .stdout(predicate::str::contains("25m 00s"));

    let csv_path = env.data_dir.join("run.csv");
    cli(&env)
        .args(["export", "1", "--out"])
        .arg(&csv_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 2 rows"));
}

#[test]
fn test_rename_and_delete() {
    let env = setup("");
    cli(&env).args(["new", "Pull"]).assert().success();

    cli(&env)
        .args(["rename", "1", "  Pull day  "])
        .assert()
        .success()
        .stdout(predicate::str::contains("Renamed workout 1"));
    cli(&env)
        .args(["rename", "1", "   "])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to change"));
    cli(&env)
        .arg("workouts")
        .assert()
        .success()
        .stdout(predicate::str::contains("Pull day"));

    cli(&env)
        .args(["delete", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted workout 1"));
    cli(&env)
        .arg("workouts")
        .assert()
        .success()
        .stdout(predicate::str::contains("No workouts yet"));
}

#[test]
fn test_confirmation_prompt_can_cancel() {
    let temp = tempfile::tempdir().unwrap();
    let data_dir = temp.path().join("data");
    let config = temp.path().join("config.toml");
    fs::write(&config, "[prompts]\nconfirm_discard = true\n").unwrap();

    let run = || {
        let mut cmd = Command::cargo_bin("gymlog").unwrap();
        cmd.arg("--data-dir")
            .arg(&data_dir)
            .arg("--config")
            .arg(&config);
        cmd
    };

    run().args(["new", "Core"]).assert().success();

    run()
        .args(["delete", "1"])
        .write_stdin("n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Cancelled"));
    run()
        .arg("workouts")
        .assert()
        .success()
        .stdout(predicate::str::contains("Core"));

    run()
        .args(["delete", "1"])
        .write_stdin("y\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted workout 1"));
}

#[test]
fn test_finish_rejects_cardio_workout_and_duplicate_uuids() {
    let env = setup("");
    cli(&env).args(["new", "Run", "--cardio"]).assert().success();
    cli(&env).args(["new", "Push"]).assert().success();

    let edited = json!({
        "name": "Run",
        "exercises": [{
            "uuid": BENCH,
            "name": "Bench press",
            "sets": [{ "uuid": SET_X, "weight": 100.0, "reps": 5, "checked": true }]
        }]
    });
    let file = write_json(env._temp.path(), "gym.json", &edited);
    cli(&env)
        .args(["finish", "1", "--file"])
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a gym workout"));

    let twins = json!({
        "name": "Push",
        "exercises": [
            { "uuid": BENCH, "name": "Bench", "sets": [{ "uuid": SET_X, "weight": 100.0, "reps": 5 }] },
            { "uuid": BENCH, "name": "Bench", "sets": [{ "uuid": SET_Y, "weight": 80.0, "reps": 8 }] }
        ]
    });
    let file = write_json(env._temp.path(), "twins.json", &twins);
    cli(&env)
        .args(["finish", "2", "--file"])
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("duplicate exercise uuid"));

    let shown = show(&env, "2");
    assert_eq!(shown["exercises"].as_array().unwrap().len(), 0);
}
