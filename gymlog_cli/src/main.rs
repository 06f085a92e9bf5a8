use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use gymlog_core::*;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "gymlog")]
#[command(about = "Gym and cardio workout log", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// List workouts
    Workouts,

    /// Create a workout
    New {
        name: String,

        /// Create a cardio workout instead of a gym workout
        #[arg(long)]
        cardio: bool,
    },

    /// Print a gym workout as editable JSON in display units
    Show { id: i64 },

    /// Save an edited gym workout and log checked sets as a session
    Finish {
        id: i64,

        /// Edited workout JSON (as printed by `show`)
        #[arg(long)]
        file: PathBuf,

        /// Back-date the session (RFC 3339)
        #[arg(long)]
        at: Option<DateTime<Utc>>,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Record cardio metrics
    Cardio {
        id: i64,

        #[arg(long)]
        steps: Option<u32>,

        /// Distance in the configured unit
        #[arg(long)]
        distance: Option<f64>,

        /// Duration in seconds
        #[arg(long)]
        duration: Option<u64>,

        /// Back-date the session (RFC 3339)
        #[arg(long)]
        at: Option<DateTime<Utc>>,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Rename a workout
    Rename { id: i64, name: String },

    /// Delete a workout and all of its history
    Delete {
        id: i64,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Print per-exercise or per-metric history series
    Stats {
        id: i64,

        #[arg(long)]
        since: Option<DateTime<Utc>>,

        #[arg(long)]
        until: Option<DateTime<Utc>>,
    },

    /// Export session history to CSV
    Export {
        id: i64,

        #[arg(long)]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    gymlog_core::logging::init(cli.verbose);

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    let db_path = Config::database_path(&data_dir);
    tracing::debug!("Using database {:?}", db_path);

    match cli.command {
        Commands::Workouts => cmd_workouts(&db_path),
        Commands::New { name, cardio } => cmd_new(&db_path, &name, cardio),
        Commands::Show { id } => cmd_show(&db_path, id, &config),
        Commands::Finish { id, file, at, yes } => cmd_finish(&db_path, id, &file, at, yes, &config),
        Commands::Cardio {
            id,
            steps,
            distance,
            duration,
            at,
            yes,
        } => {
            let edit = CardioEdit {
                steps,
                distance,
                duration_secs: duration,
            };
            cmd_cardio(&db_path, id, edit, at, yes, &config)
        }
        Commands::Rename { id, name } => cmd_rename(&db_path, id, &name),
        Commands::Delete { id, yes } => cmd_delete(&db_path, id, yes, &config),
        Commands::Stats { id, since, until } => {
            cmd_stats(&db_path, id, TimeRange { since, until }, &config)
        }
        Commands::Export { id, out } => cmd_export(&db_path, id, &out, &config),
    }
}

fn cmd_workouts(db_path: &Path) -> Result<()> {
    let db = Database::load(db_path)?;
    let workouts = db.workouts()?;
    if workouts.is_empty() {
        println!("No workouts yet.");
        return Ok(());
    }
    for workout in workouts {
        let kind = match workout.kind {
            WorkoutKind::Gym => "gym",
            WorkoutKind::Cardio => "cardio",
        };
        println!("{:>4}  {:<7} {}", workout.id, kind, workout.name);
    }
    Ok(())
}

fn cmd_new(db_path: &Path, name: &str, cardio: bool) -> Result<()> {
    let id = Database::update(db_path, |db| {
        if cardio {
            create_cardio_workout(db, name)
        } else {
            create_gym_workout(db, &EditedWorkout::new(name), &ReconcileOptions::default())
                .map(|(id, _)| id)
        }
    })?;
    println!("✓ Created workout {}", id);
    Ok(())
}

fn cmd_show(db_path: &Path, id: i64, config: &Config) -> Result<()> {
    let db = Database::load(db_path)?;
    let Some(workout) = db.workout(id)? else {
        println!("Workout {} not found.", id);
        return Ok(());
    };
    let exercises = db.exercises(id)?;
    let edited = EditedWorkout::from_persisted(&workout, &exercises, config.units.weight);
    println!("{}", serde_json::to_string_pretty(&edited)?);
    Ok(())
}

fn cmd_finish(
    db_path: &Path,
    id: i64,
    file: &Path,
    at: Option<DateTime<Utc>>,
    yes: bool,
    config: &Config,
) -> Result<()> {
    let contents = std::fs::read_to_string(file)?;
    let edited: EditedWorkout = serde_json::from_str(&contents)?;

    if config.prompts.confirm_finish && !yes && !confirm("Finish workout?")? {
        println!("Cancelled.");
        return Ok(());
    }

    let mut opts = config.reconcile_options();
    opts.performed_at = at;

    let outcome = Database::update(db_path, |db| reconcile_gym_workout(db, id, &edited, &opts))?;
    report(id, outcome);
    Ok(())
}

fn cmd_cardio(
    db_path: &Path,
    id: i64,
    edit: CardioEdit,
    at: Option<DateTime<Utc>>,
    yes: bool,
    config: &Config,
) -> Result<()> {
    if config.prompts.confirm_finish && !yes && !confirm("Finish workout?")? {
        println!("Cancelled.");
        return Ok(());
    }

    let mut opts = config.reconcile_options();
    opts.performed_at = at;

    let outcome = Database::update(db_path, |db| reconcile_cardio_workout(db, id, &edit, &opts))?;
    report(id, outcome);
    Ok(())
}

fn cmd_rename(db_path: &Path, id: i64, name: &str) -> Result<()> {
    let renamed = Database::update(db_path, |db| {
        let Some(workout) = db.workout(id)? else {
            return Ok(None);
        };
        let name = name.trim();
        if name.is_empty() || name == workout.name {
            return Ok(Some(false));
        }
        db.rename_workout(id, name)?;
        Ok(Some(true))
    })?;

    match renamed {
        None => println!("Workout {} not found.", id),
        Some(false) => println!("Nothing to change."),
        Some(true) => println!("✓ Renamed workout {}", id),
    }
    Ok(())
}

fn cmd_delete(db_path: &Path, id: i64, yes: bool, config: &Config) -> Result<()> {
    if config.prompts.confirm_discard
        && !yes
        && !confirm(&format!("Delete workout {} and its history?", id))?
    {
        println!("Cancelled.");
        return Ok(());
    }

    if Database::update(db_path, |db| delete_workout(db, id))? {
        println!("✓ Deleted workout {}", id);
    } else {
        println!("Workout {} not found.", id);
    }
    Ok(())
}

fn cmd_stats(db_path: &Path, id: i64, range: TimeRange, config: &Config) -> Result<()> {
    let db = Database::load(db_path)?;
    let Some(workout) = db.workout(id)? else {
        println!("Workout {} not found.", id);
        return Ok(());
    };

    println!("{}", workout.name);
    match workout.kind {
        WorkoutKind::Gym => {
            let unit = config.units.weight;
            let history = gym_history(&db, id, &range, unit)?.unwrap_or_default();
            for exercise in history {
                println!("\n  {}", exercise.name);
                for point in exercise.points {
                    println!(
                        "    {}  min {} {}  max {} {}",
                        point.performed_at.format("%Y-%m-%d %H:%M"),
                        point.min,
                        unit,
                        point.max,
                        unit
                    );
                }
            }
        }
        WorkoutKind::Cardio => {
            let unit = config.units.distance;
            let history = cardio_history(&db, id, &range, unit)?.unwrap_or_default();
            println!("\n  Steps");
            for p in &history.steps {
                println!("    {}  {}", p.performed_at.format("%Y-%m-%d %H:%M"), p.value);
            }
            println!("\n  Distance");
            for p in &history.distance {
                println!(
                    "    {}  {} {}",
                    p.performed_at.format("%Y-%m-%d %H:%M"),
                    p.value,
                    unit
                );
            }
            println!("\n  Duration");
            for p in &history.duration_secs {
                println!(
                    "    {}  {}m {:02}s",
                    p.performed_at.format("%Y-%m-%d %H:%M"),
                    p.value / 60,
                    p.value % 60
                );
            }
        }
    }
    Ok(())
}

fn cmd_export(db_path: &Path, id: i64, out: &Path, config: &Config) -> Result<()> {
    let db = Database::load(db_path)?;
    let Some(workout) = db.workout(id)? else {
        println!("Workout {} not found.", id);
        return Ok(());
    };

    let count = match workout.kind {
        WorkoutKind::Gym => export_gym_history(&db, id, out, config.units.weight)?,
        WorkoutKind::Cardio => export_cardio_history(&db, id, out, config.units.distance)?,
    }
    .unwrap_or(0);

    println!("✓ Exported {} rows", count);
    println!("  CSV: {}", out.display());
    Ok(())
}

fn report(id: i64, outcome: ReconcileOutcome) {
    match outcome {
        ReconcileOutcome::WorkoutMissing => println!("Workout {} not found.", id),
        ReconcileOutcome::Applied(summary) if summary.is_empty() => {
            println!("Nothing to change.")
        }
        ReconcileOutcome::Applied(summary) => {
            println!("✓ Workout {} saved", id);
            if summary.renamed {
                println!("  Renamed");
            }
            println!(
                "  Exercises: +{} ~{} -{}",
                summary.exercises_inserted, summary.exercises_updated, summary.exercises_deleted
            );
            println!(
                "  Sets: +{} ~{} -{}",
                summary.sets_inserted, summary.sets_updated, summary.sets_deleted
            );
            if let Some(session_id) = summary.session_id {
                println!(
                    "  Session {} logged ({} sets)",
                    session_id, summary.snapshots_inserted
                );
            }
        }
    }
}

fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    Ok(matches!(input.trim().to_lowercase().as_str(), "y" | "yes"))
}
