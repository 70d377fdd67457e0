//! Liftlog CLI.
//!
//! Keeps a routine library and archived workouts under `.liftlog/` in the
//! current directory, and runs workouts as a line-oriented session on stdin.

use std::env;
use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use liftlog::core::calendar::marked_days;
use liftlog::core::set_input::SetDraft;
use liftlog::core::types::MissingFieldPolicy;
use liftlog::exit_codes;
use liftlog::io::config::{AppConfig, load_config};
use liftlog::io::document_store::{DocumentStore, ExerciseImport, JsonDocumentStore, StoreError};
use liftlog::io::init::{InitOptions, LiftlogPaths, init_liftlog};
use liftlog::io::session_cache::FileSessionCache;
use liftlog::library::{self, LibraryError};
use liftlog::profile::{ProfileUpdateError, load_profile, update_profile};
use liftlog::session::{SessionController, SessionError, StartOutcome};
use liftlog::workout::{WorkoutOptions, render_snapshot, run_workout};

#[derive(Parser)]
#[command(name = "liftlog", version, about = "Workout routines and in-session set tracking")]
struct Cli {
    /// Act as this user instead of `user_id` from the config.
    #[arg(long, global = true)]
    user: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create `.liftlog/` with a default config.
    Init {
        /// Overwrite the existing config.
        #[arg(short, long)]
        force: bool,
    },
    #[command(flatten)]
    Workspace(WorkspaceCommand),
}

/// Commands that need an initialized `.liftlog/`.
#[derive(Subcommand)]
enum WorkspaceCommand {
    /// Import a routine from a JSON file and print its id.
    Import { file: PathBuf },
    /// List routines as `<id>\t<name>`.
    Routines,
    /// Print a routine with its planned sets.
    Show { routine_id: String },
    /// Start a workout (or resume the cached one) and read commands from stdin.
    Workout {
        /// Routine to start. Without it the cached session is resumed.
        #[arg(long)]
        routine: Option<String>,
    },
    /// Replace the planned sets of a library exercise.
    SetExercise {
        routine_id: String,
        exercise_id: String,
        /// One `kgs,reps,sets,rest` group per set. Blank fields are allowed.
        #[arg(required = true)]
        sets: Vec<String>,
        /// Save blank kgs/reps/sets as 0 instead of refusing.
        #[arg(long)]
        defaults: bool,
    },
    /// Move an exercise to a 1-based position within its routine.
    MoveExercise {
        routine_id: String,
        exercise_id: String,
        position: usize,
    },
    /// Rename a routine.
    Rename { routine_id: String, name: String },
    /// Delete a routine. Archived workouts stay on the calendar.
    Delete {
        routine_id: String,
        /// Confirm the deletion.
        #[arg(long)]
        yes: bool,
    },
    /// Append an exercise to a routine and print its id.
    AddExercise {
        routine_id: String,
        name: String,
        #[arg(long = "type", default_value = "")]
        kind: String,
        #[arg(long, default_value = "")]
        muscle: String,
        #[arg(long, default_value = "")]
        equipment: String,
        #[arg(long, default_value = "")]
        instructions: String,
    },
    /// Log a routine as done on a given day.
    Log {
        routine_id: String,
        /// Day in YYYY-MM-DD.
        #[arg(long)]
        date: NaiveDate,
    },
    /// List days with workouts, or the workouts of one day.
    Calendar {
        #[arg(long)]
        day: Option<NaiveDate>,
    },
    /// Show or edit the user profile.
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    Show,
    /// Set one field: birthdate, units, weight, height, name, sex, password,
    /// or any other key.
    Set { field: String, value: String },
}

fn main() {
    liftlog::logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_code_for(&err));
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let root = env::current_dir().context("resolve current directory")?;
    match cli.command {
        Command::Init { force } => cmd_init(root, force),
        Command::Workspace(command) => run_in_workspace(&Workspace::open(root, cli.user)?, command),
    }
}

fn cmd_init(root: PathBuf, force: bool) -> Result<i32> {
    let paths = init_liftlog(&root, &InitOptions { force })?;
    println!("initialized {}", paths.data_dir.display());
    Ok(exit_codes::OK)
}

fn run_in_workspace(workspace: &Workspace, command: WorkspaceCommand) -> Result<i32> {
    let store = workspace.store();
    let user = workspace.user_id.as_str();
    match command {
        WorkspaceCommand::Import { file } => {
            let id = library::import_routine(&store, user, &file)?;
            println!("{id}");
        }
        WorkspaceCommand::Routines => {
            for routine in library::list_routines(&store, user)? {
                println!("{}\t{}", routine.id, routine.name);
            }
        }
        WorkspaceCommand::Show { routine_id } => {
            let snapshot = library::load_snapshot(&store, user, &routine_id)?;
            print!("{}", render_snapshot(&snapshot, None));
        }
        WorkspaceCommand::Workout { routine } => return cmd_workout(workspace, routine.as_deref()),
        WorkspaceCommand::SetExercise {
            routine_id,
            exercise_id,
            sets,
            defaults,
        } => {
            let drafts = sets
                .iter()
                .map(|raw| parse_set_draft(raw, workspace.config.default_rest_secs))
                .collect::<Result<Vec<_>>>()?;
            let policy = if defaults {
                MissingFieldPolicy::DefaultToZero
            } else {
                MissingFieldPolicy::Reject
            };
            let saved =
                library::save_exercise_sets(&store, user, &routine_id, &exercise_id, &drafts, policy)
                    .map_err(|err| match err {
                        LibraryError::Validation(err) => {
                            anyhow!("{err} (rerun with --defaults)")
                        }
                        other => other.into(),
                    })?;
            println!("saved {} sets", saved.len());
        }
        WorkspaceCommand::MoveExercise {
            routine_id,
            exercise_id,
            position,
        } => {
            let index = position
                .checked_sub(1)
                .ok_or_else(|| anyhow!("position is 1-based"))?;
            let order = library::move_exercise(&store, user, &routine_id, &exercise_id, index)?;
            println!("{}", order.join(" "));
        }
        WorkspaceCommand::Rename { routine_id, name } => {
            library::rename_routine(&store, user, &routine_id, &name)?;
        }
        WorkspaceCommand::Delete { routine_id, yes } => {
            let routine = store.load_routine(user, &routine_id)?;
            if !yes {
                bail!(
                    "refusing to delete '{}' without --yes (archived workouts are kept)",
                    routine.name
                );
            }
            library::delete_routine(&store, user, &routine_id)?;
            println!("deleted {}", routine.name);
        }
        WorkspaceCommand::AddExercise {
            routine_id,
            name,
            kind,
            muscle,
            equipment,
            instructions,
        } => {
            let exercise = ExerciseImport {
                name,
                kind,
                muscle,
                equipment,
                instructions,
                sets: None,
            };
            let id = library::add_exercise(&store, user, &routine_id, &exercise)?;
            println!("{id}");
        }
        WorkspaceCommand::Log { routine_id, date } => {
            let id = library::log_routine_for_day(&store, user, &routine_id, date)?;
            println!("{id}");
        }
        WorkspaceCommand::Calendar { day } => {
            let days = library::calendar(&store, user)?;
            match day {
                Some(day) => {
                    for entry in days.get(&day).into_iter().flatten() {
                        println!("{}\t{}", entry.unique_id, entry.name);
                    }
                }
                None => {
                    for day in marked_days(&days) {
                        let count = days.get(&day).map_or(0, Vec::len);
                        println!("{day}\t{count}");
                    }
                }
            }
        }
        WorkspaceCommand::Profile { action } => match action {
            ProfileAction::Show => {
                let mut profile = load_profile(&store, user)?;
                if profile.password_hash.is_some() {
                    profile.password_hash = Some("********".to_string());
                }
                let rendered =
                    serde_json::to_string_pretty(&profile).context("serialize profile")?;
                println!("{rendered}");
            }
            ProfileAction::Set { field, value } => {
                update_profile(&store, user, &field, &value)?;
            }
        },
    }
    Ok(exit_codes::OK)
}

fn cmd_workout(workspace: &Workspace, routine: Option<&str>) -> Result<i32> {
    let cache = FileSessionCache::new(&workspace.paths.session_path);
    let mut controller = SessionController::new(&workspace.user_id, workspace.store(), cache);
    let started = match routine {
        Some(routine_id) => controller.select_routine(routine_id)?,
        None => controller.start(None)?,
    };
    if started == StartOutcome::NoSession {
        eprintln!("no cached workout to resume (use --routine <id>)");
        return Ok(exit_codes::NO_SESSION);
    }

    let options = WorkoutOptions {
        rest_step_secs: workspace.config.rest_step_secs,
        ..WorkoutOptions::default()
    };
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let exit = run_workout(&mut controller, stdin.lock(), &mut stdout, &options)?;
    tracing::debug!(?exit, "workout ended");
    Ok(exit_codes::OK)
}

/// Parse `kgs,reps,sets,rest`. A blank rest takes the configured default.
fn parse_set_draft(raw: &str, default_rest: u32) -> Result<SetDraft> {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    let [kgs, reps, sets, rest] = parts[..] else {
        bail!("set '{raw}' must have the form kgs,reps,sets,rest");
    };
    let mut draft = SetDraft::blank(default_rest);
    if !rest.is_empty() {
        draft.rest = rest
            .parse()
            .with_context(|| format!("rest '{rest}' in set '{raw}' must be whole seconds"))?;
    }
    draft.kgs = kgs.to_string();
    draft.reps = reps.to_string();
    draft.sets = sets.to_string();
    Ok(draft)
}

/// An initialized `.liftlog/` with its config and the acting user.
struct Workspace {
    paths: LiftlogPaths,
    config: AppConfig,
    user_id: String,
}

impl Workspace {
    fn open(root: PathBuf, user: Option<String>) -> Result<Self> {
        let paths = LiftlogPaths::new(root);
        if !paths.data_dir.is_dir() {
            bail!("no .liftlog directory here (run `liftlog init` first)");
        }
        let mut config = load_config(&paths.config_path)?;
        if let Some(user) = user {
            config.user_id = user;
            config.validate().context("--user")?;
        }
        let user_id = config.user_id.clone();
        Ok(Self {
            paths,
            config,
            user_id,
        })
    }

    fn store(&self) -> JsonDocumentStore {
        JsonDocumentStore::new(&self.paths.store_dir)
    }
}

/// Map an error chain to a stable exit code.
fn exit_code_for(err: &anyhow::Error) -> i32 {
    let not_found = err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<StoreError>(),
            Some(StoreError::NotFound { .. })
        ) || matches!(
            cause.downcast_ref::<LibraryError>(),
            Some(LibraryError::Store(StoreError::NotFound { .. }))
        ) || matches!(
            cause.downcast_ref::<SessionError>(),
            Some(SessionError::Store(StoreError::NotFound { .. }))
        ) || matches!(
            cause.downcast_ref::<ProfileUpdateError>(),
            Some(ProfileUpdateError::Store(StoreError::NotFound { .. }))
        )
    });
    if not_found {
        exit_codes::NOT_FOUND
    } else {
        exit_codes::INVALID
    }
}
