//! Line-oriented workout loop driving a [`SessionController`].
//!
//! Each input line is one user action. Exercise and set numbers are 1-based
//! as displayed by `show`. Incomplete edits and cancel go through a yes/no
//! confirmation; any other command answers "no" to a pending question.

use std::fmt::Write as _;
use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;

use crate::core::ledger::CompletionLedger;
use crate::core::mutation::MutationError;
use crate::core::set_input::{SetDraft, ValidationError};
use crate::core::types::{EditOutcome, MarkOutcome, MissingFieldPolicy};
use crate::io::document_store::DocumentStore;
use crate::io::session_cache::SessionCache;
use crate::routine::RoutineSnapshot;
use crate::session::{FinishOutcome, SessionController, SessionError};

/// One parsed line of workout input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkoutCommand {
    Show,
    Help,
    Done { exercise: usize, set: usize },
    Edit {
        exercise: usize,
        set: usize,
        changes: Vec<FieldChange>,
    },
    Rest {
        exercise: usize,
        set: usize,
        delta: RestDelta,
    },
    Finish,
    Cancel,
    Yes,
    No,
    Quit,
}

/// `field=value` from an `edit` line. Blank values are allowed and mean
/// "clear this field".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldChange {
    Kgs(String),
    Reps(String),
    Sets(String),
    Rest(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestDelta {
    /// `+`: one configured step up.
    StepUp,
    /// `-`: one configured step down.
    StepDown,
    Seconds(i64),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("invalid {what} '{value}'")]
    BadNumber { what: &'static str, value: String },
    #[error("unknown field '{0}' (expected kgs, reps, sets or rest)")]
    UnknownField(String),
}

const HELP: &str = "commands: show | done E S | edit E S [kgs=..] [reps=..] [sets=..] [rest=..] \
                    | rest E S (+|-|SECONDS) | finish | cancel | yes | no | quit";

pub fn parse_command(line: &str) -> Result<WorkoutCommand, CommandError> {
    let mut words = line.split_whitespace();
    let Some(name) = words.next() else {
        return Err(CommandError::Usage(HELP));
    };
    let args: Vec<&str> = words.collect();
    let command = match name.to_ascii_lowercase().as_str() {
        "show" | "ls" => WorkoutCommand::Show,
        "help" | "?" => WorkoutCommand::Help,
        "done" | "d" => {
            let [exercise, set] = args[..] else {
                return Err(CommandError::Usage("done E S"));
            };
            WorkoutCommand::Done {
                exercise: position(exercise, "exercise")?,
                set: position(set, "set")?,
            }
        }
        "edit" | "e" => {
            let [exercise, set, ref fields @ ..] = args[..] else {
                return Err(CommandError::Usage("edit E S [kgs=..] [reps=..] [sets=..] [rest=..]"));
            };
            WorkoutCommand::Edit {
                exercise: position(exercise, "exercise")?,
                set: position(set, "set")?,
                changes: fields
                    .iter()
                    .map(|field| field_change(field))
                    .collect::<Result<_, _>>()?,
            }
        }
        "rest" | "r" => {
            let [exercise, set, delta] = args[..] else {
                return Err(CommandError::Usage("rest E S (+|-|SECONDS)"));
            };
            WorkoutCommand::Rest {
                exercise: position(exercise, "exercise")?,
                set: position(set, "set")?,
                delta: rest_delta(delta)?,
            }
        }
        "finish" => WorkoutCommand::Finish,
        "cancel" => WorkoutCommand::Cancel,
        "yes" | "y" => WorkoutCommand::Yes,
        "no" | "n" => WorkoutCommand::No,
        "quit" | "q" | "exit" => WorkoutCommand::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(command)
}

/// Parse a 1-based number into a 0-based index.
fn position(raw: &str, what: &'static str) -> Result<usize, CommandError> {
    match raw.parse::<usize>() {
        Ok(value) if value >= 1 => Ok(value - 1),
        _ => Err(CommandError::BadNumber {
            what,
            value: raw.to_string(),
        }),
    }
}

fn field_change(raw: &str) -> Result<FieldChange, CommandError> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| CommandError::UnknownField(raw.to_string()))?;
    let change = match name.to_ascii_lowercase().as_str() {
        "kgs" | "kg" => FieldChange::Kgs(value.to_string()),
        "reps" => FieldChange::Reps(value.to_string()),
        "sets" => FieldChange::Sets(value.to_string()),
        "rest" => FieldChange::Rest(value.parse().map_err(|_| CommandError::BadNumber {
            what: "rest",
            value: value.to_string(),
        })?),
        other => return Err(CommandError::UnknownField(other.to_string())),
    };
    Ok(change)
}

fn rest_delta(raw: &str) -> Result<RestDelta, CommandError> {
    match raw {
        "+" => Ok(RestDelta::StepUp),
        "-" => Ok(RestDelta::StepDown),
        _ => raw
            .parse::<i64>()
            .map(RestDelta::Seconds)
            .map_err(|_| CommandError::BadNumber {
                what: "rest delta",
                value: raw.to_string(),
            }),
    }
}

/// Render a snapshot for display. Numbers are 1-based.
pub fn render_snapshot(snapshot: &RoutineSnapshot, ledger: Option<&CompletionLedger>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", snapshot.name);
    for (exercise_index, exercise) in snapshot.exercises.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", exercise_index + 1, exercise.name);
        if exercise.sets.is_empty() {
            let _ = writeln!(out, "   No sets available");
            continue;
        }
        for (set_index, set) in exercise.sets.iter().enumerate() {
            let _ = write!(
                out,
                "   {}) {} kg x {} reps, {} sets left, rest {}s",
                set_index + 1,
                set.kgs,
                set.reps,
                set.sets,
                set.rest
            );
            if set.completed {
                out.push_str(" [done]");
            }
            if let Some(fact) = ledger.and_then(|ledger| ledger.fact(exercise_index, set_index)) {
                let _ = write!(out, " (done {}x)", fact.sets);
            }
            out.push('\n');
        }
    }
    out
}

#[derive(Debug, Clone, Copy)]
pub struct WorkoutOptions {
    pub rest_step_secs: u32,
    /// Timestamp source for `finish`.
    pub now: fn() -> DateTime<Utc>,
}

impl Default for WorkoutOptions {
    fn default() -> Self {
        Self {
            rest_step_secs: 10,
            now: Utc::now,
        }
    }
}

/// How the loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkoutExit {
    Finished { id: String },
    Cancelled,
    /// `quit` or end of input with the session still active. The snapshot
    /// stays in the cache for the next run.
    Suspended,
}

/// A question waiting for `yes` or `no`.
#[derive(Debug)]
enum Pending {
    ZeroDefaults {
        exercise: usize,
        set: usize,
        draft: SetDraft,
    },
    Cancel,
}

/// Read commands from `input` until the session ends or input runs out.
///
/// The controller must already be Active. User mistakes are reported on
/// `output` and the loop continues; only I/O failures on the streams are
/// returned as errors.
pub fn run_workout<S, C, R, W>(
    controller: &mut SessionController<S, C>,
    input: R,
    output: &mut W,
    options: &WorkoutOptions,
) -> Result<WorkoutExit>
where
    S: DocumentStore,
    C: SessionCache,
    R: BufRead,
    W: Write,
{
    if let Some(snapshot) = controller.snapshot() {
        write!(output, "{}", render_snapshot(snapshot, controller.ledger()))
            .context("write workout output")?;
    }
    let mut pending: Option<Pending> = None;
    for line in input.lines() {
        let line = line.context("read workout input")?;
        if line.trim().is_empty() {
            continue;
        }
        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(err) => {
                writeln!(output, "error: {err}").context("write workout output")?;
                continue;
            }
        };
        debug!(?command, "workout command");

        let question = pending.take();
        if !matches!(command, WorkoutCommand::Yes | WorkoutCommand::No) {
            if let Some(Pending::Cancel) = question {
                controller.dismiss_cancel()?;
            }
        }

        let reply = match step(controller, command, question, options) {
            Ok(Step::Reply(message)) => message,
            Ok(Step::Ask(message, next)) => {
                pending = Some(next);
                message
            }
            Ok(Step::Exit(exit, message)) => {
                writeln!(output, "{message}").context("write workout output")?;
                return Ok(exit);
            }
            Err(err) => format!("error: {}", describe_error(&err)),
        };
        writeln!(output, "{reply}").context("write workout output")?;
    }
    if let Some(Pending::Cancel) = pending {
        controller.dismiss_cancel()?;
    }
    Ok(WorkoutExit::Suspended)
}

enum Step {
    Reply(String),
    Ask(String, Pending),
    Exit(WorkoutExit, String),
}

fn step<S: DocumentStore, C: SessionCache>(
    controller: &mut SessionController<S, C>,
    command: WorkoutCommand,
    question: Option<Pending>,
    options: &WorkoutOptions,
) -> Result<Step, SessionError> {
    let reply = match command {
        WorkoutCommand::Show => {
            let snapshot = controller.snapshot().ok_or(SessionError::NotActive)?;
            let mut text = render_snapshot(snapshot, controller.ledger());
            text.truncate(text.trim_end().len());
            Step::Reply(text)
        }
        WorkoutCommand::Help => Step::Reply(HELP.to_string()),
        WorkoutCommand::Done { exercise, set } => {
            match controller.mark_set_complete(exercise, set)? {
                MarkOutcome::AlreadyCompleted => {
                    Step::Reply(format!("set {} of exercise {} is already done", set + 1, exercise + 1))
                }
                MarkOutcome::Recorded {
                    remaining,
                    completed,
                    times_done,
                } => {
                    let status = if completed {
                        "complete".to_string()
                    } else {
                        format!("{remaining} left")
                    };
                    let mut reply = format!("marked ({status}, done {times_done}x)");
                    if controller.snapshot().is_some_and(RoutineSnapshot::is_complete) {
                        reply.push_str("\nall sets done; type 'finish' to save");
                    }
                    Step::Reply(reply)
                }
            }
        }
        WorkoutCommand::Edit {
            exercise,
            set,
            changes,
        } => {
            let snapshot = controller.snapshot().ok_or(SessionError::NotActive)?;
            let current = snapshot
                .exercises
                .get(exercise)
                .ok_or(MutationError::UnknownExercise { exercise })?
                .sets
                .get(set)
                .ok_or(MutationError::UnknownSet { exercise, set })?;
            let mut draft = SetDraft::from_values(current.values());
            for change in changes {
                match change {
                    FieldChange::Kgs(value) => draft.kgs = value,
                    FieldChange::Reps(value) => draft.reps = value,
                    FieldChange::Sets(value) => draft.sets = value,
                    FieldChange::Rest(value) => draft.rest = value,
                }
            }
            match controller.edit_set(exercise, set, &draft, MissingFieldPolicy::Reject) {
                Ok(outcome) => Step::Reply(describe_edit(outcome)),
                Err(SessionError::Validation(ValidationError::Incomplete { missing })) => Step::Ask(
                    format!(
                        "blank: {}. save blank fields as 0? (yes/no)",
                        missing
                            .iter()
                            .map(|field| field.field.to_string())
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                    Pending::ZeroDefaults {
                        exercise,
                        set,
                        draft,
                    },
                ),
                Err(err) => return Err(err),
            }
        }
        WorkoutCommand::Rest {
            exercise,
            set,
            delta,
        } => {
            let step = i64::from(options.rest_step_secs);
            let seconds = match delta {
                RestDelta::StepUp => step,
                RestDelta::StepDown => -step,
                RestDelta::Seconds(seconds) => seconds,
            };
            let rest = controller.adjust_rest(exercise, set, seconds)?;
            Step::Reply(format!("rest {rest}s"))
        }
        WorkoutCommand::Finish => match controller.finish((options.now)())? {
            FinishOutcome::Archived { id } => {
                Step::Exit(WorkoutExit::Finished { id: id.clone() }, format!("saved workout {id}"))
            }
            FinishOutcome::NothingToSave => {
                Step::Reply("nothing to save: no sets were completed".to_string())
            }
        },
        WorkoutCommand::Cancel => {
            controller.request_cancel()?;
            Step::Ask(
                "discard this workout? (yes/no)".to_string(),
                Pending::Cancel,
            )
        }
        WorkoutCommand::Yes => match question {
            Some(Pending::ZeroDefaults {
                exercise,
                set,
                draft,
            }) => {
                let outcome =
                    controller.edit_set(exercise, set, &draft, MissingFieldPolicy::DefaultToZero)?;
                Step::Reply(describe_edit(outcome))
            }
            Some(Pending::Cancel) => {
                controller.confirm_cancel()?;
                Step::Exit(WorkoutExit::Cancelled, "workout discarded".to_string())
            }
            None => Step::Reply("nothing to confirm".to_string()),
        },
        WorkoutCommand::No => match question {
            Some(Pending::ZeroDefaults { .. }) => Step::Reply("edit not saved".to_string()),
            Some(Pending::Cancel) => {
                controller.dismiss_cancel()?;
                Step::Reply("workout continues".to_string())
            }
            None => Step::Reply("nothing to confirm".to_string()),
        },
        WorkoutCommand::Quit => Step::Exit(
            WorkoutExit::Suspended,
            "workout saved; run `liftlog workout` to resume".to_string(),
        ),
    };
    Ok(reply)
}

/// Session errors with positions shown 1-based, as the user typed them.
fn describe_error(err: &SessionError) -> String {
    match err {
        SessionError::Mutation(MutationError::UnknownExercise { exercise }) => {
            format!("exercise {} does not exist", exercise + 1)
        }
        SessionError::Mutation(MutationError::UnknownSet { exercise, set }) => {
            format!("set {} does not exist in exercise {}", set + 1, exercise + 1)
        }
        other => other.to_string(),
    }
}

fn describe_edit(outcome: EditOutcome) -> String {
    match outcome {
        EditOutcome::Replaced { set } => format!("set {} updated", set + 1),
        EditOutcome::Branched { frozen, inserted } => {
            format!("set {} kept as done; new set {} added", frozen + 1, inserted + 1)
        }
    }
}
