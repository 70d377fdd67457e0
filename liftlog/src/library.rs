//! Routine library: selecting, importing, editing, and logging routines.
//!
//! These functions coordinate the document store with core validation. All of
//! them take the user id explicitly and stay scoped to the routine they were
//! given.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::aggregator::{ArchivedExercise, ArchivedRoutine};
use crate::core::calendar::{CalendarEntry, group_by_day, start_of_day};
use crate::core::set_input::{SetDraft, ValidationError, resolve_all};
use crate::core::types::{CompletedFact, MissingFieldPolicy, SetValues};
use crate::io::document_store::{
    DocumentStore, ExerciseDoc, ExerciseImport, RoutineDoc, RoutineSummary, StoreError,
};
use crate::io::routine_import::load_import;
use crate::routine::{ExerciseEntry, RoutineSnapshot, SetEntry};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LibraryError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("routine name must not be blank")]
    BlankName,
    #[error("exercise name must not be blank")]
    BlankExerciseName,
    #[error("position {position} is out of range for {count} exercises")]
    PositionOutOfRange { position: usize, count: usize },
}

pub fn list_routines<S: DocumentStore>(
    store: &S,
    user_id: &str,
) -> Result<Vec<RoutineSummary>, StoreError> {
    store.load_user_routines(user_id)
}

/// Load a routine and its exercises as a fresh session snapshot.
pub fn load_snapshot<S: DocumentStore>(
    store: &S,
    user_id: &str,
    routine_id: &str,
) -> Result<RoutineSnapshot, StoreError> {
    let routine = store.load_routine(user_id, routine_id)?;
    let exercises = store.load_exercises(user_id, routine_id)?;
    debug!(routine_id, exercises = exercises.len(), "routine loaded for session");
    Ok(snapshot_from_docs(routine, exercises))
}

/// Build a snapshot with every set pending. Exercises without sets stay empty.
pub fn snapshot_from_docs(routine: RoutineDoc, exercises: Vec<ExerciseDoc>) -> RoutineSnapshot {
    RoutineSnapshot {
        name: routine.name,
        exercises: exercises
            .into_iter()
            .map(|exercise| ExerciseEntry {
                name: exercise.name,
                sets: exercise
                    .sets
                    .unwrap_or_default()
                    .into_iter()
                    .map(SetEntry::pending)
                    .collect(),
            })
            .collect(),
    }
}

/// Validate an import file and create the routine. Returns the new id.
pub fn import_routine<S: DocumentStore>(
    store: &S,
    user_id: &str,
    path: &Path,
) -> anyhow::Result<String> {
    let routine = load_import(path)?;
    let id = store
        .create_routine(user_id, &routine)
        .with_context(|| format!("store routine '{}'", routine.name))?;
    Ok(id)
}

/// Save the planned sets of one library exercise.
///
/// With [`MissingFieldPolicy::Reject`], blank fields fail the save and nothing
/// is written; retrying with [`MissingFieldPolicy::DefaultToZero`] saves them
/// as 0 for the same routine and user.
pub fn save_exercise_sets<S: DocumentStore>(
    store: &S,
    user_id: &str,
    routine_id: &str,
    exercise_id: &str,
    drafts: &[SetDraft],
    policy: MissingFieldPolicy,
) -> Result<Vec<SetValues>, LibraryError> {
    let sets = resolve_all(drafts, policy)?;
    let exercise = store
        .load_exercises(user_id, routine_id)?
        .into_iter()
        .find(|exercise| exercise.id == exercise_id)
        .ok_or_else(|| StoreError::NotFound {
            kind: "exercise",
            id: exercise_id.to_string(),
        })?;
    store.update_exercise(user_id, routine_id, exercise_id, &exercise.name, &sets)?;
    info!(routine_id, exercise_id, sets = sets.len(), "exercise sets saved");
    Ok(sets)
}

/// Rewrite exercise positions to match `ordered_ids`.
///
/// Every position update is attempted; the first failure is returned after
/// the rest have been tried.
pub fn reorder_exercises<S: DocumentStore>(
    store: &S,
    user_id: &str,
    routine_id: &str,
    ordered_ids: &[String],
) -> Result<(), StoreError> {
    let mut first_error = None;
    for (position, exercise_id) in ordered_ids.iter().enumerate() {
        let position = u32::try_from(position).unwrap_or(u32::MAX);
        if let Err(err) = store.update_exercise_position(user_id, routine_id, exercise_id, position)
        {
            warn!(routine_id, exercise_id = %exercise_id, error = %err, "exercise position update failed");
            first_error.get_or_insert(err);
        }
    }
    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Move one exercise to `position` (0-based) and persist the new order.
///
/// Returns the exercise ids in their new order.
pub fn move_exercise<S: DocumentStore>(
    store: &S,
    user_id: &str,
    routine_id: &str,
    exercise_id: &str,
    position: usize,
) -> Result<Vec<String>, LibraryError> {
    let mut ids: Vec<String> = store
        .load_exercises(user_id, routine_id)?
        .into_iter()
        .map(|exercise| exercise.id)
        .collect();
    let current = ids
        .iter()
        .position(|id| id == exercise_id)
        .ok_or_else(|| StoreError::NotFound {
            kind: "exercise",
            id: exercise_id.to_string(),
        })?;
    if position >= ids.len() {
        return Err(LibraryError::PositionOutOfRange {
            position,
            count: ids.len(),
        });
    }
    let moved = ids.remove(current);
    ids.insert(position, moved);
    reorder_exercises(store, user_id, routine_id, &ids)?;
    Ok(ids)
}

pub fn rename_routine<S: DocumentStore>(
    store: &S,
    user_id: &str,
    routine_id: &str,
    name: &str,
) -> Result<(), LibraryError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(LibraryError::BlankName);
    }
    store.rename_routine(user_id, routine_id, name)?;
    Ok(())
}

/// Delete a routine from the library. Sessions already archived from it stay
/// on the calendar.
pub fn delete_routine<S: DocumentStore>(
    store: &S,
    user_id: &str,
    routine_id: &str,
) -> Result<(), StoreError> {
    store.delete_routine(user_id, routine_id)?;
    info!(user_id, routine_id, "routine deleted");
    Ok(())
}

/// Append an exercise to an existing routine. Returns the new exercise id.
pub fn add_exercise<S: DocumentStore>(
    store: &S,
    user_id: &str,
    routine_id: &str,
    exercise: &ExerciseImport,
) -> Result<String, LibraryError> {
    let name = exercise.name.trim();
    if name.is_empty() {
        return Err(LibraryError::BlankExerciseName);
    }
    let exercise = ExerciseImport {
        name: name.to_string(),
        ..exercise.clone()
    };
    let id = store.add_exercise(user_id, routine_id, &exercise)?;
    info!(user_id, routine_id, exercise_id = %id, exercise = %exercise.name, "exercise added");
    Ok(id)
}

/// Log a library routine as done on `day`, with its planned sets.
pub fn log_routine_for_day<S: DocumentStore>(
    store: &S,
    user_id: &str,
    routine_id: &str,
    day: NaiveDate,
) -> Result<String, StoreError> {
    let routine = store.load_routine(user_id, routine_id)?;
    let exercises = store.load_exercises(user_id, routine_id)?;
    let archived = ArchivedRoutine {
        name: routine.name,
        notes: routine.notes,
        completed_at: start_of_day(day),
        exercises: exercises
            .into_iter()
            .map(|exercise| ArchivedExercise {
                name_of_exercise: exercise.name,
                sets: exercise
                    .sets
                    .unwrap_or_default()
                    .into_iter()
                    .map(|values| CompletedFact {
                        kgs: values.kgs,
                        reps: values.reps,
                        rest: values.rest,
                        sets: values.sets,
                    })
                    .collect(),
            })
            .collect(),
    };
    store.archive_completed_routine(user_id, &archived)
}

/// Archived sessions of the user grouped by day.
pub fn calendar<S: DocumentStore>(
    store: &S,
    user_id: &str,
) -> Result<BTreeMap<NaiveDate, Vec<CalendarEntry>>, StoreError> {
    let completed = store.load_completed_routines(user_id)?;
    Ok(group_by_day(&completed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::SetField;
    use crate::core::set_input::MissingField;
    use crate::test_support::{MemoryDocumentStore, leg_day_import};

    fn seeded() -> (MemoryDocumentStore, String) {
        let store = MemoryDocumentStore::new();
        let id = store
            .create_routine("ana", &leg_day_import())
            .expect("create");
        (store, id)
    }

    #[test]
    fn load_snapshot_builds_pending_sets() {
        let (store, id) = seeded();
        let snapshot = load_snapshot(&store, "ana", &id).expect("snapshot");

        assert_eq!(snapshot.name, "Leg Day");
        assert_eq!(snapshot.exercises[0].sets.len(), 1);
        assert!(!snapshot.exercises[0].sets[0].completed);
        assert!(snapshot.exercises[1].sets.is_empty(), "no sets available");
    }

    #[test]
    fn load_snapshot_surfaces_not_found() {
        let store = MemoryDocumentStore::new();
        assert!(matches!(
            load_snapshot(&store, "ana", "missing"),
            Err(StoreError::NotFound { kind: "routine", .. })
        ));
    }

    #[test]
    fn save_exercise_rejects_blanks_then_saves_zeros_on_confirm() {
        let (store, id) = seeded();
        let drafts = vec![SetDraft {
            kgs: "20".to_string(),
            reps: String::new(),
            sets: "3".to_string(),
            rest: 60,
        }];

        let err = save_exercise_sets(&store, "ana", &id, "ex-2", &drafts, MissingFieldPolicy::Reject)
            .unwrap_err();
        assert_eq!(
            err,
            LibraryError::Validation(ValidationError::Incomplete {
                missing: vec![MissingField {
                    set_index: 0,
                    field: SetField::Reps,
                }],
            })
        );
        assert_eq!(store.load_exercises("ana", &id).expect("load")[1].sets, None);

        let saved = save_exercise_sets(
            &store,
            "ana",
            &id,
            "ex-2",
            &drafts,
            MissingFieldPolicy::DefaultToZero,
        )
        .expect("save");
        assert_eq!(saved[0].reps, 0);
        let stored = store.load_exercises("ana", &id).expect("load");
        assert_eq!(stored[1].sets.as_deref(), Some(saved.as_slice()));
        assert_eq!(stored[1].name, "Lunge");
    }

    #[test]
    fn move_exercise_rewrites_positions() {
        let (store, id) = seeded();
        let order = move_exercise(&store, "ana", &id, "ex-2", 0).expect("move");
        assert_eq!(order, vec!["ex-2".to_string(), "ex-1".to_string()]);

        let names: Vec<String> = store
            .load_exercises("ana", &id)
            .expect("load")
            .into_iter()
            .map(|exercise| exercise.name)
            .collect();
        assert_eq!(names, vec!["Lunge", "Squat"]);

        assert_eq!(
            move_exercise(&store, "ana", &id, "ex-2", 5),
            Err(LibraryError::PositionOutOfRange {
                position: 5,
                count: 2,
            })
        );
    }

    #[test]
    fn reorder_reports_failed_position_write() {
        let (store, id) = seeded();
        store.fail_writes(true);
        let err = reorder_exercises(&store, "ana", &id, &["ex-1".to_string()]).unwrap_err();
        assert!(matches!(err, StoreError::Write { .. }));
    }

    #[test]
    fn rename_rejects_blank_names() {
        let (store, id) = seeded();
        assert_eq!(
            rename_routine(&store, "ana", &id, "  "),
            Err(LibraryError::BlankName)
        );
        rename_routine(&store, "ana", &id, " Legs ").expect("rename");
        assert_eq!(store.load_routine("ana", &id).expect("load").name, "Legs");
    }

    fn bench_press() -> ExerciseImport {
        ExerciseImport {
            name: " Bench Press ".to_string(),
            kind: "strength".to_string(),
            muscle: "chest".to_string(),
            equipment: "barbell".to_string(),
            instructions: "Lower to the chest, press up.".to_string(),
            sets: None,
        }
    }

    #[test]
    fn added_exercise_shows_last_in_the_next_snapshot() {
        let (store, id) = seeded();

        let exercise_id = add_exercise(&store, "ana", &id, &bench_press()).expect("add");

        assert_eq!(exercise_id, "ex-3");
        let snapshot = load_snapshot(&store, "ana", &id).expect("snapshot");
        let names: Vec<&str> = snapshot.exercises.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Squat", "Lunge", "Bench Press"]);
        assert!(snapshot.exercises[2].sets.is_empty());
    }

    #[test]
    fn add_exercise_rejects_blank_name_and_unknown_routine() {
        let (store, id) = seeded();
        let blank = ExerciseImport {
            name: "  ".to_string(),
            ..bench_press()
        };
        assert_eq!(
            add_exercise(&store, "ana", &id, &blank),
            Err(LibraryError::BlankExerciseName)
        );
        assert!(matches!(
            add_exercise(&store, "ana", "routine-404", &bench_press()),
            Err(LibraryError::Store(StoreError::NotFound { kind: "routine", .. }))
        ));
        assert_eq!(store.load_exercises("ana", &id).expect("exercises").len(), 2);
    }

    #[test]
    fn deleted_routine_leaves_library_but_not_calendar() {
        let (store, id) = seeded();
        let day = NaiveDate::from_ymd_opt(2026, 3, 2).expect("date");
        log_routine_for_day(&store, "ana", &id, day).expect("log");

        delete_routine(&store, "ana", &id).expect("delete");

        assert!(list_routines(&store, "ana").expect("list").is_empty());
        assert!(matches!(
            load_snapshot(&store, "ana", &id),
            Err(StoreError::NotFound { .. })
        ));
        assert_eq!(calendar(&store, "ana").expect("calendar").len(), 1);
        assert!(matches!(
            delete_routine(&store, "ana", &id),
            Err(StoreError::NotFound { kind: "routine", .. })
        ));
    }

    #[test]
    fn delete_is_scoped_to_the_user() {
        let (store, id) = seeded();
        assert!(matches!(
            delete_routine(&store, "ben", &id),
            Err(StoreError::NotFound { .. })
        ));
        assert_eq!(list_routines(&store, "ana").expect("list").len(), 1);
    }

    #[test]
    fn logged_routine_appears_on_its_day() {
        let (store, id) = seeded();
        let day = NaiveDate::from_ymd_opt(2026, 3, 2).expect("date");

        log_routine_for_day(&store, "ana", &id, day).expect("log");

        let days = calendar(&store, "ana").expect("calendar");
        let entries = days.get(&day).expect("entries");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "Leg Day");

        let archived = store.load_completed_routines("ana").expect("completed");
        assert_eq!(archived[0].exercises[0].sets[0].sets, 3);
        assert!(archived[0].exercises[1].sets.is_empty());
    }
}
