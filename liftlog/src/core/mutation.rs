//! Set mutation engine: edits, completions, and rest adjustments.
//!
//! Every operation mutates the snapshot in place and synchronously. Callers
//! persist the snapshot afterwards; nothing here performs I/O.

use thiserror::Error;

use crate::core::ledger::CompletionLedger;
use crate::core::types::{EditOutcome, MarkOutcome, SetValues};
use crate::routine::{RoutineSnapshot, SetEntry};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MutationError {
    #[error("exercise {exercise} does not exist")]
    UnknownExercise { exercise: usize },
    #[error("set {set} does not exist in exercise {exercise}")]
    UnknownSet { exercise: usize, set: usize },
}

/// Apply an edit to the set at `(exercise, set)`.
///
/// Unchanged values reset the entry to pending in place. Changed values freeze
/// the current entry as completed and insert a pending entry with the new
/// values at `set + 1`; ledger facts for later sets move with their entries.
pub fn edit_set(
    snapshot: &mut RoutineSnapshot,
    ledger: &mut CompletionLedger,
    exercise: usize,
    set: usize,
    values: SetValues,
) -> Result<EditOutcome, MutationError> {
    let entry = set_mut(snapshot, exercise, set)?;

    if entry.values() == values {
        *entry = SetEntry::pending(values);
        return Ok(EditOutcome::Replaced { set });
    }

    entry.completed = true;
    snapshot.exercises[exercise]
        .sets
        .insert(set + 1, SetEntry::pending(values));
    ledger.shift_sets_after(exercise, set);
    Ok(EditOutcome::Branched {
        frozen: set,
        inserted: set + 1,
    })
}

/// Mark one execution of the set at `(exercise, set)`.
///
/// Completed sets are left alone. Otherwise the remaining count drops by one
/// (floor 0), the set completes when it reaches 0, and the ledger counter for
/// the set is incremented either way.
pub fn mark_set_complete(
    snapshot: &mut RoutineSnapshot,
    ledger: &mut CompletionLedger,
    exercise: usize,
    set: usize,
) -> Result<MarkOutcome, MutationError> {
    let exercise_name = snapshot
        .exercises
        .get(exercise)
        .map(|entry| entry.name.clone())
        .ok_or(MutationError::UnknownExercise { exercise })?;
    let entry = set_mut(snapshot, exercise, set)?;
    if entry.completed {
        return Ok(MarkOutcome::AlreadyCompleted);
    }

    let recorded = *entry;
    entry.sets = entry.sets.saturating_sub(1);
    let completed = entry.sets == 0;
    if completed {
        entry.completed = true;
    }
    let remaining = entry.sets;

    let times_done = ledger.record(exercise, &exercise_name, set, &recorded);
    Ok(MarkOutcome::Recorded {
        remaining,
        completed,
        times_done,
    })
}

/// Shift the rest of `(exercise, set)` by `delta` seconds, floored at 0.
pub fn adjust_rest(
    snapshot: &mut RoutineSnapshot,
    exercise: usize,
    set: usize,
    delta: i64,
) -> Result<u32, MutationError> {
    let entry = set_mut(snapshot, exercise, set)?;
    let next = (i64::from(entry.rest) + delta).clamp(0, i64::from(u32::MAX));
    entry.rest = u32::try_from(next).unwrap_or(u32::MAX);
    Ok(entry.rest)
}

fn set_mut(
    snapshot: &mut RoutineSnapshot,
    exercise: usize,
    set: usize,
) -> Result<&mut SetEntry, MutationError> {
    snapshot
        .exercises
        .get_mut(exercise)
        .ok_or(MutationError::UnknownExercise { exercise })?
        .sets
        .get_mut(set)
        .ok_or(MutationError::UnknownSet { exercise, set })
}
