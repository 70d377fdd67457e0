//! Completion aggregator: ledger in, archival document out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::ledger::CompletionLedger;
use crate::core::types::CompletedFact;

/// Final record of a session, written append-only to the document store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedRoutine {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub completed_at: DateTime<Utc>,
    pub exercises: Vec<ArchivedExercise>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedExercise {
    pub name_of_exercise: String,
    pub sets: Vec<CompletedFact>,
}

/// The ledger holds no completed sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("nothing to save: no sets were completed")]
pub struct NothingToSave;

/// Build the archival document for `routine_name` from `ledger`.
///
/// Exercises follow exercise index order and sets follow set index order.
pub fn build_archive(
    routine_name: &str,
    ledger: &CompletionLedger,
    completed_at: DateTime<Utc>,
) -> Result<ArchivedRoutine, NothingToSave> {
    if ledger.is_empty() {
        return Err(NothingToSave);
    }
    let exercises = ledger
        .exercises()
        .filter(|(_, exercise)| !exercise.sets.is_empty())
        .map(|(_, exercise)| ArchivedExercise {
            name_of_exercise: exercise.name_of_exercise.clone(),
            sets: exercise.sets.values().copied().collect(),
        })
        .collect();
    Ok(ArchivedRoutine {
        name: routine_name.to_string(),
        notes: None,
        completed_at,
        exercises,
    })
}
