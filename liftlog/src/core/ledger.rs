//! Completion ledger: what the lifter actually did during a session.
//!
//! The ledger owns its facts. It never aliases the snapshot's set entries, so
//! the live remaining-count can move independently of the recorded history.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::types::CompletedFact;
use crate::routine::SetEntry;

/// Completed-set facts keyed by exercise index, then set index.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompletionLedger {
    exercises: BTreeMap<usize, LedgerExercise>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerExercise {
    pub name_of_exercise: String,
    pub sets: BTreeMap<usize, CompletedFact>,
}

impl CompletionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.exercises.values().all(|exercise| exercise.sets.is_empty())
    }

    /// Record one execution of `entry` at `(exercise, set)`.
    ///
    /// Creates the fact with `sets = 1` on first sight, otherwise increments
    /// it. Returns the counter after the update.
    pub fn record(
        &mut self,
        exercise: usize,
        exercise_name: &str,
        set: usize,
        entry: &SetEntry,
    ) -> u32 {
        let slot = self
            .exercises
            .entry(exercise)
            .or_insert_with(|| LedgerExercise {
                name_of_exercise: exercise_name.to_string(),
                sets: BTreeMap::new(),
            });
        let fact = slot.sets.entry(set).or_insert(CompletedFact {
            kgs: entry.kgs,
            reps: entry.reps,
            rest: entry.rest,
            sets: 0,
        });
        fact.sets = fact.sets.saturating_add(1);
        fact.sets
    }

    pub fn fact(&self, exercise: usize, set: usize) -> Option<&CompletedFact> {
        self.exercises.get(&exercise)?.sets.get(&set)
    }

    pub fn exercise(&self, exercise: usize) -> Option<&LedgerExercise> {
        self.exercises.get(&exercise)
    }

    /// Iterate exercises in index order.
    pub fn exercises(&self) -> impl Iterator<Item = (usize, &LedgerExercise)> {
        self.exercises.iter().map(|(index, exercise)| (*index, exercise))
    }

    /// Keep facts attached to their set after an entry is inserted at `set + 1`.
    ///
    /// Keys greater than `set` in `exercise` move up by one.
    pub fn shift_sets_after(&mut self, exercise: usize, set: usize) {
        let Some(slot) = self.exercises.get_mut(&exercise) else {
            return;
        };
        slot.sets = std::mem::take(&mut slot.sets)
            .into_iter()
            .map(|(index, fact)| {
                if index > set {
                    (index + 1, fact)
                } else {
                    (index, fact)
                }
            })
            .collect();
    }

    /// Sum of all completion counters.
    pub fn total_completions(&self) -> u32 {
        self.exercises
            .values()
            .flat_map(|exercise| exercise.sets.values())
            .map(|fact| fact.sets)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::set_entry;

    #[test]
    fn record_creates_then_increments() {
        let mut ledger = CompletionLedger::new();
        let entry = set_entry(100.0, 5, 3, 90);

        assert_eq!(ledger.record(0, "Squat", 0, &entry), 1);
        assert_eq!(ledger.record(0, "Squat", 0, &entry), 2);

        let fact = ledger.fact(0, 0).expect("fact");
        assert_eq!(fact.sets, 2);
        assert_eq!(fact.kgs, 100.0);
        assert_eq!(ledger.exercise(0).expect("exercise").name_of_exercise, "Squat");
        assert_eq!(ledger.total_completions(), 2);
    }

    #[test]
    fn shift_moves_only_later_sets() {
        let mut ledger = CompletionLedger::new();
        let entry = set_entry(60.0, 8, 2, 60);
        ledger.record(1, "Row", 0, &entry);
        ledger.record(1, "Row", 2, &entry);
        ledger.record(0, "Squat", 2, &entry);

        ledger.shift_sets_after(1, 0);

        assert!(ledger.fact(1, 0).is_some());
        assert!(ledger.fact(1, 2).is_none());
        assert!(ledger.fact(1, 3).is_some());
        assert!(ledger.fact(0, 2).is_some(), "other exercises untouched");
    }

    #[test]
    fn serializes_with_archive_field_names() {
        let mut ledger = CompletionLedger::new();
        ledger.record(0, "Squat", 0, &set_entry(100.0, 5, 3, 90));
        let json = serde_json::to_value(&ledger).expect("serialize");
        assert_eq!(
            json["exercises"]["0"]["nameOfExercise"],
            serde_json::json!("Squat")
        );
    }
}
