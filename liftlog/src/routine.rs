//! In-memory working copy of a routine during a session.

use serde::{Deserialize, Serialize};

use crate::core::types::SetValues;

/// A routine as loaded for a session: name plus exercises in authoring order.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RoutineSnapshot {
    pub name: String,
    pub exercises: Vec<ExerciseEntry>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExerciseEntry {
    pub name: String,
    /// Missing in the source document means "no sets available".
    #[serde(default)]
    pub sets: Vec<SetEntry>,
}

/// One set-group of an exercise. `sets` is the remaining count.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct SetEntry {
    pub kgs: f64,
    pub reps: u32,
    pub sets: u32,
    pub rest: u32,
    #[serde(default)]
    pub completed: bool,
}

impl SetEntry {
    pub fn pending(values: SetValues) -> Self {
        Self {
            kgs: values.kgs,
            reps: values.reps,
            sets: values.sets,
            rest: values.rest,
            completed: false,
        }
    }

    pub fn values(&self) -> SetValues {
        SetValues {
            kgs: self.kgs,
            reps: self.reps,
            sets: self.sets,
            rest: self.rest,
        }
    }
}

impl RoutineSnapshot {
    pub fn set(&self, exercise: usize, set: usize) -> Option<&SetEntry> {
        self.exercises.get(exercise)?.sets.get(set)
    }

    /// Total number of set entries across all exercises.
    pub fn set_count(&self) -> usize {
        self.exercises.iter().map(|exercise| exercise.sets.len()).sum()
    }

    /// True when every set entry of every exercise is completed.
    pub fn is_complete(&self) -> bool {
        self.exercises
            .iter()
            .flat_map(|exercise| exercise.sets.iter())
            .all(|set| set.completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_sets_deserialize_as_empty() {
        let raw = r#"{"name":"Leg Day","exercises":[{"name":"Squat"}]}"#;
        let snapshot: RoutineSnapshot = serde_json::from_str(raw).expect("parse");
        assert!(snapshot.exercises[0].sets.is_empty());
        assert_eq!(snapshot.set_count(), 0);
    }

    #[test]
    fn missing_completed_defaults_to_pending() {
        let raw = r#"{"kgs":100,"reps":5,"sets":3,"rest":90}"#;
        let set: SetEntry = serde_json::from_str(raw).expect("parse");
        assert!(!set.completed);
        assert_eq!(set.kgs, 100.0);
    }
}
