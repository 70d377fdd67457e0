//! Semantic checks for snapshots that arrive from outside the session.

use crate::routine::RoutineSnapshot;

/// Check invariants that serde alone cannot express:
/// - routine and exercise names are non-blank
/// - `kgs` is finite and non-negative
///
/// Returns one message per violation, empty when the snapshot is sound.
pub fn validate_snapshot(snapshot: &RoutineSnapshot) -> Vec<String> {
    let mut errors = Vec::new();
    if snapshot.name.trim().is_empty() {
        errors.push("routine name must not be blank".to_string());
    }
    for (exercise_index, exercise) in snapshot.exercises.iter().enumerate() {
        if exercise.name.trim().is_empty() {
            errors.push(format!("exercise {}: name must not be blank", exercise_index));
        }
        for (set_index, set) in exercise.sets.iter().enumerate() {
            if !set.kgs.is_finite() || set.kgs < 0.0 {
                errors.push(format!(
                    "exercise {} set {}: kgs {} must be a non-negative number",
                    exercise_index, set_index, set.kgs
                ));
            }
        }
    }
    errors
}
