//! Routine import files: schema validation + invariants before they reach the store.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use jsonschema::validator_for;
use serde_json::Value;

use super::document_store::RoutineImport;
use crate::core::invariants::validate_snapshot;
use crate::routine::{ExerciseEntry, RoutineSnapshot, SetEntry};

const IMPORT_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/schemas/routine_import.v1.schema.json"
));

/// Load and validate a routine import file (schema + invariants).
pub fn load_import(path: &Path) -> Result<RoutineImport> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read import {}", path.display()))?;
    parse_import(&contents).with_context(|| format!("import {}", path.display()))
}

/// Validate raw JSON text as a routine import.
pub fn parse_import(contents: &str) -> Result<RoutineImport> {
    let value: Value = serde_json::from_str(contents).context("parse routine json")?;
    validate_schema(&value)?;
    let routine: RoutineImport =
        serde_json::from_value(value).context("deserialize routine import")?;
    let errors = validate_snapshot(&preview(&routine));
    if !errors.is_empty() {
        return Err(anyhow!("routine invariants failed: {}", errors.join("; ")));
    }
    Ok(routine)
}

/// The snapshot a session would see if this routine were selected.
fn preview(routine: &RoutineImport) -> RoutineSnapshot {
    RoutineSnapshot {
        name: routine.name.clone(),
        exercises: routine
            .exercises
            .iter()
            .map(|exercise| ExerciseEntry {
                name: exercise.name.clone(),
                sets: exercise
                    .sets
                    .iter()
                    .flatten()
                    .map(|values| SetEntry::pending(*values))
                    .collect(),
            })
            .collect(),
    }
}

fn validate_schema(routine: &Value) -> Result<()> {
    let schema: Value = serde_json::from_str(IMPORT_SCHEMA).context("parse import schema")?;
    let compiled = validator_for(&schema).map_err(|err| anyhow!("invalid schema: {}", err))?;
    let messages = compiled
        .iter_errors(routine)
        .map(|err| err.to_string())
        .collect::<Vec<_>>();
    if !messages.is_empty() {
        return Err(anyhow!(
            "routine schema validation failed: {}",
            messages.join("; ")
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEG_DAY: &str = r#"{
        "name": "Leg Day",
        "exercises": [
            {"name": "Squat", "type": "strength", "muscle": "quadriceps",
             "sets": [{"kgs": 100, "reps": 5, "sets": 3, "rest": 90}]},
            {"name": "Calf Raise"}
        ]
    }"#;

    #[test]
    fn parses_valid_import() {
        let routine = parse_import(LEG_DAY).expect("import");
        assert_eq!(routine.name, "Leg Day");
        assert_eq!(routine.exercises[0].kind, "strength");
        assert_eq!(routine.exercises[1].sets, None);
    }

    #[test]
    fn schema_rejects_negative_weight_and_unknown_fields() {
        let err = parse_import(
            r#"{"name":"X","exercises":[{"name":"Squat","sets":[{"kgs":-1,"reps":5,"sets":3,"rest":90}]}]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("schema validation failed"));

        let err = parse_import(r#"{"name":"X","exercises":[],"owner":"ana"}"#).unwrap_err();
        assert!(err.to_string().contains("schema validation failed"));
    }

    #[test]
    fn invariants_reject_blank_names() {
        let err = parse_import(r#"{"name":"   ","exercises":[]}"#).unwrap_err();
        assert!(err.to_string().contains("routine invariants failed"));
    }

    #[test]
    fn load_import_names_the_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("leg_day.json");
        fs::write(&path, "not json").expect("write");
        let err = load_import(&path).unwrap_err();
        assert!(format!("{err:#}").contains("leg_day.json"));
    }
}
