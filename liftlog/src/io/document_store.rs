//! Document store abstraction for routines, archived sessions, and profiles.
//!
//! The [`DocumentStore`] trait stands in for the hosted backend. Every call
//! takes the user id explicitly; there is no ambient "current user".
//! [`JsonDocumentStore`] keeps one JSON document per routine, per archived
//! session and per profile under `.liftlog/store/users/<user>/`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use super::json_file::{read_json, write_json};
use crate::core::aggregator::ArchivedRoutine;
use crate::core::profile::UserProfile;
use crate::core::types::SetValues;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },
    #[error("write failed for {what}: {reason}")]
    Write { what: String, reason: String },
    #[error("corrupt document {what}: {reason}")]
    Corrupt { what: String, reason: String },
    #[error("invalid id '{0}': only ASCII letters, digits, '-' and '_' are allowed")]
    InvalidId(String),
}

/// Routine header document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutineDoc {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Library exercise inside a routine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseDoc {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub muscle: String,
    #[serde(default)]
    pub equipment: String,
    #[serde(default)]
    pub instructions: String,
    /// Display order within the routine.
    #[serde(default)]
    pub position: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sets: Option<Vec<SetValues>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutineSummary {
    pub id: String,
    pub name: String,
}

/// A routine to create, before the store assigns ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutineImport {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub exercises: Vec<ExerciseImport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseImport {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub muscle: String,
    #[serde(default)]
    pub equipment: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sets: Option<Vec<SetValues>>,
}

/// Abstraction over the document backend.
pub trait DocumentStore {
    fn load_routine(&self, user_id: &str, routine_id: &str) -> Result<RoutineDoc, StoreError>;

    /// Exercises of a routine ordered by `position`.
    fn load_exercises(&self, user_id: &str, routine_id: &str)
    -> Result<Vec<ExerciseDoc>, StoreError>;

    /// Append an archived session. Returns the new document id.
    fn archive_completed_routine(
        &self,
        user_id: &str,
        routine: &ArchivedRoutine,
    ) -> Result<String, StoreError>;

    fn load_user_routines(&self, user_id: &str) -> Result<Vec<RoutineSummary>, StoreError>;

    /// Archived sessions ordered by `completed_at`.
    fn load_completed_routines(&self, user_id: &str) -> Result<Vec<ArchivedRoutine>, StoreError>;

    /// Create a routine; exercises get ids and positions in list order.
    fn create_routine(&self, user_id: &str, routine: &RoutineImport) -> Result<String, StoreError>;

    fn update_exercise(
        &self,
        user_id: &str,
        routine_id: &str,
        exercise_id: &str,
        name: &str,
        sets: &[SetValues],
    ) -> Result<(), StoreError>;

    fn update_exercise_position(
        &self,
        user_id: &str,
        routine_id: &str,
        exercise_id: &str,
        position: u32,
    ) -> Result<(), StoreError>;

    fn rename_routine(&self, user_id: &str, routine_id: &str, name: &str)
    -> Result<(), StoreError>;

    /// Remove a routine and its exercises. Archived sessions are kept.
    fn delete_routine(&self, user_id: &str, routine_id: &str) -> Result<(), StoreError>;

    /// Append an exercise after the last one. Returns the new exercise id.
    fn add_exercise(
        &self,
        user_id: &str,
        routine_id: &str,
        exercise: &ExerciseImport,
    ) -> Result<String, StoreError>;

    fn load_user_profile(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError>;

    fn store_user_profile(&self, user_id: &str, profile: &UserProfile) -> Result<(), StoreError>;
}

/// The first `ex-N` id not taken by `exercises`.
pub fn next_exercise_id(exercises: &[ExerciseDoc]) -> String {
    (exercises.len() + 1..)
        .map(|n| format!("ex-{n}"))
        .find(|id| exercises.iter().all(|exercise| &exercise.id != id))
        .unwrap_or_default()
}

/// One past the highest position, so a new exercise sorts last.
pub fn next_position(exercises: &[ExerciseDoc]) -> u32 {
    exercises
        .iter()
        .map(|exercise| exercise.position.saturating_add(1))
        .max()
        .unwrap_or(0)
}

impl ExerciseDoc {
    pub fn from_import(id: String, position: u32, exercise: &ExerciseImport) -> Self {
        Self {
            id,
            name: exercise.name.clone(),
            kind: exercise.kind.clone(),
            muscle: exercise.muscle.clone(),
            equipment: exercise.equipment.clone(),
            instructions: exercise.instructions.clone(),
            position,
            sets: exercise.sets.clone(),
        }
    }
}

/// Reject ids that could escape the store directory.
pub fn validate_id(id: &str) -> Result<(), StoreError> {
    if id.is_empty()
        || !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(StoreError::InvalidId(id.to_string()));
    }
    Ok(())
}

/// Routine document as stored on disk: header plus embedded exercises.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredRoutine {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
    #[serde(default)]
    exercises: Vec<ExerciseDoc>,
}

/// Document store backed by JSON files in a directory.
#[derive(Debug, Clone)]
pub struct JsonDocumentStore {
    root: PathBuf,
}

impl JsonDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn user_dir(&self, user_id: &str) -> Result<PathBuf, StoreError> {
        validate_id(user_id)?;
        Ok(self.root.join("users").join(user_id))
    }

    fn routine_path(&self, user_id: &str, routine_id: &str) -> Result<PathBuf, StoreError> {
        validate_id(routine_id)?;
        Ok(self
            .user_dir(user_id)?
            .join("routines")
            .join(format!("{routine_id}.json")))
    }

    fn load_stored(&self, user_id: &str, routine_id: &str) -> Result<StoredRoutine, StoreError> {
        let path = self.routine_path(user_id, routine_id)?;
        if !path.exists() {
            return Err(StoreError::NotFound {
                kind: "routine",
                id: routine_id.to_string(),
            });
        }
        read_json(&path).map_err(|err| corrupt(&path, &err))
    }

    fn write_stored(
        &self,
        user_id: &str,
        routine_id: &str,
        routine: &StoredRoutine,
    ) -> Result<(), StoreError> {
        let path = self.routine_path(user_id, routine_id)?;
        write_json(&path, routine).map_err(|err| write_failed(&path, &err))
    }

    fn modify_exercise(
        &self,
        user_id: &str,
        routine_id: &str,
        exercise_id: &str,
        apply: impl FnOnce(&mut ExerciseDoc),
    ) -> Result<(), StoreError> {
        let mut stored = self.load_stored(user_id, routine_id)?;
        let exercise = stored
            .exercises
            .iter_mut()
            .find(|exercise| exercise.id == exercise_id)
            .ok_or_else(|| StoreError::NotFound {
                kind: "exercise",
                id: exercise_id.to_string(),
            })?;
        apply(exercise);
        self.write_stored(user_id, routine_id, &stored)
    }
}

impl DocumentStore for JsonDocumentStore {
    fn load_routine(&self, user_id: &str, routine_id: &str) -> Result<RoutineDoc, StoreError> {
        let stored = self.load_stored(user_id, routine_id)?;
        Ok(RoutineDoc {
            name: stored.name,
            notes: stored.notes,
        })
    }

    fn load_exercises(
        &self,
        user_id: &str,
        routine_id: &str,
    ) -> Result<Vec<ExerciseDoc>, StoreError> {
        let mut exercises = self.load_stored(user_id, routine_id)?.exercises;
        exercises.sort_by_key(|exercise| exercise.position);
        Ok(exercises)
    }

    fn archive_completed_routine(
        &self,
        user_id: &str,
        routine: &ArchivedRoutine,
    ) -> Result<String, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        let path = self
            .user_dir(user_id)?
            .join("completed")
            .join(format!("{id}.json"));
        write_json(&path, routine).map_err(|err| write_failed(&path, &err))?;
        info!(user_id, id = %id, routine = %routine.name, "archived completed routine");
        Ok(id)
    }

    fn load_user_routines(&self, user_id: &str) -> Result<Vec<RoutineSummary>, StoreError> {
        let dir = self.user_dir(user_id)?.join("routines");
        let mut routines = Vec::new();
        for path in json_files(&dir)? {
            let Some(id) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            let stored: StoredRoutine = read_json(&path).map_err(|err| corrupt(&path, &err))?;
            routines.push(RoutineSummary {
                id: id.to_string(),
                name: stored.name,
            });
        }
        routines.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(routines)
    }

    fn load_completed_routines(&self, user_id: &str) -> Result<Vec<ArchivedRoutine>, StoreError> {
        let dir = self.user_dir(user_id)?.join("completed");
        let mut completed = Vec::new();
        for path in json_files(&dir)? {
            let routine: ArchivedRoutine = read_json(&path).map_err(|err| corrupt(&path, &err))?;
            completed.push(routine);
        }
        completed.sort_by_key(|routine| routine.completed_at);
        Ok(completed)
    }

    fn create_routine(&self, user_id: &str, routine: &RoutineImport) -> Result<String, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        let exercises = routine
            .exercises
            .iter()
            .enumerate()
            .map(|(position, exercise)| {
                ExerciseDoc::from_import(
                    format!("ex-{}", position + 1),
                    u32::try_from(position).unwrap_or(u32::MAX),
                    exercise,
                )
            })
            .collect();
        let stored = StoredRoutine {
            name: routine.name.clone(),
            notes: routine.notes.clone(),
            exercises,
        };
        self.write_stored(user_id, &id, &stored)?;
        info!(user_id, id = %id, routine = %routine.name, "created routine");
        Ok(id)
    }

    fn update_exercise(
        &self,
        user_id: &str,
        routine_id: &str,
        exercise_id: &str,
        name: &str,
        sets: &[SetValues],
    ) -> Result<(), StoreError> {
        debug!(user_id, routine_id, exercise_id, sets = sets.len(), "updating exercise");
        self.modify_exercise(user_id, routine_id, exercise_id, |exercise| {
            exercise.name = name.to_string();
            exercise.sets = Some(sets.to_vec());
        })
    }

    fn update_exercise_position(
        &self,
        user_id: &str,
        routine_id: &str,
        exercise_id: &str,
        position: u32,
    ) -> Result<(), StoreError> {
        debug!(user_id, routine_id, exercise_id, position, "updating exercise position");
        self.modify_exercise(user_id, routine_id, exercise_id, |exercise| {
            exercise.position = position;
        })
    }

    fn rename_routine(
        &self,
        user_id: &str,
        routine_id: &str,
        name: &str,
    ) -> Result<(), StoreError> {
        let mut stored = self.load_stored(user_id, routine_id)?;
        stored.name = name.to_string();
        self.write_stored(user_id, routine_id, &stored)
    }

    fn delete_routine(&self, user_id: &str, routine_id: &str) -> Result<(), StoreError> {
        let path = self.routine_path(user_id, routine_id)?;
        if !path.exists() {
            return Err(StoreError::NotFound {
                kind: "routine",
                id: routine_id.to_string(),
            });
        }
        fs::remove_file(&path).map_err(|err| StoreError::Write {
            what: path.display().to_string(),
            reason: err.to_string(),
        })?;
        info!(user_id, routine_id, "deleted routine");
        Ok(())
    }

    fn add_exercise(
        &self,
        user_id: &str,
        routine_id: &str,
        exercise: &ExerciseImport,
    ) -> Result<String, StoreError> {
        let mut stored = self.load_stored(user_id, routine_id)?;
        let id = next_exercise_id(&stored.exercises);
        let position = next_position(&stored.exercises);
        stored
            .exercises
            .push(ExerciseDoc::from_import(id.clone(), position, exercise));
        self.write_stored(user_id, routine_id, &stored)?;
        debug!(user_id, routine_id, exercise_id = %id, position, "added exercise");
        Ok(id)
    }

    fn load_user_profile(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        let path = self.user_dir(user_id)?.join("profile.json");
        if !path.exists() {
            return Ok(None);
        }
        read_json(&path).map(Some).map_err(|err| corrupt(&path, &err))
    }

    fn store_user_profile(&self, user_id: &str, profile: &UserProfile) -> Result<(), StoreError> {
        let path = self.user_dir(user_id)?.join("profile.json");
        write_json(&path, profile).map_err(|err| write_failed(&path, &err))
    }
}

/// `*.json` files in `dir`, sorted by path. A missing directory is empty.
fn json_files(dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let entries = fs::read_dir(dir).map_err(|err| StoreError::Corrupt {
        what: dir.display().to_string(),
        reason: err.to_string(),
    })?;
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();
    Ok(paths)
}

fn corrupt(path: &Path, err: &anyhow::Error) -> StoreError {
    StoreError::Corrupt {
        what: path.display().to_string(),
        reason: format!("{err:#}"),
    }
}

fn write_failed(path: &Path, err: &anyhow::Error) -> StoreError {
    StoreError::Write {
        what: path.display().to_string(),
        reason: format!("{err:#}"),
    }
}
