//! Test-only fixtures and in-memory stand-ins for the store and cache.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};

use crate::core::aggregator::{ArchivedExercise, ArchivedRoutine};
use crate::core::profile::UserProfile;
use crate::core::types::{CompletedFact, SetValues};
use crate::io::document_store::{
    DocumentStore, ExerciseDoc, ExerciseImport, RoutineDoc, RoutineImport, RoutineSummary,
    StoreError, next_exercise_id, next_position,
};
use crate::io::init::{InitOptions, LiftlogPaths, init_liftlog};
use crate::io::session_cache::{FileSessionCache, SessionCache};
use crate::routine::{ExerciseEntry, RoutineSnapshot, SetEntry};

pub fn set_values(kgs: f64, reps: u32, sets: u32, rest: u32) -> SetValues {
    SetValues {
        kgs,
        reps,
        sets,
        rest,
    }
}

/// A pending set entry.
pub fn set_entry(kgs: f64, reps: u32, sets: u32, rest: u32) -> SetEntry {
    SetEntry::pending(set_values(kgs, reps, sets, rest))
}

/// "Leg Day" with one exercise, Squat, holding one set: 100 kg x 5, 3 sets,
/// 90 s rest.
pub fn leg_day() -> RoutineSnapshot {
    RoutineSnapshot {
        name: "Leg Day".to_string(),
        exercises: vec![ExerciseEntry {
            name: "Squat".to_string(),
            sets: vec![set_entry(100.0, 5, 3, 90)],
        }],
    }
}

/// Library form of "Leg Day": Squat with one planned set, Lunge with none.
pub fn leg_day_import() -> RoutineImport {
    RoutineImport {
        name: "Leg Day".to_string(),
        notes: None,
        exercises: vec![
            ExerciseImport {
                name: "Squat".to_string(),
                kind: "strength".to_string(),
                muscle: "quadriceps".to_string(),
                equipment: "barbell".to_string(),
                instructions: String::new(),
                sets: Some(vec![set_values(100.0, 5, 3, 90)]),
            },
            ExerciseImport {
                name: "Lunge".to_string(),
                kind: "strength".to_string(),
                muscle: "glutes".to_string(),
                equipment: "body_only".to_string(),
                instructions: String::new(),
                sets: None,
            },
        ],
    }
}

pub fn fixed_time() -> DateTime<Utc> {
    at("2026-03-02T18:30:00Z")
}

pub fn at(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339)
        .expect("valid rfc3339 timestamp")
        .with_timezone(&Utc)
}

/// An archived session of `name` with one Squat fact, completed at `rfc3339`.
pub fn archived(name: &str, rfc3339: &str) -> ArchivedRoutine {
    ArchivedRoutine {
        name: name.to_string(),
        notes: None,
        completed_at: at(rfc3339),
        exercises: vec![ArchivedExercise {
            name_of_exercise: "Squat".to_string(),
            sets: vec![CompletedFact {
                kgs: 100.0,
                reps: 5,
                rest: 90,
                sets: 3,
            }],
        }],
    }
}

/// Session cache held in memory, with call counters.
#[derive(Debug, Default)]
pub struct MemorySessionCache {
    session: RefCell<Option<(String, RoutineSnapshot)>>,
    fail_saves: Cell<bool>,
    saves: Cell<usize>,
    clears: Cell<usize>,
}

impl MemorySessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(user_id: &str, snapshot: RoutineSnapshot) -> Self {
        let cache = Self::default();
        cache.session.replace(Some((user_id.to_string(), snapshot)));
        cache
    }

    /// Make every following `save` fail.
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.set(fail);
    }

    /// The stored snapshot, whoever owns it.
    pub fn stored(&self) -> Option<RoutineSnapshot> {
        self.session
            .borrow()
            .as_ref()
            .map(|(_, snapshot)| snapshot.clone())
    }

    pub fn owner(&self) -> Option<String> {
        self.session.borrow().as_ref().map(|(user, _)| user.clone())
    }

    pub fn save_calls(&self) -> usize {
        self.saves.get()
    }

    pub fn clear_calls(&self) -> usize {
        self.clears.get()
    }
}

impl SessionCache for MemorySessionCache {
    fn save(&self, user_id: &str, snapshot: &RoutineSnapshot) -> Result<()> {
        self.saves.set(self.saves.get() + 1);
        if self.fail_saves.get() {
            return Err(anyhow!("memory cache refused the write"));
        }
        self.session
            .replace(Some((user_id.to_string(), snapshot.clone())));
        Ok(())
    }

    fn load(&self, user_id: &str) -> Option<RoutineSnapshot> {
        self.session
            .borrow()
            .as_ref()
            .filter(|(owner, _)| owner == user_id)
            .map(|(_, snapshot)| snapshot.clone())
    }

    fn clear(&self) -> Result<()> {
        self.clears.set(self.clears.get() + 1);
        self.session.replace(None);
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct MemoryRoutine {
    doc: RoutineDoc,
    exercises: Vec<ExerciseDoc>,
}

/// Document store held in memory. Writes can be forced to fail.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    routines: RefCell<BTreeMap<(String, String), MemoryRoutine>>,
    completed: RefCell<BTreeMap<String, Vec<ArchivedRoutine>>>,
    profiles: RefCell<BTreeMap<String, UserProfile>>,
    next_id: Cell<usize>,
    fail_writes: Cell<bool>,
    archive_calls: Cell<usize>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following write fail with [`StoreError::Write`].
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    pub fn archive_calls(&self) -> usize {
        self.archive_calls.get()
    }

    fn check_write(&self, what: &str) -> Result<(), StoreError> {
        if self.fail_writes.get() {
            return Err(StoreError::Write {
                what: what.to_string(),
                reason: "memory store is read-only".to_string(),
            });
        }
        Ok(())
    }

    fn next_id(&self, prefix: &str) -> String {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        format!("{prefix}-{id}")
    }

    fn with_routine<T>(
        &self,
        user_id: &str,
        routine_id: &str,
        apply: impl FnOnce(&mut MemoryRoutine) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut routines = self.routines.borrow_mut();
        let routine = routines
            .get_mut(&(user_id.to_string(), routine_id.to_string()))
            .ok_or_else(|| StoreError::NotFound {
                kind: "routine",
                id: routine_id.to_string(),
            })?;
        apply(routine)
    }

    fn with_exercise(
        &self,
        user_id: &str,
        routine_id: &str,
        exercise_id: &str,
        apply: impl FnOnce(&mut ExerciseDoc),
    ) -> Result<(), StoreError> {
        self.with_routine(user_id, routine_id, |routine| {
            let exercise = routine
                .exercises
                .iter_mut()
                .find(|exercise| exercise.id == exercise_id)
                .ok_or_else(|| StoreError::NotFound {
                    kind: "exercise",
                    id: exercise_id.to_string(),
                })?;
            apply(exercise);
            Ok(())
        })
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn load_routine(&self, user_id: &str, routine_id: &str) -> Result<RoutineDoc, StoreError> {
        self.with_routine(user_id, routine_id, |routine| Ok(routine.doc.clone()))
    }

    fn load_exercises(
        &self,
        user_id: &str,
        routine_id: &str,
    ) -> Result<Vec<ExerciseDoc>, StoreError> {
        self.with_routine(user_id, routine_id, |routine| {
            let mut exercises = routine.exercises.clone();
            exercises.sort_by_key(|exercise| exercise.position);
            Ok(exercises)
        })
    }

    fn archive_completed_routine(
        &self,
        user_id: &str,
        routine: &ArchivedRoutine,
    ) -> Result<String, StoreError> {
        self.archive_calls.set(self.archive_calls.get() + 1);
        self.check_write("completed routine")?;
        self.completed
            .borrow_mut()
            .entry(user_id.to_string())
            .or_default()
            .push(routine.clone());
        Ok(self.next_id("completed"))
    }

    fn load_user_routines(&self, user_id: &str) -> Result<Vec<RoutineSummary>, StoreError> {
        let mut routines: Vec<RoutineSummary> = self
            .routines
            .borrow()
            .iter()
            .filter(|((user, _), _)| user == user_id)
            .map(|((_, id), routine)| RoutineSummary {
                id: id.clone(),
                name: routine.doc.name.clone(),
            })
            .collect();
        routines.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(routines)
    }

    fn load_completed_routines(&self, user_id: &str) -> Result<Vec<ArchivedRoutine>, StoreError> {
        let mut completed = self
            .completed
            .borrow()
            .get(user_id)
            .cloned()
            .unwrap_or_default();
        completed.sort_by_key(|routine| routine.completed_at);
        Ok(completed)
    }

    fn create_routine(&self, user_id: &str, routine: &RoutineImport) -> Result<String, StoreError> {
        self.check_write("routine")?;
        let id = self.next_id("routine");
        let exercises = routine
            .exercises
            .iter()
            .enumerate()
            .map(|(position, exercise)| {
                ExerciseDoc::from_import(format!("ex-{}", position + 1), position as u32, exercise)
            })
            .collect();
        self.routines.borrow_mut().insert(
            (user_id.to_string(), id.clone()),
            MemoryRoutine {
                doc: RoutineDoc {
                    name: routine.name.clone(),
                    notes: routine.notes.clone(),
                },
                exercises,
            },
        );
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
        self.check_write("exercise")?;
        self.with_exercise(user_id, routine_id, exercise_id, |exercise| {
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
        self.check_write("exercise position")?;
        self.with_exercise(user_id, routine_id, exercise_id, |exercise| {
            exercise.position = position;
        })
    }

    fn rename_routine(
        &self,
        user_id: &str,
        routine_id: &str,
        name: &str,
    ) -> Result<(), StoreError> {
        self.check_write("routine name")?;
        self.with_routine(user_id, routine_id, |routine| {
            routine.doc.name = name.to_string();
            Ok(())
        })
    }

    fn delete_routine(&self, user_id: &str, routine_id: &str) -> Result<(), StoreError> {
        self.check_write("routine")?;
        self.routines
            .borrow_mut()
            .remove(&(user_id.to_string(), routine_id.to_string()))
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound {
                kind: "routine",
                id: routine_id.to_string(),
            })
    }

    fn add_exercise(
        &self,
        user_id: &str,
        routine_id: &str,
        exercise: &ExerciseImport,
    ) -> Result<String, StoreError> {
        self.check_write("exercise")?;
        self.with_routine(user_id, routine_id, |routine| {
            let id = next_exercise_id(&routine.exercises);
            let position = next_position(&routine.exercises);
            routine
                .exercises
                .push(ExerciseDoc::from_import(id.clone(), position, exercise));
            Ok(id)
        })
    }

    fn load_user_profile(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.profiles.borrow().get(user_id).cloned())
    }

    fn store_user_profile(&self, user_id: &str, profile: &UserProfile) -> Result<(), StoreError> {
        self.check_write("profile")?;
        self.profiles
            .borrow_mut()
            .insert(user_id.to_string(), profile.clone());
        Ok(())
    }
}

/// An initialized `.liftlog/` directory inside a temp dir.
pub struct TestWorkspace {
    pub temp: tempfile::TempDir,
    pub paths: LiftlogPaths,
}

impl TestWorkspace {
    pub fn new() -> Self {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = init_liftlog(temp.path(), &InitOptions { force: false }).expect("init");
        Self { temp, paths }
    }

    pub fn store(&self) -> crate::io::document_store::JsonDocumentStore {
        crate::io::document_store::JsonDocumentStore::new(&self.paths.store_dir)
    }

    pub fn cache(&self) -> FileSessionCache {
        FileSessionCache::new(&self.paths.session_path)
    }
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}
