//! Session lifecycle tests against the on-disk store and cache.
//!
//! These tests drive `SessionController` across simulated process restarts:
//! the snapshot survives through the session cache, the ledger does not.

use std::path::Path;

use liftlog::core::calendar::marked_days;
use liftlog::core::set_input::SetDraft;
use liftlog::core::types::{MarkOutcome, MissingFieldPolicy};
use liftlog::io::document_store::DocumentStore;
use liftlog::io::session_cache::SessionCache;
use liftlog::library::{self, calendar, import_routine};
use liftlog::session::{FinishOutcome, SessionController, StartOutcome};
use liftlog::test_support::{TestWorkspace, fixed_time};

fn demo_routine() -> &'static Path {
    Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/demos/leg_day.json"))
}

/// Full lifecycle: import → select → mark → restart → resume → finish.
///
/// The first process marks Squat once and exits without finishing. The
/// second resumes from the cache with an empty ledger, marks twice more, and
/// finishes. Only the completions of the second process are archived.
#[test]
fn resumed_session_finishes_with_its_own_ledger() {
    let workspace = TestWorkspace::new();
    let id = import_routine(&workspace.store(), "local", demo_routine()).expect("import");

    {
        let mut first = SessionController::new("local", workspace.store(), workspace.cache());
        assert_eq!(first.select_routine(&id), Ok(StartOutcome::Started));
        first.mark_set_complete(0, 0).expect("mark");
    }

    let cached = workspace.cache().load("local").expect("cached snapshot");
    assert_eq!(cached.set(0, 0).map(|set| set.sets), Some(2));

    let mut second = SessionController::new("local", workspace.store(), workspace.cache());
    assert_eq!(second.start(None), Ok(StartOutcome::Resumed));
    assert!(second.ledger().is_some_and(|ledger| ledger.is_empty()));
    second.mark_set_complete(0, 0).expect("mark");
    let last = second.mark_set_complete(0, 0).expect("mark");
    assert_eq!(
        last,
        MarkOutcome::Recorded {
            remaining: 0,
            completed: true,
            times_done: 2,
        }
    );

    let outcome = second.finish(fixed_time()).expect("finish");
    assert!(matches!(outcome, FinishOutcome::Archived { .. }));
    assert!(!second.is_active());
    assert!(!workspace.paths.session_path.exists());

    let archived = workspace
        .store()
        .load_completed_routines("local")
        .expect("completed");
    assert_eq!(archived.len(), 1);
    assert_eq!(archived[0].name, "Leg Day");
    assert_eq!(archived[0].exercises.len(), 1);
    assert_eq!(archived[0].exercises[0].name_of_exercise, "Squat");
    assert_eq!(archived[0].exercises[0].sets[0].sets, 2);

    let days = calendar(&workspace.store(), "local").expect("calendar");
    assert_eq!(marked_days(&days), vec![fixed_time().date_naive()]);
}

/// Cancel discards the cached snapshot so the next start finds nothing.
#[test]
fn cancelled_session_leaves_nothing_to_resume() {
    let workspace = TestWorkspace::new();
    let id = import_routine(&workspace.store(), "local", demo_routine()).expect("import");

    let mut controller = SessionController::new("local", workspace.store(), workspace.cache());
    controller.select_routine(&id).expect("select");
    let heavier = SetDraft {
        kgs: "105".to_string(),
        reps: "5".to_string(),
        sets: "3".to_string(),
        rest: 90,
    };
    controller
        .edit_set(0, 0, &heavier, MissingFieldPolicy::Reject)
        .expect("edit");
    assert_eq!(
        workspace
            .cache()
            .load("local")
            .map(|snapshot| snapshot.exercises[0].sets.len()),
        Some(2)
    );

    controller.request_cancel().expect("request");
    controller.confirm_cancel().expect("confirm");

    let mut next = SessionController::new("local", workspace.store(), workspace.cache());
    assert_eq!(next.start(None), Ok(StartOutcome::NoSession));
    assert!(
        workspace
            .store()
            .load_completed_routines("local")
            .expect("completed")
            .is_empty()
    );
}

/// Library edits do not leak into a session that is already running.
#[test]
fn library_edits_apply_to_the_next_session_only() {
    let workspace = TestWorkspace::new();
    let store = workspace.store();
    let id = import_routine(&store, "local", demo_routine()).expect("import");

    let mut controller = SessionController::new("local", workspace.store(), workspace.cache());
    controller.select_routine(&id).expect("select");

    library::move_exercise(&store, "local", &id, "ex-2", 0).expect("move");
    library::rename_routine(&store, "local", &id, "Legs").expect("rename");

    let running = controller.snapshot().expect("snapshot");
    assert_eq!(running.name, "Leg Day");
    assert_eq!(running.exercises[0].name, "Squat");

    let next = library::load_snapshot(&store, "local", &id).expect("snapshot");
    assert_eq!(next.name, "Legs");
    assert_eq!(next.exercises[0].name, "Lunge");
    assert!(next.exercises[0].sets.is_empty());
}

/// A session cached by one user is invisible to another user's controller and
/// never lands in that user's calendar.
#[test]
fn cached_session_is_not_resumed_by_another_user() {
    let workspace = TestWorkspace::new();
    let id = import_routine(&workspace.store(), "ana", demo_routine()).expect("import");

    {
        let mut ana = SessionController::new("ana", workspace.store(), workspace.cache());
        ana.select_routine(&id).expect("select");
        ana.mark_set_complete(0, 0).expect("mark");
    }

    let mut bob = SessionController::new("bob", workspace.store(), workspace.cache());
    assert_eq!(bob.start(None), Ok(StartOutcome::NoSession));
    assert!(!bob.is_active());
    assert!(
        workspace
            .store()
            .load_completed_routines("bob")
            .expect("completed")
            .is_empty()
    );

    let mut ana = SessionController::new("ana", workspace.store(), workspace.cache());
    assert_eq!(ana.start(None), Ok(StartOutcome::Resumed));
    ana.mark_set_complete(0, 0).expect("mark");
    assert!(matches!(
        ana.finish(fixed_time()),
        Ok(FinishOutcome::Archived { .. })
    ));
    assert_eq!(
        workspace
            .store()
            .load_completed_routines("ana")
            .expect("completed")
            .len(),
        1
    );
}
