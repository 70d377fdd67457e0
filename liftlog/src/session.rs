//! Session controller: the only stateful coordinator of a workout.
//!
//! A controller is Idle until a snapshot is supplied or resumed from the
//! session cache, then Active until the session is cancelled or finished.
//! Every mutation updates the in-memory snapshot first and mirrors it to the
//! cache afterwards; a failed cache write is logged and never undoes the
//! mutation.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::aggregator::build_archive;
use crate::core::invariants::validate_snapshot;
use crate::core::ledger::CompletionLedger;
use crate::core::mutation::{self, MutationError};
use crate::core::set_input::{SetDraft, ValidationError};
use crate::core::types::{EditOutcome, MarkOutcome, MissingFieldPolicy};
use crate::io::document_store::{DocumentStore, StoreError};
use crate::io::session_cache::SessionCache;
use crate::library::load_snapshot;
use crate::routine::RoutineSnapshot;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("no active session")]
    NotActive,
    #[error("a session for '{routine}' is already active")]
    AlreadyActive { routine: String },
    #[error("cancel was not requested")]
    CancelNotRequested,
    #[error("invalid routine snapshot: {}", .0.join("; "))]
    InvalidSnapshot(Vec<String>),
    #[error(transparent)]
    Mutation(#[from] MutationError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// How `start` entered (or did not enter) the Active state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A supplied snapshot became the active session.
    Started,
    /// The cached snapshot was resumed.
    Resumed,
    /// Nothing supplied and nothing cached; still Idle.
    NoSession,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishOutcome {
    /// The ledger was archived under `id` and the session ended.
    Archived { id: String },
    /// The ledger was empty. Nothing was written and the session stays Active.
    NothingToSave,
}

#[derive(Debug)]
struct ActiveSession {
    snapshot: RoutineSnapshot,
    ledger: CompletionLedger,
    cancel_requested: bool,
}

impl ActiveSession {
    fn new(snapshot: RoutineSnapshot) -> Self {
        Self {
            snapshot,
            ledger: CompletionLedger::new(),
            cancel_requested: false,
        }
    }
}

/// Coordinates one user's session over a document store and a session cache.
pub struct SessionController<S: DocumentStore, C: SessionCache> {
    user_id: String,
    store: S,
    cache: C,
    active: Option<ActiveSession>,
}

impl<S: DocumentStore, C: SessionCache> SessionController<S, C> {
    pub fn new(user_id: impl Into<String>, store: S, cache: C) -> Self {
        Self {
            user_id: user_id.into(),
            store,
            cache,
            active: None,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn snapshot(&self) -> Option<&RoutineSnapshot> {
        self.active.as_ref().map(|active| &active.snapshot)
    }

    pub fn ledger(&self) -> Option<&CompletionLedger> {
        self.active.as_ref().map(|active| &active.ledger)
    }

    pub fn cancel_requested(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| active.cancel_requested)
    }

    /// Enter the Active state.
    ///
    /// A supplied snapshot wins and is written to the cache. Without one, the
    /// cached snapshot is resumed if there is a readable one owned by this
    /// controller's user.
    pub fn start(
        &mut self,
        supplied: Option<RoutineSnapshot>,
    ) -> Result<StartOutcome, SessionError> {
        self.ensure_idle()?;
        match supplied {
            Some(snapshot) => {
                let errors = validate_snapshot(&snapshot);
                if !errors.is_empty() {
                    return Err(SessionError::InvalidSnapshot(errors));
                }
                persist(&self.cache, &self.user_id, &snapshot);
                info!(
                    user_id = %self.user_id,
                    routine = %snapshot.name,
                    sets = snapshot.set_count(),
                    "session started"
                );
                self.active = Some(ActiveSession::new(snapshot));
                Ok(StartOutcome::Started)
            }
            None => match self.cache.load(&self.user_id) {
                Some(snapshot) => {
                    info!(user_id = %self.user_id, routine = %snapshot.name, "session resumed from cache");
                    self.active = Some(ActiveSession::new(snapshot));
                    Ok(StartOutcome::Resumed)
                }
                None => {
                    debug!("no session supplied or cached");
                    Ok(StartOutcome::NoSession)
                }
            },
        }
    }

    /// Load `routine_id` from the library and start a session with it.
    ///
    /// A lookup failure leaves the controller Idle.
    pub fn select_routine(&mut self, routine_id: &str) -> Result<StartOutcome, SessionError> {
        self.ensure_idle()?;
        let snapshot = load_snapshot(&self.store, &self.user_id, routine_id)?;
        self.start(Some(snapshot))
    }

    /// Edit a set from user input. Blank fields follow `policy`.
    pub fn edit_set(
        &mut self,
        exercise: usize,
        set: usize,
        draft: &SetDraft,
        policy: MissingFieldPolicy,
    ) -> Result<EditOutcome, SessionError> {
        let active = self.active.as_mut().ok_or(SessionError::NotActive)?;
        let values = draft.resolve(set, policy)?;
        let outcome = mutation::edit_set(
            &mut active.snapshot,
            &mut active.ledger,
            exercise,
            set,
            values,
        )?;
        debug!(exercise, set, ?outcome, "set edited");
        persist(&self.cache, &self.user_id, &active.snapshot);
        Ok(outcome)
    }

    pub fn mark_set_complete(
        &mut self,
        exercise: usize,
        set: usize,
    ) -> Result<MarkOutcome, SessionError> {
        let active = self.active.as_mut().ok_or(SessionError::NotActive)?;
        let outcome =
            mutation::mark_set_complete(&mut active.snapshot, &mut active.ledger, exercise, set)?;
        if outcome == MarkOutcome::AlreadyCompleted {
            return Ok(outcome);
        }
        debug!(exercise, set, ?outcome, "set marked");
        persist(&self.cache, &self.user_id, &active.snapshot);
        Ok(outcome)
    }

    /// Shift a set's rest by `delta` seconds. Returns the new rest.
    pub fn adjust_rest(
        &mut self,
        exercise: usize,
        set: usize,
        delta: i64,
    ) -> Result<u32, SessionError> {
        let active = self.active.as_mut().ok_or(SessionError::NotActive)?;
        let rest = mutation::adjust_rest(&mut active.snapshot, exercise, set, delta)?;
        persist(&self.cache, &self.user_id, &active.snapshot);
        Ok(rest)
    }

    /// First step of the cancel gate.
    pub fn request_cancel(&mut self) -> Result<(), SessionError> {
        let active = self.active.as_mut().ok_or(SessionError::NotActive)?;
        active.cancel_requested = true;
        Ok(())
    }

    /// Withdraw a pending cancel request. The session continues unchanged.
    pub fn dismiss_cancel(&mut self) -> Result<(), SessionError> {
        let active = self.active.as_mut().ok_or(SessionError::NotActive)?;
        active.cancel_requested = false;
        Ok(())
    }

    /// Second step of the cancel gate: discard snapshot and ledger, clear the
    /// cache, and return to Idle.
    pub fn confirm_cancel(&mut self) -> Result<(), SessionError> {
        let active = self.active.as_ref().ok_or(SessionError::NotActive)?;
        if !active.cancel_requested {
            return Err(SessionError::CancelNotRequested);
        }
        let routine = active.snapshot.name.clone();
        self.end_session();
        info!(user_id = %self.user_id, routine = %routine, "session cancelled");
        Ok(())
    }

    /// Archive the ledger and end the session.
    ///
    /// An empty ledger is reported as [`FinishOutcome::NothingToSave`] without
    /// touching the store. A store failure is returned and the session stays
    /// Active so the finish can be retried.
    pub fn finish(&mut self, completed_at: DateTime<Utc>) -> Result<FinishOutcome, SessionError> {
        let active = self.active.as_ref().ok_or(SessionError::NotActive)?;
        let Ok(archive) = build_archive(&active.snapshot.name, &active.ledger, completed_at) else {
            info!(routine = %active.snapshot.name, "finish requested with nothing to save");
            return Ok(FinishOutcome::NothingToSave);
        };
        let id = match self.store.archive_completed_routine(&self.user_id, &archive) {
            Ok(id) => id,
            Err(err) => {
                warn!(routine = %archive.name, error = %err, "archiving session failed");
                return Err(err.into());
            }
        };
        self.end_session();
        info!(user_id = %self.user_id, id = %id, routine = %archive.name, "session finished");
        Ok(FinishOutcome::Archived { id })
    }

    fn ensure_idle(&self) -> Result<(), SessionError> {
        match &self.active {
            Some(active) => Err(SessionError::AlreadyActive {
                routine: active.snapshot.name.clone(),
            }),
            None => Ok(()),
        }
    }

    fn end_session(&mut self) {
        self.active = None;
        if let Err(err) = self.cache.clear() {
            let error = format!("{err:#}");
            warn!(error = %error, "clearing session cache failed");
        }
    }
}

fn persist<C: SessionCache>(cache: &C, user_id: &str, snapshot: &RoutineSnapshot) {
    if let Err(err) = cache.save(user_id, snapshot) {
        let error = format!("{err:#}");
        warn!(routine = %snapshot.name, error = %error, "session cache write failed");
    }
}
