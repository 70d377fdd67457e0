//! Shared deterministic types for session core logic.
//!
//! These types define stable contracts between core components and must not
//! depend on external state or I/O.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The four numeric values that configure a set-group.
///
/// Also the planned-set shape stored in library exercise documents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SetValues {
    pub kgs: f64,
    pub reps: u32,
    pub sets: u32,
    pub rest: u32,
}

/// User-editable set fields that may be left blank.
///
/// `rest` is absent on purpose: it always carries a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SetField {
    Kgs,
    Reps,
    Sets,
}

impl fmt::Display for SetField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SetField::Kgs => "kgs",
            SetField::Reps => "reps",
            SetField::Sets => "sets",
        };
        f.write_str(name)
    }
}

/// What to do with blank set fields when saving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingFieldPolicy {
    /// Refuse the save and report the blank fields.
    #[default]
    Reject,
    /// The user confirmed: blank `kgs`/`reps`/`sets` become 0.
    DefaultToZero,
}

/// One completed set configuration, as recorded in the ledger.
///
/// `sets` counts how many times the configuration was marked done.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompletedFact {
    pub kgs: f64,
    pub reps: u32,
    pub rest: u32,
    pub sets: u32,
}

/// Result of editing a set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// Values were unchanged; the entry was reset to pending in place.
    Replaced { set: usize },
    /// Values changed; the original entry was frozen as completed and a new
    /// pending entry was inserted right after it.
    Branched { frozen: usize, inserted: usize },
}

/// Result of marking a set done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    /// The set was already completed; nothing changed.
    AlreadyCompleted,
    Recorded {
        /// Remaining count after the decrement.
        remaining: u32,
        /// True when this call flipped the set to completed.
        completed: bool,
        /// Ledger counter for this set after the increment.
        times_done: u32,
    },
}
