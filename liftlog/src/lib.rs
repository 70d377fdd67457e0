//! In-session workout tracking: routine snapshots, set mutations, and the
//! completion ledger that is archived when a workout finishes.
//!
//! The crate keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (set mutation, ledger, archive
//!   building, input validation). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (session cache, document store,
//!   config, import files). Behind traits so tests can swap in memory doubles.
//!
//! Orchestration modules ([`session`], [`library`], [`profile`], [`workout`])
//! coordinate core logic with I/O to implement CLI commands.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod library;
pub mod logging;
pub mod profile;
pub mod routine;
pub mod session;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod workout;
