//! Deterministic, pure logic for workout sessions.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! snapshots and ledgers and return deterministic outputs suitable for tests.

pub mod aggregator;
pub mod calendar;
pub mod invariants;
pub mod ledger;
pub mod mutation;
pub mod profile;
pub mod set_input;
pub mod types;
