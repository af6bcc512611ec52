//! Deterministic simulation of the review index.
//!
//! A seeded generator drives random creates, updates and deletes (including
//! ones aimed at deleted or never-issued ids) against an in-memory store,
//! while a model tracks the expected state. After every few operations the
//! invariant checker compares the store with the model:
//!
//! - every index member refers to a live review of that course/user
//! - every live review appears in both of its indexes
//! - `list_all`, `get_by_course` and `get_by_user` return exactly the model's reviews
//!
//! Given the same seed, execution is identical.

#![cfg(test)]

mod invariants;
mod simulator;

pub use invariants::{InvariantChecker, InvariantViolation, ReviewModel};
pub use simulator::{Simulator, SimulatorConfig};
