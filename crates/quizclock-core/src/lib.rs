//! quizclock-core — Timed quiz attempt engine.
//!
//! This crate defines the quiz data model, the attempt state machine with its
//! timer and autosave scheduler, the scoring function, the feedback policy,
//! and the storage seam the whole quizclock system builds on.

pub mod attempt;
pub mod autosave;
pub mod error;
pub mod feedback;
pub mod model;
pub mod parser;
pub mod report;
pub mod scoring;
pub mod session;
pub mod timer;
pub mod traits;

#[cfg(test)]
mod test_support;
