//! Per-card scheduling algorithms.

pub mod sm2;

use crate::types::{CardState, Grade, Timestamp};

pub use sm2::InfiniteSm2;

/// Trait for grading transitions.
pub trait SchedulingAlgorithm: Send + Sync {
    /// Algorithm identifier.
    fn name(&self) -> &'static str;

    /// Number of graded presentations before a card graduates to review.
    fn learning_steps(&self) -> u32;

    /// State for a card inserted at `now`.
    fn initial_state(&self, now: Timestamp) -> CardState;

    /// State after `grade` is recorded at `now`.
    fn schedule(&self, state: &CardState, grade: Grade, now: Timestamp) -> CardState;
}
