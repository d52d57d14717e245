//! Scheduling core for the infinite spaced-repetition deck.
//!
//! Provides:
//! - Card store holding immutable card content and per-card scheduling state
//! - SM-2 grading transitions with a fixed introduction phase
//! - Least-seen / overdue-weighted next-card selection
//! - Validation of generated card batches
//! - Markdown parser for seed decks

pub mod algorithm;
pub mod clock;
pub mod error;
pub mod parser;
pub mod selection;
pub mod store;
pub mod types;
pub mod validation;

pub use algorithm::{InfiniteSm2, SchedulingAlgorithm};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ParseError, Result, SchedulerError, ValidationError};
pub use parser::parse;
pub use selection::select_next;
pub use store::CardStore;
pub use types::{
    Card, CardId, CardState, CodeBlock, CodeReorderCard, ConceptCard, Counts, Difficulty, Grade,
    Phase, Timestamp, DAY_MS,
};
pub use validation::{validate_batch, BatchRules};
