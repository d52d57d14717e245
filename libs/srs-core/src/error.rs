//! Error types for srs-core.

use thiserror::Error;

/// Result type alias using ParseError.
pub type Result<T> = std::result::Result<T, ParseError>;

/// Errors that can occur while parsing a markdown seed deck.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("missing question at line {line}")]
    MissingQuestion { line: usize },

    #[error("missing answer at line {line}")]
    MissingAnswer { line: usize },

    #[error("missing ID at line {line}")]
    MissingId { line: usize },

    #[error("text outside a question or answer at line {line}")]
    UnexpectedText { line: usize },

    #[error("duplicate ID {id} at line {line}")]
    DuplicateId { id: String, line: usize },
}

/// Card Store / Scheduling Engine desync.
#[derive(Debug, Error, PartialEq)]
pub enum SchedulerError {
    #[error("no card state for id {0}")]
    UnknownCard(String),
}

/// Reasons a generated batch is rejected.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("card at position {index} has an empty id")]
    EmptyId { index: usize },

    #[error("duplicate card id {0} in batch")]
    DuplicateId(String),

    #[error("concept card {0} has an empty front or back")]
    EmptyConcept(String),

    #[error("code card {id} has {count} blocks, at least {min} required")]
    TooFewBlocks { id: String, count: usize, min: usize },

    #[error("code card {0} has duplicate block ids")]
    DuplicateBlock(String),

    #[error("code card {0} solution order does not match its blocks")]
    SolutionMismatch(String),

    #[error("code card {id} has an invalid problem url: {url}")]
    InvalidUrl { id: String, url: String },

    #[error("card {id} references unknown unit {unit}")]
    UnknownUnit { id: String, unit: String },

    #[error("batch has {found} {kind} cards, at least {min} required")]
    TooFewOfKind {
        kind: &'static str,
        found: usize,
        min: usize,
    },
}
