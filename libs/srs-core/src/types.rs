//! Core types for the infinite scheduler.

use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch.
pub type Timestamp = i64;

/// One day in milliseconds.
pub const DAY_MS: i64 = 86_400_000;

/// Card identifier, globally unique.
pub type CardId = String;

/// Card learning phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Learning,
    Review,
}

impl Default for Phase {
    fn default() -> Self {
        Self::Learning
    }
}

/// Learner's grade for a single presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    Again,
    Hard,
    Good,
    Easy,
}

impl Grade {
    /// SM-2 quality value (0-5 scale, only 1, 2, 4 and 5 are used).
    pub fn quality(self) -> u8 {
        match self {
            Self::Again => 1,
            Self::Hard => 2,
            Self::Good => 4,
            Self::Easy => 5,
        }
    }

    /// Parse from the lowercase name.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "again" => Some(Self::Again),
            "hard" => Some(Self::Hard),
            "good" => Some(Self::Good),
            "easy" => Some(Self::Easy),
            _ => None,
        }
    }
}

/// Mutable scheduling metadata, one per card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardState {
    pub phase: Phase,
    pub seen_count: u32,
    pub due_at: Timestamp,
    /// Current spacing in days.
    pub interval: u32,
    pub repetition: u32,
    pub ease: f64,
    pub lapses: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reviewed_at: Option<Timestamp>,
}

impl CardState {
    /// Fresh state for a card inserted at `now`.
    pub fn new(now: Timestamp) -> Self {
        Self {
            phase: Phase::Learning,
            seen_count: 0,
            due_at: now,
            interval: 0,
            repetition: 0,
            ease: 2.5,
            lapses: 0,
            last_reviewed_at: None,
        }
    }

    /// Whether the card still belongs to the introduction pool.
    pub fn is_learning(&self, learning_steps: u32) -> bool {
        self.phase == Phase::Learning && self.seen_count < learning_steps
    }

    /// Whether a review card is eligible at `now`.
    pub fn is_due(&self, now: Timestamp) -> bool {
        self.phase == Phase::Review && self.due_at <= now
    }
}

/// A single fragment of a code-reordering exercise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeBlock {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub indent_level: u32,
}

/// Problem difficulty of a code exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Default for Difficulty {
    fn default() -> Self {
        Self::Medium
    }
}

/// Question/answer card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptCard {
    pub id: CardId,
    pub unit_id: String,
    pub front: String,
    pub back: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
}

/// Put-the-lines-in-order exercise linked to an external problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeReorderCard {
    pub id: CardId,
    pub unit_id: String,
    pub prompt: String,
    #[serde(default)]
    pub explanation: String,
    pub external_url: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    pub blocks: Vec<CodeBlock>,
    pub solution_order: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
}

/// Immutable card content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Card {
    Concept(ConceptCard),
    CodeReorder(CodeReorderCard),
}

impl Card {
    pub fn id(&self) -> &str {
        match self {
            Self::Concept(c) => &c.id,
            Self::CodeReorder(c) => &c.id,
        }
    }

    pub fn unit_id(&self) -> &str {
        match self {
            Self::Concept(c) => &c.unit_id,
            Self::CodeReorder(c) => &c.unit_id,
        }
    }

    pub fn created_at(&self) -> Option<Timestamp> {
        match self {
            Self::Concept(c) => c.created_at,
            Self::CodeReorder(c) => c.created_at,
        }
    }

    /// Set the creation time to `now` unless the card already carries one.
    pub fn stamp_created_at(&mut self, now: Timestamp) -> Timestamp {
        let created_at = match self {
            Self::Concept(c) => &mut c.created_at,
            Self::CodeReorder(c) => &mut c.created_at,
        };
        *created_at.get_or_insert(now)
    }
}

/// Queue sizes shown to the learner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Counts {
    pub learning_remaining: usize,
    pub due_count: usize,
}

impl Counts {
    /// Nothing left to study right now.
    pub fn is_exhausted(&self) -> bool {
        self.learning_remaining == 0 && self.due_count == 0
    }
}
