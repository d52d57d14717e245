//! API request and response types

use serde::{Deserialize, Serialize};

pub use srs_core::types::{Card, CardId, CardState, Counts, Grade};

use crate::services::monitor::{GenerationOutcome, GenerationStatus, SkipReason};

/// GET /api/session/next
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextCardResponse {
    pub card_id: Option<CardId>,
    pub card: Option<Card>,
    pub counts: Counts,
}

/// POST /api/session/grade
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeRequest {
    pub card_id: CardId,
    pub grade: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeResponse {
    pub state: CardState,
    pub counts: Counts,
}

/// POST /api/session/generate
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<SkipReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inserted: Option<usize>,
    pub counts: Counts,
}

impl GenerateResponse {
    pub fn from_outcome(outcome: GenerationOutcome, counts: Counts) -> Self {
        match outcome {
            GenerationOutcome::Skipped(reason) => Self {
                status: "skipped",
                reason: Some(reason),
                inserted: None,
                counts,
            },
            GenerationOutcome::Added { inserted, .. } => Self {
                status: "added",
                reason: None,
                inserted: Some(inserted),
                counts,
            },
        }
    }
}

/// GET /api/session/status
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusResponse {
    pub session_id: String,
    pub total_cards: usize,
    pub counts: Counts,
    pub generation: GenerationStatus,
    pub pending_sync: usize,
}

/// GET /api/cards/:id
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardResponse {
    pub card: Card,
    pub state: CardState,
}
