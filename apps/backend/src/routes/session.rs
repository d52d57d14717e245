//! Session endpoints

use axum::{extract::State, Json};

use crate::error::{ApiError, Result};
use crate::models::*;
use crate::AppState;

/// GET /api/session/next
/// Returns the next card to study, or nulls when the queue is empty
pub async fn next(State(state): State<AppState>) -> Json<NextCardResponse> {
    let session = &state.session;
    let card_id = session.next_card();
    let card = card_id.as_deref().and_then(|id| session.card(id));

    Json(NextCardResponse {
        card_id,
        card,
        counts: session.counts(),
    })
}

/// POST /api/session/grade
pub async fn grade(
    State(state): State<AppState>,
    Json(payload): Json<GradeRequest>,
) -> Result<Json<GradeResponse>> {
    let grade = Grade::from_str(&payload.grade)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown grade: {}", payload.grade)))?;

    let new_state = state.session.grade_card(&payload.card_id, grade)?;

    Ok(Json(GradeResponse {
        state: new_state,
        counts: state.session.counts(),
    }))
}

/// GET /api/session/counts
pub async fn counts(State(state): State<AppState>) -> Json<Counts> {
    Json(state.session.counts())
}

/// POST /api/session/generate
/// Manually request a new batch of cards
pub async fn generate(State(state): State<AppState>) -> Result<Json<GenerateResponse>> {
    let outcome = state.session.request_more_cards().await?;
    Ok(Json(GenerateResponse::from_outcome(
        outcome,
        state.session.counts(),
    )))
}

/// GET /api/session/status
pub async fn status(State(state): State<AppState>) -> Json<SessionStatusResponse> {
    let session = &state.session;
    Json(SessionStatusResponse {
        session_id: session.session_id().to_string(),
        total_cards: session.total_cards(),
        counts: session.counts(),
        generation: session.generation_status(),
        pending_sync: session.sync().pending_ids().len(),
    })
}
