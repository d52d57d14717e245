//! Card lookup endpoints

use axum::extract::{Path, State};
use axum::Json;

use crate::error::{ApiError, Result};
use crate::models::CardResponse;
use crate::AppState;

/// GET /api/cards/:id
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CardResponse>> {
    let card = state
        .session
        .card(&id)
        .ok_or_else(|| ApiError::NotFound(format!("Card {}", id)))?;
    let card_state = state
        .session
        .state(&id)
        .ok_or_else(|| ApiError::Internal(format!("Card {} has no scheduling state", id)))?;

    Ok(Json(CardResponse {
        card,
        state: card_state,
    }))
}
