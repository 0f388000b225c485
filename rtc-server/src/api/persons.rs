//! Person read endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use rtc_common::db::{validate_person_id, Interaction, InteractionStore, Person};
use rtc_common::scoring::LeaderboardEntry;

use super::leaderboard::compute_leaderboard;
use super::log_failure;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// GET /api/persons
pub async fn list_persons(State(state): State<AppState>) -> ApiResult<Json<Vec<Person>>> {
    let persons = state
        .store
        .list_persons()
        .await
        .map_err(|e| log_failure("list_persons", "*", e))?;
    Ok(Json(persons))
}

/// GET /api/persons/:name/interactions
///
/// Full received history, newest first.
pub async fn get_person_interactions(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Vec<Interaction>>> {
    let history = state
        .store
        .list_received_interactions(&name)
        .await
        .map_err(|e| log_failure("list_received_interactions", &name, e))?;
    Ok(Json(history))
}

/// GET /api/persons/:name/score
///
/// One leaderboard entry. Position needs everyone's totals, so the whole
/// board is computed.
pub async fn get_person_score(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<LeaderboardEntry>> {
    validate_person_id(&name).map_err(|e| log_failure("person_score", &name, e))?;

    let entries = compute_leaderboard(&state)
        .await
        .map_err(|e| log_failure("person_score", &name, e))?;

    entries
        .into_iter()
        .find(|entry| entry.id == name)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Person not found: {}", name)))
}
