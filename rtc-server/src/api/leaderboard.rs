//! Leaderboard endpoint
//!
//! Statistics are computed fresh from one snapshot of every person's
//! received interactions on each request.

use axum::{extract::State, Json};
use chrono::Utc;
use rtc_common::db::InteractionStore;
use rtc_common::scoring::{build_leaderboard, LeaderboardEntry};

use super::log_failure;
use crate::error::ApiResult;
use crate::AppState;

/// Compute the full leaderboard, ordered by position then name
pub async fn compute_leaderboard(state: &AppState) -> rtc_common::Result<Vec<LeaderboardEntry>> {
    let histories = state.store.list_all_persons_with_history().await?;
    Ok(build_leaderboard(&histories, Utc::now(), state.settings.position_window()))
}

/// GET /api/leaderboard
pub async fn get_leaderboard(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<LeaderboardEntry>>> {
    let entries = compute_leaderboard(&state)
        .await
        .map_err(|e| log_failure("leaderboard", "*", e))?;
    Ok(Json(entries))
}
