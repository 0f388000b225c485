//! Rating session endpoints
//!
//! POST /api/sessions               - open a session for a rater
//! GET  /api/sessions/:id           - clips and progress
//! POST /api/sessions/:id/ratings   - like/dislike one clip
//! POST /api/sessions/:id/complete  - close the session

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use rtc_common::db::{validate_person_id, Interaction, Outcome};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;
use uuid::Uuid;

use super::{log_failure, reject_body};
use crate::error::{ApiError, ApiResult};
use crate::rating::{rate_clip, RatingProgress, RatingSession, SessionClip};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub rater: String,
}

#[derive(Debug, Deserialize)]
pub struct RateRequest {
    /// Receiving person of the clip
    pub clip: String,
    pub outcome: Outcome,
}

/// Clip as presented to the rater
#[derive(Debug, Serialize)]
pub struct ClipView {
    #[serde(flatten)]
    pub clip: SessionClip,
    pub video_url: String,
    pub image_url: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub rater: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub clips: Vec<ClipView>,
    pub progress: RatingProgress,
}

impl From<&RatingSession> for SessionResponse {
    fn from(session: &RatingSession) -> Self {
        let clips = session
            .clips()
            .iter()
            .map(|clip| ClipView {
                video_url: format!("/videos/{}", clip.receiver),
                image_url: format!("/image/{}", clip.receiver),
                clip: clip.clone(),
            })
            .collect();

        Self {
            session_id: session.id(),
            rater: session.rater().to_string(),
            created_at: session.created_at(),
            completed_at: session.completed_at(),
            clips,
            progress: session.progress(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RateResponse {
    pub interaction: Interaction,
    pub progress: RatingProgress,
}

/// POST /api/sessions
///
/// Offers every known person other than the rater who has a clip on disk.
pub async fn create_session(
    State(state): State<AppState>,
    payload: Result<Json<CreateSessionRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    let Json(request) = payload.map_err(|e| reject_body("create_session", e))?;
    let rater = request.rater;
    validate_person_id(&rater).map_err(|e| log_failure("create_session", &rater, e))?;

    let owners = state
        .media
        .list_clip_owners()
        .await
        .map_err(|e| log_failure("list_clip_owners", &rater, e))?;

    let known: HashSet<String> = state
        .store
        .list_persons()
        .await
        .map_err(|e| log_failure("create_session", &rater, e))?
        .into_iter()
        .map(|p| p.name)
        .collect();

    let receivers: Vec<String> = owners
        .into_iter()
        .filter(|owner| *owner != rater)
        .filter(|owner| {
            let registered = known.contains(owner);
            if !registered {
                warn!(person = %owner, "Clip directory has no registered person, skipping");
            }
            registered
        })
        .collect();

    let session = state
        .sessions
        .create_session(&rater, &receivers)
        .await
        .map_err(|e| log_failure("create_session", &rater, e))?;

    Ok((StatusCode::CREATED, Json(SessionResponse::from(&session))))
}

/// GET /api/sessions/:id
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<SessionResponse>> {
    let id = parse_session_id(&session_id)?;
    let session = state
        .sessions
        .load_session(id)
        .await
        .map_err(|e| log_failure("load_session", &session_id, e))?;
    Ok(Json(SessionResponse::from(&session)))
}

/// POST /api/sessions/:id/ratings
pub async fn rate_session_clip(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    payload: Result<Json<RateRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<RateResponse>)> {
    let id = parse_session_id(&session_id)?;
    let Json(request) = payload.map_err(|e| reject_body("rate_clip", e))?;
    let mut session = state
        .sessions
        .load_session(id)
        .await
        .map_err(|e| log_failure("load_session", &session_id, e))?;

    let interaction = rate_clip(&state.sessions, &mut session, &request.clip, request.outcome)
        .await
        .map_err(|e| log_failure("rate_clip", &request.clip, e))?;

    Ok((
        StatusCode::CREATED,
        Json(RateResponse {
            interaction,
            progress: session.progress(),
        }),
    ))
}

/// POST /api/sessions/:id/complete
///
/// With `purge_rated_clips` on, rated clips are removed from disk. Purge
/// failures are logged and do not fail the request.
pub async fn complete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<SessionResponse>> {
    let id = parse_session_id(&session_id)?;
    let session = state
        .sessions
        .complete_session(id)
        .await
        .map_err(|e| log_failure("complete_session", &session_id, e))?;

    if state.settings.purge_rated_clips {
        for receiver in session.rated_receivers() {
            if let Err(e) = state.media.purge_clips(receiver).await {
                warn!(
                    session_id = %id,
                    person = %receiver,
                    error = %e,
                    "Failed to purge rated clips"
                );
            }
        }
    }

    Ok(Json(SessionResponse::from(&session)))
}

fn parse_session_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("Invalid session id: {}", raw)))
}
