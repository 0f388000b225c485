//! Media byte-serving endpoints
//!
//! GET /image/:person_id  - still image of the person
//! GET /videos/:person_id - clip closest to the target duration

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use tracing::debug;

use super::log_failure;
use crate::error::ApiResult;
use crate::media::MediaFile;
use crate::AppState;

/// GET /image/:person_id
pub async fn get_image(
    State(state): State<AppState>,
    Path(person_id): Path<String>,
) -> ApiResult<Response> {
    let media = state
        .media
        .resolve_still_image(&person_id)
        .await
        .map_err(|e| log_failure("resolve_still_image", &person_id, e))?;

    Ok(media_response(media))
}

/// GET /videos/:person_id
pub async fn get_video(
    State(state): State<AppState>,
    Path(person_id): Path<String>,
) -> ApiResult<Response> {
    let target = state.media.target_duration_secs();
    let media = state
        .media
        .resolve_closest_video(&person_id, target)
        .await
        .map_err(|e| log_failure("resolve_closest_video", &person_id, e))?;

    Ok(media_response(media))
}

fn media_response(media: MediaFile) -> Response {
    debug!(
        file = %media.path.display(),
        content_type = media.content_type,
        bytes = media.bytes.len(),
        "Serving media file"
    );
    ([(header::CONTENT_TYPE, media.content_type)], media.bytes).into_response()
}
