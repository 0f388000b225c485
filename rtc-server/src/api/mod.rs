//! HTTP API handlers for rtc-server

pub mod health;
pub mod leaderboard;
pub mod media;
pub mod persons;
pub mod sessions;

pub use health::health_routes;
pub use leaderboard::get_leaderboard;
pub use media::{get_image, get_video};
pub use persons::{get_person_interactions, get_person_score, list_persons};
pub use sessions::{complete_session, create_session, get_session, rate_session_clip};

use axum::extract::rejection::JsonRejection;
use tracing::{error, warn};

use crate::error::ApiError;

/// Log a failed operation with its subject, then convert it for the response
pub(crate) fn log_failure(
    operation: &'static str,
    subject: &str,
    err: rtc_common::Error,
) -> ApiError {
    if err.is_client_error() {
        warn!(operation, subject = %subject, error = %err, "Request rejected");
    } else {
        error!(operation, subject = %subject, error = %err, "Request failed");
    }
    ApiError::from(err)
}

/// Log a request body that failed to parse and reject it as a bad request
pub(crate) fn reject_body(operation: &'static str, rejection: JsonRejection) -> ApiError {
    warn!(operation, error = %rejection.body_text(), "Malformed request body");
    ApiError::from(rejection)
}
