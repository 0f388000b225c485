//! Rating flow
//!
//! Records one like/dislike for a clip in a session:
//! 1. validate the clip is still unrated (no write otherwise)
//! 2. optimistically mark it rated
//! 3. persist through the recorder
//! 4. roll the clip back to unrated if persistence fails
//!
//! Aggregates need no invalidation: the leaderboard is recomputed from
//! committed interactions on every read.

use async_trait::async_trait;
use rtc_common::db::{Interaction, Outcome};
use rtc_common::Result;
use tracing::{info, warn};
use uuid::Uuid;

use super::session::RatingSession;

/// Persists a rating and claims the session clip in one atomic step
///
/// Must fail with Conflict, writing nothing, if the clip was already claimed.
#[async_trait]
pub trait SessionRecorder: Send + Sync {
    async fn record_rating(
        &self,
        session_id: Uuid,
        rater: &str,
        receiver: &str,
        outcome: Outcome,
    ) -> Result<Interaction>;
}

/// Rate one clip of a session
pub async fn rate_clip<R>(
    recorder: &R,
    session: &mut RatingSession,
    receiver: &str,
    outcome: Outcome,
) -> Result<Interaction>
where
    R: SessionRecorder + ?Sized,
{
    session.mark_rated(receiver, outcome)?;

    let result = recorder
        .record_rating(session.id(), session.rater(), receiver, outcome)
        .await;

    match result {
        Ok(interaction) => {
            info!(
                session_id = %session.id(),
                rater = %session.rater(),
                receiver = %receiver,
                outcome = %outcome,
                "Clip rated"
            );
            Ok(interaction)
        }
        Err(e) => {
            session.rollback(receiver);
            warn!(
                session_id = %session.id(),
                rater = %session.rater(),
                receiver = %receiver,
                operation = "rate_clip",
                error = %e,
                "Rating not recorded, clip returned to unrated"
            );
            Err(e)
        }
    }
}
