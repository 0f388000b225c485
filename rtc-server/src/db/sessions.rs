//! Rating session persistence
//!
//! Sessions snapshot the clip list at creation. A clip is claimed by
//! writing the interaction guid into its row; the claim and the interaction
//! insert share one transaction, so a duplicate rate request can never
//! double-write.

use async_trait::async_trait;
use chrono::Utc;
use rtc_common::db::{
    format_timestamp, insert_interaction, parse_timestamp, validate_person_id,
    Interaction, Outcome,
};
use rtc_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use tracing::info;
use uuid::Uuid;

use crate::rating::{ClipState, RatingSession, SessionClip, SessionRecorder};

/// SQLite-backed rating session storage
#[derive(Clone)]
pub struct SessionStore {
    pool: SqlitePool,
}

impl SessionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a session offering `receivers` (in the given order) to `rater`
    pub async fn create_session(&self, rater: &str, receivers: &[String]) -> Result<RatingSession> {
        validate_person_id(rater)?;
        if receivers.iter().any(|r| r == rater) {
            return Err(Error::Validation(format!(
                "Rater {} cannot be offered their own clip",
                rater
            )));
        }

        let session = RatingSession::new(
            Uuid::new_v4(),
            rater.to_string(),
            receivers.to_vec(),
            Utc::now(),
        );

        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO rating_sessions (guid, rater, created_at)
             SELECT ?, ?, ? WHERE EXISTS (SELECT 1 FROM persons WHERE name = ?)",
        )
        .bind(session.id().to_string())
        .bind(rater)
        .bind(format_timestamp(&session.created_at()))
        .bind(rater)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Person not found: {}", rater)));
        }

        for (position, receiver) in receivers.iter().enumerate() {
            sqlx::query(
                "INSERT INTO rating_session_clips (session_guid, receiver, position)
                 VALUES (?, ?, ?)",
            )
            .bind(session.id().to_string())
            .bind(receiver)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(
            session_id = %session.id(),
            rater = %rater,
            clips = receivers.len(),
            "Created rating session"
        );
        Ok(session)
    }

    pub async fn load_session(&self, session_id: Uuid) -> Result<RatingSession> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "SELECT rater, created_at, completed_at FROM rating_sessions WHERE guid = ?",
        )
        .bind(session_id.to_string())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Rating session not found: {}", session_id)))?;

        let rater: String = row.try_get("rater")?;
        let created_at: String = row.try_get("created_at")?;
        let completed_at: Option<String> = row.try_get("completed_at")?;

        let clip_rows = sqlx::query(
            r#"
            SELECT c.receiver, i.point_outcome
            FROM rating_session_clips c
            LEFT JOIN interactions i ON i.guid = c.interaction_guid
            WHERE c.session_guid = ?
            ORDER BY c.position
            "#,
        )
        .bind(session_id.to_string())
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        let clips = clip_rows
            .iter()
            .map(|row| {
                let receiver: String = row.try_get("receiver")?;
                let points: Option<i64> = row.try_get("point_outcome")?;
                let state = match points {
                    None => ClipState::Unrated,
                    Some(p) => ClipState::Rated {
                        outcome: Outcome::from_points(p).ok_or_else(|| {
                            Error::Internal(format!(
                                "Corrupt point outcome {} for {}",
                                p, receiver
                            ))
                        })?,
                    },
                };
                Ok(SessionClip { receiver, state })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(RatingSession::from_parts(
            session_id,
            rater,
            clips,
            parse_timestamp(&created_at)?,
            completed_at.as_deref().map(parse_timestamp).transpose()?,
        ))
    }

    /// Close a session. Completing twice is a Validation error.
    pub async fn complete_session(&self, session_id: Uuid) -> Result<RatingSession> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE rating_sessions SET completed_at = ? WHERE guid = ? AND completed_at IS NULL",
        )
        .bind(format_timestamp(&now))
        .bind(session_id.to_string())
        .execute(&self.pool)
        .await?;

        let session = self.load_session(session_id).await?;
        if result.rows_affected() == 0 {
            return Err(Error::Validation(format!(
                "Rating session {} is already completed",
                session_id
            )));
        }

        let progress = session.progress();
        info!(
            session_id = %session_id,
            rater = %session.rater(),
            rated = progress.rated,
            total = progress.total,
            "Completed rating session"
        );
        Ok(session)
    }
}

#[async_trait]
impl SessionRecorder for SessionStore {
    async fn record_rating(
        &self,
        session_id: Uuid,
        rater: &str,
        receiver: &str,
        outcome: Outcome,
    ) -> Result<Interaction> {
        let mut tx = self.pool.begin().await?;

        // Insert first so the transaction holds the write lock before the claim
        let interaction =
            insert_interaction(&mut *tx, rater, receiver, outcome, Utc::now()).await?;

        let claimed = sqlx::query(
            r#"
            UPDATE rating_session_clips
            SET interaction_guid = ?
            WHERE session_guid = ?
              AND receiver = ?
              AND interaction_guid IS NULL
              AND EXISTS (
                  SELECT 1 FROM rating_sessions
                  WHERE guid = ? AND rater = ? AND completed_at IS NULL
              )
            "#,
        )
        .bind(interaction.guid.to_string())
        .bind(session_id.to_string())
        .bind(receiver)
        .bind(session_id.to_string())
        .bind(rater)
        .execute(&mut *tx)
        .await?;

        if claimed.rows_affected() == 0 {
            // Dropping the transaction rolls the interaction back
            return Err(Error::Conflict(format!(
                "Clip {} is no longer open for rating in session {}",
                receiver, session_id
            )));
        }

        tx.commit().await?;
        Ok(interaction)
    }
}
