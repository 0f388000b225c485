//! Rating session state
//!
//! A session is the set of clips offered to one rater. Each clip moves from
//! `Unrated` to `Rated` at most once. The state is explicit per session and
//! is reloaded from storage for every request.

use chrono::{DateTime, Utc};
use rtc_common::db::Outcome;
use rtc_common::{Error, Result};
use serde::Serialize;
use uuid::Uuid;

/// Per-clip state inside a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ClipState {
    Unrated,
    Rated { outcome: Outcome },
}

/// One clip offered in a session, identified by the receiving person
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionClip {
    pub receiver: String,
    #[serde(flatten)]
    pub state: ClipState,
}

/// Rated/total counters shown while rating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RatingProgress {
    pub rated: usize,
    pub total: usize,
    /// Rounded percentage; an empty session counts as fully rated
    pub percent: u32,
}

#[derive(Debug, Clone)]
pub struct RatingSession {
    id: Uuid,
    rater: String,
    clips: Vec<SessionClip>,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl RatingSession {
    /// Fresh session with every clip unrated
    pub fn new(id: Uuid, rater: String, receivers: Vec<String>, created_at: DateTime<Utc>) -> Self {
        let clips = receivers
            .into_iter()
            .map(|receiver| SessionClip {
                receiver,
                state: ClipState::Unrated,
            })
            .collect();
        Self::from_parts(id, rater, clips, created_at, None)
    }

    pub fn from_parts(
        id: Uuid,
        rater: String,
        clips: Vec<SessionClip>,
        created_at: DateTime<Utc>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            rater,
            clips,
            created_at,
            completed_at,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn rater(&self) -> &str {
        &self.rater
    }

    pub fn clips(&self) -> &[SessionClip] {
        &self.clips
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    pub fn clip_state(&self, receiver: &str) -> Option<ClipState> {
        self.clips
            .iter()
            .find(|c| c.receiver == receiver)
            .map(|c| c.state)
    }

    /// Receivers of clips that were rated in this session
    pub fn rated_receivers(&self) -> impl Iterator<Item = &str> {
        self.clips
            .iter()
            .filter(|c| matches!(c.state, ClipState::Rated { .. }))
            .map(|c| c.receiver.as_str())
    }

    /// Transition a clip to `Rated`
    ///
    /// Unknown clip or closed session → Validation. Already rated → Conflict.
    pub fn mark_rated(&mut self, receiver: &str, outcome: Outcome) -> Result<()> {
        if self.is_completed() {
            return Err(Error::Validation(format!(
                "Rating session {} is already completed",
                self.id
            )));
        }

        let clip = self
            .clips
            .iter_mut()
            .find(|c| c.receiver == receiver)
            .ok_or_else(|| {
                Error::Validation(format!(
                    "Clip {} is not part of rating session {}",
                    receiver, self.id
                ))
            })?;

        match clip.state {
            ClipState::Unrated => {
                clip.state = ClipState::Rated { outcome };
                Ok(())
            }
            ClipState::Rated { .. } => Err(Error::Conflict(format!(
                "Clip {} was already rated in session {}",
                receiver, self.id
            ))),
        }
    }

    /// Undo an optimistic `mark_rated` after the write failed
    pub fn rollback(&mut self, receiver: &str) {
        if let Some(clip) = self.clips.iter_mut().find(|c| c.receiver == receiver) {
            clip.state = ClipState::Unrated;
        }
    }

    pub fn mark_completed(&mut self, at: DateTime<Utc>) {
        self.completed_at = Some(at);
    }

    pub fn progress(&self) -> RatingProgress {
        let total = self.clips.len();
        let rated = self.rated_receivers().count();
        let percent = if total == 0 {
            100
        } else {
            ((rated as f64 / total as f64) * 100.0).round() as u32
        };
        RatingProgress {
            rated,
            total,
            percent,
        }
    }
}
