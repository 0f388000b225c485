//! Score aggregation
//!
//! Pure functions from a person's received interactions (newest first) to
//! the leaderboard statistics. Nothing here touches storage; every value is
//! recomputed from committed history on each read, so there is no cached
//! aggregate to go stale.
//!
//! Decisions:
//! - Average points per day divides total points by the number of UTC
//!   calendar days from the oldest interaction through `now`, inclusive.
//! - Position uses competition ranking ("1224"): equal totals share a
//!   position, the next distinct total skips. Listing order among equal
//!   totals is by name ascending.
//! - Position change compares against the ranking computed from
//!   interactions older than the configured look-back window.

use chrono::{DateTime, Datelike, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;

use crate::db::models::{Interaction, PersonHistory};

/// Trend of the current streak
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreakDirection {
    Up,
    Down,
    None,
}

/// Signed run length of the most recent same-signed outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Streak {
    pub current: i64,
    pub direction: StreakDirection,
}

impl Streak {
    pub fn from_signed(current: i64) -> Self {
        let direction = match current.signum() {
            1 => StreakDirection::Up,
            -1 => StreakDirection::Down,
            _ => StreakDirection::None,
        };
        Self { current, direction }
    }
}

/// Most recent rating received
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LastRating {
    /// Point outcome of the newest interaction, 0 without history
    pub change: i64,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Derived statistics for one person. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreSnapshot {
    pub total_points: i64,
    pub clip_count: usize,
    pub streak: Streak,
    pub best_streak: u32,
    pub avg_points_per_day: f64,
    pub ytd_points: i64,
    pub last_rating: LastRating,
}

/// Compute every per-person statistic from one newest-first history
pub fn compute_snapshot(history: &[Interaction], now: DateTime<Utc>) -> ScoreSnapshot {
    let mut total_points = 0;
    let mut ytd_points = 0;
    for interaction in history {
        total_points += interaction.point_outcome;
        if interaction.created_at.year() == now.year() {
            ytd_points += interaction.point_outcome;
        }
    }

    let outcomes_newest_first = history.iter().map(|i| i.point_outcome);

    ScoreSnapshot {
        total_points,
        clip_count: history.len(),
        streak: Streak::from_signed(current_streak(outcomes_newest_first.clone())),
        best_streak: best_streak(outcomes_newest_first.rev()),
        avg_points_per_day: average_points_per_day(total_points, history.last(), now),
        ytd_points,
        last_rating: LastRating {
            change: history.first().map(|i| i.point_outcome).unwrap_or(0),
            timestamp: history.first().map(|i| i.created_at),
        },
    }
}

/// Signed length of the leading run of same-signed outcomes (newest first)
pub fn current_streak<I>(outcomes_newest_first: I) -> i64
where
    I: IntoIterator<Item = i64>,
{
    let mut outcomes = outcomes_newest_first.into_iter();
    let sign = match outcomes.next() {
        Some(first) => first.signum(),
        None => return 0,
    };
    if sign == 0 {
        return 0;
    }

    let run = 1 + outcomes.take_while(|o| o.signum() == sign).count() as i64;
    run * sign
}

/// Longest run of consecutive likes anywhere in the history (oldest first)
pub fn best_streak<I>(outcomes_oldest_first: I) -> u32
where
    I: IntoIterator<Item = i64>,
{
    let mut best = 0;
    let mut run = 0;
    for outcome in outcomes_oldest_first {
        if outcome > 0 {
            run += 1;
            best = best.max(run);
        } else {
            run = 0;
        }
    }
    best
}

fn average_points_per_day(
    total_points: i64,
    oldest: Option<&Interaction>,
    now: DateTime<Utc>,
) -> f64 {
    let Some(oldest) = oldest else {
        return 0.0;
    };
    let days = (now.date_naive() - oldest.created_at.date_naive()).num_days() + 1;
    total_points as f64 / days.max(1) as f64
}

/// Competition ranks for a set of totals: 1 + count of strictly higher totals
pub fn competition_ranks<'a, I>(totals: I) -> HashMap<String, u32>
where
    I: IntoIterator<Item = (&'a str, i64)>,
{
    let totals: Vec<(&str, i64)> = totals.into_iter().collect();
    let mut sorted: Vec<i64> = totals.iter().map(|(_, points)| *points).collect();
    sorted.sort_unstable_by(|a, b| b.cmp(a));

    totals
        .iter()
        .map(|(name, points)| {
            let higher = sorted.partition_point(|other| other > points);
            (name.to_string(), higher as u32 + 1)
        })
        .collect()
}

/// Leaderboard position and its movement over the look-back window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    pub current: u32,
    /// Positive when the person climbed
    pub change: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryStats {
    pub position: Position,
    pub ytd_points: i64,
    pub last_rating: LastRating,
    pub streak: Streak,
    pub best_streak: u32,
    pub avg_points_per_day: f64,
}

/// One leaderboard row, as rendered by the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub id: String,
    pub name: String,
    pub avatar: String,
    pub points: i64,
    pub clip_count: usize,
    pub stats: EntryStats,
}

/// Build the full leaderboard from one snapshot of all histories
///
/// Entries are ordered by position, then name.
pub fn build_leaderboard(
    histories: &[PersonHistory],
    now: DateTime<Utc>,
    position_window: Duration,
) -> Vec<LeaderboardEntry> {
    let snapshots: Vec<ScoreSnapshot> = histories
        .iter()
        .map(|h| compute_snapshot(&h.received, now))
        .collect();

    let current_ranks = competition_ranks(
        histories
            .iter()
            .zip(&snapshots)
            .map(|(h, s)| (h.person.name.as_str(), s.total_points)),
    );

    let cutoff = now - position_window;
    let previous_ranks = competition_ranks(histories.iter().map(|h| {
        let points = h
            .received
            .iter()
            .filter(|i| i.created_at < cutoff)
            .map(|i| i.point_outcome)
            .sum();
        (h.person.name.as_str(), points)
    }));

    let mut entries: Vec<LeaderboardEntry> = histories
        .iter()
        .zip(snapshots)
        .map(|(history, snapshot)| {
            let name = &history.person.name;
            let current = current_ranks.get(name).copied().unwrap_or(1);
            let previous = previous_ranks.get(name).copied().unwrap_or(current);

            LeaderboardEntry {
                id: name.clone(),
                name: name.clone(),
                avatar: history.person.avatar.clone(),
                points: snapshot.total_points,
                clip_count: snapshot.clip_count,
                stats: EntryStats {
                    position: Position {
                        current,
                        change: previous as i64 - current as i64,
                    },
                    ytd_points: snapshot.ytd_points,
                    last_rating: snapshot.last_rating,
                    streak: snapshot.streak,
                    best_streak: snapshot.best_streak,
                    avg_points_per_day: snapshot.avg_points_per_day,
                },
            }
        })
        .collect();

    entries.sort_by(|a, b| {
        a.stats
            .position
            .current
            .cmp(&b.stats.position.current)
            .then_with(|| a.name.cmp(&b.name))
    });
    entries
}
