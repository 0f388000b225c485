//! Database initialization
//!
//! Creates the database on first run and the schema idempotently on every
//! start. Connections enable foreign keys, WAL journaling and a busy timeout
//! so concurrent rating requests serialize at the storage layer.

use crate::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Busy timeout applied to every connection
pub const BUSY_TIMEOUT_MS: u64 = 5000;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables and indexes (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_persons_table(pool).await?;
    create_interactions_table(pool).await?;
    create_rating_sessions_table(pool).await?;
    create_rating_session_clips_table(pool).await?;
    Ok(())
}

async fn create_persons_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS persons (
            name TEXT PRIMARY KEY,
            avatar TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_interactions_table(pool: &SqlitePool) -> Result<()> {
    // Append-only: rows are never updated or deleted by the service
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS interactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            guid TEXT NOT NULL UNIQUE,
            initiator TEXT NOT NULL REFERENCES persons(name),
            receiver TEXT NOT NULL REFERENCES persons(name),
            point_outcome INTEGER NOT NULL CHECK (point_outcome IN (-1, 1)),
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_interactions_receiver
         ON interactions(receiver, created_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_rating_sessions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS rating_sessions (
            guid TEXT PRIMARY KEY,
            rater TEXT NOT NULL REFERENCES persons(name),
            created_at TEXT NOT NULL,
            completed_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_rating_session_clips_table(pool: &SqlitePool) -> Result<()> {
    // interaction_guid is NULL while the clip is unrated
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS rating_session_clips (
            session_guid TEXT NOT NULL REFERENCES rating_sessions(guid),
            receiver TEXT NOT NULL REFERENCES persons(name),
            position INTEGER NOT NULL,
            interaction_guid TEXT REFERENCES interactions(guid),
            PRIMARY KEY (session_guid, receiver)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Format a timestamp for storage (fixed-width RFC 3339, UTC, microseconds)
///
/// Fixed width keeps lexical order equal to chronological order.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Corrupt timestamp '{}': {}", raw, e)))
}
