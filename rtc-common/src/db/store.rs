//! Interaction store
//!
//! Persists immutable rating events and serves the read queries the score
//! aggregator consumes. Writes are single transactions, so a failed write
//! leaves nothing behind; reads of the whole leaderboard run inside one read
//! transaction and therefore observe one snapshot.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

use super::init::{format_timestamp, parse_timestamp};
use super::models::{validate_person_id, Interaction, Outcome, Person, PersonHistory};
use crate::{Error, Result};

/// Read/write contract for rating events
#[async_trait]
pub trait InteractionStore: Send + Sync {
    /// Append one interaction. Both persons must exist; self-rating is rejected.
    async fn record_interaction(
        &self,
        initiator: &str,
        receiver: &str,
        outcome: Outcome,
    ) -> Result<Interaction>;

    /// Full received history of one person, newest first
    async fn list_received_interactions(&self, person: &str) -> Result<Vec<Interaction>>;

    /// Every person with their received history, from one consistent snapshot
    async fn list_all_persons_with_history(&self) -> Result<Vec<PersonHistory>>;
}

/// SQLite-backed interaction store
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Register a person. Persons are created out-of-band, never by rating.
    pub async fn create_person(&self, name: &str, avatar: Option<&str>) -> Result<Person> {
        validate_person_id(name)?;

        let person = Person {
            name: name.to_string(),
            avatar: avatar
                .map(str::to_string)
                .unwrap_or_else(|| default_avatar(name)),
            created_at: Utc::now(),
        };

        let result = sqlx::query(
            "INSERT INTO persons (name, avatar, created_at) VALUES (?, ?, ?)
             ON CONFLICT(name) DO NOTHING",
        )
        .bind(&person.name)
        .bind(&person.avatar)
        .bind(format_timestamp(&person.created_at))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::Validation(format!("Person already exists: {}", name)));
        }

        info!(person = %person.name, "Registered person");
        Ok(person)
    }

    pub async fn get_person(&self, name: &str) -> Result<Person> {
        validate_person_id(name)?;
        let mut conn = self.pool.acquire().await?;
        fetch_person(&mut conn, name).await
    }

    /// All persons, ordered by name
    pub async fn list_persons(&self) -> Result<Vec<Person>> {
        let rows = sqlx::query("SELECT name, avatar, created_at FROM persons ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(person_from_row).collect()
    }
}

#[async_trait]
impl InteractionStore for SqliteStore {
    async fn record_interaction(
        &self,
        initiator: &str,
        receiver: &str,
        outcome: Outcome,
    ) -> Result<Interaction> {
        let mut tx = self.pool.begin().await?;
        let interaction =
            insert_interaction(&mut *tx, initiator, receiver, outcome, Utc::now()).await?;
        tx.commit().await?;
        Ok(interaction)
    }

    async fn list_received_interactions(&self, person: &str) -> Result<Vec<Interaction>> {
        validate_person_id(person)?;
        let mut conn = self.pool.acquire().await?;
        fetch_person(&mut conn, person).await?;

        let rows = sqlx::query(
            r#"
            SELECT guid, initiator, receiver, point_outcome, created_at
            FROM interactions
            WHERE receiver = ?
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(person)
        .fetch_all(&mut *conn)
        .await?;

        rows.iter().map(interaction_from_row).collect()
    }

    async fn list_all_persons_with_history(&self) -> Result<Vec<PersonHistory>> {
        let mut tx = self.pool.begin().await?;

        let person_rows = sqlx::query("SELECT name, avatar, created_at FROM persons ORDER BY name")
            .fetch_all(&mut *tx)
            .await?;

        let interaction_rows = sqlx::query(
            r#"
            SELECT guid, initiator, receiver, point_outcome, created_at
            FROM interactions
            ORDER BY receiver, created_at DESC, id DESC
            "#,
        )
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        let mut received: HashMap<String, Vec<Interaction>> = HashMap::new();
        for row in &interaction_rows {
            let interaction = interaction_from_row(row)?;
            received
                .entry(interaction.receiver.clone())
                .or_default()
                .push(interaction);
        }

        let histories = person_rows
            .iter()
            .map(|row| {
                let person = person_from_row(row)?;
                let received = received.remove(&person.name).unwrap_or_default();
                Ok(PersonHistory { person, received })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            persons = histories.len(),
            interactions = interaction_rows.len(),
            "Loaded leaderboard snapshot"
        );
        Ok(histories)
    }
}

/// Insert one interaction on an open connection or transaction
///
/// The insert is the first statement so a deferred transaction takes the
/// write lock up front (and waits on the busy timeout) instead of failing
/// on a read-to-write upgrade. Missing persons leave the row unwritten and
/// are reported as NotFound.
pub async fn insert_interaction(
    conn: &mut SqliteConnection,
    initiator: &str,
    receiver: &str,
    outcome: Outcome,
    created_at: DateTime<Utc>,
) -> Result<Interaction> {
    validate_person_id(initiator)?;
    validate_person_id(receiver)?;
    if initiator == receiver {
        return Err(Error::Validation(format!(
            "Self-rating is not allowed: {}",
            initiator
        )));
    }

    let interaction = Interaction {
        guid: Uuid::new_v4(),
        initiator: initiator.to_string(),
        receiver: receiver.to_string(),
        point_outcome: outcome.points(),
        created_at,
    };

    let result = sqlx::query(
        r#"
        INSERT INTO interactions (guid, initiator, receiver, point_outcome, created_at)
        SELECT ?, ?, ?, ?, ?
        WHERE EXISTS (SELECT 1 FROM persons WHERE name = ?)
          AND EXISTS (SELECT 1 FROM persons WHERE name = ?)
        "#,
    )
    .bind(interaction.guid.to_string())
    .bind(&interaction.initiator)
    .bind(&interaction.receiver)
    .bind(interaction.point_outcome)
    .bind(format_timestamp(&interaction.created_at))
    .bind(&interaction.initiator)
    .bind(&interaction.receiver)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        fetch_person(conn, initiator).await?;
        fetch_person(conn, receiver).await?;
        return Err(Error::Internal(format!(
            "Interaction {} -> {} was not written",
            initiator, receiver
        )));
    }

    debug!(
        initiator = %interaction.initiator,
        receiver = %interaction.receiver,
        points = interaction.point_outcome,
        "Recorded interaction"
    );
    Ok(interaction)
}

/// Load a person or fail with NotFound
pub async fn fetch_person(conn: &mut SqliteConnection, name: &str) -> Result<Person> {
    let row = sqlx::query("SELECT name, avatar, created_at FROM persons WHERE name = ?")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(row) => person_from_row(&row),
        None => Err(Error::NotFound(format!("Person not found: {}", name))),
    }
}

fn default_avatar(name: &str) -> String {
    format!("/image/{}", name)
}

fn person_from_row(row: &SqliteRow) -> Result<Person> {
    let created_at: String = row.try_get("created_at")?;
    Ok(Person {
        name: row.try_get("name")?,
        avatar: row.try_get("avatar")?,
        created_at: parse_timestamp(&created_at)?,
    })
}

fn interaction_from_row(row: &SqliteRow) -> Result<Interaction> {
    let guid: String = row.try_get("guid")?;
    let guid = Uuid::parse_str(&guid)
        .map_err(|e| Error::Internal(format!("Corrupt interaction guid '{}': {}", guid, e)))?;
    let created_at: String = row.try_get("created_at")?;

    Ok(Interaction {
        guid,
        initiator: row.try_get("initiator")?,
        receiver: row.try_get("receiver")?,
        point_outcome: row.try_get("point_outcome")?,
        created_at: parse_timestamp(&created_at)?,
    })
}
