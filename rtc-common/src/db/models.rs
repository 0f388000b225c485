//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::Error;

/// Person identifier (the unique person name)
pub type PersonId = String;

/// Longest accepted person name
pub const MAX_PERSON_NAME_LEN: usize = 64;

/// A named participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub name: PersonId,
    pub avatar: String,
    pub created_at: DateTime<Utc>,
}

/// Rating decision made by the initiator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Like,
    Dislike,
}

impl Outcome {
    /// Point outcome stored for this decision: +1 like, -1 dislike
    pub fn points(self) -> i64 {
        match self {
            Outcome::Like => 1,
            Outcome::Dislike => -1,
        }
    }

    pub fn from_points(points: i64) -> Option<Self> {
        match points {
            1 => Some(Outcome::Like),
            -1 => Some(Outcome::Dislike),
            _ => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Like => write!(f, "like"),
            Outcome::Dislike => write!(f, "dislike"),
        }
    }
}

/// Immutable rating event from an initiator to a receiver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    pub guid: Uuid,
    pub initiator: PersonId,
    pub receiver: PersonId,
    pub point_outcome: i64,
    pub created_at: DateTime<Utc>,
}

/// A person together with their received interactions, newest first
#[derive(Debug, Clone)]
pub struct PersonHistory {
    pub person: Person,
    pub received: Vec<Interaction>,
}

/// Validate a person identifier
///
/// Names double as directory names under the media tree, so anything that
/// could escape a directory is rejected.
pub fn validate_person_id(name: &str) -> crate::Result<()> {
    if name.is_empty() {
        return Err(Error::Validation("Person id must not be empty".to_string()));
    }
    if name.len() > MAX_PERSON_NAME_LEN {
        return Err(Error::Validation(format!(
            "Person id longer than {} characters",
            MAX_PERSON_NAME_LEN
        )));
    }
    if name == "." || name == ".." {
        return Err(Error::Validation(format!("Invalid person id: {}", name)));
    }
    let valid = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.');
    if !valid {
        return Err(Error::Validation(format!("Invalid person id: {}", name)));
    }
    Ok(())
}
