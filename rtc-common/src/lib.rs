//! # Rate-the-Clip Common Library
//!
//! Shared code for the rate-the-clip service including:
//! - Error taxonomy
//! - Configuration loading and root folder resolution
//! - Database schema, models and the interaction store
//! - Score aggregation (leaderboard math)

pub mod config;
pub mod db;
pub mod error;
pub mod scoring;

pub use error::{Error, Result};
