//! rtc-server library - rate-the-clip HTTP service
//!
//! Serves person images and interaction clips, records like/dislike ratings
//! through rating sessions and computes the leaderboard.

use axum::Router;
use rtc_common::config::TomlConfig;
use rtc_common::db::SqliteStore;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;
pub mod error;
pub mod media;
pub mod rating;

pub use crate::error::{ApiError, ApiResult};

use crate::db::SessionStore;
use crate::media::MediaLocator;

/// Runtime settings handlers need besides storage and media
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// Look-back window for the leaderboard position change
    pub position_window_hours: u32,
    /// Remove rated clip directories when a session completes
    pub purge_rated_clips: bool,
}

impl ServiceSettings {
    pub fn from_config(config: &TomlConfig) -> Self {
        Self {
            position_window_hours: config.leaderboard.position_window_hours,
            purge_rated_clips: config.media.purge_rated_clips,
        }
    }

    pub fn position_window(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.position_window_hours))
    }
}

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Interaction store (persons + interactions)
    pub store: SqliteStore,
    /// Rating session storage
    pub sessions: SessionStore,
    /// Image and clip resolution
    pub media: Arc<MediaLocator>,
    pub settings: Arc<ServiceSettings>,
}

impl AppState {
    pub fn new(db: SqlitePool, media: MediaLocator, settings: ServiceSettings) -> Self {
        Self {
            store: SqliteStore::new(db.clone()),
            sessions: SessionStore::new(db),
            media: Arc::new(media),
            settings: Arc::new(settings),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    Router::new()
        // Media bytes
        .route("/image/:person_id", get(api::get_image))
        .route("/videos/:person_id", get(api::get_video))
        // Persons and leaderboard
        .route("/api/persons", get(api::list_persons))
        .route("/api/persons/:name/interactions", get(api::get_person_interactions))
        .route("/api/persons/:name/score", get(api::get_person_score))
        .route("/api/leaderboard", get(api::get_leaderboard))
        // Rating sessions
        .route("/api/sessions", post(api::create_session))
        .route("/api/sessions/:id", get(api::get_session))
        .route("/api/sessions/:id/ratings", post(api::rate_session_clip))
        .route("/api/sessions/:id/complete", post(api::complete_session))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
