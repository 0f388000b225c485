//! Integration tests for rtc-server API endpoints
//!
//! Tests cover:
//! - Health endpoint
//! - Image and closest-duration clip serving
//! - Leaderboard ordering and per-person score
//! - Rating session lifecycle (create, rate, double rate, complete, purge)
//! - Error mapping for unknown persons and sessions

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use rtc_common::config::MediaConfig;
use rtc_common::db::{init_database, InteractionStore, Outcome, SqliteStore};
use rtc_common::{Error, Result};
use rtc_server::media::{DurationProbe, MediaLocator};
use rtc_server::{build_router, AppState, ServiceSettings};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method

/// Probe that reads the clip duration from the file body
struct ContentProbe;

#[async_trait]
impl DurationProbe for ContentProbe {
    async fn probe_duration(&self, path: &Path) -> Result<f64> {
        let raw = tokio::fs::read_to_string(path).await?;
        raw.trim()
            .parse()
            .map_err(|_| Error::ExternalTool(format!("unreadable duration in {}", path.display())))
    }
}

struct TestApp {
    dir: TempDir,
    store: SqliteStore,
    router: axum::Router,
}

/// Test helper: root folder with alice, bob and carol registered
async fn setup_app(purge_rated_clips: bool) -> TestApp {
    let dir = tempfile::tempdir().expect("Should create temp dir");
    let pool = init_database(&dir.path().join("rtc.db"))
        .await
        .expect("Should initialize database");

    let store = SqliteStore::new(pool.clone());
    for name in ["alice", "bob", "carol"] {
        store.create_person(name, None).await.expect("Should create person");
    }

    let media = MediaLocator::new(
        dir.path().join("faces"),
        dir.path().join("interactions"),
        &MediaConfig::default(),
        Arc::new(ContentProbe),
    );
    let settings = ServiceSettings {
        position_window_hours: 24,
        purge_rated_clips,
    };

    let router = build_router(AppState::new(pool, media, settings));
    TestApp { dir, store, router }
}

fn write_file(path: &Path, content: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn write_clip(root: &Path, person: &str, file: &str, duration: f64) {
    write_file(
        &root.join("interactions").join(person).join(file),
        &duration.to_string(),
    );
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_empty(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Vec<u8>, Option<String>) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Should read body");
    (status, bytes.to_vec(), content_type)
}

async fn send_json(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let (status, bytes, _) = send(app, request).await;
    let value = serde_json::from_slice(&bytes).expect("Should parse JSON");
    (status, value)
}

// =============================================================================
// Health and media
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = setup_app(false).await;
    let (status, json) = send_json(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "rtc-server");
}

#[tokio::test]
async fn test_image_served_with_content_type() {
    let app = setup_app(false).await;
    write_file(&app.dir.path().join("faces/alice/portrait.jpg"), "jpeg bytes");

    let (status, body, content_type) = send(&app, get("/image/alice")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("image/jpeg"));
    assert_eq!(body, b"jpeg bytes");
}

#[tokio::test]
async fn test_image_missing_is_404() {
    let app = setup_app(false).await;
    let (status, json) = send_json(&app, get("/image/bob")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_image_invalid_name_is_400() {
    let app = setup_app(false).await;
    let (status, _) = send_json(&app, get("/image/not%20valid")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_video_closest_to_target_duration() {
    let app = setup_app(false).await;
    let root = app.dir.path();
    write_clip(root, "bob", "a.mov", 3.0);
    write_clip(root, "bob", "b.mov", 4.8);
    write_clip(root, "bob", "c.mov", 7.0);
    write_file(&root.join("interactions/bob/broken.mov"), "not a duration");

    let (status, body, content_type) = send(&app, get("/videos/bob")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("video/quicktime"));
    assert_eq!(body, b"4.8");
}

#[tokio::test]
async fn test_video_missing_is_404() {
    let app = setup_app(false).await;
    let (status, _) = send_json(&app, get("/videos/carol")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_video_io_failure_is_500_without_details() {
    let app = setup_app(false).await;
    // A regular file where the clip directory should be
    write_file(&app.dir.path().join("interactions/bob"), "not a directory");

    let (status, json) = send_json(&app, get("/videos/bob")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json, json!({ "error": "Internal server error" }));
}

// =============================================================================
// Persons and leaderboard
// =============================================================================

#[tokio::test]
async fn test_list_persons() {
    let app = setup_app(false).await;
    let (status, json) = send_json(&app, get("/api/persons")).await;

    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["alice", "bob", "carol"]);
    assert_eq!(json[0]["avatar"], "/image/alice");
}

#[tokio::test]
async fn test_leaderboard_ordering_and_ties() {
    let app = setup_app(false).await;
    app.store.record_interaction("alice", "bob", Outcome::Like).await.unwrap();
    app.store.record_interaction("carol", "bob", Outcome::Like).await.unwrap();
    app.store.record_interaction("bob", "carol", Outcome::Like).await.unwrap();
    app.store.record_interaction("alice", "carol", Outcome::Dislike).await.unwrap();

    let (status, json) = send_json(&app, get("/api/leaderboard")).await;
    assert_eq!(status, StatusCode::OK);

    let entries = json.as_array().unwrap();
    assert_eq!(entries.len(), 3);

    assert_eq!(entries[0]["id"], "bob");
    assert_eq!(entries[0]["points"], 2);
    assert_eq!(entries[0]["clip_count"], 2);
    assert_eq!(entries[0]["stats"]["position"]["current"], 1);
    assert_eq!(entries[0]["stats"]["position"]["change"], 0);
    assert_eq!(entries[0]["stats"]["streak"]["current"], 2);
    assert_eq!(entries[0]["stats"]["streak"]["direction"], "up");

    // alice and carol are tied on zero and share second place
    assert_eq!(entries[1]["id"], "alice");
    assert_eq!(entries[1]["stats"]["position"]["current"], 2);
    assert_eq!(entries[2]["id"], "carol");
    assert_eq!(entries[2]["points"], 0);
    assert_eq!(entries[2]["stats"]["position"]["current"], 2);
}

#[tokio::test]
async fn test_person_score_and_history() {
    let app = setup_app(false).await;
    app.store.record_interaction("alice", "carol", Outcome::Dislike).await.unwrap();
    app.store.record_interaction("bob", "carol", Outcome::Dislike).await.unwrap();

    let (status, json) = send_json(&app, get("/api/persons/carol/score")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["points"], -2);
    assert_eq!(json["stats"]["streak"]["current"], -2);
    assert_eq!(json["stats"]["streak"]["direction"], "down");
    assert_eq!(json["stats"]["best_streak"], 0);
    assert_eq!(json["stats"]["last_rating"]["change"], -1);

    let (status, json) = send_json(&app, get("/api/persons/carol/interactions")).await;
    assert_eq!(status, StatusCode::OK);
    let history = json.as_array().unwrap();
    assert_eq!(history.len(), 2);
    // Newest first
    assert_eq!(history[0]["initiator"], "bob");
    assert_eq!(history[1]["initiator"], "alice");
}

#[tokio::test]
async fn test_unknown_person_is_404() {
    let app = setup_app(false).await;

    let (status, _) = send_json(&app, get("/api/persons/dave/score")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send_json(&app, get("/api/persons/dave/interactions")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Rating sessions
// =============================================================================

/// Clips for every registered person plus one unregistered directory
fn seed_clips(root: &Path) {
    for person in ["alice", "bob", "carol", "ghost"] {
        write_clip(root, person, "clip.mov", 5.0);
    }
}

async fn open_session(app: &TestApp, rater: &str) -> Value {
    let request = post_json("/api/sessions", json!({ "rater": rater }));
    let (status, json) = send_json(app, request).await;
    assert_eq!(status, StatusCode::CREATED, "unexpected body: {}", json);
    json
}

#[tokio::test]
async fn test_session_offers_other_registered_clip_owners() {
    let app = setup_app(false).await;
    seed_clips(app.dir.path());

    let session = open_session(&app, "alice").await;
    assert_eq!(session["rater"], "alice");
    assert!(session["completed_at"].is_null());

    let clips = session["clips"].as_array().unwrap();
    let receivers: Vec<&str> = clips.iter().map(|c| c["receiver"].as_str().unwrap()).collect();
    assert_eq!(receivers, vec!["bob", "carol"]);
    assert_eq!(clips[0]["state"], "unrated");
    assert_eq!(clips[0]["video_url"], "/videos/bob");
    assert_eq!(clips[0]["image_url"], "/image/bob");

    assert_eq!(session["progress"]["rated"], 0);
    assert_eq!(session["progress"]["total"], 2);
    assert_eq!(session["progress"]["percent"], 0);
}

#[tokio::test]
async fn test_session_for_unknown_rater_is_404() {
    let app = setup_app(false).await;
    seed_clips(app.dir.path());

    let (status, _) = send_json(&app, post_json("/api/sessions", json!({ "rater": "dave" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rate_clip_records_interaction_once() {
    let app = setup_app(false).await;
    seed_clips(app.dir.path());
    let session = open_session(&app, "alice").await;
    let id = session["session_id"].as_str().unwrap().to_string();
    let ratings_uri = format!("/api/sessions/{}/ratings", id);

    let (status, json) = send_json(
        &app,
        post_json(&ratings_uri, json!({ "clip": "bob", "outcome": "like" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["interaction"]["initiator"], "alice");
    assert_eq!(json["interaction"]["receiver"], "bob");
    assert_eq!(json["interaction"]["point_outcome"], 1);
    assert_eq!(json["progress"]["rated"], 1);
    assert_eq!(json["progress"]["percent"], 50);

    // Second rating of the same clip is refused and records nothing
    let (status, _) = send_json(
        &app,
        post_json(&ratings_uri, json!({ "clip": "bob", "outcome": "dislike" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let history = app.store.list_received_interactions("bob").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].point_outcome, 1);

    // Clip not offered in this session
    let (status, _) = send_json(
        &app,
        post_json(&ratings_uri, json!({ "clip": "alice", "outcome": "like" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = send_json(&app, get(&format!("/api/sessions/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["clips"][0]["state"], "rated");
    assert_eq!(json["clips"][0]["outcome"], "like");
    assert_eq!(json["clips"][1]["state"], "unrated");
}

#[tokio::test]
async fn test_malformed_rating_body_is_400() {
    let app = setup_app(false).await;
    seed_clips(app.dir.path());
    let session = open_session(&app, "alice").await;
    let id = session["session_id"].as_str().unwrap().to_string();

    let (status, json) = send_json(
        &app,
        post_json(
            &format!("/api/sessions/{}/ratings", id),
            json!({ "clip": "bob", "outcome": "meh" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("meh"));

    // Nothing was recorded and the clip is still open
    assert!(app.store.list_received_interactions("bob").await.unwrap().is_empty());
    let (_, json) = send_json(&app, get(&format!("/api/sessions/{}", id))).await;
    assert_eq!(json["clips"][0]["state"], "unrated");
}

#[tokio::test]
async fn test_session_request_missing_rater_is_400() {
    let app = setup_app(false).await;

    let (status, json) = send_json(&app, post_json("/api/sessions", json!({ "nobody": 1 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("rater"));

    // Body that is not JSON at all
    let request = Request::builder()
        .method("POST")
        .uri("/api/sessions")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, json) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_complete_session_closes_rating() {
    let app = setup_app(false).await;
    seed_clips(app.dir.path());
    let session = open_session(&app, "alice").await;
    let id = session["session_id"].as_str().unwrap().to_string();

    send_json(
        &app,
        post_json(
            &format!("/api/sessions/{}/ratings", id),
            json!({ "clip": "carol", "outcome": "dislike" }),
        ),
    )
    .await;

    let complete_uri = format!("/api/sessions/{}/complete", id);
    let (status, json) = send_json(&app, post_empty(&complete_uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["completed_at"].is_string());

    // Completing twice is rejected
    let (status, _) = send_json(&app, post_empty(&complete_uri)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // No rating after completion
    let (status, _) = send_json(
        &app,
        post_json(
            &format!("/api/sessions/{}/ratings", id),
            json!({ "clip": "bob", "outcome": "like" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(app.store.list_received_interactions("bob").await.unwrap().is_empty());

    // Clips stay on disk unless purging is enabled
    assert!(app.dir.path().join("interactions/carol").exists());
}

#[tokio::test]
async fn test_complete_session_purges_rated_clips() {
    let app = setup_app(true).await;
    seed_clips(app.dir.path());
    let session = open_session(&app, "alice").await;
    let id = session["session_id"].as_str().unwrap().to_string();

    send_json(
        &app,
        post_json(
            &format!("/api/sessions/{}/ratings", id),
            json!({ "clip": "bob", "outcome": "like" }),
        ),
    )
    .await;

    let (status, _) = send_json(&app, post_empty(&format!("/api/sessions/{}/complete", id))).await;
    assert_eq!(status, StatusCode::OK);

    assert!(!app.dir.path().join("interactions/bob").exists());
    assert!(app.dir.path().join("interactions/carol").exists());
}

#[tokio::test]
async fn test_session_id_errors() {
    let app = setup_app(false).await;

    let (status, _) = send_json(&app, get("/api/sessions/not-a-uuid")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let unknown = uuid::Uuid::new_v4();
    let (status, _) = send_json(&app, get(&format!("/api/sessions/{}", unknown))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
