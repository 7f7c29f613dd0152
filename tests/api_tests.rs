use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};

use tunematch::{
    db::{CatalogStore, MemoryStore},
    models::{Song, SongId},
    routes::{create_router, AppState},
};

fn song(sid: &str, title: &str, artist: &str, genre: &str, duration: f64) -> Song {
    Song {
        sid: SongId::from(sid),
        title: title.to_string(),
        artist: artist.to_string(),
        genres: vec![genre.to_string()],
        duration,
        audio_path: None,
        audio_download_path: None,
    }
}

async fn create_test_server() -> TestServer {
    let store = Arc::new(MemoryStore::new());
    store
        .seed_songs(&[
            song("j1", "So What", "Miles Davis", "Jazz", 545.0),
            song("j2", "Take Five", "Dave Brubeck", "Jazz", 324.0),
            song("j3", "Blue in Green", "Bill Evans", "Jazz", 337.0),
            song("r1", "Paranoid", "Black Sabbath", "Rock", 170.0),
            song("r2", "Iron Man", "Black Sabbath", "Rock", 356.0),
            song("p1", "Levitating", "Dua Lipa", "Pop", 203.0),
        ])
        .await
        .unwrap();

    let state = Arc::new(AppState::new(store, None, 60));
    TestServer::new(create_router(state)).unwrap()
}

async fn register(server: &TestServer, username: &str) -> String {
    let response = server
        .post("/api/v1/users/register")
        .json(&json!({
            "username": username,
            "password": "hunter22",
            "country": "NL"
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let user: Value = response.json();
    user["uid"].as_str().unwrap().to_string()
}

async fn play(server: &TestServer, uid: &str, sid: &str) {
    server
        .post(&format!("/api/v1/user-actions/{}/{}/play", uid, sid))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_health_check_echoes_request_id() {
    let server = create_test_server().await;

    let response = server
        .get("/health")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("trace-abc"),
        )
        .await;
    response.assert_status_ok();
    assert_eq!(response.header("x-request-id"), "trace-abc");

    let response = server.get("/health").await;
    assert!(!response.header("x-request-id").is_empty());
}

#[tokio::test]
async fn test_register_login_and_duplicates() {
    let server = create_test_server().await;
    let uid = register(&server, "alice").await;

    let response = server
        .post("/api/v1/users/register")
        .json(&json!({ "username": "alice", "password": "another1" }))
        .await;
    response.assert_status(StatusCode::CONFLICT);

    let response = server
        .post("/api/v1/users/login")
        .json(&json!({ "username": "alice", "password": "hunter22" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["user"]["uid"], uid);
    assert!(body["user"].get("password_hash").is_none());

    let response = server
        .post("/api/v1/users/login")
        .json(&json!({ "username": "alice", "password": "wrong-pass" }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_validation_failures_are_bad_requests() {
    let server = create_test_server().await;
    let uid = register(&server, "bob").await;

    server
        .post("/api/v1/users/register")
        .json(&json!({ "username": "", "password": "hunter22" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    server
        .put(&format!("/api/v1/users/{}", uid))
        .json(&json!({}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    server
        .post("/api/v1/playlists")
        .json(&json!({ "uid": uid, "name": "   " }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    server
        .get("/api/v1/matching/candidates")
        .add_query_param("current_uid", &uid)
        .add_query_param("limit", 0)
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    server
        .get("/api/v1/dashboard/global/top-songs")
        .add_query_param("limit", 1000)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_like_like_back_and_repeat() {
    let server = create_test_server().await;
    let alice = register(&server, "alice").await;
    let bob = register(&server, "bob").await;

    let response = server
        .post("/api/v1/matching/like")
        .json(&json!({ "liker_id": alice, "liked_id": bob }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let record: Value = response.json();
    assert_eq!(record["matched"], false);
    // Neither user has listened to anything
    assert_eq!(record["similarity_score"], 0.0);

    let response = server.get(&format!("/api/v1/matching/matches/{}", alice)).await;
    response.assert_status_ok();
    let matches: Vec<Value> = response.json();
    assert!(matches.is_empty());

    let response = server
        .post("/api/v1/matching/like")
        .json(&json!({ "liker_id": bob, "liked_id": alice }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let record: Value = response.json();
    assert_eq!(record["matched"], true);
    assert!(!record["matched_at"].is_null());

    server
        .post("/api/v1/matching/like")
        .json(&json!({ "liker_id": alice, "liked_id": bob }))
        .await
        .assert_status(StatusCode::CONFLICT);

    let response = server.get(&format!("/api/v1/matching/matches/{}", bob)).await;
    let matches: Vec<Value> = response.json();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0]["uid"], alice);
    assert_eq!(matches[0]["matched"], true);

    server
        .post("/api/v1/matching/like")
        .json(&json!({ "liker_id": alice, "liked_id": alice }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_candidates_exclude_requester_and_liked() {
    let server = create_test_server().await;
    let alice = register(&server, "alice").await;
    let bob = register(&server, "bob").await;
    let carol = register(&server, "carol").await;

    play(&server, &alice, "j1").await;
    play(&server, &bob, "j1").await;
    play(&server, &carol, "r1").await;

    let response = server
        .get("/api/v1/matching/candidates")
        .add_query_param("current_uid", &alice)
        .add_query_param("limit", 10)
        .await;
    response.assert_status_ok();
    let page: Value = response.json();
    let candidates = page["candidates"].as_array().unwrap();
    assert_eq!(page["total_candidates"], 2);
    assert!(candidates.iter().all(|c| c["uid"] != alice.as_str()));
    assert_eq!(candidates[0]["uid"], bob);
    assert_eq!(candidates[1]["similarity_score"], 0.0);

    server
        .post("/api/v1/matching/like")
        .json(&json!({ "liker_id": alice, "liked_id": bob }))
        .await
        .assert_status(StatusCode::CREATED);

    let response = server
        .get("/api/v1/matching/candidates")
        .add_query_param("current_uid", &alice)
        .await;
    let page: Value = response.json();
    let candidates = page["candidates"].as_array().unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0]["uid"], carol);
}

#[tokio::test]
async fn test_toggle_favourite_twice_mirrors_playlist() {
    let server = create_test_server().await;
    let uid = register(&server, "dana").await;

    let toggle = format!("/api/v1/user-actions/{}/j2/toggle-favourite", uid);
    let flag = format!("/api/v1/user-actions/{}/j2/is-favourite", uid);

    let response = server.post(&toggle).await;
    response.assert_status_ok();
    let interaction: Value = response.json();
    assert_eq!(interaction["favourite"], true);

    let response = server
        .get(&format!("/api/v1/playlists/user/{}/favourite", uid))
        .await;
    response.assert_status_ok();
    let favourites: Value = response.json();
    let pid = favourites["pid"].as_str().unwrap().to_string();
    assert_eq!(favourites["is_favourites"], true);

    let songs: Vec<String> = server
        .get(&format!("/api/v1/playlist-songs/{}", pid))
        .await
        .json();
    assert_eq!(songs, vec!["j2".to_string()]);

    let response = server.post(&toggle).await;
    let interaction: Value = response.json();
    assert_eq!(interaction["favourite"], false);

    let body: Value = server.get(&flag).await.json();
    assert_eq!(body["is_favourite"], false);

    let songs: Vec<String> = server
        .get(&format!("/api/v1/playlist-songs/{}", pid))
        .await
        .json();
    assert!(songs.is_empty());

    // The favourites playlist only changes through toggling
    server
        .post("/api/v1/playlist-songs")
        .json(&json!({ "pid": pid, "sid": "j1" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    server
        .delete(&format!("/api/v1/playlists/{}", pid))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_playlist_lifecycle() {
    let server = create_test_server().await;
    let uid = register(&server, "erin").await;

    let response = server
        .post("/api/v1/playlists")
        .json(&json!({ "uid": uid, "name": "Late night" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let playlist: Value = response.json();
    let pid = playlist["pid"].as_str().unwrap().to_string();

    server
        .post("/api/v1/playlist-songs")
        .json(&json!({ "pid": pid, "sid": "j3" }))
        .await
        .assert_status(StatusCode::CREATED);
    server
        .post("/api/v1/playlist-songs")
        .json(&json!({ "pid": pid, "sid": "j3" }))
        .await
        .assert_status(StatusCode::CONFLICT);
    server
        .post("/api/v1/playlist-songs")
        .json(&json!({ "pid": pid, "sid": "missing" }))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    server
        .delete(&format!("/api/v1/playlists/{}", pid))
        .await
        .assert_status_ok();
    server
        .get(&format!("/api/v1/playlists/{}", pid))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let response = server.get(&format!("/api/v1/playlist-songs/{}", pid)).await;
    response.assert_status_ok();
    let songs: Vec<String> = response.json();
    assert!(songs.is_empty());
}

#[tokio::test]
async fn test_song_recommendations_follow_taste() {
    let server = create_test_server().await;
    let uid = register(&server, "frank").await;

    // Jazz favourites of 324s and 545s: the duration band spans both
    for sid in ["j1", "j2"] {
        server
            .post(&format!("/api/v1/user-actions/{}/{}/toggle-favourite", uid, sid))
            .await
            .assert_status_ok();
    }

    let recommend = format!("/api/v1/songs/recommendations/{}", uid);
    let response = server.get(&recommend).add_query_param("limit", 5).await;
    response.assert_status_ok();
    let songs: Vec<Value> = response.json();
    let sids: Vec<&str> = songs.iter().map(|s| s["sid"].as_str().unwrap()).collect();

    // j3 matches genre and duration, r2 only duration; r1 and p1 match nothing
    assert_eq!(sids, vec!["j3", "r2"]);
    assert_eq!(songs[0]["reason"], "top_genre");
    assert_eq!(songs[1]["reason"], "duration_match");
    assert!(songs[0]["score"].as_f64().unwrap() > songs[1]["score"].as_f64().unwrap());

    let response = server
        .get(&format!("/api/v1/recommendations/{}", uid))
        .add_query_param("target_type", "song")
        .await;
    response.assert_status_ok();
    let stored: Vec<Value> = response.json();
    assert_eq!(stored.len(), 2);
    assert!(stored.iter().all(|r| r["target_type"] == "song"));

    // a song played just now is excluded from the very next request
    play(&server, &uid, "j3").await;
    let songs: Vec<Value> = server
        .get(&recommend)
        .add_query_param("limit", 5)
        .await
        .json();
    assert!(songs.iter().all(|s| s["sid"] != "j3"));
}

#[tokio::test]
async fn test_interaction_crud_and_dashboard() {
    let server = create_test_server().await;
    let uid = register(&server, "gina").await;

    let response = server
        .post("/api/v1/user-actions")
        .json(&json!({ "uid": uid, "sid": "p1", "total_plays": 3, "rating": 4 }))
        .await;
    response.assert_status(StatusCode::CREATED);

    server
        .post("/api/v1/user-actions")
        .json(&json!({ "uid": uid, "sid": "p1" }))
        .await
        .assert_status(StatusCode::CONFLICT);

    server
        .put(&format!("/api/v1/user-actions/{}/p1", uid))
        .json(&json!({ "total_plays": 1 }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let response = server
        .put(&format!("/api/v1/user-actions/{}/p1", uid))
        .json(&json!({ "total_plays": 5 }))
        .await;
    response.assert_status_ok();
    let interaction: Value = response.json();
    assert_eq!(interaction["total_plays"], 5);

    let response = server
        .get(&format!("/api/v1/users/{}/total_listen_duration", uid))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["total_listen_seconds"], 5.0 * 203.0);

    let response = server.get("/api/v1/dashboard/global/top-artists").await;
    response.assert_status_ok();
    let artists: Vec<Value> = response.json();
    assert_eq!(artists[0]["artist"], "Dua Lipa");
    assert_eq!(artists[0]["plays"], 5);

    server
        .delete(&format!("/api/v1/user-actions/{}/p1", uid))
        .await
        .assert_status_ok();
    server
        .get(&format!("/api/v1/user-actions/{}/p1", uid))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let response = server.get(&format!("/api/v1/dashboard/profile/{}", uid)).await;
    response.assert_status_ok();
    let stats: Value = response.json();
    assert_eq!(stats["total_plays"], 0);
}

#[tokio::test]
async fn test_unknown_resources_are_not_found() {
    let server = create_test_server().await;
    let missing = "00000000-0000-0000-0000-000000000000";

    server
        .get(&format!("/api/v1/users/{}", missing))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server
        .get("/api/v1/songs/nope")
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server
        .get(&format!("/api/v1/matching/profile/{}", missing))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}
