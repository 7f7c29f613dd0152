use std::sync::Arc;

use axum::{
    http::StatusCode,
    middleware,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::{
    db::{
        Cache, CatalogStore, InteractionStore, PlaylistStore, RecommendationStore, StatsStore,
        Store, UserStore,
    },
    middleware::{make_span_with_request_id, request_id_middleware},
    services::{
        AccountService, CandidateRanker, InteractionService, MatchService, ProfileService,
        SongRecommender,
    },
};

pub mod dashboard;
pub mod matching;
pub mod playlist_songs;
pub mod playlists;
pub mod recommendations;
pub mod songs;
pub mod user_actions;
pub mod users;

/// Shared application state: store handles and the services built on them
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub catalog: Arc<dyn CatalogStore>,
    pub interactions: Arc<dyn InteractionStore>,
    pub playlists: Arc<dyn PlaylistStore>,
    pub recommendations: Arc<dyn RecommendationStore>,
    pub stats: Arc<dyn StatsStore>,
    pub accounts: AccountService,
    pub interaction_writes: InteractionService,
    pub matching: MatchService,
    pub ranker: CandidateRanker,
    pub song_recommender: SongRecommender,
}

impl AppState {
    /// Wires every component to one backing store
    pub fn new<S: Store>(store: Arc<S>, cache: Option<Cache>, profile_cache_ttl: u64) -> Self {
        let profiles = ProfileService::new(store.clone(), cache, profile_cache_ttl);

        Self {
            users: store.clone(),
            catalog: store.clone(),
            interactions: store.clone(),
            playlists: store.clone(),
            recommendations: store.clone(),
            stats: store.clone(),
            accounts: AccountService::new(store.clone()),
            interaction_writes: InteractionService::new(store.clone(), profiles.clone()),
            matching: MatchService::new(
                store.clone(),
                store.clone(),
                store.clone(),
                store.clone(),
                profiles.clone(),
            ),
            ranker: CandidateRanker::new(
                store.clone(),
                store.clone(),
                store.clone(),
                profiles.clone(),
            ),
            song_recommender: SongRecommender::new(store.clone(), store.clone(), store, profiles),
        }
    }
}

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id)),
        )
}

/// API routes under /api/v1
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", get(users::list))
        .route("/users/register", post(users::register))
        .route("/users/login", post(users::login))
        .route("/users/:uid", get(users::get).put(users::update))
        .route(
            "/users/:uid/total_listen_duration",
            get(users::total_listen_duration),
        )
        .route("/songs", get(songs::search))
        .route("/songs/recommendations/:uid", get(songs::recommendations))
        .route("/songs/:sid", get(songs::get))
        .route("/playlists", post(playlists::create))
        .route("/playlists/user/:uid", get(playlists::by_owner))
        .route("/playlists/user/:uid/favourite", get(playlists::favourites))
        .route(
            "/playlists/:pid",
            get(playlists::get)
                .put(playlists::update)
                .delete(playlists::delete),
        )
        .route("/playlist-songs", post(playlist_songs::add))
        .route("/playlist-songs/:pid", get(playlist_songs::list))
        .route(
            "/playlist-songs/:pid/:sid",
            delete(playlist_songs::remove),
        )
        .route("/user-actions", post(user_actions::create))
        .route("/user-actions/:uid", get(user_actions::list))
        .route("/user-actions/:uid/favourites", get(user_actions::favourites))
        .route("/user-actions/:uid/recent", get(user_actions::recent))
        .route(
            "/user-actions/:uid/:sid",
            get(user_actions::get)
                .put(user_actions::update)
                .delete(user_actions::delete),
        )
        .route("/user-actions/:uid/:sid/play", post(user_actions::play))
        .route(
            "/user-actions/:uid/:sid/toggle-favourite",
            post(user_actions::toggle_favourite),
        )
        .route(
            "/user-actions/:uid/:sid/is-favourite",
            get(user_actions::is_favourite),
        )
        .route("/matching/profile/:uid", get(matching::profile))
        .route("/matching/candidates", get(matching::candidates))
        .route("/matching/like", post(matching::like))
        .route("/matching/matches/:uid", get(matching::matches))
        .route("/matching/likes/:uid", get(matching::likes))
        .route(
            "/matching/recommendations/users/:uid",
            get(matching::recommended_users),
        )
        .route("/recommendations/:uid", get(recommendations::list))
        .route("/dashboard/profile/:uid", get(dashboard::profile))
        .route("/dashboard/global/top-songs", get(dashboard::top_songs))
        .route("/dashboard/global/top-artists", get(dashboard::top_artists))
        .route("/dashboard/global/top-genres", get(dashboard::top_genres))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
