use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    middleware::RequestId,
    models::{Song, SongId, SongSearch, UserId},
    routes::AppState,
    services::RecommendedSong,
};

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    10
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(search): Query<SongSearch>,
) -> AppResult<Json<Vec<Song>>> {
    search.validate()?;
    let songs = state.catalog.search_songs(&search).await?;
    Ok(Json(songs))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(sid): Path<SongId>,
) -> AppResult<Json<Song>> {
    let song = state
        .catalog
        .song(&sid)
        .await?
        .ok_or_else(|| AppError::not_found("Song", &sid))?;
    Ok(Json(song))
}

pub async fn recommendations(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Path(uid): Path<UserId>,
    Query(query): Query<LimitQuery>,
) -> AppResult<Json<Vec<RecommendedSong>>> {
    tracing::info!(request_id = %request_id, uid = %uid, limit = query.limit, "Recommending songs");
    let songs = state.song_recommender.recommend(uid, query.limit).await?;
    Ok(Json(songs))
}
