use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{ArtistPlays, GenrePlays, SongPlays, UserId, UserStats},
    routes::AppState,
};

const MAX_TOP_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct TopQuery {
    #[serde(default = "default_top_limit")]
    pub limit: i64,
}

fn default_top_limit() -> i64 {
    10
}

impl TopQuery {
    fn checked_limit(&self) -> AppResult<i64> {
        if !(1..=MAX_TOP_LIMIT).contains(&self.limit) {
            return Err(AppError::InvalidInput(format!(
                "limit must be between 1 and {}",
                MAX_TOP_LIMIT
            )));
        }
        Ok(self.limit)
    }
}

pub async fn profile(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<UserId>,
) -> AppResult<Json<UserStats>> {
    let stats = state
        .stats
        .user_stats(uid)
        .await?
        .ok_or_else(|| AppError::not_found("User", uid))?;
    Ok(Json(stats))
}

pub async fn top_songs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TopQuery>,
) -> AppResult<Json<Vec<SongPlays>>> {
    let songs = state.stats.top_songs(query.checked_limit()?).await?;
    Ok(Json(songs))
}

pub async fn top_artists(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TopQuery>,
) -> AppResult<Json<Vec<ArtistPlays>>> {
    let artists = state.stats.top_artists(query.checked_limit()?).await?;
    Ok(Json(artists))
}

pub async fn top_genres(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TopQuery>,
) -> AppResult<Json<Vec<GenrePlays>>> {
    let genres = state.stats.top_genres(query.checked_limit()?).await?;
    Ok(Json(genres))
}
