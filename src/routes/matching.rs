use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::AppResult,
    middleware::RequestId,
    models::{CandidatePage, Match, MatchCard, MatchingProfile, PageQuery, UserId},
    routes::{songs::LimitQuery, AppState},
};

#[derive(Debug, Deserialize)]
pub struct CandidatesQuery {
    pub current_uid: UserId,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_page() -> u32 {
    PageQuery::default().page
}

fn default_limit() -> u32 {
    PageQuery::default().limit
}

#[derive(Debug, Deserialize)]
pub struct LikeRequest {
    pub liker_id: UserId,
    pub liked_id: UserId,
}

pub async fn profile(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<UserId>,
) -> AppResult<Json<MatchingProfile>> {
    let profile = state.matching.profile(uid).await?;
    Ok(Json(profile))
}

/// Handler for the ranked candidates page
pub async fn candidates(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Query(query): Query<CandidatesQuery>,
) -> AppResult<Json<CandidatePage>> {
    tracing::info!(
        request_id = %request_id,
        uid = %query.current_uid,
        page = query.page,
        limit = query.limit,
        "Ranking match candidates"
    );

    let page = state
        .ranker
        .rank(
            query.current_uid,
            PageQuery {
                page: query.page,
                limit: query.limit,
            },
        )
        .await?;

    tracing::info!(
        request_id = %request_id,
        total_candidates = page.total_candidates,
        "Candidates ranked"
    );
    Ok(Json(page))
}

pub async fn like(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<LikeRequest>,
) -> AppResult<(StatusCode, Json<Match>)> {
    tracing::debug!(
        request_id = %request_id,
        liker = %request.liker_id,
        liked = %request.liked_id,
        "Processing like"
    );
    let record = state
        .matching
        .like(request.liker_id, request.liked_id)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn matches(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<UserId>,
) -> AppResult<Json<Vec<MatchCard>>> {
    let cards = state.matching.matches(uid).await?;
    Ok(Json(cards))
}

pub async fn likes(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<UserId>,
) -> AppResult<Json<Vec<MatchCard>>> {
    let cards = state.matching.likes(uid).await?;
    Ok(Json(cards))
}

pub async fn recommended_users(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<UserId>,
    Query(query): Query<LimitQuery>,
) -> AppResult<Json<Vec<MatchCard>>> {
    let cards = state.ranker.top(uid, query.limit).await?;
    Ok(Json(cards))
}
