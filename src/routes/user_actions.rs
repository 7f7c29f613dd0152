use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    middleware::RequestId,
    models::{Interaction, InteractionCreate, InteractionPatch, MessageResponse, SongId, UserId},
    routes::{songs::LimitQuery, AppState},
};

#[derive(Debug, Serialize)]
pub struct FavouriteFlag {
    pub uid: UserId,
    pub sid: SongId,
    pub is_favourite: bool,
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(request): Json<InteractionCreate>,
) -> AppResult<(StatusCode, Json<Interaction>)> {
    let interaction = state.interaction_writes.create(request).await?;
    Ok((StatusCode::CREATED, Json(interaction)))
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<UserId>,
) -> AppResult<Json<Vec<Interaction>>> {
    let interactions = state.interactions.interactions_for_user(uid).await?;
    Ok(Json(interactions))
}

pub async fn favourites(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<UserId>,
) -> AppResult<Json<Vec<Interaction>>> {
    let interactions = state.interaction_writes.favourites(uid).await?;
    Ok(Json(interactions))
}

pub async fn recent(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<UserId>,
    Query(query): Query<LimitQuery>,
) -> AppResult<Json<Vec<Interaction>>> {
    let interactions = state.interaction_writes.recent(uid, query.limit).await?;
    Ok(Json(interactions))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Path((uid, sid)): Path<(UserId, SongId)>,
) -> AppResult<Json<Interaction>> {
    let interaction = state
        .interactions
        .interaction(uid, &sid)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("No interaction of user {} with song {}", uid, sid))
        })?;
    Ok(Json(interaction))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    Path((uid, sid)): Path<(UserId, SongId)>,
    Json(patch): Json<InteractionPatch>,
) -> AppResult<Json<Interaction>> {
    let interaction = state.interaction_writes.update(uid, &sid, patch).await?;
    Ok(Json(interaction))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path((uid, sid)): Path<(UserId, SongId)>,
) -> AppResult<Json<MessageResponse>> {
    state.interaction_writes.delete(uid, &sid).await?;
    Ok(Json(MessageResponse::new(format!(
        "Interaction of user {} with song {} deleted",
        uid, sid
    ))))
}

pub async fn play(
    State(state): State<Arc<AppState>>,
    Path((uid, sid)): Path<(UserId, SongId)>,
) -> AppResult<Json<Interaction>> {
    let interaction = state.interaction_writes.record_play(uid, &sid).await?;
    Ok(Json(interaction))
}

pub async fn toggle_favourite(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Path((uid, sid)): Path<(UserId, SongId)>,
) -> AppResult<Json<Interaction>> {
    let interaction = state.interaction_writes.toggle_favourite(uid, &sid).await?;

    tracing::info!(
        request_id = %request_id,
        uid = %uid,
        sid = %sid,
        favourite = interaction.favourite,
        "Favourite toggled"
    );
    Ok(Json(interaction))
}

/// False when the user never interacted with the song
pub async fn is_favourite(
    State(state): State<Arc<AppState>>,
    Path((uid, sid)): Path<(UserId, SongId)>,
) -> AppResult<Json<FavouriteFlag>> {
    let is_favourite = state
        .interactions
        .interaction(uid, &sid)
        .await?
        .is_some_and(|i| i.favourite);
    Ok(Json(FavouriteFlag {
        uid,
        sid,
        is_favourite,
    }))
}
