use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    middleware::RequestId,
    models::{MessageResponse, Playlist, PlaylistCreate, PlaylistId, PlaylistPatch, UserId},
    routes::AppState,
};

pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<PlaylistCreate>,
) -> AppResult<(StatusCode, Json<Playlist>)> {
    request.validate()?;
    let playlist = state
        .playlists
        .create_playlist(request.into_playlist(Utc::now()))
        .await?;

    tracing::info!(
        request_id = %request_id,
        pid = %playlist.pid,
        uid = %playlist.uid,
        "Playlist created"
    );
    Ok((StatusCode::CREATED, Json(playlist)))
}

pub async fn by_owner(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<UserId>,
) -> AppResult<Json<Vec<Playlist>>> {
    let playlists = state.playlists.playlists_for_user(uid).await?;
    Ok(Json(playlists))
}

pub async fn favourites(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<UserId>,
) -> AppResult<Json<Playlist>> {
    let playlist = state
        .playlists
        .favourites_playlist(uid)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("User {} has no favourites playlist yet", uid))
        })?;
    Ok(Json(playlist))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(pid): Path<PlaylistId>,
) -> AppResult<Json<Playlist>> {
    let playlist = state
        .playlists
        .playlist(pid)
        .await?
        .ok_or_else(|| AppError::not_found("Playlist", pid))?;
    Ok(Json(playlist))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(pid): Path<PlaylistId>,
    Json(patch): Json<PlaylistPatch>,
) -> AppResult<Json<Playlist>> {
    patch.validate()?;
    let playlist = state
        .playlists
        .update_playlist(pid, &patch)
        .await?
        .ok_or_else(|| AppError::not_found("Playlist", pid))?;
    Ok(Json(playlist))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Path(pid): Path<PlaylistId>,
) -> AppResult<Json<MessageResponse>> {
    let playlist = state
        .playlists
        .playlist(pid)
        .await?
        .ok_or_else(|| AppError::not_found("Playlist", pid))?;
    playlist.ensure_user_managed()?;

    if !state.playlists.delete_playlist(pid).await? {
        return Err(AppError::not_found("Playlist", pid));
    }

    tracing::info!(request_id = %request_id, pid = %pid, "Playlist deleted");
    Ok(Json(MessageResponse::new(format!(
        "Playlist {} deleted",
        pid
    ))))
}
