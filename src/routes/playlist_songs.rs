use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{PlaylistId, PlaylistSong, SongId},
    routes::AppState,
};

/// Rejects membership edits of missing playlists and of the favourites playlist
async fn user_managed_playlist(state: &AppState, pid: PlaylistId) -> AppResult<()> {
    state
        .playlists
        .playlist(pid)
        .await?
        .ok_or_else(|| AppError::not_found("Playlist", pid))?
        .ensure_user_managed()
}

pub async fn add(
    State(state): State<Arc<AppState>>,
    Json(membership): Json<PlaylistSong>,
) -> AppResult<(StatusCode, Json<PlaylistSong>)> {
    user_managed_playlist(&state, membership.pid).await?;
    state
        .playlists
        .add_song(membership.pid, &membership.sid)
        .await?;

    tracing::debug!(pid = %membership.pid, sid = %membership.sid, "Song added to playlist");
    Ok((StatusCode::CREATED, Json(membership)))
}

/// Song ids of a playlist; an unknown playlist lists nothing
pub async fn list(
    State(state): State<Arc<AppState>>,
    Path(pid): Path<PlaylistId>,
) -> AppResult<Json<Vec<SongId>>> {
    let sids = state.playlists.playlist_songs(pid).await?;
    Ok(Json(sids))
}

pub async fn remove(
    State(state): State<Arc<AppState>>,
    Path((pid, sid)): Path<(PlaylistId, SongId)>,
) -> AppResult<StatusCode> {
    user_managed_playlist(&state, pid).await?;
    state.playlists.remove_song(pid, &sid).await?;
    Ok(StatusCode::NO_CONTENT)
}
