use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};

use super::{PgStore, PLAYLIST_COLUMNS};
use crate::{
    db::store::PlaylistStore,
    error::{AppError, AppResult},
    models::{Playlist, PlaylistId, PlaylistPatch, SongId, UserId},
};

#[async_trait]
impl PlaylistStore for PgStore {
    async fn create_playlist(&self, playlist: Playlist) -> AppResult<Playlist> {
        self.require_user(playlist.uid).await?;

        let query = format!(
            r#"
            INSERT INTO playlists (pid, uid, name, description, private, shared_with, is_favourites, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            PLAYLIST_COLUMNS
        );
        let created = sqlx::query_as::<_, Playlist>(&query)
            .bind(playlist.pid)
            .bind(playlist.uid)
            .bind(&playlist.name)
            .bind(&playlist.description)
            .bind(playlist.private)
            .bind(&playlist.shared_with)
            .bind(playlist.is_favourites)
            .bind(playlist.created_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    async fn playlist(&self, pid: PlaylistId) -> AppResult<Option<Playlist>> {
        let query = format!("SELECT {} FROM playlists WHERE pid = $1", PLAYLIST_COLUMNS);
        let playlist = sqlx::query_as::<_, Playlist>(&query)
            .bind(pid)
            .fetch_optional(&self.pool)
            .await?;
        Ok(playlist)
    }

    async fn playlists_for_user(&self, uid: UserId) -> AppResult<Vec<Playlist>> {
        let query = format!(
            "SELECT {} FROM playlists WHERE uid = $1 ORDER BY created_at, pid",
            PLAYLIST_COLUMNS
        );
        let playlists = sqlx::query_as::<_, Playlist>(&query)
            .bind(uid)
            .fetch_all(&self.pool)
            .await?;
        Ok(playlists)
    }

    async fn favourites_playlist(&self, uid: UserId) -> AppResult<Option<Playlist>> {
        let query = format!(
            "SELECT {} FROM playlists WHERE uid = $1 AND is_favourites",
            PLAYLIST_COLUMNS
        );
        let playlist = sqlx::query_as::<_, Playlist>(&query)
            .bind(uid)
            .fetch_optional(&self.pool)
            .await?;
        Ok(playlist)
    }

    async fn update_playlist(
        &self,
        pid: PlaylistId,
        patch: &PlaylistPatch,
    ) -> AppResult<Option<Playlist>> {
        if patch.is_empty() {
            return self.playlist(pid).await;
        }

        let mut builder = QueryBuilder::<Postgres>::new("UPDATE playlists SET ");
        let mut set = builder.separated(", ");
        if let Some(name) = &patch.name {
            set.push("name = ").push_bind_unseparated(name.trim().to_string());
        }
        if let Some(description) = &patch.description {
            set.push("description = ")
                .push_bind_unseparated(description.clone());
        }
        if let Some(private) = patch.private {
            set.push("private = ").push_bind_unseparated(private);
        }
        if let Some(shared_with) = &patch.shared_with {
            set.push("shared_with = ")
                .push_bind_unseparated(shared_with.clone());
        }
        builder
            .push(" WHERE pid = ")
            .push_bind(pid)
            .push(" RETURNING ")
            .push(PLAYLIST_COLUMNS);

        let playlist = builder
            .build_query_as::<Playlist>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(playlist)
    }

    async fn delete_playlist(&self, pid: PlaylistId) -> AppResult<bool> {
        // memberships go with it through ON DELETE CASCADE
        let deleted = sqlx::query("DELETE FROM playlists WHERE pid = $1")
            .bind(pid)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(deleted > 0)
    }

    async fn add_song(&self, pid: PlaylistId, sid: &SongId) -> AppResult<()> {
        if self.playlist(pid).await?.is_none() {
            return Err(AppError::not_found("Playlist", pid));
        }
        self.require_song(sid).await?;

        let inserted = sqlx::query(
            "INSERT INTO playlist_songs (pid, sid) VALUES ($1, $2) ON CONFLICT (pid, sid) DO NOTHING",
        )
        .bind(pid)
        .bind(sid)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if inserted == 0 {
            return Err(AppError::Conflict(format!(
                "Song {} is already in playlist {}",
                sid, pid
            )));
        }
        Ok(())
    }

    async fn remove_song(&self, pid: PlaylistId, sid: &SongId) -> AppResult<()> {
        let deleted = sqlx::query("DELETE FROM playlist_songs WHERE pid = $1 AND sid = $2")
            .bind(pid)
            .bind(sid)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(AppError::NotFound(format!(
                "Song {} is not in playlist {}",
                sid, pid
            )));
        }
        Ok(())
    }

    async fn playlist_songs(&self, pid: PlaylistId) -> AppResult<Vec<SongId>> {
        let sids: Vec<SongId> = sqlx::query_scalar(
            "SELECT sid FROM playlist_songs WHERE pid = $1 ORDER BY added_at, sid",
        )
        .bind(pid)
        .fetch_all(&self.pool)
        .await?;
        Ok(sids)
    }
}
