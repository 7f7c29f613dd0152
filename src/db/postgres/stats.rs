use async_trait::async_trait;

use super::PgStore;
use crate::{
    db::store::StatsStore,
    error::AppResult,
    models::{ArtistPlays, GenrePlays, SongPlays, UserId, UserStats},
};

#[async_trait]
impl StatsStore for PgStore {
    async fn user_stats(&self, uid: UserId) -> AppResult<Option<UserStats>> {
        let stats = sqlx::query_as::<_, UserStats>(
            r#"
            SELECT u.uid, u.username, u.name, u.email, u.country,
                   COALESCE((SELECT SUM(total_plays) FROM user_track_actions WHERE uid = u.uid), 0)::BIGINT
                       AS total_plays,
                   (SELECT COUNT(*) FROM user_track_actions WHERE uid = u.uid AND favourite)
                       AS favourite_count,
                   (SELECT COUNT(*) FROM playlists WHERE uid = u.uid) AS playlists_count,
                   COALESCE((
                       SELECT SUM(uta.total_plays * s.duration)
                       FROM user_track_actions uta
                       JOIN songs s ON s.sid = uta.sid
                       WHERE uta.uid = u.uid
                   ), 0)::DOUBLE PRECISION AS total_listen_seconds
            FROM users u
            WHERE u.uid = $1
            "#,
        )
        .bind(uid)
        .fetch_optional(&self.pool)
        .await?;
        Ok(stats)
    }

    async fn top_songs(&self, limit: i64) -> AppResult<Vec<SongPlays>> {
        let songs = sqlx::query_as::<_, SongPlays>(
            r#"
            SELECT s.sid, s.title, s.artist, SUM(uta.total_plays)::BIGINT AS plays
            FROM user_track_actions uta
            JOIN songs s ON s.sid = uta.sid
            GROUP BY s.sid
            HAVING SUM(uta.total_plays) > 0
            ORDER BY plays DESC, s.sid
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(songs)
    }

    async fn top_artists(&self, limit: i64) -> AppResult<Vec<ArtistPlays>> {
        let artists = sqlx::query_as::<_, ArtistPlays>(
            r#"
            SELECT s.artist, SUM(uta.total_plays)::BIGINT AS plays
            FROM user_track_actions uta
            JOIN songs s ON s.sid = uta.sid
            GROUP BY s.artist
            HAVING SUM(uta.total_plays) > 0
            ORDER BY plays DESC, s.artist
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(artists)
    }

    async fn top_genres(&self, limit: i64) -> AppResult<Vec<GenrePlays>> {
        let genres = sqlx::query_as::<_, GenrePlays>(
            r#"
            SELECT g.genre_name AS genre, SUM(uta.total_plays)::BIGINT AS plays
            FROM user_track_actions uta
            JOIN song_genres sg ON sg.sid = uta.sid
            JOIN genres g ON g.gid = sg.gid
            GROUP BY g.genre_name
            HAVING SUM(uta.total_plays) > 0
            ORDER BY plays DESC, g.genre_name
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(genres)
    }
}
