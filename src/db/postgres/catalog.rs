use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};

use super::{PgStore, SONG_GROUP, SONG_SELECT};
use crate::{
    db::store::CatalogStore,
    error::AppResult,
    models::{Song, SongId, SongSearch},
};

/// Restricts [`SONG_SELECT`] to songs with a genre matching the bound parameter
const GENRE_FILTER: &str = r#"
    s.sid IN (
        SELECT sg2.sid FROM song_genres sg2
        JOIN genres g2 ON g2.gid = sg2.gid
        WHERE lower(g2.genre_name)
"#;

#[async_trait]
impl CatalogStore for PgStore {
    async fn song(&self, sid: &SongId) -> AppResult<Option<Song>> {
        let query = format!("{} WHERE s.sid = $1 {}", SONG_SELECT, SONG_GROUP);
        let song = sqlx::query_as::<_, Song>(&query)
            .bind(sid)
            .fetch_optional(&self.pool)
            .await?;
        Ok(song)
    }

    async fn songs_by_genre(&self, genre: &str) -> AppResult<Vec<Song>> {
        let query = format!(
            "{} WHERE {} = lower($1)) {}",
            SONG_SELECT, GENRE_FILTER, SONG_GROUP
        );
        let songs = sqlx::query_as::<_, Song>(&query)
            .bind(genre)
            .fetch_all(&self.pool)
            .await?;
        Ok(songs)
    }

    async fn songs_by_artist(&self, artist: &str) -> AppResult<Vec<Song>> {
        let query = format!(
            "{} WHERE lower(s.artist) = lower($1) {}",
            SONG_SELECT, SONG_GROUP
        );
        let songs = sqlx::query_as::<_, Song>(&query)
            .bind(artist)
            .fetch_all(&self.pool)
            .await?;
        Ok(songs)
    }

    async fn songs_by_duration(&self, min: f64, max: f64) -> AppResult<Vec<Song>> {
        let query = format!(
            "{} WHERE s.duration BETWEEN $1 AND $2 {}",
            SONG_SELECT, SONG_GROUP
        );
        let songs = sqlx::query_as::<_, Song>(&query)
            .bind(min)
            .bind(max)
            .fetch_all(&self.pool)
            .await?;
        Ok(songs)
    }

    async fn search_songs(&self, search: &SongSearch) -> AppResult<Vec<Song>> {
        let pattern = |text: &str| format!("%{}%", text.to_lowercase());

        let mut builder = QueryBuilder::<Postgres>::new(SONG_SELECT);
        builder.push(" WHERE TRUE");

        if let Some(q) = &search.q {
            builder
                .push(" AND (lower(s.title) LIKE ")
                .push_bind(pattern(q))
                .push(" OR lower(s.artist) LIKE ")
                .push_bind(pattern(q))
                .push(" OR ")
                .push(GENRE_FILTER)
                .push(" LIKE ")
                .push_bind(pattern(q))
                .push("))");
        }
        if let Some(genre) = &search.genre {
            builder
                .push(" AND ")
                .push(GENRE_FILTER)
                .push(" LIKE ")
                .push_bind(pattern(genre))
                .push(")");
        }
        if let Some(artist) = &search.artist {
            builder
                .push(" AND lower(s.artist) LIKE ")
                .push_bind(pattern(artist));
        }
        if let Some(min) = search.min_duration {
            builder.push(" AND s.duration >= ").push_bind(min);
        }
        if let Some(max) = search.max_duration {
            builder.push(" AND s.duration <= ").push_bind(max);
        }

        builder
            .push(SONG_GROUP)
            .push(" LIMIT ")
            .push_bind(i64::from(search.page_size))
            .push(" OFFSET ")
            .push_bind(search.offset() as i64);

        let songs = builder
            .build_query_as::<Song>()
            .fetch_all(&self.pool)
            .await?;
        Ok(songs)
    }

    async fn sample_songs(&self, limit: usize) -> AppResult<Vec<Song>> {
        let query = format!(
            "{} GROUP BY s.sid ORDER BY random() LIMIT $1",
            SONG_SELECT
        );
        let songs = sqlx::query_as::<_, Song>(&query)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;
        Ok(songs)
    }

    async fn song_count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM songs")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn seed_songs(&self, songs: &[Song]) -> AppResult<usize> {
        let mut tx = self.pool.begin().await?;
        let mut added = 0;

        for song in songs {
            let inserted = sqlx::query(
                r#"
                INSERT INTO songs (sid, title, artist, duration, audio_path, audio_download_path)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (sid) DO NOTHING
                "#,
            )
            .bind(&song.sid)
            .bind(&song.title)
            .bind(&song.artist)
            .bind(song.duration)
            .bind(&song.audio_path)
            .bind(&song.audio_download_path)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if inserted == 0 {
                continue;
            }
            added += 1;

            for genre in &song.genres {
                let gid: i32 = sqlx::query_scalar(
                    r#"
                    INSERT INTO genres (genre_name) VALUES ($1)
                    ON CONFLICT (genre_name) DO UPDATE SET genre_name = EXCLUDED.genre_name
                    RETURNING gid
                    "#,
                )
                .bind(genre)
                .fetch_one(&mut *tx)
                .await?;

                sqlx::query(
                    "INSERT INTO song_genres (sid, gid) VALUES ($1, $2) ON CONFLICT DO NOTHING",
                )
                .bind(&song.sid)
                .bind(gid)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(added)
    }
}
