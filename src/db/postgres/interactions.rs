use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Postgres, QueryBuilder};

use super::{sync_favourite, PgStore, INTERACTION_COLUMNS};
use crate::{
    db::store::InteractionStore,
    error::{AppError, AppResult},
    models::{HistoryEntry, Interaction, InteractionPatch, SongId, UserId},
};

fn missing(uid: UserId, sid: &SongId) -> AppError {
    AppError::NotFound(format!("No interaction of user {} with song {}", uid, sid))
}

fn transaction_failed(e: sqlx::Error) -> AppError {
    AppError::TransactionFailed(e.to_string())
}

async fn lock_interaction(
    conn: &mut PgConnection,
    uid: UserId,
    sid: &SongId,
) -> Result<Option<Interaction>, sqlx::Error> {
    let query = format!(
        "SELECT {} FROM user_track_actions WHERE uid = $1 AND sid = $2 FOR UPDATE",
        INTERACTION_COLUMNS
    );
    sqlx::query_as::<_, Interaction>(&query)
        .bind(uid)
        .bind(sid)
        .fetch_optional(&mut *conn)
        .await
}

#[async_trait]
impl InteractionStore for PgStore {
    async fn interaction(&self, uid: UserId, sid: &SongId) -> AppResult<Option<Interaction>> {
        let query = format!(
            "SELECT {} FROM user_track_actions WHERE uid = $1 AND sid = $2",
            INTERACTION_COLUMNS
        );
        let interaction = sqlx::query_as::<_, Interaction>(&query)
            .bind(uid)
            .bind(sid)
            .fetch_optional(&self.pool)
            .await?;
        Ok(interaction)
    }

    async fn has_interaction(&self, uid: UserId, sid: &SongId) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM user_track_actions WHERE uid = $1 AND sid = $2)",
        )
        .bind(uid)
        .bind(sid)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn interactions_for_user(&self, uid: UserId) -> AppResult<Vec<Interaction>> {
        let query = format!(
            "SELECT {} FROM user_track_actions WHERE uid = $1 ORDER BY sid",
            INTERACTION_COLUMNS
        );
        let interactions = sqlx::query_as::<_, Interaction>(&query)
            .bind(uid)
            .fetch_all(&self.pool)
            .await?;
        Ok(interactions)
    }

    async fn history(&self, uid: UserId) -> AppResult<Vec<HistoryEntry>> {
        let history = sqlx::query_as::<_, HistoryEntry>(
            r#"
            SELECT uta.uid, uta.sid, uta.total_plays, uta.favourite, uta.rating, uta.last_listened,
                   s.title, s.artist, s.duration, s.audio_path, s.audio_download_path,
                   COALESCE(
                       array_agg(g.genre_name ORDER BY g.genre_name) FILTER (WHERE g.genre_name IS NOT NULL),
                       ARRAY[]::TEXT[]
                   ) AS genres
            FROM user_track_actions uta
            JOIN songs s ON s.sid = uta.sid
            LEFT JOIN song_genres sg ON sg.sid = s.sid
            LEFT JOIN genres g ON g.gid = sg.gid
            WHERE uta.uid = $1
            GROUP BY uta.uid, uta.sid, s.sid
            ORDER BY uta.sid
            "#,
        )
        .bind(uid)
        .fetch_all(&self.pool)
        .await?;
        Ok(history)
    }

    async fn create_interaction(&self, interaction: Interaction) -> AppResult<Interaction> {
        self.require_user(interaction.uid).await?;
        self.require_song(&interaction.sid).await?;

        let mut tx = self.pool.begin().await?;
        let query = format!(
            r#"
            INSERT INTO user_track_actions (uid, sid, total_plays, favourite, rating, last_listened)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (uid, sid) DO NOTHING
            RETURNING {}
            "#,
            INTERACTION_COLUMNS
        );
        let created = sqlx::query_as::<_, Interaction>(&query)
            .bind(interaction.uid)
            .bind(&interaction.sid)
            .bind(interaction.total_plays)
            .bind(interaction.favourite)
            .bind(interaction.rating)
            .bind(interaction.last_listened)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| {
                AppError::Conflict(format!(
                    "Interaction of user {} with song {} already exists",
                    interaction.uid, interaction.sid
                ))
            })?;

        if created.favourite {
            sync_favourite(&mut tx, created.uid, &created.sid, true)
                .await
                .map_err(transaction_failed)?;
        }
        tx.commit().await.map_err(transaction_failed)?;
        Ok(created)
    }

    async fn update_interaction(
        &self,
        uid: UserId,
        sid: &SongId,
        patch: &InteractionPatch,
    ) -> AppResult<Interaction> {
        let mut tx = self.pool.begin().await?;
        let current = lock_interaction(&mut tx, uid, sid)
            .await?
            .ok_or_else(|| missing(uid, sid))?;
        patch.check_against(&current)?;

        let mut builder = QueryBuilder::<Postgres>::new("UPDATE user_track_actions SET ");
        let mut set = builder.separated(", ");
        if let Some(last_listened) = patch.last_listened {
            set.push("last_listened = ").push_bind_unseparated(last_listened);
        }
        if let Some(total_plays) = patch.total_plays {
            set.push("total_plays = ").push_bind_unseparated(total_plays);
        }
        if let Some(rating) = patch.rating {
            set.push("rating = ").push_bind_unseparated(rating);
        }
        builder
            .push(" WHERE uid = ")
            .push_bind(uid)
            .push(" AND sid = ")
            .push_bind(sid.clone())
            .push(" RETURNING ")
            .push(INTERACTION_COLUMNS);

        let updated = builder
            .build_query_as::<Interaction>()
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn delete_interaction(&self, uid: UserId, sid: &SongId) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        let deleted = sqlx::query("DELETE FROM user_track_actions WHERE uid = $1 AND sid = $2")
            .bind(uid)
            .bind(sid)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Err(missing(uid, sid));
        }

        sync_favourite(&mut tx, uid, sid, false)
            .await
            .map_err(transaction_failed)?;
        tx.commit().await.map_err(transaction_failed)?;
        Ok(())
    }

    async fn record_play(
        &self,
        uid: UserId,
        sid: &SongId,
        at: DateTime<Utc>,
    ) -> AppResult<Interaction> {
        self.require_user(uid).await?;
        self.require_song(sid).await?;

        let query = format!(
            r#"
            INSERT INTO user_track_actions (uid, sid, total_plays, favourite, last_listened)
            VALUES ($1, $2, 1, FALSE, $3)
            ON CONFLICT (uid, sid) DO UPDATE
                SET total_plays = user_track_actions.total_plays + 1,
                    last_listened = EXCLUDED.last_listened
            RETURNING {}
            "#,
            INTERACTION_COLUMNS
        );
        let interaction = sqlx::query_as::<_, Interaction>(&query)
            .bind(uid)
            .bind(sid)
            .bind(at)
            .fetch_one(&self.pool)
            .await?;
        Ok(interaction)
    }

    async fn toggle_favourite(&self, uid: UserId, sid: &SongId) -> AppResult<Interaction> {
        self.require_user(uid).await?;
        self.require_song(sid).await?;

        let mut tx = self.pool.begin().await.map_err(transaction_failed)?;
        let query = format!(
            r#"
            INSERT INTO user_track_actions (uid, sid, total_plays, favourite, last_listened)
            VALUES ($1, $2, 0, TRUE, $3)
            ON CONFLICT (uid, sid) DO UPDATE
                SET favourite = NOT user_track_actions.favourite
            RETURNING {}
            "#,
            INTERACTION_COLUMNS
        );
        let toggled = sqlx::query_as::<_, Interaction>(&query)
            .bind(uid)
            .bind(sid)
            .bind(Utc::now())
            .fetch_one(&mut *tx)
            .await
            .map_err(transaction_failed)?;

        sync_favourite(&mut tx, uid, sid, toggled.favourite)
            .await
            .map_err(transaction_failed)?;
        tx.commit().await.map_err(transaction_failed)?;

        tracing::debug!(
            uid = %uid,
            sid = %sid,
            favourite = toggled.favourite,
            "Favourite toggled"
        );
        Ok(toggled)
    }
}
