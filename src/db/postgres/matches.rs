use async_trait::async_trait;
use chrono::Utc;

use super::{PgStore, USER_COLUMNS};
use crate::{
    db::store::MatchStore,
    error::AppResult,
    models::{LikeOutcome, Match, User, UserId},
};

const MATCH_COLUMNS: &str = "user1_id, user2_id, liked_by_user1, liked_by_user2, matched, \
                             similarity_score, created_at, matched_at";

#[async_trait]
impl MatchStore for PgStore {
    async fn get_match(&self, a: UserId, b: UserId) -> AppResult<Option<Match>> {
        let (user1, user2) = Match::canonical_pair(a, b);
        let query = format!(
            "SELECT {} FROM user_matches WHERE user1_id = $1 AND user2_id = $2",
            MATCH_COLUMNS
        );
        let record = sqlx::query_as::<_, Match>(&query)
            .bind(user1)
            .bind(user2)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    async fn upsert_like(
        &self,
        liker: UserId,
        liked: UserId,
        similarity: f64,
    ) -> AppResult<(Match, LikeOutcome)> {
        let (user1, user2) = Match::canonical_pair(liker, liked);
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO user_matches (user1_id, user2_id, similarity_score, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user1_id, user2_id) DO NOTHING
            "#,
        )
        .bind(user1)
        .bind(user2)
        .bind(similarity)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        // the row lock serializes concurrent likes on the same pair
        let query = format!(
            "SELECT {} FROM user_matches WHERE user1_id = $1 AND user2_id = $2 FOR UPDATE",
            MATCH_COLUMNS
        );
        let mut record = sqlx::query_as::<_, Match>(&query)
            .bind(user1)
            .bind(user2)
            .fetch_one(&mut *tx)
            .await?;

        let outcome = record.apply_like(liker, now);
        if outcome != LikeOutcome::Unchanged {
            sqlx::query(
                r#"
                UPDATE user_matches
                SET liked_by_user1 = $3, liked_by_user2 = $4, matched = $5, matched_at = $6
                WHERE user1_id = $1 AND user2_id = $2
                "#,
            )
            .bind(user1)
            .bind(user2)
            .bind(record.liked_by_user1)
            .bind(record.liked_by_user2)
            .bind(record.matched)
            .bind(record.matched_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok((record, outcome))
    }

    async fn matches_for(&self, uid: UserId) -> AppResult<Vec<Match>> {
        let query = format!(
            "SELECT {} FROM user_matches WHERE user1_id = $1 OR user2_id = $1 ORDER BY created_at",
            MATCH_COLUMNS
        );
        let records = sqlx::query_as::<_, Match>(&query)
            .bind(uid)
            .fetch_all(&self.pool)
            .await?;
        Ok(records)
    }

    async fn candidate_users(&self, uid: UserId) -> AppResult<Vec<User>> {
        let query = format!(
            r#"
            SELECT {} FROM users u
            WHERE u.uid <> $1
              AND NOT EXISTS (
                  SELECT 1 FROM user_matches m
                  WHERE (m.user1_id = $1 AND m.user2_id = u.uid
                         AND (m.liked_by_user1 OR NOT m.liked_by_user2))
                     OR (m.user2_id = $1 AND m.user1_id = u.uid
                         AND (m.liked_by_user2 OR NOT m.liked_by_user1))
              )
            ORDER BY u.uid
            "#,
            USER_COLUMNS
        );
        let users = sqlx::query_as::<_, User>(&query)
            .bind(uid)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }
}
