use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::PgStore;
use crate::{
    db::store::RecommendationStore,
    error::{AppError, AppResult},
    models::{Recommendation, TargetType, UserId},
};

/// Row shape of `recommendations`; tags are stored as text
#[derive(sqlx::FromRow)]
struct RecommendationRow {
    uid: UserId,
    target_type: String,
    target_id: String,
    score: f64,
    reason: String,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RecommendationRow> for Recommendation {
    type Error = AppError;

    fn try_from(row: RecommendationRow) -> Result<Self, Self::Error> {
        Ok(Recommendation {
            uid: row.uid,
            target_type: row.target_type.parse()?,
            target_id: row.target_id,
            score: row.score,
            reason: row.reason.parse()?,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl RecommendationStore for PgStore {
    async fn upsert_recommendations(&self, recommendations: &[Recommendation]) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        for recommendation in recommendations {
            sqlx::query(
                r#"
                INSERT INTO recommendations (uid, target_type, target_id, score, reason, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (uid, target_type, target_id) DO UPDATE
                    SET score = EXCLUDED.score,
                        reason = EXCLUDED.reason,
                        updated_at = EXCLUDED.updated_at
                "#,
            )
            .bind(recommendation.uid)
            .bind(recommendation.target_type.as_str())
            .bind(&recommendation.target_id)
            .bind(recommendation.score)
            .bind(recommendation.reason.as_str())
            .bind(recommendation.updated_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn recommendations_for(
        &self,
        uid: UserId,
        target_type: Option<TargetType>,
    ) -> AppResult<Vec<Recommendation>> {
        let rows = sqlx::query_as::<_, RecommendationRow>(
            r#"
            SELECT uid, target_type, target_id, score, reason, updated_at
            FROM recommendations
            WHERE uid = $1 AND ($2::TEXT IS NULL OR target_type = $2)
            ORDER BY score DESC, target_id
            "#,
        )
        .bind(uid)
        .bind(target_type.map(|t| t.as_str()))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Recommendation::try_from).collect()
    }
}
