use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::AppResult,
    models::{Recommendation, TargetType, UserId},
    routes::AppState,
};

#[derive(Debug, Deserialize)]
pub struct RecommendationFilter {
    #[serde(default)]
    pub target_type: Option<TargetType>,
}

/// Stored recommendations for a user, highest score first
pub async fn list(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<UserId>,
    Query(filter): Query<RecommendationFilter>,
) -> AppResult<Json<Vec<Recommendation>>> {
    let recommendations = state
        .recommendations
        .recommendations_for(uid, filter.target_type)
        .await?;
    Ok(Json(recommendations))
}
