use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    middleware::RequestId,
    models::{LoginRequest, RegisterRequest, User, UserId, UserPatch},
    routes::AppState,
};

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct ListenDurationResponse {
    pub uid: UserId,
    pub total_listen_seconds: f64,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    tracing::info!(request_id = %request_id, username = %request.username, "Registering user");
    let user = state.accounts.register(request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let user = state.accounts.login(request).await?;
    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        user,
    }))
}

pub async fn list(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<User>>> {
    let users = state.users.list_users().await?;
    Ok(Json(users))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<UserId>,
) -> AppResult<Json<User>> {
    let user = state
        .users
        .user(uid)
        .await?
        .ok_or_else(|| AppError::not_found("User", uid))?;
    Ok(Json(user))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Path(uid): Path<UserId>,
    Json(patch): Json<UserPatch>,
) -> AppResult<Json<User>> {
    patch.validate()?;
    let user = state
        .users
        .update_user(uid, &patch)
        .await?
        .ok_or_else(|| AppError::not_found("User", uid))?;

    tracing::info!(request_id = %request_id, uid = %uid, "User updated");
    Ok(Json(user))
}

pub async fn total_listen_duration(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<UserId>,
) -> AppResult<Json<ListenDurationResponse>> {
    let stats = state
        .stats
        .user_stats(uid)
        .await?
        .ok_or_else(|| AppError::not_found("User", uid))?;
    Ok(Json(ListenDurationResponse {
        uid,
        total_listen_seconds: stats.total_listen_seconds,
    }))
}
