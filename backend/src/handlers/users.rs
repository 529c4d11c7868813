//! User profile HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use shared::{Pagination, User};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::{AdminUser, CurrentUser};
use crate::services::user::{CompleteProfileInput, UpdateProfileInput, UpdateRoleInput, UserService};
use crate::AppState;

/// Current caller's profile
pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}

/// Complete the profile after sign-up
pub async fn complete_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    WithRejection(Json(input), _): WithRejection<Json<CompleteProfileInput>, AppError>,
) -> AppResult<Json<User>> {
    let service = UserService::new(state.db.clone());
    Ok(Json(service.complete_profile(&user, input).await?))
}

pub async fn update_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    WithRejection(Json(input), _): WithRejection<Json<UpdateProfileInput>, AppError>,
) -> AppResult<Json<User>> {
    let service = UserService::new(state.db.clone());
    Ok(Json(service.update_profile(&user, input).await?))
}

pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
    WithRejection(Query(page), _): WithRejection<Query<Pagination>, AppError>,
) -> AppResult<Json<Vec<User>>> {
    let service = UserService::new(state.db.clone());
    Ok(Json(service.list_users(page).await?))
}

pub async fn get_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    WithRejection(Path(user_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<Json<User>> {
    let service = UserService::new(state.db.clone());
    Ok(Json(service.get_user(user_id).await?))
}

pub async fn update_user_role(
    State(state): State<AppState>,
    _admin: AdminUser,
    WithRejection(Path(user_id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(input), _): WithRejection<Json<UpdateRoleInput>, AppError>,
) -> AppResult<Json<User>> {
    let service = UserService::new(state.db.clone());
    Ok(Json(service.update_role(user_id, input).await?))
}

pub async fn delete_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    WithRejection(Path(user_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<StatusCode> {
    let service = UserService::new(state.db.clone());
    service.delete_user(user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
