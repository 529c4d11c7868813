//! Admin dashboard handler

use axum::{
    extract::{Query, State},
    Json,
};
use axum_extra::extract::WithRejection;
use shared::AdminDashboardStats;

use crate::error::{AppError, AppResult};
use crate::middleware::AdminUser;
use crate::services::stats::{StatsQuery, StatsService};
use crate::AppState;

pub async fn dashboard_stats(
    State(state): State<AppState>,
    _admin: AdminUser,
    WithRejection(Query(query), _): WithRejection<Query<StatsQuery>, AppError>,
) -> AppResult<Json<AdminDashboardStats>> {
    let service = StatsService::new(state.db.clone());
    Ok(Json(service.dashboard(query).await?))
}
