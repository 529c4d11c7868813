//! Order HTTP handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use axum_extra::extract::WithRejection;
use shared::{Order, OrderDetail, Pagination};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::{AdminUser, CustomerUser};
use crate::services::order::{CheckoutInput, OrderService, UpdateStatusInput};
use crate::AppState;

fn order_service(state: &AppState) -> OrderService {
    OrderService::new(state.db.clone()).with_email(state.email.clone())
}

/// Place an order from the caller's cart
pub async fn checkout(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
    WithRejection(Json(input), _): WithRejection<Json<CheckoutInput>, AppError>,
) -> AppResult<Json<OrderDetail>> {
    Ok(Json(order_service(&state).checkout(user.id, input).await?))
}

pub async fn list_my_orders(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
    WithRejection(Query(page), _): WithRejection<Query<Pagination>, AppError>,
) -> AppResult<Json<Vec<Order>>> {
    Ok(Json(order_service(&state).list_user_orders(user.id, page).await?))
}

pub async fn get_my_order(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
    WithRejection(Path(order_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<Json<OrderDetail>> {
    Ok(Json(order_service(&state).get_user_order(user.id, order_id).await?))
}

pub async fn list_orders(
    State(state): State<AppState>,
    _admin: AdminUser,
    WithRejection(Query(page), _): WithRejection<Query<Pagination>, AppError>,
) -> AppResult<Json<Vec<Order>>> {
    Ok(Json(order_service(&state).list_all_orders(page).await?))
}

pub async fn get_order(
    State(state): State<AppState>,
    _admin: AdminUser,
    WithRejection(Path(order_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<Json<OrderDetail>> {
    Ok(Json(order_service(&state).get_order(order_id).await?))
}

pub async fn update_order_status(
    State(state): State<AppState>,
    _admin: AdminUser,
    WithRejection(Path(order_id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(input), _): WithRejection<Json<UpdateStatusInput>, AppError>,
) -> AppResult<Json<Order>> {
    Ok(Json(order_service(&state).update_status(order_id, input).await?))
}
