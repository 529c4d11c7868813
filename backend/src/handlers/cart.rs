//! Shopping cart HTTP handlers (customers only)

use axum::{
    extract::{Path, State},
    Json,
};
use axum_extra::extract::WithRejection;
use shared::CartSummary;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::CustomerUser;
use crate::services::cart::{AddCartItemInput, CartService, UpdateCartItemInput};
use crate::AppState;

pub async fn get_cart(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
) -> AppResult<Json<CartSummary>> {
    let service = CartService::new(state.db.clone());
    Ok(Json(service.get_summary(user.id).await?))
}

pub async fn add_to_cart(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
    WithRejection(Json(input), _): WithRejection<Json<AddCartItemInput>, AppError>,
) -> AppResult<Json<CartSummary>> {
    let service = CartService::new(state.db.clone());
    Ok(Json(service.add_item(user.id, input).await?))
}

pub async fn update_cart_item(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
    WithRejection(Path(product_id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(input), _): WithRejection<Json<UpdateCartItemInput>, AppError>,
) -> AppResult<Json<CartSummary>> {
    let service = CartService::new(state.db.clone());
    Ok(Json(service.update_quantity(user.id, product_id, input).await?))
}

pub async fn remove_cart_item(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
    WithRejection(Path(product_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<Json<CartSummary>> {
    let service = CartService::new(state.db.clone());
    Ok(Json(service.remove_item(user.id, product_id).await?))
}

pub async fn clear_cart(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
) -> AppResult<Json<CartSummary>> {
    let service = CartService::new(state.db.clone());
    Ok(Json(service.clear(user.id).await?))
}
