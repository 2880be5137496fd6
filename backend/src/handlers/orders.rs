//! HTTP handlers for sales orders

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{CancelOrderInput, CompleteOrderInput, CreateOrderInput, OrderQuery, OrderSummary};
use crate::services::{OrderCoordinator, OrderView};
use crate::AppState;

/// List orders, optionally by status
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<OrderQuery>,
) -> AppResult<Json<Vec<OrderSummary>>> {
    let coordinator = OrderCoordinator::new(state.store);
    Ok(Json(coordinator.list_orders(query.status).await?))
}

/// Create a pending order
pub async fn create_order(
    State(state): State<AppState>,
    Json(input): Json<CreateOrderInput>,
) -> AppResult<(StatusCode, Json<OrderView>)> {
    let coordinator = OrderCoordinator::new(state.store);
    let order = coordinator.create_order(&input).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// Get an order with its lines
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<OrderView>> {
    let coordinator = OrderCoordinator::new(state.store);
    Ok(Json(coordinator.get_order(order_id).await?))
}

/// Complete an order against the submitted batch allocations
pub async fn complete_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(input): Json<CompleteOrderInput>,
) -> AppResult<Json<OrderView>> {
    let coordinator = OrderCoordinator::new(state.store);
    Ok(Json(coordinator.complete(order_id, &input.allocations).await?))
}

/// Cancel (delete) a pending order
pub async fn cancel_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(input): Json<CancelOrderInput>,
) -> AppResult<StatusCode> {
    let coordinator = OrderCoordinator::new(state.store);
    coordinator.cancel(order_id, &input.order_item_ids).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Remove a completed order from history
pub async fn remove_completed_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let coordinator = OrderCoordinator::new(state.store);
    coordinator.remove_completed(order_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
