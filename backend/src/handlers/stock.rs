//! HTTP handlers for the stock ledger

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{CorrectBatchInput, PurchaseRequest, StockBatch, StockQuery, StockWithBatches};
use crate::services::StockLedger;
use crate::AppState;

/// Stock records with their batches
pub async fn list_stock(
    State(state): State<AppState>,
    Query(query): Query<StockQuery>,
) -> AppResult<Json<Vec<StockWithBatches>>> {
    let ledger = StockLedger::new(state.store);
    Ok(Json(ledger.list_stock(query.include_empty).await?))
}

/// Record purchased batches
pub async fn record_purchase(
    State(state): State<AppState>,
    Json(request): Json<PurchaseRequest>,
) -> AppResult<(StatusCode, Json<Vec<StockBatch>>)> {
    let ledger = StockLedger::new(state.store);
    let batches = ledger.purchase_many(&request).await?;
    Ok((StatusCode::CREATED, Json(batches)))
}

/// Batches of a stock record that still hold units
pub async fn list_available_batches(
    State(state): State<AppState>,
    Path(stock_id): Path<Uuid>,
) -> AppResult<Json<Vec<StockBatch>>> {
    let ledger = StockLedger::new(state.store);
    Ok(Json(ledger.available_batches(stock_id).await?))
}

/// Correct a batch's code and quantity
pub async fn correct_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
    Json(input): Json<CorrectBatchInput>,
) -> AppResult<Json<StockBatch>> {
    let ledger = StockLedger::new(state.store);
    Ok(Json(ledger.correct_batch(batch_id, &input).await?))
}

/// Delete a batch
pub async fn delete_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let ledger = StockLedger::new(state.store);
    ledger.delete_batch(batch_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
