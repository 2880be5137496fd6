//! Stock ledger: per-variant totals and the batches that compose them
//!
//! Every mutation runs inside one store transaction and updates the batch
//! row and its stock total together, so a stock total always equals the sum
//! of its batches once committed.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{
    BatchAllocation, CorrectBatchInput, PurchaseInput, PurchaseRequest, StockBatch, StockRecord,
    StockVariant, StockWithBatches,
};
use crate::store::{Store, StoreTx};

/// One allocation entry after it has been taken out of its batch
#[derive(Debug, Clone, Serialize)]
pub struct ConsumedBatch {
    pub allocation: BatchAllocation,
    /// Code of the batch at consumption time
    pub batch_code: String,
}

/// Stock ledger service
#[derive(Clone)]
pub struct StockLedger {
    store: Arc<dyn Store>,
}

impl StockLedger {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Record a purchased batch and raise its stock total
    pub async fn purchase(&self, input: &PurchaseInput) -> AppResult<StockBatch> {
        input.validate()?;

        let mut tx = self.store.begin().await?;
        let batch = Self::purchase_in(tx.as_mut(), input).await?;
        tx.commit().await?;

        info!(
            stock_id = %batch.product_stock_id,
            batch_id = %batch.id,
            quantity = batch.quantity,
            "Purchase recorded"
        );
        Ok(batch)
    }

    /// Record several purchase lines in one transaction.
    ///
    /// Batches are returned in the order of the request lines.
    pub async fn purchase_many(&self, request: &PurchaseRequest) -> AppResult<Vec<StockBatch>> {
        request.validate()?;
        for line in &request.lines {
            line.validate()?;
        }

        // Lock stock records in a stable order across concurrent purchases
        let mut order: Vec<usize> = (0..request.lines.len()).collect();
        order.sort_by_key(|&i| (request.lines[i].product_id, request.lines[i].size_id));

        let mut tx = self.store.begin().await?;
        let mut created: Vec<(usize, StockBatch)> = Vec::with_capacity(order.len());
        for i in order {
            let batch = Self::purchase_in(tx.as_mut(), &request.lines[i]).await?;
            created.push((i, batch));
        }
        tx.commit().await?;

        created.sort_by_key(|(i, _)| *i);
        info!(lines = created.len(), "Purchase recorded");
        Ok(created.into_iter().map(|(_, batch)| batch).collect())
    }

    async fn purchase_in(tx: &mut dyn StoreTx, input: &PurchaseInput) -> AppResult<StockBatch> {
        shared::validate_positive_quantity(input.quantity)
            .map_err(|msg| AppError::validation("quantity", msg))?;

        if !tx.product_exists(input.product_id).await? {
            return Err(AppError::NotFound("Product".to_string()));
        }
        if !tx.bottle_size_exists(input.size_id).await? {
            return Err(AppError::NotFound("Bottle size".to_string()));
        }

        let stock = tx.ensure_stock(input.product_id, input.size_id).await?;
        let total = stock.quantity.checked_add(input.quantity).ok_or_else(|| {
            AppError::InvariantViolation("Stock total exceeds the supported range".to_string())
        })?;

        tx.set_stock_quantity(stock.id, total).await?;
        tx.insert_batch(stock.id, input.batch_code.trim(), input.quantity)
            .await
    }

    /// Edit a batch's code and quantity, moving the stock total by the
    /// quantity difference
    pub async fn correct_batch(&self, batch_id: Uuid, input: &CorrectBatchInput) -> AppResult<StockBatch> {
        input.validate()?;
        shared::validate_batch_quantity(input.quantity)
            .map_err(|msg| AppError::validation("quantity", msg))?;

        let mut tx = self.store.begin().await?;
        let (batch, stock) = Self::lock_batch_with_stock(tx.as_mut(), batch_id).await?;

        let total = shared::corrected_total(stock.quantity, batch.quantity, input.quantity)
            .map_err(|msg| {
                warn!(%batch_id, total = stock.quantity, "Batch correction rejected: {}", msg);
                AppError::InvariantViolation(msg.to_string())
            })?;

        let batch_code = input.batch_code.trim();
        tx.update_batch(batch_id, batch_code, input.quantity).await?;
        tx.set_stock_quantity(stock.id, total).await?;
        tx.commit().await?;

        info!(
            %batch_id,
            old_quantity = batch.quantity,
            new_quantity = input.quantity,
            stock_total = total,
            "Batch corrected"
        );

        Ok(StockBatch {
            batch_code: batch_code.to_string(),
            quantity: input.quantity,
            ..batch
        })
    }

    /// Remove a batch and take its remaining quantity off the stock total
    pub async fn delete_batch(&self, batch_id: Uuid) -> AppResult<()> {
        let mut tx = self.store.begin().await?;
        let (batch, stock) = Self::lock_batch_with_stock(tx.as_mut(), batch_id).await?;

        let total = stock.quantity - batch.quantity;
        if total < 0 {
            warn!(%batch_id, total = stock.quantity, batch = batch.quantity, "Batch deletion rejected");
            return Err(AppError::InvariantViolation(
                "Resulting stock cannot be negative".to_string(),
            ));
        }

        tx.delete_batch(batch_id).await?;
        tx.set_stock_quantity(stock.id, total).await?;
        tx.commit().await?;

        info!(%batch_id, stock_total = total, "Batch deleted");
        Ok(())
    }

    /// Lock a batch together with its stock record, stock record first
    async fn lock_batch_with_stock(
        tx: &mut dyn StoreTx,
        batch_id: Uuid,
    ) -> AppResult<(StockBatch, StockRecord)> {
        let seen = tx
            .find_batch(batch_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Stock batch".to_string()))?;
        let stock = tx
            .lock_stock(seen.product_stock_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Stock".to_string()))?;
        let batch = tx
            .lock_batch(batch_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Stock batch".to_string()))?;
        if batch.product_stock_id != stock.id {
            return Err(AppError::Conflict(
                "Stock batch changed while it was being edited".to_string(),
            ));
        }
        Ok((batch, stock))
    }

    /// Take allocated quantities out of their batches and stock totals.
    ///
    /// Runs inside the caller's transaction; remaining quantities are checked
    /// against locked rows, so a batch drained by a concurrent completion is
    /// reported as [`AppError::InsufficientBatchStock`]. Batches are locked in
    /// id order. On error nothing is committed by this function.
    pub async fn consume(
        tx: &mut dyn StoreTx,
        allocations: &[BatchAllocation],
    ) -> AppResult<Vec<ConsumedBatch>> {
        let mut sorted = allocations.to_vec();
        sorted.sort_by_key(|a| (a.stock_batch_id, a.sales_order_item_id));

        let mut consumed = Vec::with_capacity(sorted.len());
        for allocation in sorted {
            if allocation.quantity <= 0 {
                return Err(AppError::validation(
                    "quantity",
                    "Allocated quantity must be greater than zero",
                ));
            }

            let batch = tx
                .lock_batch(allocation.stock_batch_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Stock batch".to_string()))?;
            if batch.quantity < allocation.quantity {
                debug!(
                    batch_id = %batch.id,
                    requested = allocation.quantity,
                    remaining = batch.quantity,
                    "Batch cannot cover allocation"
                );
                return Err(AppError::InsufficientBatchStock {
                    batch_code: batch.batch_code,
                    requested: allocation.quantity,
                    remaining: batch.quantity,
                });
            }
            tx.update_batch(batch.id, &batch.batch_code, batch.quantity - allocation.quantity)
                .await?;

            let stock = tx
                .lock_stock(batch.product_stock_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Stock".to_string()))?;
            let total = stock.quantity - allocation.quantity;
            if total < 0 {
                return Err(AppError::InvariantViolation(format!(
                    "Stock total would drop below zero while consuming batch '{}'",
                    batch.batch_code
                )));
            }
            tx.set_stock_quantity(stock.id, total).await?;

            consumed.push(ConsumedBatch {
                allocation,
                batch_code: batch.batch_code,
            });
        }

        Ok(consumed)
    }

    /// Stock records with their batches
    pub async fn list_stock(&self, include_empty: bool) -> AppResult<Vec<StockWithBatches>> {
        self.store.list_stock(include_empty).await
    }

    /// Candidate batches for allocating a line of the given stock record
    pub async fn available_batches(&self, stock_id: Uuid) -> AppResult<Vec<StockBatch>> {
        if self.store.find_stock(stock_id).await?.is_none() {
            return Err(AppError::NotFound("Stock".to_string()));
        }
        self.store.available_batches(stock_id).await
    }

    pub async fn product_variants(&self, product_id: Uuid) -> AppResult<Vec<StockVariant>> {
        self.store.product_variants(product_id).await
    }
}
