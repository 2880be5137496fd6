//! Order lifecycle: pending orders are either completed against stock
//! batches or cancelled (deleted)

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;
use shared::{AllocationRow, LinePlan};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{BatchAllocation, CreateOrderInput, OrderDetail, OrderStatus, OrderSummary};
use crate::services::ledger::StockLedger;
use crate::store::Store;

/// Order detail as served to clients
#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub detail: OrderDetail,
    /// Pending, and every line's stock total covers its ordered quantity
    pub completable: bool,
}

impl From<OrderDetail> for OrderView {
    fn from(detail: OrderDetail) -> Self {
        let completable = detail.order.status == OrderStatus::Pending && detail.is_completable();
        Self { detail, completable }
    }
}

/// Order lifecycle coordinator
#[derive(Clone)]
pub struct OrderCoordinator {
    store: Arc<dyn Store>,
}

impl OrderCoordinator {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Create a pending order with its lines
    pub async fn create_order(&self, input: &CreateOrderInput) -> AppResult<OrderView> {
        input.validate()?;
        for item in &input.items {
            shared::validate_positive_quantity(item.quantity)
                .map_err(|msg| AppError::validation("quantity", msg))?;
        }

        let mut tx = self.store.begin().await?;
        if !tx.customer_exists(input.customer_id).await? {
            return Err(AppError::NotFound("Retailer".to_string()));
        }

        let order = tx.insert_order(input.customer_id).await?;
        for item in &input.items {
            if tx.lock_stock(item.product_stock_id).await?.is_none() {
                return Err(AppError::NotFound("Stock".to_string()));
            }
            tx.insert_order_item(order.id, item.product_stock_id, item.quantity)
                .await?;
        }
        tx.commit().await?;

        info!(order_id = %order.id, customer_id = %order.customer_id, lines = input.items.len(), "Order created");
        self.get_order(order.id).await
    }

    /// Complete a pending order with a flattened allocation list.
    ///
    /// Checks, consumption, batch records and the status change form one
    /// transaction: on any error the order stays pending and no stock moves.
    pub async fn complete(&self, order_id: Uuid, allocations: &[BatchAllocation]) -> AppResult<OrderView> {
        let mut tx = self.store.begin().await?;

        let order = tx
            .lock_order(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Order".to_string()))?;
        if order.status != OrderStatus::Pending {
            return Err(AppError::InvalidStateTransition(format!(
                "Order is already {}",
                order.status
            )));
        }

        let items = tx.order_items(order_id).await?;
        if items.is_empty() {
            return Err(AppError::IncompleteAllocation(
                "Order has no lines to allocate".to_string(),
            ));
        }

        let mut rows_by_line: HashMap<Uuid, Vec<AllocationRow>> = HashMap::new();
        for allocation in allocations {
            if !items.iter().any(|i| i.id == allocation.sales_order_item_id) {
                return Err(AppError::validation(
                    "allocations",
                    format!(
                        "Line {} is not part of this order",
                        allocation.sales_order_item_id
                    ),
                ));
            }
            rows_by_line
                .entry(allocation.sales_order_item_id)
                .or_default()
                .push(AllocationRow::new(allocation.stock_batch_id, allocation.quantity));
        }

        // Every line must be allocated exactly
        let mut flattened = Vec::with_capacity(allocations.len());
        for item in &items {
            let rows = rows_by_line.remove(&item.id).unwrap_or_default();
            let plan = LinePlan::with_rows(item.id, item.quantity_ordered, Vec::new(), rows);
            let entries = plan.submit().map_err(|err| {
                warn!(%order_id, item_id = %item.id, error = %err, "Completion refused");
                AppError::from(err)
            })?;
            flattened.extend(entries);
        }

        // Order-wide stock pre-check
        let mut line_stock: HashMap<Uuid, Uuid> = HashMap::new();
        let mut stock_ids: Vec<Uuid> = items.iter().map(|i| i.product_stock_id).collect();
        stock_ids.sort();
        stock_ids.dedup();
        let mut totals: HashMap<Uuid, i32> = HashMap::new();
        for stock_id in stock_ids {
            let stock = tx
                .lock_stock(stock_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Stock".to_string()))?;
            totals.insert(stock_id, stock.quantity);
        }
        for item in &items {
            line_stock.insert(item.id, item.product_stock_id);
            let available = totals.get(&item.product_stock_id).copied().unwrap_or_default();
            if available < item.quantity_ordered {
                return Err(AppError::InsufficientStock(format!(
                    "{} units in stock but {} ordered",
                    available, item.quantity_ordered
                )));
            }
        }

        flattened.sort_by_key(|a| (a.stock_batch_id, a.sales_order_item_id));
        for allocation in &flattened {
            let batch = tx
                .lock_batch(allocation.stock_batch_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Stock batch".to_string()))?;
            if line_stock.get(&allocation.sales_order_item_id) != Some(&batch.product_stock_id) {
                return Err(AppError::validation(
                    "allocations",
                    format!(
                        "Batch '{}' does not hold the product ordered on line {}",
                        batch.batch_code, allocation.sales_order_item_id
                    ),
                ));
            }
        }

        let consumed = StockLedger::consume(tx.as_mut(), &flattened).await?;
        for entry in &consumed {
            tx.insert_order_item_batch(
                entry.allocation.sales_order_item_id,
                entry.allocation.stock_batch_id,
                &entry.batch_code,
                entry.allocation.quantity,
            )
            .await?;
        }
        tx.set_order_status(order_id, OrderStatus::Completed).await?;
        tx.commit().await?;

        info!(%order_id, batches = consumed.len(), "Order completed");
        self.get_order(order_id).await
    }

    /// Delete a pending order and all its lines.
    ///
    /// `order_item_ids` are the lines the caller saw; each must belong to the
    /// order. Lines the caller did not list are deleted as well.
    pub async fn cancel(&self, order_id: Uuid, order_item_ids: &[Uuid]) -> AppResult<()> {
        let mut tx = self.store.begin().await?;

        let order = tx
            .lock_order(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Order".to_string()))?;
        if order.status != OrderStatus::Pending {
            return Err(AppError::InvalidStateTransition(
                "Only pending orders can be cancelled".to_string(),
            ));
        }

        let items = tx.order_items(order_id).await?;
        for item_id in order_item_ids {
            if !items.iter().any(|i| i.id == *item_id) {
                return Err(AppError::NotFound("Order item".to_string()));
            }
        }

        let removed = tx.delete_order_items(order_id).await?;
        tx.delete_order(order_id).await?;
        tx.commit().await?;

        info!(%order_id, lines = removed, "Order cancelled");
        Ok(())
    }

    /// Purge a completed order from history. Consumed stock is not returned.
    pub async fn remove_completed(&self, order_id: Uuid) -> AppResult<()> {
        let mut tx = self.store.begin().await?;

        let order = tx
            .lock_order(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Order".to_string()))?;
        if order.status != OrderStatus::Completed {
            return Err(AppError::InvalidStateTransition(
                "Only completed orders can be removed from history".to_string(),
            ));
        }

        tx.delete_order_items(order_id).await?;
        tx.delete_order(order_id).await?;
        tx.commit().await?;

        info!(%order_id, "Completed order removed");
        Ok(())
    }

    pub async fn list_orders(&self, status: Option<OrderStatus>) -> AppResult<Vec<OrderSummary>> {
        self.store.list_orders(status).await
    }

    pub async fn get_order(&self, order_id: Uuid) -> AppResult<OrderView> {
        self.store
            .order_detail(order_id)
            .await?
            .map(OrderView::from)
            .ok_or_else(|| AppError::NotFound("Order".to_string()))
    }
}
