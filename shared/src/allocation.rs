//! Batch allocation planning for a single order line
//!
//! Before an order is completed, each line's ordered quantity is split over
//! the stock batches it will be taken from. The plan is edited row by row
//! (add/remove a row, pick a batch, type a quantity) and every edit keeps
//! two rules:
//!
//! - a row can never take more from a batch than the batch has left after
//!   the other rows of the same line that point at that batch; larger inputs
//!   are clamped down, not rejected
//! - at least one row always remains
//!
//! Submission turns the plan into flattened [`BatchAllocation`] entries and
//! only succeeds when the allocated total matches the ordered quantity.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{BatchAllocation, StockBatch};

/// A batch that can be allocated from, with its remaining quantity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CandidateBatch {
    pub id: Uuid,
    pub batch_code: String,
    pub remaining: i32,
}

impl From<&StockBatch> for CandidateBatch {
    fn from(batch: &StockBatch) -> Self {
        Self {
            id: batch.id,
            batch_code: batch.batch_code.clone(),
            remaining: batch.quantity,
        }
    }
}

/// One allocation row: a chosen batch (maybe none yet) and a quantity
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AllocationRow {
    #[serde(default)]
    pub batch_id: Option<Uuid>,
    #[serde(default)]
    pub quantity: i32,
}

impl AllocationRow {
    pub fn new(batch_id: Uuid, quantity: i32) -> Self {
        Self {
            batch_id: Some(batch_id),
            quantity,
        }
    }

    /// A row is submitted only with a chosen batch and a positive quantity
    pub fn is_valid(&self) -> bool {
        self.batch_id.is_some() && self.quantity > 0
    }
}

/// How the allocated total compares to the ordered quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationStatus {
    UnderAllocated,
    ExactMatch,
    OverAllocated,
}

impl AllocationStatus {
    pub fn compare(total_allocated: i64, quantity_ordered: i64) -> Self {
        match total_allocated.cmp(&quantity_ordered) {
            std::cmp::Ordering::Less => AllocationStatus::UnderAllocated,
            std::cmp::Ordering::Equal => AllocationStatus::ExactMatch,
            std::cmp::Ordering::Greater => AllocationStatus::OverAllocated,
        }
    }
}

/// Allocation planning errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    #[error("allocation row {0} does not exist")]
    RowOutOfRange(usize),

    #[error("at least one allocation row must remain")]
    LastRow,

    #[error("batch {0} is not available for this line")]
    UnknownBatch(Uuid),

    #[error("select batch and quantity")]
    NoValidRows,

    #[error("allocated {allocated} but order requires {required}")]
    QuantityMismatch { allocated: i64, required: i64 },
}

/// Snapshot of a line's allocation state for display
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AllocationSummary {
    pub quantity_ordered: i32,
    pub total_allocated: i64,
    pub status: AllocationStatus,
    pub is_under_allocated: bool,
    pub is_over_allocated: bool,
    pub is_exact_match: bool,
}

/// Largest quantity a row may take from a batch with `remaining` units when
/// other rows of the same line already take `allocated_elsewhere` from it.
pub fn clamp_quantity(remaining: i32, allocated_elsewhere: i64, requested: i32) -> i32 {
    let cap = (i64::from(remaining) - allocated_elsewhere).max(0);
    i64::from(requested.max(0)).min(cap) as i32
}

/// Allocation plan for one order line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinePlan {
    sales_order_item_id: Uuid,
    quantity_ordered: i32,
    batches: Vec<CandidateBatch>,
    rows: Vec<AllocationRow>,
}

impl LinePlan {
    /// Start a plan with a single empty row
    pub fn new(sales_order_item_id: Uuid, quantity_ordered: i32, batches: Vec<CandidateBatch>) -> Self {
        Self::with_rows(sales_order_item_id, quantity_ordered, batches, Vec::new())
    }

    /// Rebuild a plan from rows edited elsewhere (e.g. submitted by a client).
    ///
    /// Rows are taken as given; clamping only applies to later edits.
    pub fn with_rows(
        sales_order_item_id: Uuid,
        quantity_ordered: i32,
        batches: Vec<CandidateBatch>,
        mut rows: Vec<AllocationRow>,
    ) -> Self {
        if rows.is_empty() {
            rows.push(AllocationRow::default());
        }
        Self {
            sales_order_item_id,
            quantity_ordered,
            batches,
            rows,
        }
    }

    pub fn rows(&self) -> &[AllocationRow] {
        &self.rows
    }

    pub fn add_row(&mut self) {
        self.rows.push(AllocationRow::default());
    }

    /// Remove a row; the last remaining row cannot be removed
    pub fn remove_row(&mut self, index: usize) -> Result<AllocationRow, AllocationError> {
        self.check_index(index)?;
        if self.rows.len() == 1 {
            return Err(AllocationError::LastRow);
        }
        Ok(self.rows.remove(index))
    }

    /// Choose (or clear) the batch of a row.
    ///
    /// The row's quantity is clamped against the newly chosen batch; the
    /// resulting quantity is returned.
    pub fn set_batch(&mut self, index: usize, batch_id: Option<Uuid>) -> Result<i32, AllocationError> {
        self.check_index(index)?;
        if let Some(id) = batch_id {
            if !self.batches.iter().any(|b| b.id == id) {
                return Err(AllocationError::UnknownBatch(id));
            }
        }
        self.rows[index].batch_id = batch_id;
        let requested = self.rows[index].quantity;
        let clamped = self.clamp(index, requested)?;
        self.rows[index].quantity = clamped;
        Ok(clamped)
    }

    /// Set a row's quantity, clamped to what its batch still has; returns the
    /// stored value.
    pub fn set_quantity(&mut self, index: usize, requested: i32) -> Result<i32, AllocationError> {
        let clamped = self.clamp(index, requested)?;
        self.rows[index].quantity = clamped;
        Ok(clamped)
    }

    /// Maximum quantity enterable in a row, `None` while no batch is chosen
    pub fn max_quantity(&self, index: usize) -> Result<Option<i32>, AllocationError> {
        self.check_index(index)?;
        let Some(batch_id) = self.rows[index].batch_id else {
            return Ok(None);
        };
        let remaining = self.remaining(batch_id);
        let elsewhere = self.allocated_elsewhere(index, batch_id);
        Ok(Some(clamp_quantity(remaining, elsewhere, i32::MAX)))
    }

    pub fn total_allocated(&self) -> i64 {
        self.rows.iter().map(|r| i64::from(r.quantity.max(0))).sum()
    }

    pub fn status(&self) -> AllocationStatus {
        AllocationStatus::compare(self.total_allocated(), i64::from(self.quantity_ordered))
    }

    pub fn is_exact_match(&self) -> bool {
        self.status() == AllocationStatus::ExactMatch
    }

    pub fn is_over_allocated(&self) -> bool {
        self.status() == AllocationStatus::OverAllocated
    }

    pub fn is_under_allocated(&self) -> bool {
        self.status() == AllocationStatus::UnderAllocated
    }

    pub fn summary(&self) -> AllocationSummary {
        let status = self.status();
        AllocationSummary {
            quantity_ordered: self.quantity_ordered,
            total_allocated: self.total_allocated(),
            status,
            is_under_allocated: status == AllocationStatus::UnderAllocated,
            is_over_allocated: status == AllocationStatus::OverAllocated,
            is_exact_match: status == AllocationStatus::ExactMatch,
        }
    }

    /// Flatten the plan into allocation entries.
    ///
    /// Invalid rows are dropped, rows naming the same batch are merged, and
    /// the result must add up to exactly the ordered quantity.
    pub fn submit(&self) -> Result<Vec<BatchAllocation>, AllocationError> {
        let required = i64::from(self.quantity_ordered);

        let mut merged: Vec<(Uuid, i64)> = Vec::new();
        for row in self.rows.iter().filter(|r| r.is_valid()) {
            let Some(batch_id) = row.batch_id else { continue };
            match merged.iter_mut().find(|(id, _)| *id == batch_id) {
                Some((_, qty)) => *qty += i64::from(row.quantity),
                None => merged.push((batch_id, i64::from(row.quantity))),
            }
        }

        if merged.is_empty() {
            return Err(AllocationError::NoValidRows);
        }
        if !self.is_exact_match() {
            return Err(AllocationError::QuantityMismatch {
                allocated: self.total_allocated(),
                required,
            });
        }

        let submitted: i64 = merged.iter().map(|(_, qty)| qty).sum();
        if submitted != required {
            return Err(AllocationError::QuantityMismatch {
                allocated: submitted,
                required,
            });
        }

        merged
            .into_iter()
            .map(|(stock_batch_id, qty)| {
                let quantity = i32::try_from(qty).map_err(|_| AllocationError::QuantityMismatch {
                    allocated: submitted,
                    required,
                })?;
                Ok(BatchAllocation {
                    sales_order_item_id: self.sales_order_item_id,
                    stock_batch_id,
                    quantity,
                })
            })
            .collect()
    }

    fn check_index(&self, index: usize) -> Result<(), AllocationError> {
        if index >= self.rows.len() {
            return Err(AllocationError::RowOutOfRange(index));
        }
        Ok(())
    }

    fn clamp(&self, index: usize, requested: i32) -> Result<i32, AllocationError> {
        Ok(match self.max_quantity(index)? {
            Some(max) => requested.max(0).min(max),
            None => requested.max(0),
        })
    }

    fn remaining(&self, batch_id: Uuid) -> i32 {
        self.batches
            .iter()
            .find(|b| b.id == batch_id)
            .map(|b| b.remaining)
            .unwrap_or(0)
    }

    fn allocated_elsewhere(&self, index: usize, batch_id: Uuid) -> i64 {
        self.rows
            .iter()
            .enumerate()
            .filter(|(i, r)| *i != index && r.batch_id == Some(batch_id))
            .map(|(_, r)| i64::from(r.quantity.max(0)))
            .sum()
    }
}
