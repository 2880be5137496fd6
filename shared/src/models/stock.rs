//! Stock models: per-variant totals and the batches that compose them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stock total for one (product, size) pair.
///
/// `quantity` always equals the sum of the quantities of its batches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StockRecord {
    pub id: Uuid,
    pub product_id: Uuid,
    pub size_id: Uuid,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

/// A purchased batch of one stock record.
///
/// `batch_code` is entered by hand and is not unique; batches are always
/// addressed by `id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StockBatch {
    pub id: Uuid,
    pub product_stock_id: Uuid,
    pub batch_code: String,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

/// Stock listing row: a stock record with product/size names and its batches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockWithBatches {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub product_short_name: Option<String>,
    pub size_id: Uuid,
    pub size_name: Option<String>,
    pub size_ml: i32,
    pub quantity: i32,
    /// Newest first
    pub batches: Vec<StockBatch>,
}

impl StockWithBatches {
    /// Sum of batch quantities; equal to `quantity` for consistent data
    pub fn batch_total(&self) -> i64 {
        self.batches.iter().map(|b| i64::from(b.quantity)).sum()
    }
}

/// One size variant of a product together with its current total
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockVariant {
    pub stock_id: Uuid,
    pub size_id: Uuid,
    pub size_ml: i32,
    pub size_name: Option<String>,
    pub quantity: i32,
}
