//! Sales order models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sales order status. Cancelled orders are deleted rather than tagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Completed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(OrderStatus::Pending),
            "completed" => Some(OrderStatus::Completed),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A retailer's sales order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SalesOrder {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// One ordered (product, size) line of a sales order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SalesOrderItem {
    pub id: Uuid,
    pub sales_order_id: Uuid,
    pub product_stock_id: Uuid,
    pub quantity_ordered: i32,
    pub created_at: DateTime<Utc>,
}

/// Quantity of one batch consumed by one order line at completion
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderItemBatch {
    pub id: Uuid,
    pub sales_order_item_id: Uuid,
    /// Empty once the batch itself has been deleted
    pub stock_batch_id: Option<Uuid>,
    /// Batch code at the time of consumption
    pub batch_code: String,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

/// A flattened (line, batch, quantity) allocation entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct BatchAllocation {
    pub sales_order_item_id: Uuid,
    pub stock_batch_id: Uuid,
    pub quantity: i32,
}

/// Order listing row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub customer_name: String,
    pub status: OrderStatus,
    pub item_count: i64,
    pub created_at: DateTime<Utc>,
}

/// An order with its lines, as shown on the order page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: SalesOrder,
    pub customer_name: String,
    pub lines: Vec<OrderLineDetail>,
}

impl OrderDetail {
    /// Every line's stock total covers its ordered quantity
    pub fn is_completable(&self) -> bool {
        self.lines.iter().all(|line| !line.is_low_stock())
    }
}

/// One order line with product/size info, current stock and allocations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLineDetail {
    #[serde(flatten)]
    pub item: SalesOrderItem,
    pub product_id: Uuid,
    pub product_name: String,
    pub size_ml: i32,
    pub stock_quantity: i32,
    /// Batches consumed by this line; empty while the order is pending
    pub allocations: Vec<OrderItemBatch>,
}

impl OrderLineDetail {
    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity < self.item.quantity_ordered
    }
}

/// Ordered quantity of one pending line against its stock record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingDemand {
    pub product_stock_id: Uuid,
    pub product_name: String,
    pub size_ml: i32,
    pub quantity_ordered: i32,
    pub available: i32,
}

/// A (product, size) whose pending demand exceeds its stock
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShortageLine {
    pub product_stock_id: Uuid,
    pub product_name: String,
    pub size_ml: i32,
    pub qty_required: i64,
    pub total_available: i64,
    pub shortage: i64,
}
