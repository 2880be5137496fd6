//! Models for the Depot distribution platform
//!
//! Re-exports domain models from the shared crate and adds the backend's
//! request inputs and query parameters.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

pub use shared::models::*;

/// Input for creating a supplier
#[derive(Debug, Deserialize, Validate)]
pub struct CreateSupplierInput {
    #[validate(length(min = 1, max = 200, message = "Supplier name cannot be empty"))]
    pub name: String,
}

/// Input for creating a product
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductInput {
    pub supplier_id: Uuid,
    #[validate(length(min = 1, max = 200, message = "Product name cannot be empty"))]
    pub name: String,
    #[validate(length(max = 20, message = "Short name is at most 20 characters"))]
    pub short_name: Option<String>,
}

/// Input for creating a bottle size
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBottleSizeInput {
    pub name: Option<String>,
    #[validate(range(min = 1, message = "Size must be at least 1 ml"))]
    pub size_ml: i32,
    pub weight_kg: Option<Decimal>,
}

/// Input for creating a retailer
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCustomerInput {
    #[validate(length(min = 1, max = 200, message = "Retailer name cannot be empty"))]
    pub name: String,
    pub address: Option<String>,
    pub license_number: Option<String>,
    pub route_number: Option<String>,
    pub user_id: Option<Uuid>,
}

/// Retailer listing query
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerQuery {
    /// Case-insensitive substring of the retailer name
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl CustomerQuery {
    pub fn pagination(&self) -> shared::Pagination {
        let defaults = shared::Pagination::default();
        shared::Pagination {
            page: self.page.unwrap_or(defaults.page).max(1),
            per_page: self.per_page.unwrap_or(defaults.per_page).clamp(1, 100),
        }
    }

    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// One purchased (product, size) line
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PurchaseInput {
    pub product_id: Uuid,
    pub size_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be greater than zero"))]
    pub quantity: i32,
    #[serde(default)]
    pub batch_code: String,
}

/// A purchase covering several variants, committed together
#[derive(Debug, Deserialize, Validate)]
pub struct PurchaseRequest {
    #[validate(length(min = 1, message = "At least one purchase line is required"))]
    pub lines: Vec<PurchaseInput>,
}

/// Manual correction of a batch
#[derive(Debug, Deserialize, Validate)]
pub struct CorrectBatchInput {
    #[serde(default)]
    pub batch_code: String,
    #[validate(range(min = 0, message = "Batch quantity cannot be negative"))]
    pub quantity: i32,
}

/// Stock listing query
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct StockQuery {
    /// Include stock records whose total is zero
    #[serde(default)]
    pub include_empty: bool,
}

/// One line of a new order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemInput {
    pub product_stock_id: Uuid,
    pub quantity: i32,
}

/// Input for creating an order
#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderInput {
    pub customer_id: Uuid,
    #[validate(length(min = 1, message = "An order needs at least one item"))]
    pub items: Vec<OrderItemInput>,
}

/// Flattened allocation list submitted to complete an order
#[derive(Debug, Deserialize)]
pub struct CompleteOrderInput {
    pub allocations: Vec<BatchAllocation>,
}

/// Line ids the client saw when it asked to cancel an order
#[derive(Debug, Deserialize)]
pub struct CancelOrderInput {
    #[serde(default)]
    pub order_item_ids: Vec<Uuid>,
}

/// Order listing query
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,
}
