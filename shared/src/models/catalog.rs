//! Catalog models: suppliers, products, bottle sizes and retailers

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A supplier (distillery, brewery, importer)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Supplier {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A product sold by the distributor. Immutable once stock references it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: Uuid,
    pub supplier_id: Uuid,
    pub name: String,
    pub short_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Bottle size descriptor, shared across products
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BottleSize {
    pub id: Uuid,
    pub name: Option<String>,
    pub size_ml: i32,
    pub weight_kg: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

/// A retailer buying from the distributor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub license_number: Option<String>,
    pub route_number: Option<String>,
    /// Login linked to this retailer, if any
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}
