//! HTTP handlers for suppliers, products, bottle sizes and retailers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::PaginatedResponse;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{
    BottleSize, CreateBottleSizeInput, CreateCustomerInput, CreateProductInput,
    CreateSupplierInput, Customer, CustomerQuery, Product, StockVariant, Supplier,
};
use crate::services::{CatalogService, StockLedger};
use crate::AppState;

/// List suppliers
pub async fn list_suppliers(State(state): State<AppState>) -> AppResult<Json<Vec<Supplier>>> {
    let service = CatalogService::new(state.store);
    Ok(Json(service.list_suppliers().await?))
}

/// Create a supplier
pub async fn create_supplier(
    State(state): State<AppState>,
    Json(input): Json<CreateSupplierInput>,
) -> AppResult<(StatusCode, Json<Supplier>)> {
    let service = CatalogService::new(state.store);
    let supplier = service.create_supplier(&input).await?;
    Ok((StatusCode::CREATED, Json(supplier)))
}

/// List products
pub async fn list_products(State(state): State<AppState>) -> AppResult<Json<Vec<Product>>> {
    let service = CatalogService::new(state.store);
    Ok(Json(service.list_products().await?))
}

/// Create a product
pub async fn create_product(
    State(state): State<AppState>,
    Json(input): Json<CreateProductInput>,
) -> AppResult<(StatusCode, Json<Product>)> {
    let service = CatalogService::new(state.store);
    let product = service.create_product(&input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// Size variants of a product that have a stock record
pub async fn list_product_variants(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Vec<StockVariant>>> {
    let ledger = StockLedger::new(state.store);
    Ok(Json(ledger.product_variants(product_id).await?))
}

/// List bottle sizes
pub async fn list_bottle_sizes(State(state): State<AppState>) -> AppResult<Json<Vec<BottleSize>>> {
    let service = CatalogService::new(state.store);
    Ok(Json(service.list_bottle_sizes().await?))
}

/// Create a bottle size
pub async fn create_bottle_size(
    State(state): State<AppState>,
    Json(input): Json<CreateBottleSizeInput>,
) -> AppResult<(StatusCode, Json<BottleSize>)> {
    let service = CatalogService::new(state.store);
    let size = service.create_bottle_size(&input).await?;
    Ok((StatusCode::CREATED, Json(size)))
}

/// Search retailers by name, one page at a time
pub async fn list_customers(
    State(state): State<AppState>,
    Query(query): Query<CustomerQuery>,
) -> AppResult<Json<PaginatedResponse<Customer>>> {
    let service = CatalogService::new(state.store);
    Ok(Json(service.list_customers(&query).await?))
}

/// Create a retailer
pub async fn create_customer(
    State(state): State<AppState>,
    Json(input): Json<CreateCustomerInput>,
) -> AppResult<(StatusCode, Json<Customer>)> {
    let service = CatalogService::new(state.store);
    let customer = service.create_customer(&input).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

/// Delete a retailer without orders
pub async fn delete_customer(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = CatalogService::new(state.store);
    service.delete_customer(customer_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
