//! Route definitions for the Depot distribution platform

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Catalog
        .route(
            "/suppliers",
            get(handlers::list_suppliers).post(handlers::create_supplier),
        )
        .nest("/products", product_routes())
        .route(
            "/sizes",
            get(handlers::list_bottle_sizes).post(handlers::create_bottle_size),
        )
        .nest("/customers", customer_routes())
        // Stock ledger
        .nest("/stock", stock_routes())
        // Order lifecycle
        .nest("/orders", order_routes())
        // Shortage report
        .route("/shortages", get(handlers::list_shortages))
}

/// Product routes
fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_products).post(handlers::create_product))
        .route("/:product_id/variants", get(handlers::list_product_variants))
}

/// Retailer routes
fn customer_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_customers).post(handlers::create_customer))
        .route("/:customer_id", delete(handlers::delete_customer))
}

/// Stock ledger routes
fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_stock))
        .route("/purchases", post(handlers::record_purchase))
        .route("/:stock_id/batches", get(handlers::list_available_batches))
        .route(
            "/batches/:batch_id",
            put(handlers::correct_batch).delete(handlers::delete_batch),
        )
}

/// Sales order routes
fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_orders).post(handlers::create_order))
        .route(
            "/:order_id",
            get(handlers::get_order).delete(handlers::remove_completed_order),
        )
        .route("/:order_id/complete", post(handlers::complete_order))
        .route("/:order_id/cancel", post(handlers::cancel_order))
}
