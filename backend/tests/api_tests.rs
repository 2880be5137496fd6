//! HTTP API tests
//!
//! Drives the router in-process over an in-memory store.

mod common;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use depot_backend::{create_app, store::MemoryStore, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

fn app() -> Router {
    create_app(AppState::new(Arc::new(MemoryStore::new()), common::test_config()))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn id(value: &Value) -> String {
    value["id"].as_str().unwrap().to_string()
}

/// Supplier, product, size and retailer; returns (product id, size id, customer id)
async fn seed_catalog(app: &Router) -> (String, String, String) {
    let (status, supplier) = send(app, "POST", "/api/v1/suppliers", Some(json!({ "name": "Northern Spirits" }))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, product) = send(
        app,
        "POST",
        "/api/v1/products",
        Some(json!({ "supplier_id": id(&supplier), "name": "Product A", "short_name": "PA" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, size) = send(app, "POST", "/api/v1/sizes", Some(json!({ "name": "Bottle", "size_ml": 750 }))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, customer) = send(app, "POST", "/api/v1/customers", Some(json!({ "name": "Corner Liquor" }))).await;
    assert_eq!(status, StatusCode::CREATED);

    (id(&product), id(&size), id(&customer))
}

// ============================================================================
// Health
// ============================================================================

#[cfg(test)]
mod health_tests {
    use super::*;

    #[tokio::test]
    async fn test_root_health() {
        let app = app();
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"OK");
    }

    #[tokio::test]
    async fn test_api_health_reports_store() {
        let app = app();
        let (status, body) = send(&app, "GET", "/api/v1/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["storage"], "memory");
        assert_eq!(body["database"], "connected");
    }
}

// ============================================================================
// Order Flow
// ============================================================================

#[cfg(test)]
mod order_flow_tests {
    use super::*;

    #[tokio::test]
    async fn test_purchase_order_and_complete() {
        let app = app();
        let (product_id, size_id, customer_id) = seed_catalog(&app).await;

        let (status, batches) = send(
            &app,
            "POST",
            "/api/v1/stock/purchases",
            Some(json!({ "lines": [
                { "product_id": product_id, "size_id": size_id, "quantity": 100, "batch_code": "B1" },
                { "product_id": product_id, "size_id": size_id, "quantity": 50, "batch_code": "B2" }
            ]})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let b1 = id(&batches[0]);
        let b2 = id(&batches[1]);
        let stock_id = batches[0]["product_stock_id"].as_str().unwrap().to_string();

        let (status, stock) = send(&app, "GET", "/api/v1/stock", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stock[0]["quantity"], 150);
        assert_eq!(stock[0]["batches"].as_array().unwrap().len(), 2);

        let (status, available) = send(&app, "GET", &format!("/api/v1/stock/{}/batches", stock_id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(available.as_array().unwrap().len(), 2);

        let (status, order) = send(
            &app,
            "POST",
            "/api/v1/orders",
            Some(json!({ "customer_id": customer_id, "items": [{ "product_stock_id": stock_id, "quantity": 120 }] })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(order["status"], "pending");
        assert_eq!(order["completable"], true);
        let order_id = id(&order);
        let line_id = id(&order["lines"][0]);

        let (status, error) = send(
            &app,
            "POST",
            &format!("/api/v1/orders/{}/complete", order_id),
            Some(json!({ "allocations": [
                { "sales_order_item_id": line_id, "stock_batch_id": b1, "quantity": 100 },
                { "sales_order_item_id": line_id, "stock_batch_id": b2, "quantity": 19 }
            ]})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(error["error"]["code"], "INCOMPLETE_ALLOCATION");
        assert_eq!(error["error"]["message"], "allocated 119 but order requires 120");

        let (status, completed) = send(
            &app,
            "POST",
            &format!("/api/v1/orders/{}/complete", order_id),
            Some(json!({ "allocations": [
                { "sales_order_item_id": line_id, "stock_batch_id": b1, "quantity": 100 },
                { "sales_order_item_id": line_id, "stock_batch_id": b2, "quantity": 20 }
            ]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(completed["status"], "completed");
        assert_eq!(completed["lines"][0]["allocations"].as_array().unwrap().len(), 2);

        let (_, stock) = send(&app, "GET", "/api/v1/stock", None).await;
        assert_eq!(stock[0]["quantity"], 30);

        let (status, listed) = send(&app, "GET", "/api/v1/orders?status=completed", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let (status, _) = send(&app, "DELETE", &format!("/api/v1/orders/{}", order_id), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, "GET", &format!("/api/v1/orders/{}", order_id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cancel_and_shortages() {
        let app = app();
        let (product_id, size_id, customer_id) = seed_catalog(&app).await;

        let (_, batches) = send(
            &app,
            "POST",
            "/api/v1/stock/purchases",
            Some(json!({ "lines": [{ "product_id": product_id, "size_id": size_id, "quantity": 50 }] })),
        )
        .await;
        let stock_id = batches[0]["product_stock_id"].as_str().unwrap().to_string();

        let mut orders = Vec::new();
        for quantity in [40, 30] {
            let (_, order) = send(
                &app,
                "POST",
                "/api/v1/orders",
                Some(json!({ "customer_id": customer_id, "items": [{ "product_stock_id": stock_id, "quantity": quantity }] })),
            )
            .await;
            orders.push(order);
        }

        let (status, report) = send(&app, "GET", "/api/v1/shortages", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report[0]["shortage"], 20);

        let first = &orders[0];
        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/v1/orders/{}/cancel", id(first)),
            Some(json!({ "order_item_ids": [id(&first["lines"][0])] })),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, report) = send(&app, "GET", "/api/v1/shortages", None).await;
        assert!(report.as_array().unwrap().is_empty());

        let (status, error) = send(&app, "DELETE", &format!("/api/v1/customers/{}", customer_id), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(error["error"]["code"], "CONFLICT");
    }
}

// ============================================================================
// Error Responses
// ============================================================================

#[cfg(test)]
mod error_tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_purchase_quantity() {
        let app = app();
        let (product_id, size_id, _) = seed_catalog(&app).await;

        let (status, error) = send(
            &app,
            "POST",
            "/api/v1/stock/purchases",
            Some(json!({ "lines": [{ "product_id": product_id, "size_id": size_id, "quantity": 0 }] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(error["error"]["field"], "quantity");
    }

    #[tokio::test]
    async fn test_unknown_order_is_not_found() {
        let app = app();
        let (status, error) = send(
            &app,
            "GET",
            &format!("/api/v1/orders/{}", uuid::Uuid::new_v4()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(error["error"]["message"], "Order not found");
    }

    #[tokio::test]
    async fn test_negative_batch_correction() {
        let app = app();
        let (product_id, size_id, _) = seed_catalog(&app).await;
        let (_, batches) = send(
            &app,
            "POST",
            "/api/v1/stock/purchases",
            Some(json!({ "lines": [{ "product_id": product_id, "size_id": size_id, "quantity": 10, "batch_code": "B1" }] })),
        )
        .await;

        let (status, error) = send(
            &app,
            "PUT",
            &format!("/api/v1/stock/batches/{}", id(&batches[0])),
            Some(json!({ "batch_code": "B1", "quantity": -3 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error["error"]["code"], "VALIDATION_ERROR");

        let (status, corrected) = send(
            &app,
            "PUT",
            &format!("/api/v1/stock/batches/{}", id(&batches[0])),
            Some(json!({ "batch_code": "B1", "quantity": 4 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(corrected["quantity"], 4);

        let (_, stock) = send(&app, "GET", "/api/v1/stock", None).await;
        assert_eq!(stock[0]["quantity"], 4);
    }

    #[tokio::test]
    async fn test_catalog_names_are_stored_trimmed() {
        let app = app();
        let (_, supplier) = send(&app, "POST", "/api/v1/suppliers", Some(json!({ "name": "Northern Spirits" }))).await;

        let (status, product) = send(
            &app,
            "POST",
            "/api/v1/products",
            Some(json!({ "supplier_id": id(&supplier), "name": "  Product A  " })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(product["name"], "Product A");

        let (status, customer) = send(&app, "POST", "/api/v1/customers", Some(json!({ "name": " Corner Liquor\t" }))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(customer["name"], "Corner Liquor");

        let (_, page) = send(&app, "GET", "/api/v1/customers?search=corner", None).await;
        assert_eq!(page["data"][0]["name"], "Corner Liquor");

        let (status, error) = send(&app, "POST", "/api/v1/customers", Some(json!({ "name": "   " }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error["error"]["field"], "name");
    }

    #[tokio::test]
    async fn test_customer_search_is_paginated() {
        let app = app();
        for name in ["Alpha Wines", "Beta Beers", "alpha spirits"] {
            send(&app, "POST", "/api/v1/customers", Some(json!({ "name": name }))).await;
        }

        let (status, page) = send(&app, "GET", "/api/v1/customers?search=ALPHA&per_page=1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["data"].as_array().unwrap().len(), 1);
        assert_eq!(page["pagination"]["total_items"], 2);
        assert_eq!(page["pagination"]["total_pages"], 2);
    }
}
